use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SyncMode;
use crate::error::ErrorKind;

/// A path or route that couldn't be processed during a pass
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SyncFailure {
    /// Prefix key or path description the failure applies to
    pub subject: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.subject, self.kind, self.reason)
    }
}

/// Outcome of one pass. Failures don't stop a pass, they're collected here
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    /// Paths handed to this pass
    pub paths: usize,
    /// Prefix keys successfully added or replaced
    pub replaced: Vec<String>,
    /// Prefix keys successfully deleted
    pub deleted: Vec<String>,
    /// Paths accepted but not translated (EVPN, Flowspec)
    pub ignored: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn new(mode: SyncMode, paths: usize) -> Self {
        Self {
            mode,
            started: Utc::now(),
            finished: None,
            paths,
            replaced: vec![],
            deleted: vec![],
            ignored: 0,
            failures: vec![],
        }
    }

    pub fn fail<S, R>(&mut self, subject: S, kind: ErrorKind, reason: R)
    where
        S: ToString,
        R: ToString,
    {
        self.failures.push(SyncFailure {
            subject: subject.to_string(),
            kind,
            reason: reason.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished = Some(Utc::now());
    }

    /// Every path decoded and every route applied
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<SyncReport mode={} paths={} replaced={} deleted={} ignored={} failures={}>",
            self.mode,
            self.paths,
            self.replaced.len(),
            self.deleted.len(),
            self.ignored,
            self.failures.len()
        )
    }
}
