//! Newline-delimited JSON feed.
//!
//! Each line carries one event from the BGP engine, either a full best-path table
//! (`{"table": [<path>, ...]}`) or a batch of changed paths (`{"paths": [<path>, ...]}`),
//! using the same path format as the JSON-RPC API.

use std::io;

use futures::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::api::PathSpec;
use crate::sync::{FeedEvent, SyncHandle};
use crate::utils::parse_path_specs;

// Longest single line we'll buffer (a full table on one line can be large)
const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FeedLine {
    Table(Vec<PathSpec>),
    Paths(Vec<PathSpec>),
}

fn parse_line(line: &str) -> Result<FeedEvent, String> {
    let line: FeedLine = serde_json::from_str(line).map_err(|err| err.to_string())?;
    let event = match line {
        FeedLine::Table(specs) => FeedEvent::Table(parse_path_specs(&specs)),
        FeedLine::Paths(specs) => FeedEvent::Paths(parse_path_specs(&specs)),
    };
    Ok(event)
}

/// Submit every event read from `reader` until it closes.
/// Unreadable lines are logged and skipped. Returns the number of events submitted
pub async fn read_feed<R>(reader: R, handle: SyncHandle) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut submitted = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next().await {
        line_no += 1;
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Feed line {} is too long, skipping", line_no);
                continue;
            }
            Err(LinesCodecError::Io(err)) => return Err(err),
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(event) => {
                debug!("Feed line {}: {}", line_no, event);
                handle
                    .submit(event)
                    .await
                    .map_err(|err| io::Error::new(io::ErrorKind::BrokenPipe, err))?;
                submitted += 1;
            }
            Err(err) => warn!("Skipping feed line {}: {}", line_no, err),
        }
    }
    info!("Feed closed after {} events", submitted);
    Ok(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fib::MemoryTable;
    use crate::sync::{Reconciler, SyncMode, SyncWorker};
    use std::sync::Arc;
    use std::time::Duration;

    const FEED: &str = r#"{"table": [{"afi": 1, "safi": 1, "nlri": {"type": "prefix", "prefix": "10.1.0.0/16"}, "attributes": [{"type": "next_hop", "next_hop": "192.0.2.1"}]}]}
not json at all

{"table": [{"afi": 1, "safi": 1, "nlri": {"type": "prefix", "prefix": "10.2.0.0/16"}, "attributes": [{"type": "next_hop", "next_hop": "192.0.2.1"}]}, {"afi": 25, "safi": 70, "nlri": {"type": "other", "encoding": "evpn"}}]}
"#;

    #[test]
    fn test_parse_line() {
        match parse_line(r#"{"paths": []}"#).unwrap() {
            FeedEvent::Paths(paths) => assert!(paths.is_empty()),
            other => panic!("Unexpected event: {}", other),
        }
        assert!(parse_line(r#"{"routes": []}"#).is_err());
    }

    #[tokio::test]
    async fn test_read_feed() {
        let table = Arc::new(MemoryTable::new());
        let reconciler = Reconciler::new(table.clone(), Duration::from_secs(1));
        let (worker, handle) = SyncWorker::new(reconciler, SyncMode::Full, 4);
        let status = handle.status();
        let task = worker.spawn();

        let submitted = read_feed(FEED.as_bytes(), handle).await.unwrap();
        assert_eq!(submitted, 2);
        task.await.unwrap();

        let keys: Vec<String> = table.routes().await.keys().cloned().collect();
        assert_eq!(keys, vec!["10.2.0.0/16"]);
        let report = status.last_report().await.unwrap();
        assert_eq!(report.ignored, 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_malformed_path_spares_snapshot() {
        let feed = r#"{"table": [{"afi": 1, "safi": 1, "nlri": {"type": "prefix", "prefix": "10.1.0.0/16"}, "attributes": [{"type": "next_hop", "next_hop": "192.0.2.1"}]}, {"afi": 1, "safi": 1, "nlri": {"type": "prefix", "prefix": "10.2.0.0"}, "attributes": [{"type": "next_hop", "next_hop": "192.0.2.1"}]}, {"afi": 1, "safi": 1, "nlri": {"type": "prefix", "prefix": "10.3.0.0/16"}, "attributes": [{"type": "next_hop", "next_hop": "192.0.2.1"}]}]}
"#;
        let table = Arc::new(MemoryTable::new());
        let reconciler = Reconciler::new(table.clone(), Duration::from_secs(1));
        let (worker, handle) = SyncWorker::new(reconciler, SyncMode::Full, 4);
        let status = handle.status();
        let task = worker.spawn();

        assert_eq!(read_feed(feed.as_bytes(), handle).await.unwrap(), 1);
        task.await.unwrap();

        let keys: Vec<String> = table.routes().await.keys().cloned().collect();
        assert_eq!(keys, vec!["10.1.0.0/16", "10.3.0.0/16"]);
        let report = status.last_report().await.unwrap();
        assert_eq!(report.paths, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, ErrorKind::MalformedPath);
    }
}
