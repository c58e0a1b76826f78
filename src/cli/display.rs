use prettytable::{cell, row, Row};

use super::table::ToRow;
use crate::api::{InstalledRoute, PeerSummary};
use crate::sync::SyncFailure;
use crate::utils::u32_to_dotted;

const EMPTY_VALUE: &str = "";

pub(super) struct InstalledRouteRow(pub InstalledRoute);

impl ToRow for InstalledRouteRow {
    fn columns() -> Row {
        row!["Prefix", "Next Hop", "Device"]
    }

    fn to_row(&self) -> Row {
        row![
            self.0.prefix,
            self.0
                .next_hop
                .map(|nh| nh.to_string())
                .unwrap_or_else(|| EMPTY_VALUE.to_string()),
            self.0.device.as_deref().unwrap_or(EMPTY_VALUE),
        ]
    }
}

pub(super) struct PeerSummaryRow(pub PeerSummary);

impl ToRow for PeerSummaryRow {
    fn columns() -> Row {
        row!["Neighbor", "Remote AS", "Local AS", "Type", "Description"]
    }

    fn to_row(&self) -> Row {
        row![
            self.0.peer,
            u32_to_dotted(self.0.remote_asn, '.'),
            u32_to_dotted(self.0.local_asn, '.'),
            if self.0.ebgp { "eBGP" } else { "iBGP" },
            self.0.description,
        ]
    }
}

pub(super) struct FailureRow(pub SyncFailure);

impl ToRow for FailureRow {
    fn columns() -> Row {
        row!["Subject", "Kind", "Reason"]
    }

    fn to_row(&self) -> Row {
        row![self.0.subject, self.0.kind.to_string(), self.0.reason]
    }
}
