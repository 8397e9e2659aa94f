//! Shapes aggregation outcomes into the wire format. No I/O.

use crate::aggregate::{Aggregation, CredentialOutcome};
use crate::tree::TreeError;
use crate::types::{AggregatedEntry, EntryError, EntryStatus};

/// Header carrying the number of failed credentials in an aggregation response.
pub const FAILED_CREDENTIALS_HEADER: &str = "x-drivehub-failed-credentials";

/// One entry per credential, same order as the aggregation.
pub fn assemble(aggregation: Aggregation) -> Vec<AggregatedEntry> {
    aggregation.outcomes.into_iter().map(entry).collect()
}

fn entry(outcome: CredentialOutcome) -> AggregatedEntry {
    let CredentialOutcome { credential, result } = outcome;
    let (status, drives, error) = match result {
        Ok(drives) => (EntryStatus::Ok, drives, None),
        Err(e) => (EntryStatus::Failed, Vec::new(), Some(error_marker(&e))),
    };
    AggregatedEntry {
        api_title: credential.title,
        api_idx: credential.id,
        api_url: credential.token,
        status,
        drives,
        error,
    }
}

pub fn error_marker(err: &TreeError) -> EntryError {
    let code = match err {
        TreeError::TimedOut(_) => "TIMED_OUT",
        _ => "PROVIDER_CALL_FAILED",
    };
    EntryError {
        code: code.to_string(),
        message: err.to_string(),
        upstream_status: err.upstream_status(),
        drive_id: err.drive_id().map(str::to_string),
    }
}
