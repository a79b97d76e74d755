//! ReferenceLookup port: death-date lookup against the reference source.

use async_trait::async_trait;
use chrono::NaiveDate;

/// One fallible, network-bound question: is there a recorded death date for
/// this name?
///
/// The contract is deliberately silent about failure: any transient error
/// (network, parse, ambiguous name) comes back as `None` and is logged by
/// the implementation. "No date this cycle" and "lookup failed this cycle"
/// are the same answer to the caller, so one subject's bad lookup can never
/// abort a cycle for the others.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn death_date(&self, name: &str) -> Option<NaiveDate>;
}
