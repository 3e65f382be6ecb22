//! Stored language reports.

pub mod store;

pub use store::{AccountSummary, ReportState, Response, ResponseStore};
