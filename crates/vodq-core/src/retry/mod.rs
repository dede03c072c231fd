//! Retry and backoff policy for the download stage (spec §4.3, §7).
//!
//! `classify` maps transport-level failures into the shared
//! `DownloadErrorKind`; `policy` turns a kind + attempt number into a
//! retry/no-retry decision; `run` drives a closure through that policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify_http_status, classify_reqwest_error};
pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
