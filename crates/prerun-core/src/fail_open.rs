//! Fail-open helper for per-provider isolation
//!
//! Aggregate operations visit several VCS providers in turn. One provider
//! failing must not take the others down with it, so each visit goes through
//! [`fail_open`]: the error is logged and the caller receives `None`.
//!
//! DO NOT use fail-open for aggregate preconditions (no providers, ambiguous
//! branch). Those are meant to reach the user.

use std::future::Future;
use tracing::error;

use crate::Result;

/// Execute an operation whose failure should only be logged
///
/// Logs the error via `tracing::error!` on failure and returns `None`.
///
/// ```no_run
/// use prerun_core::fail_open::fail_open;
/// use prerun_core::Result;
///
/// async fn collect_changes() -> Result<Vec<String>> {
///     Ok(vec![])
/// }
///
/// async fn example() {
///     let changes = fail_open("git provider at /ws", || collect_changes()).await;
///     // changes is None if collect_changes() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            error!("{} failed: {}", operation_name, e);
            None
        }
    }
}
