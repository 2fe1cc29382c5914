use std::fmt::Display;
use std::future::Future;

/// Run a side effect whose failure must not fail the caller.
///
/// The error is logged with the step name and object key and then dropped.
pub(crate) async fn best_effort<T, E, F>(step: &'static str, key: &str, fut: F) -> Option<T>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, step, key = %key, "Best-effort step failed, continuing");
            None
        }
    }
}
