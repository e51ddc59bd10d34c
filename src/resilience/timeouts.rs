//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap a network exchange with a hard deadline
//! - Report expiry as a transport failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timeout errors are distinct from other transport errors
//! - No partial content is recovered from a timed-out exchange

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Run `future` with a deadline of `timeout`.
pub async fn enforce<T, F>(timeout: Duration, future: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}
