//! Explicit "authenticated first, public second" reads.
//!
//! The context clients never fall back on their own; a caller that wants a
//! public answer when the scoped read fails asks for it here.

use std::future::Future;

use tracing::warn;

use crate::error::ApiResult;

/// Runs `primary`; on a fallback-eligible failure (not found, backend down,
/// unreachable) runs `secondary` instead. Other failures are returned as-is.
///
/// If the secondary also fails, its error is returned.
pub async fn prefer_primary<T, P, S, SF>(operation: &str, primary: P, secondary: S) -> ApiResult<T>
where
    P: Future<Output = ApiResult<T>>,
    S: FnOnce() -> SF,
    SF: Future<Output = ApiResult<T>>,
{
    match primary.await {
        Ok(value) => Ok(value),
        Err(err) if err.is_fallback_eligible() => {
            warn!(
                operation,
                kind = ?err.kind,
                status = ?err.status(),
                "Primary read failed, falling back to public source"
            );
            secondary().await
        }
        Err(err) => Err(err),
    }
}
