//! Bounded timeouts for external calls
//!
//! Every call that leaves the process (geocoder, object store, database)
//! goes through [`with_timeout`]. An elapsed timer is reported as the
//! error the caller would have received from the collaborator itself, so
//! upstream code never has to distinguish "slow" from "failed".

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::shared::types::{DomainError, DomainResult};

/// Per-collaborator timeout limits.
#[derive(Debug, Clone, Copy)]
pub struct CallTimeouts {
    pub geocoder: Duration,
    pub storage: Duration,
    pub database: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            geocoder: Duration::from_secs(10),
            storage: Duration::from_secs(30),
            database: Duration::from_secs(10),
        }
    }
}

/// Run `operation` with an upper bound of `limit`.
///
/// On expiry, `on_timeout` builds the error that stands in for the
/// collaborator's own failure (e.g. `DomainError::Geocode`).
pub async fn with_timeout<T, Fut>(
    limit: Duration,
    operation_name: &str,
    operation: Fut,
    on_timeout: impl FnOnce(String) -> DomainError,
) -> DomainResult<T>
where
    Fut: Future<Output = DomainResult<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms = limit.as_millis() as u64,
                "External call timed out"
            );
            Err(on_timeout(format!(
                "{} timed out after {}ms",
                operation_name,
                limit.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_limit() {
        let result = with_timeout(
            Duration::from_millis(200),
            "fast",
            async { Ok::<_, DomainError>(7) },
            DomainError::Storage,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_given_error() {
        let result: DomainResult<()> = with_timeout(
            Duration::from_millis(10),
            "geocode",
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            DomainError::Geocode,
        )
        .await;

        match result {
            Err(DomainError::Geocode(msg)) => assert!(msg.contains("geocode timed out")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: DomainResult<()> = with_timeout(
            Duration::from_millis(200),
            "lookup",
            async { Err(DomainError::not_found("User", "u1")) },
            DomainError::Persistence,
        )
        .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
