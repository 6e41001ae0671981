//! Ordered fallback strategies for registry mutations.
//!
//! Batch member addition has no atomicity contract with the sequential
//! form: when the batch transaction fails as a whole, the supported
//! recovery is per-address calls. Rather than nesting error handlers at
//! each call site, callers declare an explicit ordered list of
//! strategies and one policy function returns the first success or an
//! aggregate failure.

use std::future::Future;
use std::pin::Pin;

use crate::error::{RegistryError, Result};

/// A named, lazily-evaluated attempt at an operation.
pub type BoxedStrategy<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Which strategy produced the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome<T> {
    /// Name of the winning strategy.
    pub strategy: &'static str,
    /// Its result.
    pub value: T,
}

/// Evaluate strategies in order, returning the first success.
///
/// Failures short of the last are logged and swallowed; if every
/// strategy fails, the aggregate error lists each failure in order.
pub async fn run_strategies<'a, T>(
    operation: &str,
    strategies: Vec<(&'static str, BoxedStrategy<'a, T>)>,
) -> Result<StrategyOutcome<T>> {
    let mut failures = Vec::new();

    for (name, strategy) in strategies {
        match strategy.await {
            Ok(value) => {
                if !failures.is_empty() {
                    tracing::warn!(
                        operation,
                        strategy = name,
                        failed = failures.len(),
                        "operation succeeded after fallback"
                    );
                }
                return Ok(StrategyOutcome {
                    strategy: name,
                    value,
                });
            }
            Err(err) => {
                tracing::warn!(operation, strategy = name, %err, "strategy failed");
                failures.push(format!("{name}: {err}"));
            }
        }
    }

    Err(RegistryError::AllStrategiesFailed {
        operation: operation.to_string(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::ObjectId;

    fn failing<'a>(msg: &'static str) -> BoxedStrategy<'a, u32> {
        Box::pin(async move { Err(RegistryError::LedgerError(msg.into())) })
    }

    fn succeeding<'a>(value: u32) -> BoxedStrategy<'a, u32> {
        Box::pin(async move { Ok(value) })
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let outcome = run_strategies("op", vec![("batch", succeeding(1)), ("seq", succeeding(2))])
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "batch");
        assert_eq!(outcome.value, 1);
    }

    #[tokio::test]
    async fn test_fallback_after_failure() {
        let outcome = run_strategies("op", vec![("batch", failing("nope")), ("seq", succeeding(2))])
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "seq");
        assert_eq!(outcome.value, 2);
    }

    #[tokio::test]
    async fn test_aggregate_failure_lists_all() {
        let err = run_strategies("op", vec![("batch", failing("a")), ("seq", failing("b"))])
            .await
            .unwrap_err();
        match err {
            RegistryError::AllStrategiesFailed { operation, failures } => {
                assert_eq!(operation, "op");
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("batch:"));
            }
            other => panic!("expected AllStrategiesFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_strategies_capture_environment() {
        let id = ObjectId::from_bytes([0x01; 32]);
        let outcome = run_strategies(
            "op",
            vec![(
                "only",
                Box::pin(async { Ok(u32::from(id.as_bytes()[0])) }) as BoxedStrategy<'_, u32>,
            )],
        )
        .await
        .unwrap();
        assert_eq!(outcome.value, 1);
    }
}
