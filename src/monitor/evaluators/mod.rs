//! Evaluators - turn one external source into risk factors
//!
//! Each evaluator splits into an async `fetch` against its collaborator and a
//! pure `evaluate` over what was fetched. `run_evaluator` enforces the source
//! timeout and folds every failure into an empty factor list, so one broken
//! feed never stops the others.

pub mod equipment;
pub mod location;
pub mod personnel;
pub mod weather;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{trace, warn};

use super::models::{RiskFactor, SourceHealth, SourceReport};
use crate::error::SourceError;

pub use equipment::EquipmentEvaluator;
pub use location::{LocationContext, LocationEvaluator};
pub use personnel::PersonnelEvaluator;
pub use weather::WeatherEvaluator;

/// A risk evaluator over a single collaborator
#[async_trait]
pub trait RiskEvaluator: Send + Sync {
    /// What `fetch` produces
    type Input: Send;

    fn name(&self) -> &'static str;

    /// Read the collaborator. `Ok(None)` means nothing to evaluate.
    async fn fetch(&self) -> Result<Option<Self::Input>, SourceError>;

    /// Apply the threshold rules to fetched input
    fn evaluate(&self, input: &Self::Input) -> Vec<RiskFactor>;
}

/// Outcome of one evaluator within a cycle
#[derive(Debug)]
pub struct EvaluatorRun<T> {
    pub input: Option<T>,
    pub factors: Vec<RiskFactor>,
    pub report: SourceReport,
}

/// Fetch and evaluate with an enforced timeout. Never fails.
pub async fn run_evaluator<E: RiskEvaluator>(evaluator: &E, limit: Duration) -> EvaluatorRun<E::Input> {
    let started = Instant::now();

    let (input, health) = match timeout(limit, evaluator.fetch()).await {
        Ok(Ok(Some(input))) => (Some(input), SourceHealth::Ok),
        Ok(Ok(None)) => (None, SourceHealth::Empty),
        Ok(Err(e)) => {
            warn!(evaluator = evaluator.name(), error = %e, "Source unavailable, contributing no factors");
            (None, SourceHealth::Failed)
        }
        Err(_) => {
            let e = SourceError::Timeout(limit.as_millis() as u64);
            warn!(evaluator = evaluator.name(), error = %e, "Source timed out, contributing no factors");
            (None, SourceHealth::TimedOut)
        }
    };

    let factors = input
        .as_ref()
        .map(|i| evaluator.evaluate(i))
        .unwrap_or_default();

    let elapsed_ms = started.elapsed().as_millis() as u64;
    trace!(
        evaluator = evaluator.name(),
        health = ?health,
        factors = factors.len(),
        elapsed_ms,
        "Evaluator finished"
    );

    EvaluatorRun {
        input,
        report: SourceReport {
            evaluator: evaluator.name().to_string(),
            health,
            factor_count: factors.len(),
            elapsed_ms,
        },
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::models::{Hazard, RiskType, Severity};

    struct FixedEvaluator {
        result: Result<Option<u32>, SourceError>,
        delay: Duration,
    }

    #[async_trait]
    impl RiskEvaluator for FixedEvaluator {
        type Input = u32;

        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self) -> Result<Option<u32>, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }

        fn evaluate(&self, input: &u32) -> Vec<RiskFactor> {
            (0..*input)
                .map(|_| {
                    RiskFactor::new(
                        RiskType::Weather,
                        Hazard::HighWind,
                        Severity::Medium,
                        4.0,
                        "test",
                        "test",
                    )
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_ok_source() {
        let eval = FixedEvaluator {
            result: Ok(Some(2)),
            delay: Duration::ZERO,
        };
        let run = run_evaluator(&eval, Duration::from_secs(1)).await;
        assert_eq!(run.factors.len(), 2);
        assert_eq!(run.report.health, SourceHealth::Ok);
        assert_eq!(run.input, Some(2));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let eval = FixedEvaluator {
            result: Ok(None),
            delay: Duration::ZERO,
        };
        let run = run_evaluator(&eval, Duration::from_secs(1)).await;
        assert!(run.factors.is_empty());
        assert_eq!(run.report.health, SourceHealth::Empty);
        assert!(!run.report.is_degraded());
    }

    #[tokio::test]
    async fn test_failed_source() {
        let eval = FixedEvaluator {
            result: Err(SourceError::Unavailable("down".into())),
            delay: Duration::ZERO,
        };
        let run = run_evaluator(&eval, Duration::from_secs(1)).await;
        assert!(run.factors.is_empty());
        assert_eq!(run.report.health, SourceHealth::Failed);
        assert!(run.report.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_source() {
        let eval = FixedEvaluator {
            result: Ok(Some(3)),
            delay: Duration::from_secs(60),
        };
        let run = run_evaluator(&eval, Duration::from_millis(100)).await;
        assert!(run.factors.is_empty());
        assert!(run.input.is_none());
        assert_eq!(run.report.health, SourceHealth::TimedOut);
    }
}
