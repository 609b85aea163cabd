//! Aggregator - fold one cycle's factors into an overall score and level
//!
//! Any critical factor escalates the average by 2.0 per critical finding.
//! Without criticals, more than two high findings add a flat 1.5. Both are
//! capped at 10.

use chrono::{DateTime, Utc};

use super::models::*;

const CRITICAL_BOOST: f64 = 2.0;
const HIGH_CLUSTER_BOOST: f64 = 1.5;
const HIGH_CLUSTER_MIN: usize = 3;
const MAX_SCORE: f64 = 10.0;

/// Overall score for a factor list. Pure and deterministic.
pub fn overall_score(factors: &[RiskFactor]) -> f64 {
    if factors.is_empty() {
        return 0.0;
    }

    let average = factors.iter().map(|f| f.score).sum::<f64>() / factors.len() as f64;
    let critical = factors
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count();
    let high = factors
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count();

    if critical > 0 {
        (average + critical as f64 * CRITICAL_BOOST).min(MAX_SCORE)
    } else if high >= HIGH_CLUSTER_MIN {
        (average + HIGH_CLUSTER_BOOST).min(MAX_SCORE)
    } else {
        average
    }
}

/// Build the immutable record of a completed cycle
pub fn assess(
    factors: Vec<RiskFactor>,
    snapshot: ConditionSnapshot,
    sources: Vec<SourceReport>,
    timestamp: DateTime<Utc>,
) -> RiskAssessmentCycle {
    let overall_score = overall_score(&factors);

    RiskAssessmentCycle {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        overall_level: RiskLevel::from_score(overall_score),
        overall_score,
        factors,
        snapshot,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(severity: Severity, score: f64) -> RiskFactor {
        RiskFactor::new(RiskType::Weather, Hazard::HighWind, severity, score, "", "")
    }

    fn level(factors: &[RiskFactor]) -> RiskLevel {
        RiskLevel::from_score(overall_score(factors))
    }

    #[test]
    fn test_empty_is_low() {
        assert_eq!(overall_score(&[]), 0.0);
        assert_eq!(level(&[]), RiskLevel::Low);
    }

    #[test]
    fn test_single_critical_capped() {
        // 9.0 + 2.0 capped at 10
        let factors = [factor(Severity::Critical, 9.0)];
        assert_eq!(overall_score(&factors), 10.0);
        assert_eq!(level(&factors), RiskLevel::Critical);
    }

    #[test]
    fn test_two_high_one_medium_no_boost() {
        let factors = [
            factor(Severity::High, 7.0),
            factor(Severity::High, 7.0),
            factor(Severity::Medium, 4.0),
        ];
        assert_eq!(overall_score(&factors), 6.0);
        assert_eq!(level(&factors), RiskLevel::High);
    }

    #[test]
    fn test_three_high_cluster_boost() {
        let factors = [
            factor(Severity::High, 7.0),
            factor(Severity::High, 7.0),
            factor(Severity::High, 7.0),
        ];
        assert_eq!(overall_score(&factors), 8.5);
        assert_eq!(level(&factors), RiskLevel::Critical);
    }

    #[test]
    fn test_critical_boost_per_finding() {
        let factors = [
            factor(Severity::Critical, 4.0),
            factor(Severity::Critical, 2.0),
            factor(Severity::Low, 0.0),
        ];
        // avg 2.0 + 2 * 2.0
        assert_eq!(overall_score(&factors), 6.0);
    }

    #[test]
    fn test_critical_takes_precedence_over_cluster() {
        let factors = [
            factor(Severity::High, 6.0),
            factor(Severity::High, 6.0),
            factor(Severity::High, 6.0),
            factor(Severity::Critical, 2.0),
        ];
        // avg 5.0 + 2.0, not the 1.5 cluster boost
        assert_eq!(overall_score(&factors), 7.0);
    }

    #[test]
    fn test_assess_builds_cycle() {
        let now = Utc::now();
        let cycle = assess(
            vec![factor(Severity::Medium, 4.0)],
            ConditionSnapshot::default(),
            Vec::new(),
            now,
        );
        assert_eq!(cycle.overall_score, 4.0);
        assert_eq!(cycle.overall_level, RiskLevel::Medium);
        assert_eq!(cycle.timestamp, now);
        assert!(!cycle.id.is_empty());
    }
}
