//! Alert manager
//!
//! The active set is rebuilt from scratch every cycle, one alert per risk
//! factor. Acknowledging removes one alert instance immediately; if its
//! condition is still present next cycle it comes back under a new id.

use std::collections::HashMap;

use tracing::debug;

use super::models::*;

#[derive(Debug, Default)]
pub struct AlertManager {
    active: Vec<SafetyAlert>,
    /// Alert count per condition key in the last applied cycle
    previous_keys: HashMap<ConditionKey, usize>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active set from a completed cycle. Returns the alerts
    /// whose condition was not present in the previous cycle. A key seen
    /// more often than last cycle raises only the surplus.
    pub fn apply(&mut self, cycle: &RiskAssessmentCycle) -> Vec<SafetyAlert> {
        let alerts = build_alerts(cycle);

        let mut carried = self.previous_keys.clone();
        let mut current: HashMap<ConditionKey, usize> = HashMap::new();
        let mut raised = Vec::new();

        for alert in &alerts {
            let key = alert.condition_key();
            *current.entry(key.clone()).or_default() += 1;
            match carried.get_mut(&key) {
                Some(n) if *n > 0 => *n -= 1,
                _ => raised.push(alert.clone()),
            }
        }

        self.previous_keys = current;
        self.active = alerts;

        debug!(
            cycle_id = %cycle.id,
            active = self.active.len(),
            raised = raised.len(),
            "Alert set replaced"
        );
        raised
    }

    /// Dismiss one alert instance. Unknown ids are a no-op.
    pub fn acknowledge(&mut self, id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|a| a.id != id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[SafetyAlert] {
        &self.active
    }
}

/// One alert per risk factor, ordered by severity then score (both
/// descending). The sort is stable, so ties keep evaluator order.
pub fn build_alerts(cycle: &RiskAssessmentCycle) -> Vec<SafetyAlert> {
    let mut selected: Vec<&RiskFactor> = cycle.factors.iter().collect();

    selected.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.score.total_cmp(&a.score))
    });

    selected
        .into_iter()
        .map(|f| SafetyAlert::from_factor(f, &cycle.id, cycle.timestamp))
        .collect()
}
