//! Emergency protocol controller
//!
//! Two-state machine. While idle, a cycle at or above the threshold emits an
//! event and arms the cooldown. During cooldown qualifying cycles are
//! suppressed, not queued.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::models::*;

pub struct EmergencyController {
    threshold: f64,
    cooldown: Duration,
    state: ControllerState,
}

impl EmergencyController {
    /// Cooldowns beyond what chrono can represent saturate rather than wrap
    pub fn new(threshold: f64, cooldown_secs: u64) -> Self {
        let secs = i64::try_from(cooldown_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);

        Self {
            threshold,
            cooldown: Duration::try_seconds(secs).unwrap_or_else(|| Duration::weeks(52)),
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Feed one completed cycle. The cycle timestamp is the clock.
    pub fn observe(&mut self, cycle: &RiskAssessmentCycle) -> Option<EmergencyEvent> {
        let now = cycle.timestamp;

        if let ControllerState::CooldownActive { expires_at } = self.state {
            if now >= expires_at {
                debug!("Emergency cooldown expired");
                self.state = ControllerState::Idle;
            }
        }

        if cycle.overall_score < self.threshold {
            return None;
        }

        if let ControllerState::CooldownActive { expires_at } = self.state {
            debug!(
                cycle_id = %cycle.id,
                score = cycle.overall_score,
                %expires_at,
                "Emergency suppressed by cooldown"
            );
            return None;
        }

        let contributing = contributing_factors(&cycle.factors);
        if contributing.is_empty() {
            return None;
        }

        let expires_at = now
            .checked_add_signed(self.cooldown)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.state = ControllerState::CooldownActive { expires_at };

        info!(
            cycle_id = %cycle.id,
            score = cycle.overall_score,
            factors = contributing.len(),
            %expires_at,
            "Emergency triggered"
        );

        Some(EmergencyEvent {
            id: uuid::Uuid::new_v4().to_string(),
            risk_score: cycle.overall_score,
            overall_level: cycle.overall_level,
            triggered_at: now,
            contributing_factors: contributing,
            cycle_id: cycle.id.clone(),
        })
    }
}

/// High and critical findings, or everything when none reach high
fn contributing_factors(factors: &[RiskFactor]) -> Vec<RiskFactor> {
    let severe: Vec<RiskFactor> = factors
        .iter()
        .filter(|f| f.severity >= Severity::High)
        .cloned()
        .collect();
    if severe.is_empty() {
        factors.to_vec()
    } else {
        severe
    }
}
