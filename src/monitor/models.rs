//! Monitor models - shared types for risk evaluation and alerting
//!
//! Core types for risk factors, assessment cycles, alerts, emergencies,
//! and checklists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sources::{Coordinates, CrewMember, EquipmentStatus, WeatherSnapshot};

/// Unique identifier for an alert instance
pub type AlertId = String;

/// Unique identifier for a monitoring cycle
pub type CycleId = String;

//=============================================================================
// RISK FACTORS
//=============================================================================

/// Which evaluator a finding came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    Weather,
    Equipment,
    Location,
    Personnel,
    Emergency,
}

impl RiskType {
    pub fn label(&self) -> &'static str {
        match self {
            RiskType::Weather => "Weather",
            RiskType::Equipment => "Equipment",
            RiskType::Location => "Location",
            RiskType::Personnel => "Personnel",
            RiskType::Emergency => "Emergency",
        }
    }
}

/// Severity of a single finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

/// Overall risk level of a cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// `[0,3)` low, `[3,6)` medium, `[6,8)` high, `[8,10]` critical
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            RiskLevel::Critical
        } else if score >= 6.0 {
            RiskLevel::High
        } else if score >= 3.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The specific hazard behind a finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    // Weather
    HighWind,
    Precipitation,
    HeatStress,
    ColdStress,
    Lightning,

    // Equipment
    Maintenance,
    Overheating,
    LowFuel,
    RpmDeviation,

    // Location
    PowerLine,
    Traffic,
    Residential,

    // Personnel
    MissingCertification,
    InsufficientExperience,
    MinimumCrew,
}

/// One scored, typed hazard finding from a single evaluator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub hazard: Hazard,
    pub severity: Severity,
    /// 0.0 - 10.0
    pub score: f64,
    pub description: String,
    pub mitigation: String,
    /// Equipment unit or crew member the finding is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl RiskFactor {
    pub fn new(
        risk_type: RiskType,
        hazard: Hazard,
        severity: Severity,
        score: f64,
        description: impl Into<String>,
        mitigation: impl Into<String>,
    ) -> Self {
        Self {
            risk_type,
            hazard,
            severity,
            score: score.clamp(0.0, 10.0),
            description: description.into(),
            mitigation: mitigation.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Identity of the underlying condition, stable across cycles
    pub fn condition_key(&self) -> ConditionKey {
        ConditionKey {
            risk_type: self.risk_type,
            hazard: self.hazard,
            subject: self.subject.clone(),
        }
    }
}

/// Identity of a hazard condition independent of the cycle that observed it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConditionKey {
    pub risk_type: RiskType,
    pub hazard: Hazard,
    pub subject: Option<String>,
}

//=============================================================================
// CYCLES
//=============================================================================

/// Outcome of one evaluator's source read
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealth {
    /// Data read and evaluated
    Ok,
    /// Source had nothing to report
    Empty,
    /// Source returned an error
    Failed,
    /// Source did not answer within the timeout
    TimedOut,
}

/// Per-evaluator report attached to a cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub evaluator: String,
    pub health: SourceHealth,
    pub factor_count: usize,
    pub elapsed_ms: u64,
}

impl SourceReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self.health, SourceHealth::Failed | SourceHealth::TimedOut)
    }
}

/// Inputs that were available to a cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionSnapshot {
    pub weather: Option<WeatherSnapshot>,
    pub location: Option<Coordinates>,
    pub equipment: Option<EquipmentStatus>,
    pub crew: Vec<CrewMember>,
}

impl ConditionSnapshot {
    /// Names of equipment units currently engaged on site
    pub fn engaged_equipment(&self) -> Vec<(String, String)> {
        self.equipment
            .as_ref()
            .map(|status| {
                status
                    .telemetry
                    .iter()
                    .filter(|t| t.engaged)
                    .map(|t| (t.equipment_id.clone(), t.equipment_name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result of one monitoring tick. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessmentCycle {
    pub id: CycleId,
    pub timestamp: DateTime<Utc>,
    pub factors: Vec<RiskFactor>,
    pub overall_score: f64,
    pub overall_level: RiskLevel,
    pub snapshot: ConditionSnapshot,
    pub sources: Vec<SourceReport>,
}

impl RiskAssessmentCycle {
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.factors.iter().filter(|f| f.severity == severity).count()
    }

    pub fn degraded_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.is_degraded())
            .map(|s| s.evaluator.as_str())
            .collect()
    }
}

//=============================================================================
// ALERTS & EMERGENCIES
//=============================================================================

/// An active alert, one per risk factor of the cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub id: AlertId,
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub hazard: Hazard,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub mitigation: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub cycle_id: CycleId,
}

impl SafetyAlert {
    pub fn from_factor(factor: &RiskFactor, cycle_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            risk_type: factor.risk_type,
            hazard: factor.hazard,
            severity: factor.severity,
            title: format!("{} {} Risk", factor.severity.label(), factor.risk_type.label()),
            description: factor.description.clone(),
            mitigation: factor.mitigation.clone(),
            timestamp,
            risk_score: factor.score,
            subject: factor.subject.clone(),
            cycle_id: cycle_id.to_string(),
        }
    }

    pub fn condition_key(&self) -> ConditionKey {
        ConditionKey {
            risk_type: self.risk_type,
            hazard: self.hazard,
            subject: self.subject.clone(),
        }
    }
}

/// Emitted when the overall score crosses the emergency threshold outside cooldown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub id: String,
    pub risk_score: f64,
    pub overall_level: RiskLevel,
    pub triggered_at: DateTime<Utc>,
    pub contributing_factors: Vec<RiskFactor>,
    pub cycle_id: CycleId,
}

//=============================================================================
// CHECKLISTS
//=============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistCategory {
    Briefing,
    Ppe,
    Communication,
    Weather,
    Equipment,
    Hazard,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub category: ChecklistCategory,
    pub description: String,
    pub is_required: bool,
    pub is_completed: bool,
}

impl ChecklistItem {
    pub fn required(category: ChecklistCategory, description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            description: description.into(),
            is_required: true,
            is_completed: false,
        }
    }

    pub fn optional(category: ChecklistCategory, description: impl Into<String>) -> Self {
        Self {
            is_required: false,
            ..Self::required(category, description)
        }
    }
}

/// A generated, user-completable list of pre-task safety actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyChecklist {
    pub id: String,
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    /// Cycle the checklist was derived from, if any had completed
    pub cycle_id: Option<CycleId>,
}

impl SafetyChecklist {
    /// Mark exactly one item complete. Returns false for unknown ids.
    pub fn complete_item(&mut self, item_id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) else {
            return false;
        };
        item.is_completed = true;
        self.completed = self
            .items
            .iter()
            .filter(|i| i.is_required)
            .all(|i| i.is_completed);
        true
    }

    pub fn remaining_required(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.is_required && !i.is_completed)
            .count()
    }
}

//=============================================================================
// REFERENCE DATA
//=============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactCategory {
    Emergency,
    Medical,
    Utility,
    Supervisor,
    Other,
}

/// Static reference data loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub category: ContactCategory,
}

//=============================================================================
// STATUS
//=============================================================================

/// State of the emergency protocol controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    CooldownActive { expires_at: DateTime<Utc> },
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState::Idle
    }
}

/// Current status of the monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub site_id: String,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub ticks_skipped: u64,
    pub current_level: RiskLevel,
    pub current_score: f64,
    pub active_alerts: usize,
    pub emergency_state: ControllerState,
    pub degraded_sources: Vec<String>,
}
