//! Monitor configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;
use crate::monitor::models::{ContactCategory, EmergencyContact};
use crate::sources::geo::{PowerLine, StaticGeoReference, Zone};
use crate::sources::CrewRole;

/// One day
pub const MAX_EMERGENCY_COOLDOWN_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub crew: CrewConfig,
    #[serde(default)]
    pub equipment: EquipmentConfig,
    #[serde(default)]
    pub checklist: ChecklistConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default = "default_contacts")]
    pub emergency_contacts: Vec<EmergencyContact>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Monitoring cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Site identifier reported in status and remote assessments
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// Seconds between scheduled cycles
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Per-evaluator source timeout in milliseconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_ms: u64,

    /// Overall score at or above which an emergency fires
    #[serde(default = "default_emergency_threshold")]
    pub emergency_threshold: f64,

    /// Minimum seconds between consecutive emergency events
    #[serde(default = "default_emergency_cooldown")]
    pub emergency_cooldown_secs: u64,

    /// Completed cycles kept in memory
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            cycle_interval_secs: default_cycle_interval(),
            source_timeout_ms: default_source_timeout(),
            emergency_threshold: default_emergency_threshold(),
            emergency_cooldown_secs: default_emergency_cooldown(),
            history_size: default_history_size(),
        }
    }
}

impl MonitorConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

/// Remote assessment service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint receiving the JSON assessment request
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token; `FIELD_SAFETY_ASSESSMENT_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_assessment_timeout")]
    pub timeout_secs: u64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_secs: default_assessment_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Deliver alerts and emergencies as JSON POSTs; logs only when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Task complexity of the current job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Low,
    #[default]
    Moderate,
    High,
    Extreme,
}

impl TaskComplexity {
    /// Years added to every role's experience minimum
    pub fn experience_increment(&self) -> f64 {
        match self {
            TaskComplexity::Low | TaskComplexity::Moderate => 0.0,
            TaskComplexity::High => 1.0,
            TaskComplexity::Extreme => 2.0,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, TaskComplexity::High | TaskComplexity::Extreme)
    }
}

/// Certification and tenure required for a role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleRequirement {
    pub role: CrewRole,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub min_years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewConfig {
    #[serde(default = "default_min_crew")]
    pub min_crew_size: usize,

    #[serde(default)]
    pub task_complexity: TaskComplexity,

    #[serde(default = "default_roles")]
    pub roles: Vec<RoleRequirement>,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            min_crew_size: default_min_crew(),
            task_complexity: TaskComplexity::default(),
            roles: default_roles(),
        }
    }
}

impl CrewConfig {
    pub fn requirement(&self, role: CrewRole) -> Option<&RoleRequirement> {
        self.roles.iter().find(|r| r.role == role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentConfig {
    /// Temperature ceiling for units that do not report their own
    #[serde(default = "default_max_temperature")]
    pub default_max_temperature_f: f64,

    #[serde(default = "default_low_fuel")]
    pub low_fuel_percent: f64,

    /// Allowed fractional deviation from expected RPM
    #[serde(default = "default_rpm_deviation")]
    pub rpm_deviation_ratio: f64,
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        Self {
            default_max_temperature_f: default_max_temperature(),
            low_fuel_percent: default_low_fuel(),
            rpm_deviation_ratio: default_rpm_deviation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistConfig {
    /// PPE every crew member must verify before work
    #[serde(default = "default_ppe")]
    pub ppe: Vec<String>,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self { ppe: default_ppe() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_clearance")]
    pub power_line_clearance_m: f64,
    #[serde(default)]
    pub power_lines: Vec<PowerLine>,
    #[serde(default)]
    pub traffic_zones: Vec<Zone>,
    #[serde(default)]
    pub residential_zones: Vec<Zone>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            power_line_clearance_m: default_clearance(),
            power_lines: Vec::new(),
            traffic_zones: Vec::new(),
            residential_zones: Vec::new(),
        }
    }
}

impl GeoConfig {
    /// Build the geo reference lookups from the configured geometry
    pub fn reference(&self) -> StaticGeoReference {
        StaticGeoReference {
            clearance_m: self.power_line_clearance_m,
            power_lines: self.power_lines.clone(),
            traffic_zones: self.traffic_zones.clone(),
            residential_zones: self.residential_zones.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// JSON site conditions re-read every cycle
    #[serde(default = "default_conditions_file")]
    pub conditions_file: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            conditions_file: default_conditions_file(),
        }
    }
}

// Defaults
fn default_site_id() -> String { "site-1".to_string() }
fn default_cycle_interval() -> u64 { 30 }
fn default_source_timeout() -> u64 { 5000 }
fn default_emergency_threshold() -> f64 { 8.0 }
fn default_emergency_cooldown() -> u64 { 300 } // 5 minutes
fn default_history_size() -> usize { 100 }
fn default_assessment_timeout() -> u64 { 20 }
fn default_min_crew() -> usize { 2 }
fn default_max_temperature() -> f64 { 230.0 }
fn default_low_fuel() -> f64 { 10.0 }
fn default_rpm_deviation() -> f64 { 0.30 }
fn default_clearance() -> f64 { 15.0 }
fn default_true() -> bool { true }
fn default_http_port() -> u16 { 8085 }
fn default_conditions_file() -> PathBuf { PathBuf::from("site-conditions.json") }

fn default_roles() -> Vec<RoleRequirement> {
    vec![
        RoleRequirement {
            role: CrewRole::CrewLeader,
            certification: Some("isa_certified_arborist".to_string()),
            min_years: 5.0,
        },
        RoleRequirement {
            role: CrewRole::Climber,
            certification: Some("tree_climbing".to_string()),
            min_years: 2.0,
        },
        RoleRequirement {
            role: CrewRole::EquipmentOperator,
            certification: Some("equipment_operation".to_string()),
            min_years: 1.0,
        },
        RoleRequirement {
            role: CrewRole::GroundWorker,
            certification: Some("chainsaw_safety".to_string()),
            min_years: 0.0,
        },
    ]
}

fn default_ppe() -> Vec<String> {
    ["Hard hat", "Eye protection", "Hearing protection", "Chainsaw chaps", "Work gloves", "High-visibility vest"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_contacts() -> Vec<EmergencyContact> {
    vec![EmergencyContact {
        name: "Emergency Services".to_string(),
        phone: "911".to_string(),
        category: ContactCategory::Emergency,
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            assessment: AssessmentConfig::default(),
            notifications: NotificationConfig::default(),
            crew: CrewConfig::default(),
            equipment: EquipmentConfig::default(),
            checklist: ChecklistConfig::default(),
            geo: GeoConfig::default(),
            emergency_contacts: default_contacts(),
            api: ApiConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.cycle_interval_secs == 0 {
            return Err(ConfigError::Invalid("monitor.cycle_interval_secs must be > 0".into()));
        }
        if self.monitor.source_timeout_ms == 0 {
            return Err(ConfigError::Invalid("monitor.source_timeout_ms must be > 0".into()));
        }
        if !(self.monitor.emergency_threshold > 0.0 && self.monitor.emergency_threshold <= 10.0) {
            return Err(ConfigError::Invalid(
                "monitor.emergency_threshold must be in (0, 10]".into(),
            ));
        }
        if self.monitor.emergency_cooldown_secs > MAX_EMERGENCY_COOLDOWN_SECS {
            return Err(ConfigError::Invalid(format!(
                "monitor.emergency_cooldown_secs must be <= {}",
                MAX_EMERGENCY_COOLDOWN_SECS
            )));
        }
        if self.assessment.enabled && self.assessment.endpoint.is_none() {
            return Err(ConfigError::Invalid(
                "assessment.endpoint is required when assessment is enabled".into(),
            ));
        }
        if self.crew.min_crew_size == 0 {
            return Err(ConfigError::Invalid("crew.min_crew_size must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.equipment.rpm_deviation_ratio) {
            return Err(ConfigError::Invalid(
                "equipment.rpm_deviation_ratio must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
