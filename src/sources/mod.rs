//! Sources - external collaborators the monitor reads from
//!
//! Each trait is a capability the host injects. Absence of data is
//! `Ok(None)` (or an empty list), never an error.

pub mod file;
pub mod geo;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::SourceError;

pub use file::ConditionsFile;
pub use geo::StaticGeoReference;
pub use memory::{MemorySource, WeatherFeed};

//=============================================================================
// DATA
//=============================================================================

/// Current weather at the work site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_f: f64,
    pub wind_speed_mph: f64,
    /// Inches over the last reporting period
    pub precipitation_in: f64,
    #[serde(default)]
    pub visibility_mi: Option<f64>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    pub fn calm() -> Self {
        Self {
            temperature_f: 70.0,
            wind_speed_mph: 5.0,
            precipitation_in: 0.0,
            visibility_mi: Some(10.0),
            condition: "Clear".to_string(),
            observed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceSeverity {
    Critical,
    Warning,
    Preventive,
    #[serde(other)]
    Other,
}

/// An open maintenance alert from the equipment tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceAlert {
    pub equipment_id: String,
    pub equipment_name: String,
    pub severity: MaintenanceSeverity,
    pub message: String,
}

/// Live readings from one equipment unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentTelemetry {
    pub equipment_id: String,
    pub equipment_name: String,
    #[serde(default)]
    pub temperature_f: Option<f64>,
    /// Unit-specific ceiling; falls back to the configured default
    #[serde(default)]
    pub max_temperature_f: Option<f64>,
    #[serde(default)]
    pub fuel_level_percent: Option<f64>,
    #[serde(default)]
    pub engine_rpm: Option<f64>,
    #[serde(default)]
    pub expected_rpm: Option<f64>,
    /// Unit is in use on the current job
    #[serde(default)]
    pub engaged: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EquipmentStatus {
    #[serde(default)]
    pub maintenance_alerts: Vec<MaintenanceAlert>,
    #[serde(default)]
    pub telemetry: Vec<EquipmentTelemetry>,
}

impl EquipmentStatus {
    pub fn is_empty(&self) -> bool {
        self.maintenance_alerts.is_empty() && self.telemetry.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CrewRole {
    CrewLeader,
    Climber,
    EquipmentOperator,
    GroundWorker,
}

impl CrewRole {
    pub fn label(&self) -> &'static str {
        match self {
            CrewRole::CrewLeader => "crew leader",
            CrewRole::Climber => "climber",
            CrewRole::EquipmentOperator => "equipment operator",
            CrewRole::GroundWorker => "ground worker",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub id: String,
    pub name: String,
    pub role: CrewRole,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub years_experience: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Everything a site knows about itself at one moment. `None` marks a
/// source with nothing to report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConditions {
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub equipment: Option<EquipmentStatus>,
    #[serde(default)]
    pub position: Option<Coordinates>,
    #[serde(default)]
    pub crew: Option<Vec<CrewMember>>,
}

//=============================================================================
// COLLABORATOR TRAITS
//=============================================================================

/// Weather provider. Pull via `current`; push-capable sources also expose
/// a change stream.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self) -> Result<Option<WeatherSnapshot>, SourceError>;

    fn changes(&self) -> Option<watch::Receiver<Option<WeatherSnapshot>>> {
        None
    }
}

/// Equipment tracker: open maintenance alerts plus live telemetry
#[async_trait]
pub trait EquipmentTracker: Send + Sync {
    async fn status(&self) -> Result<EquipmentStatus, SourceError>;
}

/// Crew position provider
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Option<Coordinates>, SourceError>;
}

/// Geospatial reference lookups used by the location evaluator
#[async_trait]
pub trait GeoReference: Send + Sync {
    async fn near_power_lines(&self, at: Coordinates) -> Result<bool, SourceError>;
    async fn is_high_traffic(&self, at: Coordinates) -> Result<bool, SourceError>;
    async fn is_residential(&self, at: Coordinates) -> Result<bool, SourceError>;
}

/// Crew roster with certifications and tenure. `Ok(None)` means no roster
/// is available; `Ok(Some(vec![]))` is a roster with nobody on it.
#[async_trait]
pub trait CrewRoster: Send + Sync {
    async fn crew(&self) -> Result<Option<Vec<CrewMember>>, SourceError>;
}
