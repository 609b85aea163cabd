//! field-safety-monitor: risk monitoring engine for hazardous field work
//!
//! Fuses weather, equipment telemetry, location hazards and crew
//! qualifications into one risk level per monitoring cycle, raises
//! severity-ordered alerts, and fires debounced emergency events. Every input is
//! an injected collaborator; any of them may be missing or slow without
//! stopping the others.

pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sources;

pub use config::Config;
pub use error::{AssessmentError, ConfigError, MonitorError, NotifyError, SourceError};
pub use monitor::{MonitorBuilder, MonitorSources, SafetyMonitor};
