//! Monitor CLI - one-shot operations against the configured site
//!
//! `run` starts the daemon and is handled by the binary. The rest run a
//! single cycle or print reference data and exit.

use clap::Subcommand;

use super::models::*;
use super::SafetyMonitor;

#[derive(Debug, Clone, Subcommand)]
pub enum MonitorCommands {
    /// Run the monitoring daemon (default)
    Run,

    /// Run one monitoring cycle and print it
    Tick {
        /// Human-readable summary instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Run one cycle and print the generated pre-task checklist
    Checklist {
        /// Human-readable list instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// List emergency contacts
    Contacts,
}

/// Execute a one-shot command. `Run` is not handled here.
pub async fn execute_command(monitor: &SafetyMonitor, command: MonitorCommands) -> Result<String, String> {
    match command {
        MonitorCommands::Run => Err("run is handled by the daemon entrypoint".to_string()),

        MonitorCommands::Tick { text } => {
            let cycle = monitor
                .trigger_manual_cycle()
                .await
                .map_err(|e| e.to_string())?;
            if text {
                Ok(format_cycle(&cycle))
            } else {
                serde_json::to_string_pretty(cycle.as_ref()).map_err(|e| e.to_string())
            }
        }

        MonitorCommands::Checklist { text } => {
            monitor
                .trigger_manual_cycle()
                .await
                .map_err(|e| e.to_string())?;
            let checklist = monitor.generate_checklist().await;
            if text {
                Ok(format_checklist(&checklist))
            } else {
                serde_json::to_string_pretty(&checklist).map_err(|e| e.to_string())
            }
        }

        MonitorCommands::Contacts => Ok(format_contacts(monitor.emergency_contacts())),
    }
}

fn format_cycle(cycle: &RiskAssessmentCycle) -> String {
    let mut output = String::new();
    output.push_str("Risk Assessment\n");
    output.push_str("===============\n\n");

    output.push_str(&format!("Cycle:    {}\n", cycle.id));
    output.push_str(&format!("Time:     {}\n", cycle.timestamp.to_rfc3339()));
    output.push_str(&format!("Score:    {:.1}\n", cycle.overall_score));
    output.push_str(&format!("Level:    {}\n", cycle.overall_level));

    let degraded = cycle.degraded_sources();
    if !degraded.is_empty() {
        output.push_str(&format!("Degraded: {}\n", degraded.join(", ")));
    }

    if cycle.factors.is_empty() {
        output.push_str("\nNo risk factors\n");
        return output;
    }

    output.push_str("\nFactors:\n");
    for f in &cycle.factors {
        output.push_str(&format!(
            "  [{:<8}] {:>4.1} {:<10} {}\n",
            f.severity.label(),
            f.score,
            f.risk_type.label(),
            f.description
        ));
        output.push_str(&format!("             -> {}\n", f.mitigation));
    }

    output
}

fn format_checklist(checklist: &SafetyChecklist) -> String {
    let mut output = String::new();
    output.push_str("Safety Checklist\n");
    output.push_str("================\n\n");
    output.push_str(&format!("Id: {}\n\n", checklist.id));

    for item in &checklist.items {
        output.push_str(&format!(
            "[{}] {}{}\n",
            if item.is_completed { "x" } else { " " },
            item.description,
            if item.is_required { "" } else { " (optional)" }
        ));
    }

    output
}

fn format_contacts(contacts: &[EmergencyContact]) -> String {
    if contacts.is_empty() {
        return "No emergency contacts configured".to_string();
    }

    let mut output = String::new();
    output.push_str("Emergency Contacts\n");
    output.push_str("==================\n\n");

    for c in contacts {
        output.push_str(&format!("{:<28} {:<16} {:?}\n", c.name, c.phone, c.category));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::monitor::MonitorSources;
    use crate::sources::{MemorySource, SiteConditions, WeatherSnapshot};
    use std::sync::Arc;

    fn monitor() -> SafetyMonitor {
        let mut weather = WeatherSnapshot::calm();
        weather.wind_speed_mph = 40.0;
        let source = Arc::new(MemorySource::new(SiteConditions {
            weather: Some(weather),
            ..Default::default()
        }));
        SafetyMonitor::builder(Config::default(), MonitorSources::from_shared(source)).build()
    }

    #[tokio::test]
    async fn test_tick_json() {
        let output = execute_command(&monitor(), MonitorCommands::Tick { text: false })
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["overall_level"], "critical");
        assert_eq!(json["factors"][0]["hazard"], "high_wind");
    }

    #[tokio::test]
    async fn test_tick_text() {
        let output = execute_command(&monitor(), MonitorCommands::Tick { text: true })
            .await
            .unwrap();
        assert!(output.contains("Level:    critical"));
        assert!(output.contains("Wind speed 40 mph"));
    }

    #[tokio::test]
    async fn test_checklist_includes_wind_gear() {
        let output = execute_command(&monitor(), MonitorCommands::Checklist { text: true })
            .await
            .unwrap();
        assert!(output.contains("chin straps"));
    }

    #[tokio::test]
    async fn test_contacts() {
        let output = execute_command(&monitor(), MonitorCommands::Contacts)
            .await
            .unwrap();
        assert!(output.contains("911"));
    }
}
