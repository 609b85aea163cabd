//! Equipment evaluator
//!
//! Maps open maintenance alerts to scores and checks live telemetry. A unit
//! may contribute several independent factors in one cycle.

use std::sync::Arc;

use async_trait::async_trait;

use super::RiskEvaluator;
use crate::config::EquipmentConfig;
use crate::error::SourceError;
use crate::monitor::models::{Hazard, RiskFactor, RiskType, Severity};
use crate::sources::{
    EquipmentStatus, EquipmentTelemetry, EquipmentTracker, MaintenanceAlert, MaintenanceSeverity,
};

pub struct EquipmentEvaluator {
    tracker: Arc<dyn EquipmentTracker>,
    config: EquipmentConfig,
}

impl EquipmentEvaluator {
    pub fn new(tracker: Arc<dyn EquipmentTracker>, config: EquipmentConfig) -> Self {
        Self { tracker, config }
    }

    fn maintenance_factor(&self, alert: &MaintenanceAlert) -> RiskFactor {
        let (severity, score, mitigation) = match alert.severity {
            MaintenanceSeverity::Critical => (
                Severity::Critical,
                9.0,
                "Tag out the unit and do not operate until repaired",
            ),
            MaintenanceSeverity::Warning => (
                Severity::High,
                7.0,
                "Inspect before use and assign a spotter",
            ),
            MaintenanceSeverity::Preventive => (
                Severity::Medium,
                4.0,
                "Schedule service at the end of the shift",
            ),
            MaintenanceSeverity::Other => (Severity::Low, 2.0, "Note for the next inspection"),
        };

        RiskFactor::new(
            RiskType::Equipment,
            Hazard::Maintenance,
            severity,
            score,
            format!("{}: {}", alert.equipment_name, alert.message),
            mitigation,
        )
        .with_subject(alert.equipment_id.clone())
    }

    fn telemetry_factors(&self, unit: &EquipmentTelemetry) -> Vec<RiskFactor> {
        let mut factors = Vec::new();

        if let Some(temperature) = unit.temperature_f {
            let ceiling = unit
                .max_temperature_f
                .unwrap_or(self.config.default_max_temperature_f);
            if temperature > ceiling {
                factors.push(
                    RiskFactor::new(
                        RiskType::Equipment,
                        Hazard::Overheating,
                        Severity::High,
                        7.5,
                        format!(
                            "{} overheating: {:.0}°F (limit {:.0}°F)",
                            unit.equipment_name, temperature, ceiling
                        ),
                        "Shut down and allow the unit to cool before continuing",
                    )
                    .with_subject(unit.equipment_id.clone()),
                );
            }
        }

        if let Some(fuel) = unit.fuel_level_percent {
            if fuel < self.config.low_fuel_percent {
                factors.push(
                    RiskFactor::new(
                        RiskType::Equipment,
                        Hazard::LowFuel,
                        Severity::Medium,
                        3.0,
                        format!("{} fuel low: {:.0}%", unit.equipment_name, fuel),
                        "Refuel with the engine off before the next operation",
                    )
                    .with_subject(unit.equipment_id.clone()),
                );
            }
        }

        if let (Some(rpm), Some(expected)) = (unit.engine_rpm, unit.expected_rpm) {
            if expected > 0.0 {
                let deviation = (rpm - expected).abs() / expected;
                if deviation > self.config.rpm_deviation_ratio {
                    factors.push(
                        RiskFactor::new(
                            RiskType::Equipment,
                            Hazard::RpmDeviation,
                            Severity::Medium,
                            5.0,
                            format!(
                                "{} engine at {:.0} RPM, {:.0}% off expected {:.0}",
                                unit.equipment_name,
                                rpm,
                                deviation * 100.0,
                                expected
                            ),
                            "Check engine load and governor before continuing",
                        )
                        .with_subject(unit.equipment_id.clone()),
                    );
                }
            }
        }

        factors
    }
}

#[async_trait]
impl RiskEvaluator for EquipmentEvaluator {
    type Input = EquipmentStatus;

    fn name(&self) -> &'static str {
        "equipment"
    }

    async fn fetch(&self) -> Result<Option<EquipmentStatus>, SourceError> {
        let status = self.tracker.status().await?;
        Ok(if status.is_empty() { None } else { Some(status) })
    }

    fn evaluate(&self, status: &EquipmentStatus) -> Vec<RiskFactor> {
        let mut factors: Vec<RiskFactor> = status
            .maintenance_alerts
            .iter()
            .map(|a| self.maintenance_factor(a))
            .collect();

        for unit in &status.telemetry {
            factors.extend(self.telemetry_factors(unit));
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;

    fn evaluator() -> EquipmentEvaluator {
        EquipmentEvaluator::new(Arc::new(MemorySource::default()), EquipmentConfig::default())
    }

    fn unit(id: &str) -> EquipmentTelemetry {
        EquipmentTelemetry {
            equipment_id: id.to_string(),
            equipment_name: format!("Unit {}", id),
            temperature_f: Some(180.0),
            max_temperature_f: Some(220.0),
            fuel_level_percent: Some(60.0),
            engine_rpm: Some(2000.0),
            expected_rpm: Some(2000.0),
            engaged: true,
        }
    }

    fn alert(severity: MaintenanceSeverity) -> MaintenanceAlert {
        MaintenanceAlert {
            equipment_id: "chipper-1".to_string(),
            equipment_name: "Chipper".to_string(),
            severity,
            message: "Hydraulic pressure".to_string(),
        }
    }

    #[test]
    fn test_maintenance_severity_mapping() {
        let eval = evaluator();
        let status = EquipmentStatus {
            maintenance_alerts: vec![
                alert(MaintenanceSeverity::Critical),
                alert(MaintenanceSeverity::Warning),
                alert(MaintenanceSeverity::Preventive),
                alert(MaintenanceSeverity::Other),
            ],
            telemetry: vec![],
        };

        let scores: Vec<f64> = eval.evaluate(&status).iter().map(|f| f.score).collect();
        assert_eq!(scores, vec![9.0, 7.0, 4.0, 2.0]);
    }

    #[test]
    fn test_healthy_unit_no_factors() {
        let eval = evaluator();
        assert!(eval.telemetry_factors(&unit("a")).is_empty());
    }

    #[test]
    fn test_unit_can_contribute_multiple_factors() {
        let eval = evaluator();
        let mut hot = unit("bucket-truck");
        hot.temperature_f = Some(240.0);
        hot.fuel_level_percent = Some(6.0);
        hot.engine_rpm = Some(1200.0);

        let factors = eval.telemetry_factors(&hot);
        let hazards: Vec<_> = factors.iter().map(|f| (f.hazard, f.score)).collect();
        assert_eq!(
            hazards,
            vec![
                (Hazard::Overheating, 7.5),
                (Hazard::LowFuel, 3.0),
                (Hazard::RpmDeviation, 5.0)
            ]
        );
        assert!(factors
            .iter()
            .all(|f| f.subject.as_deref() == Some("bucket-truck")));
    }

    #[test]
    fn test_default_temperature_ceiling() {
        let eval = evaluator();
        let mut u = unit("saw");
        u.max_temperature_f = None;
        u.temperature_f = Some(235.0);
        assert_eq!(eval.telemetry_factors(&u)[0].hazard, Hazard::Overheating);
    }

    #[test]
    fn test_rpm_deviation_threshold() {
        let eval = evaluator();
        let mut u = unit("stump");
        u.engine_rpm = Some(2600.0); // exactly 30%
        assert!(eval.telemetry_factors(&u).is_empty());

        u.engine_rpm = Some(2700.0);
        assert_eq!(eval.telemetry_factors(&u)[0].hazard, Hazard::RpmDeviation);

        u.expected_rpm = Some(0.0);
        assert!(eval.telemetry_factors(&u).is_empty());
    }

    #[tokio::test]
    async fn test_empty_tracker_is_no_input() {
        let eval = evaluator();
        assert!(eval.fetch().await.unwrap().is_none());
    }
}
