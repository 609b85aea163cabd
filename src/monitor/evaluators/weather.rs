//! Weather evaluator
//!
//! Independent threshold rules, at most one factor per hazard.

use std::sync::Arc;

use async_trait::async_trait;

use super::RiskEvaluator;
use crate::error::SourceError;
use crate::monitor::models::{Hazard, RiskFactor, RiskType, Severity};
use crate::sources::{WeatherSnapshot, WeatherSource};

const WIND_CRITICAL_MPH: f64 = 35.0;
const WIND_HIGH_MPH: f64 = 25.0;
const WIND_MEDIUM_MPH: f64 = 15.0;
const PRECIPITATION_IN: f64 = 0.1;
const HEAT_F: f64 = 100.0;
const COLD_F: f64 = 20.0;

const STORM_KEYWORDS: [&str; 3] = ["storm", "thunder", "lightning"];

pub struct WeatherEvaluator {
    source: Arc<dyn WeatherSource>,
}

impl WeatherEvaluator {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn WeatherSource> {
        &self.source
    }
}

#[async_trait]
impl RiskEvaluator for WeatherEvaluator {
    type Input = WeatherSnapshot;

    fn name(&self) -> &'static str {
        "weather"
    }

    async fn fetch(&self) -> Result<Option<WeatherSnapshot>, SourceError> {
        self.source.current().await
    }

    fn evaluate(&self, weather: &WeatherSnapshot) -> Vec<RiskFactor> {
        evaluate_weather(weather)
    }
}

pub fn evaluate_weather(weather: &WeatherSnapshot) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    let wind = weather.wind_speed_mph;
    let wind_rule = if wind >= WIND_CRITICAL_MPH {
        Some((Severity::Critical, 9.0, "Stop all aerial work and crane operations"))
    } else if wind >= WIND_HIGH_MPH {
        Some((Severity::High, 7.0, "Suspend climbing and secure loose material"))
    } else if wind >= WIND_MEDIUM_MPH {
        Some((Severity::Medium, 4.0, "Monitor gusts and limit aerial exposure"))
    } else {
        None
    };
    if let Some((severity, score, mitigation)) = wind_rule {
        factors.push(RiskFactor::new(
            RiskType::Weather,
            Hazard::HighWind,
            severity,
            score,
            format!("Wind speed {:.0} mph", wind),
            mitigation,
        ));
    }

    if weather.precipitation_in > PRECIPITATION_IN {
        factors.push(RiskFactor::new(
            RiskType::Weather,
            Hazard::Precipitation,
            Severity::High,
            7.5,
            format!(
                "Precipitation {:.2} in, slip hazard on wet surfaces",
                weather.precipitation_in
            ),
            "Use non-slip footwear and reduce climbing on wet bark",
        ));
    }

    if weather.temperature_f > HEAT_F {
        factors.push(RiskFactor::new(
            RiskType::Weather,
            Hazard::HeatStress,
            Severity::High,
            8.0,
            format!("Temperature {:.0}°F, heat stress risk", weather.temperature_f),
            "Mandatory hydration breaks and shaded rest rotation",
        ));
    } else if weather.temperature_f < COLD_F {
        factors.push(RiskFactor::new(
            RiskType::Weather,
            Hazard::ColdStress,
            Severity::High,
            7.0,
            format!("Temperature {:.0}°F, cold stress risk", weather.temperature_f),
            "Insulated layers and warm-up breaks",
        ));
    }

    let condition = weather.condition.to_lowercase();
    if STORM_KEYWORDS.iter().any(|k| condition.contains(k)) {
        factors.push(RiskFactor::new(
            RiskType::Weather,
            Hazard::Lightning,
            Severity::Critical,
            10.0,
            format!("Lightning risk: {}", weather.condition),
            "Cease all work and move crew to shelter",
        ));
    }

    factors
}
