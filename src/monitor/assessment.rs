//! Remote assessment client
//!
//! Sends a snapshot of each completed cycle to a remote reasoning service.
//! The response is informational: it is stored for operators and never
//! feeds back into the local level or emergency decision.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use super::models::*;
use crate::config::AssessmentConfig;
use crate::error::AssessmentError;
use crate::sources::{Coordinates, CrewMember, EquipmentStatus, WeatherSnapshot};

/// Environment variable overriding `assessment.api_key`
pub const API_KEY_ENV: &str = "FIELD_SAFETY_ASSESSMENT_KEY";

/// Request body sent to the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub site_id: String,
    pub cycle_id: CycleId,
    pub timestamp: DateTime<Utc>,
    pub factors: Vec<RiskFactor>,
    pub location: Option<Coordinates>,
    pub crew: Vec<CrewMember>,
    pub equipment: Option<EquipmentStatus>,
    pub weather: Option<WeatherSnapshot>,
    pub local_score: f64,
    pub local_level: RiskLevel,
}

impl AssessmentRequest {
    pub fn from_cycle(site_id: &str, cycle: &RiskAssessmentCycle) -> Self {
        Self {
            site_id: site_id.to_string(),
            cycle_id: cycle.id.clone(),
            timestamp: cycle.timestamp,
            factors: cycle.factors.clone(),
            location: cycle.snapshot.location,
            crew: cycle.snapshot.crew.clone(),
            equipment: cycle.snapshot.equipment.clone(),
            weather: cycle.snapshot.weather.clone(),
            local_score: cycle.overall_score,
            local_level: cycle.overall_level,
        }
    }
}

/// Whatever the service answered, kept as opaque JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub cycle_id: CycleId,
    pub received_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait RemoteAssessor: Send + Sync {
    async fn assess(&self, request: &AssessmentRequest) -> Result<AssessmentResponse, AssessmentError>;
}

/// JSON-over-HTTP assessor
pub struct HttpAssessor {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAssessor {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AssessmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssessmentError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build from config. `Err(Disabled)` when assessment is off.
    pub fn from_config(config: &AssessmentConfig) -> Result<Self, AssessmentError> {
        if !config.enabled {
            return Err(AssessmentError::Disabled);
        }
        let endpoint = config.endpoint.clone().ok_or(AssessmentError::Disabled)?;
        let api_key = std::env::var(API_KEY_ENV).ok().or_else(|| config.api_key.clone());

        Self::new(endpoint, api_key, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl RemoteAssessor for HttpAssessor {
    async fn assess(&self, request: &AssessmentRequest) -> Result<AssessmentResponse, AssessmentError> {
        let mut http_request = self.client.post(&self.endpoint).json(request);

        if let Some(key) = &self.api_key {
            http_request = http_request.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| AssessmentError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssessmentError::Http {
                status: response.status().as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssessmentError::Parse(e.to_string()))?;

        Ok(AssessmentResponse {
            cycle_id: request.cycle_id.clone(),
            received_at: Utc::now(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::aggregator::assess;

    #[test]
    fn test_request_from_cycle() {
        let factors = vec![RiskFactor::new(
            RiskType::Weather,
            Hazard::HighWind,
            Severity::Critical,
            9.0,
            "Wind speed 40 mph",
            "Stop aerial work",
        )];
        let snapshot = ConditionSnapshot {
            weather: Some(WeatherSnapshot::calm()),
            location: Some(Coordinates::new(45.5, -122.6)),
            ..Default::default()
        };
        let cycle = assess(factors, snapshot, Vec::new(), Utc::now());

        let request = AssessmentRequest::from_cycle("site-7", &cycle);
        assert_eq!(request.site_id, "site-7");
        assert_eq!(request.cycle_id, cycle.id);
        assert_eq!(request.factors.len(), 1);
        assert_eq!(request.local_level, RiskLevel::Critical);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["factors"][0]["type"], "weather");
        assert_eq!(json["location"]["latitude"], 45.5);
    }

    #[test]
    fn test_enabled_config_builds_client() {
        let config = AssessmentConfig {
            enabled: true,
            endpoint: Some("http://localhost:9000/assess".to_string()),
            api_key: Some("key".to_string()),
            timeout_secs: 3,
        };
        let assessor = HttpAssessor::from_config(&config).unwrap();
        assert_eq!(assessor.endpoint, "http://localhost:9000/assess");
    }

    #[test]
    fn test_disabled_config() {
        let config = AssessmentConfig::default();
        assert!(matches!(
            HttpAssessor::from_config(&config),
            Err(AssessmentError::Disabled)
        ));
    }
}
