//! API route handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use super::SharedState;
use crate::monitor::assessment::AssessmentResponse;
use crate::monitor::models::*;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /api/status
pub async fn api_status(State(monitor): State<SharedState>) -> Json<MonitorStatus> {
    Json(monitor.status().await)
}

#[derive(Serialize)]
pub struct RiskResponse {
    pub level: RiskLevel,
    pub score: f64,
    pub cycle: Option<RiskAssessmentCycle>,
    pub last_emergency: Option<EmergencyEvent>,
    pub remote_assessment: Option<AssessmentResponse>,
}

/// GET /api/risk
pub async fn api_risk(State(monitor): State<SharedState>) -> Json<RiskResponse> {
    let cycle = monitor.latest_cycle().await;

    Json(RiskResponse {
        level: cycle.as_ref().map(|c| c.overall_level).unwrap_or_default(),
        score: cycle.as_ref().map(|c| c.overall_score).unwrap_or(0.0),
        cycle: cycle.map(|c| c.as_ref().clone()),
        last_emergency: monitor.last_emergency().await,
        remote_assessment: monitor.last_assessment().await,
    })
}

/// POST /api/cycle - force an out-of-schedule cycle
pub async fn api_trigger_cycle(
    State(monitor): State<SharedState>,
) -> Result<Json<RiskAssessmentCycle>, (StatusCode, String)> {
    monitor
        .trigger_manual_cycle()
        .await
        .map(|c| Json(c.as_ref().clone()))
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
}

#[derive(Deserialize)]
pub struct CyclesQuery {
    #[serde(default = "default_cycle_count")]
    pub count: usize,
}

fn default_cycle_count() -> usize {
    10
}

/// GET /api/cycles?count=N - newest first
pub async fn api_recent_cycles(
    State(monitor): State<SharedState>,
    Query(query): Query<CyclesQuery>,
) -> Json<Vec<RiskAssessmentCycle>> {
    let cycles = monitor.recent_cycles(query.count).await;
    Json(cycles.iter().map(|c| c.as_ref().clone()).collect())
}

/// GET /api/alerts
pub async fn api_alerts(State(monitor): State<SharedState>) -> Json<Vec<SafetyAlert>> {
    Json(monitor.active_alerts().await)
}

#[derive(Serialize)]
pub struct AckResponse {
    pub acknowledged: bool,
}

/// POST /api/alerts/:id/ack - unknown ids answer `acknowledged: false`
pub async fn api_ack_alert(
    State(monitor): State<SharedState>,
    Path(id): Path<String>,
) -> Json<AckResponse> {
    Json(AckResponse {
        acknowledged: monitor.acknowledge_alert(&id).await,
    })
}

/// POST /api/checklists
pub async fn api_generate_checklist(State(monitor): State<SharedState>) -> Json<SafetyChecklist> {
    Json(monitor.generate_checklist().await)
}

/// GET /api/checklists/:id
pub async fn api_checklist(
    State(monitor): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SafetyChecklist>, StatusCode> {
    monitor
        .checklist(&id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub completed: bool,
    pub checklist: Option<SafetyChecklist>,
}

/// POST /api/checklists/:id/items/:item/complete
pub async fn api_complete_item(
    State(monitor): State<SharedState>,
    Path((id, item)): Path<(String, String)>,
) -> Json<CompleteResponse> {
    let completed = monitor.complete_checklist_item(&id, &item).await;
    Json(CompleteResponse {
        completed,
        checklist: monitor.checklist(&id).await,
    })
}

/// GET /api/contacts
pub async fn api_contacts(State(monitor): State<SharedState>) -> Json<Vec<EmergencyContact>> {
    Json(monitor.emergency_contacts().to_vec())
}
