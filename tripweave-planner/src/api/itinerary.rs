//! Itinerary endpoints
//!
//! POST /api/itinerary         generate, then repair into a full itinerary
//! POST /api/itinerary/repair  repair caller-supplied model output

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};
use tripweave_common::{ComprehensiveItinerary, TripRequest};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{Diagnostics, PipelineOutcome, RecoveryTier};
use crate::prompt::build_prompt;
use crate::validation::validate_request;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResponse {
    pub request_id: Uuid,
    pub itinerary: ComprehensiveItinerary,
    pub recovery_tier: RecoveryTier,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequest {
    pub request: TripRequest,
    pub raw_text: String,
}

fn respond(request_id: Uuid, outcome: PipelineOutcome) -> ItineraryResponse {
    outcome.diagnostics.emit(&request_id.to_string());
    info!(
        request_id = %request_id,
        days = outcome.itinerary.days.len(),
        tier = ?outcome.recovery_tier,
        warnings = outcome.diagnostics.warnings().count(),
        "Itinerary ready"
    );
    ItineraryResponse {
        request_id,
        itinerary: outcome.itinerary,
        recovery_tier: outcome.recovery_tier,
        diagnostics: outcome.diagnostics,
    }
}

async fn record_failure(state: &AppState, request_id: Uuid, err: &ApiError) {
    warn!(request_id = %request_id, code = err.code(), error = %err, "Itinerary request failed");
    *state.last_error.write().await = Some(err.to_string());
}

async fn generate_and_repair(
    state: &AppState,
    request: &TripRequest,
) -> ApiResult<PipelineOutcome> {
    let prompt = build_prompt(request);
    let raw_text = state.generator.generate(&prompt).await?;
    Ok(state.pipeline.run(&raw_text, request).await?)
}

/// POST /api/itinerary
pub async fn create_itinerary(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> ApiResult<Json<ItineraryResponse>> {
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        destination = %request.destination,
        days = request.day_count(),
        mandatory = request.mandatory_places.len(),
        "Itinerary requested"
    );

    let result = match validate_request(&request) {
        Err(err) => Err(ApiError::from(err)),
        Ok(()) => match timeout(
            state.config.request_timeout,
            generate_and_repair(&state, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::Upstream(format!(
                "itinerary generation timed out after {:?}",
                state.config.request_timeout
            ))),
        },
    };

    match result {
        Ok(outcome) => Ok(Json(respond(request_id, outcome))),
        Err(err) => {
            record_failure(&state, request_id, &err).await;
            Err(err)
        }
    }
}

/// POST /api/itinerary/repair
pub async fn repair_itinerary(
    State(state): State<AppState>,
    Json(body): Json<RepairRequest>,
) -> ApiResult<Json<ItineraryResponse>> {
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        raw_len = body.raw_text.len(),
        "Repair requested"
    );

    let result = match validate_request(&body.request) {
        Err(err) => Err(ApiError::from(err)),
        Ok(()) => state
            .pipeline
            .run(&body.raw_text, &body.request)
            .await
            .map_err(ApiError::from),
    };

    match result {
        Ok(outcome) => Ok(Json(respond(request_id, outcome))),
        Err(err) => {
            record_failure(&state, request_id, &err).await;
            Err(err)
        }
    }
}

pub fn itinerary_routes() -> Router<AppState> {
    Router::new()
        .route("/api/itinerary", post(create_itinerary))
        .route("/api/itinerary/repair", post(repair_itinerary))
}
