//! tripweave-planner library
//!
//! Turns a trip request into a validated, geocoded, canonical itinerary by
//! generating a plan with a language model and repairing whatever comes back.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod services;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::PlannerConfig;
use crate::pipeline::{Geocoder, Pipeline};
use crate::services::TextGenerator;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PlannerConfig>,
    pub generator: Arc<dyn TextGenerator>,
    pub pipeline: Pipeline,
    pub startup_time: DateTime<Utc>,
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        config: PlannerConfig,
        generator: Arc<dyn TextGenerator>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let pipeline = Pipeline::new(geocoder, config.enrich);
        Self {
            config: Arc::new(config),
            generator,
            pipeline,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::itinerary_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
