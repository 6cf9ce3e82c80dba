//! Itinerary synthesis and repair pipeline
//!
//! raw text → [`recovery`] → [`coverage`] → [`enrichment`] → [`normalizer`]
//!
//! Each stage takes its input by value and returns a new stage type, so
//! the invariants that hold at each point are visible in the types:
//! [`RawPlan`] → [`RepairedPlan`] → [`EnrichedPlan`] → `ComprehensiveItinerary`.

pub mod coverage;
pub mod diagnostics;
pub mod enrichment;
pub mod geo;
pub mod normalizer;
pub mod raw;
pub mod recovery;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tripweave_common::{ComprehensiveItinerary, TripRequest};

pub use diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics, Stage};
pub use enrichment::{EnrichOptions, EnrichedPlan, Geocoder};
pub use raw::{RawPlan, RepairedPlan};
pub use recovery::{RecoveryError, RecoveryTier};

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub itinerary: ComprehensiveItinerary,
    pub recovery_tier: RecoveryTier,
    pub diagnostics: Diagnostics,
}

/// Runs the four stages against one geocoder
#[derive(Clone)]
pub struct Pipeline {
    geocoder: Arc<dyn Geocoder>,
    options: EnrichOptions,
}

impl Pipeline {
    pub fn new(geocoder: Arc<dyn Geocoder>, options: EnrichOptions) -> Self {
        Self { geocoder, options }
    }

    /// Turn raw model output into a canonical itinerary
    ///
    /// Only an unrecoverable payload is an error; every other problem is
    /// repaired or degraded and reported in the outcome's diagnostics.
    pub async fn run(
        &self,
        raw_text: &str,
        request: &TripRequest,
    ) -> Result<PipelineOutcome, RecoveryError> {
        let mut diagnostics = Diagnostics::new();

        let recovered = recovery::recover_plan(raw_text)?;
        match recovered.tier {
            RecoveryTier::Direct => diagnostics.info(Stage::Recovery, recovered.tier.describe()),
            tier => diagnostics.warn(Stage::Recovery, tier.describe()),
        }
        debug!(days = recovered.plan.days.len(), "Recovery stage complete");

        let repaired = coverage::repair(
            recovered.plan,
            &request.mandatory_places,
            &request.destination,
        );
        if repaired.created_day {
            diagnostics.warn(
                Stage::Coverage,
                "generated plan had no days; created day 1 for mandatory places",
            );
        }
        for name in &repaired.injected {
            diagnostics.warn(
                Stage::Coverage,
                format!("mandatory place \"{}\" was missing and has been added", name),
            );
        }

        let enriched = enrichment::enrich(repaired, self.geocoder.as_ref(), self.options).await;
        if enriched.report.geocoded > 0 {
            diagnostics.info(
                Stage::Enrichment,
                format!("resolved coordinates for {} event(s)", enriched.report.geocoded),
            );
        }
        for name in &enriched.report.geocode_failures {
            diagnostics.warn(
                Stage::Enrichment,
                format!("could not geocode \"{}\"; coordinates set to 0,0", name),
            );
        }

        let (itinerary, report) = normalizer::normalize_with_report(enriched, request);
        for (day, name) in &report.demoted_meals {
            diagnostics.warn(
                Stage::Normalization,
                format!(
                    "day {}: meal slot already taken, \"{}\" listed with the day's events",
                    day, name
                ),
            );
        }
        if !report.derived_dates.is_empty() {
            diagnostics.info(
                Stage::Normalization,
                format!(
                    "dates derived from trip start for day(s) {:?}",
                    report.derived_dates
                ),
            );
        }

        Ok(PipelineOutcome {
            itinerary,
            recovery_tier: recovered.tier,
            diagnostics,
        })
    }
}
