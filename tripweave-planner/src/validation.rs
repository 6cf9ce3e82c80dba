//! Trip request validation
//!
//! Runs before any generation. All problems are collected so the caller
//! can fix them in one round trip.

use thiserror::Error;
use tripweave_common::TripRequest;

/// Longest trip the planner will generate
pub const MAX_TRIP_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trip request: {}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

pub fn validate_request(request: &TripRequest) -> Result<(), ValidationError> {
    let mut problems = Vec::new();

    if request.destination.trim().is_empty() {
        problems.push("destination is required".to_string());
    }

    if request.end_date < request.start_date {
        problems.push("end date is before start date".to_string());
    } else if request.day_count() > MAX_TRIP_DAYS {
        problems.push(format!(
            "trip is {} days long; at most {} days are supported",
            request.day_count(),
            MAX_TRIP_DAYS
        ));
    }

    if request.preferences.is_empty() {
        problems.push("at least one preference is required".to_string());
    }

    if request.mandatory_places.is_empty() {
        problems.push("at least one mandatory place is required".to_string());
    }

    for (i, place) in request.mandatory_places.iter().enumerate() {
        if place.name.trim().is_empty() {
            problems.push(format!("mandatory place #{} has no name", i + 1));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { problems })
    }
}
