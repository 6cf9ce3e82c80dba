//! # TripWeave Common Library
//!
//! Shared code for the TripWeave services including:
//! - Trip request and mandatory place types
//! - The canonical itinerary model (days, events, meals)
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod itinerary;
pub mod request;

pub use error::{Error, Result};
pub use itinerary::{
    ComprehensiveItinerary, Coordinates, DailyBudgetBreakdown, EmergencyInfo, ItineraryDay,
    ItineraryEvent, Meals,
};
pub use request::{BudgetTier, MandatoryPlace, PreferenceTag, TripPreferences, TripRequest};
