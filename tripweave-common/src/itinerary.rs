//! Canonical itinerary model
//!
//! This is the only strongly-typed trip representation that leaves the
//! planner. Field names serialize in camelCase for the UI.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::TripPreferences;

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const ZERO: Coordinates = Coordinates { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `{0,0}` doubles as "unknown" in generator output
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// One scheduled stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryEvent {
    pub name: String,
    pub description: String,
    pub address: String,
    pub coordinates: Coordinates,
    /// "HH:MM" as produced upstream; not re-validated
    pub start_time: String,
    pub end_time: String,
    pub category: String,
    pub estimated_cost: String,
    pub tips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_time_to_next_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_distance_to_next_km: Option<f64>,
}

/// Meal slots of a day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Meals {
    pub breakfast: Option<ItineraryEvent>,
    pub lunch: Option<ItineraryEvent>,
    pub dinner: Option<ItineraryEvent>,
}

impl Meals {
    pub fn filled_slots(&self) -> usize {
        [&self.breakfast, &self.lunch, &self.dinner]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}

/// Per-day spend estimate, as display strings ("$40")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBudgetBreakdown {
    pub accommodation: String,
    pub food: String,
    pub activities: String,
    pub transportation: String,
    pub total: String,
}

impl Default for DailyBudgetBreakdown {
    fn default() -> Self {
        Self {
            accommodation: "$0".to_string(),
            food: "$0".to_string(),
            activities: "$0".to_string(),
            transportation: "$0".to_string(),
            total: "$0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day_number: u32,
    pub date: NaiveDate,
    pub theme: String,
    /// Everything that is not a meal
    pub events: Vec<ItineraryEvent>,
    pub meals: Meals,
    pub daily_budget_breakdown: DailyBudgetBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyInfo {
    pub police: String,
    pub ambulance: String,
    pub fire: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tourist_helpline: Option<String>,
    pub notes: Vec<String>,
}

impl Default for EmergencyInfo {
    fn default() -> Self {
        Self {
            police: "112".to_string(),
            ambulance: "112".to_string(),
            fire: "112".to_string(),
            tourist_helpline: None,
            notes: vec![
                "Verify local emergency numbers on arrival; 112 works in most countries.".to_string(),
            ],
        }
    }
}

/// Trip-level aggregate returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveItinerary {
    pub id: Uuid,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_estimated_cost: String,
    pub days: Vec<ItineraryDay>,
    pub travel_tips: Vec<String>,
    pub packing_suggestions: Vec<String>,
    pub local_customs: Vec<String>,
    pub emergency_info: EmergencyInfo,
    pub preferences: TripPreferences,
    pub generated_at: DateTime<Utc>,
}

impl ComprehensiveItinerary {
    /// All events of the trip, meal slots included, in day order
    pub fn all_events(&self) -> impl Iterator<Item = &ItineraryEvent> {
        self.days.iter().flat_map(|day| {
            day.events.iter().chain(
                [&day.meals.breakfast, &day.meals.lunch, &day.meals.dinner]
                    .into_iter()
                    .flatten(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ItineraryEvent {
        ItineraryEvent {
            name: name.to_string(),
            description: String::new(),
            address: String::new(),
            coordinates: Coordinates::ZERO,
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            category: "activity".to_string(),
            estimated_cost: "$0".to_string(),
            tips: vec![],
            travel_time_to_next_minutes: None,
            travel_distance_to_next_km: None,
        }
    }

    #[test]
    fn test_zero_coordinates() {
        assert!(Coordinates::ZERO.is_zero());
        assert!(!Coordinates::new(0.0, 2.35).is_zero());
    }

    #[test]
    fn test_event_serializes_camel_case_and_skips_missing_metrics() {
        let value = serde_json::to_value(event("Louvre")).unwrap();
        assert!(value.get("startTime").is_some());
        assert!(value.get("travelTimeToNextMinutes").is_none());
    }

    #[test]
    fn test_meals_filled_slots() {
        let meals = Meals {
            breakfast: Some(event("Cafe")),
            lunch: None,
            dinner: Some(event("Bistro")),
        };
        assert_eq!(meals.filled_slots(), 2);
    }

    #[test]
    fn test_default_budget_breakdown_is_zeroed() {
        let breakdown = DailyBudgetBreakdown::default();
        assert_eq!(breakdown.total, "$0");
        assert_eq!(breakdown.activities, "$0");
    }
}
