//! Trip request types supplied by the caller

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::itinerary::Coordinates;

/// Budget tier selected by the traveller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Budget,
    Moderate,
    Luxury,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Budget => "budget",
            BudgetTier::Moderate => "moderate",
            BudgetTier::Luxury => "luxury",
        }
    }
}

/// Closed vocabulary of trip preference tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceTag {
    Culture,
    Food,
    Nature,
    Adventure,
    Nightlife,
    Shopping,
    History,
    Relaxation,
    Art,
    Family,
}

impl PreferenceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceTag::Culture => "culture",
            PreferenceTag::Food => "food",
            PreferenceTag::Nature => "nature",
            PreferenceTag::Adventure => "adventure",
            PreferenceTag::Nightlife => "nightlife",
            PreferenceTag::Shopping => "shopping",
            PreferenceTag::History => "history",
            PreferenceTag::Relaxation => "relaxation",
            PreferenceTag::Art => "art",
            PreferenceTag::Family => "family",
        }
    }
}

/// A place the user already chose; must appear in the final itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatoryPlace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Visitor rating, 0.0-5.0
    #[serde(default)]
    pub rating: Option<f64>,
    /// Price level, 0 (free) to 4 (very expensive)
    #[serde(default)]
    pub price_level: Option<u8>,
}

/// Incoming itinerary request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub budget: BudgetTier,
    pub preferences: Vec<PreferenceTag>,
    #[serde(default)]
    pub must_see_notes: Option<String>,
    pub mandatory_places: Vec<MandatoryPlace>,
}

impl TripRequest {
    /// Number of calendar days covered, counting both ends
    ///
    /// Zero when the range is inverted.
    pub fn day_count(&self) -> u32 {
        let days = (self.end_date - self.start_date).num_days() + 1;
        days.max(0) as u32
    }

    /// The preference echo stored on the finished itinerary
    pub fn preferences_summary(&self) -> TripPreferences {
        TripPreferences {
            destination: self.destination.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            preferences: self.preferences.clone(),
            must_see_notes: self.must_see_notes.clone(),
        }
    }
}

/// Original trip preferences, as echoed on the itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPreferences {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: BudgetTier,
    pub preferences: Vec<PreferenceTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_see_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> TripRequest {
        TripRequest {
            destination: "Paris".to_string(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            budget: BudgetTier::Moderate,
            preferences: vec![PreferenceTag::Art],
            must_see_notes: None,
            mandatory_places: vec![],
        }
    }

    #[test]
    fn test_day_count_is_inclusive() {
        assert_eq!(request("2025-06-01", "2025-06-03").day_count(), 3);
        assert_eq!(request("2025-06-01", "2025-06-01").day_count(), 1);
    }

    #[test]
    fn test_day_count_inverted_range_is_zero() {
        assert_eq!(request("2025-06-05", "2025-06-01").day_count(), 0);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "destination": "Toronto",
            "startDate": "2025-07-01",
            "endDate": "2025-07-02",
            "budget": "luxury",
            "preferences": ["food", "nightlife"],
            "mandatoryPlaces": [
                {"id": "p1", "name": "CN Tower", "address": "290 Bremner Blvd", "priceLevel": 3}
            ]
        }"#;
        let req: TripRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.budget, BudgetTier::Luxury);
        assert_eq!(req.preferences, vec![PreferenceTag::Food, PreferenceTag::Nightlife]);
        assert_eq!(req.mandatory_places[0].price_level, Some(3));
        assert!(req.mandatory_places[0].coordinates.is_none());
    }

    #[test]
    fn test_unknown_preference_tag_is_rejected() {
        let result: Result<PreferenceTag, _> = serde_json::from_str("\"skydiving\"");
        assert!(result.is_err());
    }
}
