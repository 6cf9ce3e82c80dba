//! Stage types produced by the recovery parser and the coverage repairer
//!
//! Generator output is read leniently: every field is optional, and the
//! cost/time/day-number fields accept either strings or numbers. Nothing in
//! here validates content; later stages establish their own invariants.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Trip-level fields carried through every stage unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanMeta {
    #[serde(deserialize_with = "loose::opt_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub destination: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub total_estimated_cost: Option<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub travel_tips: Vec<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub packing_suggestions: Vec<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub local_customs: Vec<String>,
    #[serde(deserialize_with = "loose::opt_emergency")]
    pub emergency_info: Option<RawEmergencyInfo>,
}

/// Output of the recovery parser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlan {
    #[serde(flatten)]
    pub meta: PlanMeta,
    #[serde(default, deserialize_with = "loose::list")]
    pub days: Vec<RawDay>,
}

impl RawPlan {
    pub fn event_count(&self) -> usize {
        self.days.iter().map(|d| d.events.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDay {
    #[serde(deserialize_with = "loose::opt_u32")]
    pub day_number: Option<u32>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub theme: Option<String>,
    #[serde(deserialize_with = "loose::list")]
    pub events: Vec<RawEvent>,
    #[serde(deserialize_with = "loose::opt_budget")]
    pub daily_budget_breakdown: Option<RawBudgetBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    #[serde(deserialize_with = "loose::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub address: Option<String>,
    #[serde(deserialize_with = "loose::opt_coordinates")]
    pub coordinates: Option<RawCoordinates>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub start_time: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub end_time: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub estimated_cost: Option<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub tips: Vec<String>,
}

impl RawEvent {
    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Coordinates as emitted by the generator; either half may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCoordinates {
    #[serde(alias = "latitude", deserialize_with = "loose::opt_f64")]
    pub lat: Option<f64>,
    #[serde(alias = "longitude", alias = "lon", deserialize_with = "loose::opt_f64")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBudgetBreakdown {
    #[serde(deserialize_with = "loose::opt_string")]
    pub accommodation: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub food: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub activities: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub transportation: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub total: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmergencyInfo {
    #[serde(deserialize_with = "loose::opt_string")]
    pub police: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub ambulance: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub fire: Option<String>,
    #[serde(deserialize_with = "loose::opt_string")]
    pub tourist_helpline: Option<String>,
    #[serde(deserialize_with = "loose::string_list")]
    pub notes: Vec<String>,
}

/// Output of the coverage repairer
///
/// Same shape as [`RawPlan`], but every mandatory place is matched by some
/// event name and each day lists mandatory matches first.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedPlan {
    pub meta: PlanMeta,
    pub days: Vec<RawDay>,
    /// Names of mandatory places that had to be synthesized
    pub injected: Vec<String>,
    /// Whether the plan had no days and one was created for injected events
    pub created_day: bool,
}

/// Deserializers tolerant of the generator's type drift
mod loose {
    use super::*;

    fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(d)?.and_then(scalar_to_string))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(value.filter(|v| v.is_finite()))
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(opt_f64(d)?
            .filter(|v| v.is_finite() && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32))
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items.into_iter().filter_map(scalar_to_string).collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
            _ => Vec::new(),
        })
    }

    /// A list of records; `null` or a non-array becomes empty, unreadable items are skipped
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    fn opt_record<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    pub fn opt_coordinates<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<RawCoordinates>, D::Error> {
        opt_record(d)
    }

    pub fn opt_budget<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<RawBudgetBreakdown>, D::Error> {
        opt_record(d)
    }

    pub fn opt_emergency<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<RawEmergencyInfo>, D::Error> {
        opt_record(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_strings_are_interchangeable() {
        let event: RawEvent = serde_json::from_value(json!({
            "name": "Ramen Bar",
            "estimated_cost": 18,
            "start_time": "19:00",
            "coordinates": {"lat": "43.65", "lng": -79.38}
        }))
        .unwrap();

        assert_eq!(event.estimated_cost.as_deref(), Some("18"));
        let coords = event.coordinates.unwrap();
        assert_eq!(coords.lat, Some(43.65));
        assert_eq!(coords.lng, Some(-79.38));
    }

    #[test]
    fn test_non_finite_numbers_are_dropped() {
        let coords: RawCoordinates =
            serde_json::from_value(json!({"lat": "NaN", "lng": "inf"})).unwrap();
        assert_eq!(coords.lat, None);
        assert_eq!(coords.lng, None);

        let day: RawDay = serde_json::from_value(json!({"day_number": "Infinity"})).unwrap();
        assert_eq!(day.day_number, None);
    }

    #[test]
    fn test_day_number_as_string() {
        let day: RawDay =
            serde_json::from_value(json!({"day_number": "2", "events": null})).unwrap();
        assert_eq!(day.day_number, Some(2));
        assert!(day.events.is_empty());
    }

    #[test]
    fn test_bad_nested_records_are_dropped_not_fatal() {
        let plan: RawPlan = serde_json::from_value(json!({
            "title": "Trip",
            "travel_tips": "Carry cash",
            "emergency_info": "call 911",
            "days": [
                {"day_number": 1, "events": [{"name": "A"}, 42, {"name": "B", "coordinates": "n/a"}]}
            ]
        }))
        .unwrap();

        assert_eq!(plan.meta.travel_tips, vec!["Carry cash".to_string()]);
        assert!(plan.meta.emergency_info.is_none());
        assert_eq!(plan.days[0].events.len(), 2);
        assert!(plan.days[0].events[1].coordinates.is_none());
    }

    #[test]
    fn test_longitude_aliases() {
        let coords: RawCoordinates =
            serde_json::from_value(json!({"latitude": 1.5, "lon": 2.5})).unwrap();
        assert_eq!(coords, RawCoordinates { lat: Some(1.5), lng: Some(2.5) });
    }
}
