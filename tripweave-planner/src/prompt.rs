//! Generation prompt for the itinerary model
//!
//! The output shape described here is what [`crate::pipeline::raw::RawPlan`]
//! reads, and the key names are the ones the recovery parser scans for.

use std::fmt::Write;

use tripweave_common::TripRequest;

const OUTPUT_SHAPE: &str = r#"{
  "title": "string",
  "destination": "string",
  "total_estimated_cost": "$amount",
  "days": [
    {
      "day_number": 1,
      "date": "YYYY-MM-DD",
      "theme": "string",
      "events": [
        {
          "name": "string",
          "description": "string",
          "address": "full street address",
          "coordinates": {"lat": 0.0, "lng": 0.0},
          "start_time": "HH:MM",
          "end_time": "HH:MM",
          "category": "breakfast | lunch | dinner | activity | transport | accommodation",
          "estimated_cost": "$amount",
          "tips": ["string"]
        }
      ],
      "daily_budget_breakdown": {
        "accommodation": "$amount",
        "food": "$amount",
        "activities": "$amount",
        "transportation": "$amount",
        "total": "$amount"
      }
    }
  ],
  "travel_tips": ["string"],
  "packing_suggestions": ["string"],
  "local_customs": ["string"],
  "emergency_info": {
    "police": "string",
    "ambulance": "string",
    "fire": "string",
    "tourist_helpline": "string",
    "notes": ["string"]
  }
}"#;

/// Render the instruction text for one trip request
pub fn build_prompt(request: &TripRequest) -> String {
    let days = request.day_count();
    let preferences = request
        .preferences
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(
        prompt,
        "Create a detailed {}-day travel itinerary for {} from {} to {}.",
        days, request.destination, request.start_date, request.end_date
    );
    let _ = writeln!(prompt, "Budget level: {}.", request.budget.as_str());
    let _ = writeln!(prompt, "Traveller interests: {}.", preferences);

    if let Some(notes) = request.must_see_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(prompt, "Additional wishes: {}", notes.trim());
    }

    let _ = writeln!(
        prompt,
        "\nThe itinerary MUST include every one of these places as an event, using the exact name:"
    );
    for place in &request.mandatory_places {
        if place.address.trim().is_empty() {
            let _ = writeln!(prompt, "- {}", place.name);
        } else {
            let _ = writeln!(prompt, "- {} ({})", place.name, place.address);
        }
    }

    let _ = writeln!(
        prompt,
        "\nPlan breakfast, lunch and dinner each day as events with those categories. \
         Give every event a real street address and coordinates. \
         Keep \"daily_budget_breakdown\" as the last field of each day."
    );
    let _ = writeln!(
        prompt,
        "\nRespond with a single JSON object only, no commentary, in exactly this shape:\n{}",
        OUTPUT_SHAPE
    );

    prompt
}
