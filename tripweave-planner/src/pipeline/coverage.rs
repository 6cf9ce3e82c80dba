//! Mandatory-place coverage check and repair
//!
//! A mandatory place counts as present when some event name, case-folded,
//! contains the place name or is contained by it. Missing places are
//! synthesized as featured midday activities, then every day is reordered
//! so mandatory matches come first.

use tripweave_common::MandatoryPlace;

use super::raw::{RawCoordinates, RawDay, RawEvent, RawPlan, RepairedPlan};

const INJECTED_START: &str = "12:00";
const INJECTED_END: &str = "14:00";
const INJECTED_CATEGORY: &str = "activity";
const COST_PER_PRICE_LEVEL: u32 = 25;

/// Bidirectional case-insensitive substring match
///
/// Blank names never match; otherwise an unnamed event would satisfy
/// every place.
pub fn matches_place(event_name: &str, place_name: &str) -> bool {
    let event = event_name.trim().to_lowercase();
    let place = place_name.trim().to_lowercase();
    if event.is_empty() || place.is_empty() {
        return false;
    }
    event.contains(&place) || place.contains(&event)
}

fn is_mandatory(event: &RawEvent, mandatory: &[MandatoryPlace]) -> bool {
    mandatory
        .iter()
        .any(|place| matches_place(event.name_str(), &place.name))
}

/// Mandatory places with no matching event anywhere in the plan
pub fn missing_places<'a>(
    plan: &RawPlan,
    mandatory: &'a [MandatoryPlace],
) -> Vec<&'a MandatoryPlace> {
    mandatory
        .iter()
        .filter(|place| {
            !plan
                .days
                .iter()
                .flat_map(|day| day.events.iter())
                .any(|event| matches_place(event.name_str(), &place.name))
        })
        .collect()
}

/// Build the stand-in event for a place the generator left out
pub fn synthesize_event(place: &MandatoryPlace, destination: &str) -> RawEvent {
    RawEvent {
        name: Some(place.name.clone()),
        description: Some(format!(
            "Visit {}, one of your must-see places in {}.",
            place.name, destination
        )),
        address: Some(place.address.clone()),
        coordinates: place.coordinates.map(|c| RawCoordinates {
            lat: Some(c.lat),
            lng: Some(c.lng),
        }),
        start_time: Some(INJECTED_START.to_string()),
        end_time: Some(INJECTED_END.to_string()),
        category: Some(INJECTED_CATEGORY.to_string()),
        estimated_cost: Some(estimated_cost(place.price_level)),
        tips: tips_for_rating(place.rating),
    }
}

fn estimated_cost(price_level: Option<u8>) -> String {
    let level = price_level.map(u32::from).unwrap_or(0);
    format!("${}", level * COST_PER_PRICE_LEVEL)
}

fn tips_for_rating(rating: Option<f64>) -> Vec<String> {
    match rating {
        Some(rating) => {
            let mut tips = vec![format!("Rated {:.1}/5 by visitors", rating)];
            if rating >= 4.5 {
                tips.push("Very popular: book ahead or arrive early".to_string());
            }
            tips
        }
        None => vec!["Check opening hours before you go".to_string()],
    }
}

/// Move mandatory matches to the front, keeping relative order in both groups
fn prioritize(events: Vec<RawEvent>, mandatory: &[MandatoryPlace]) -> Vec<RawEvent> {
    let (mut featured, rest): (Vec<_>, Vec<_>) = events
        .into_iter()
        .partition(|event| is_mandatory(event, mandatory));
    featured.extend(rest);
    featured
}

/// Establish mandatory-place coverage
///
/// Missing place `i` goes to the front of day `min(i, day_count - 1)`.
/// A plan with no days gets a day 1 to hold the injected events.
/// Duplicate events are left alone.
pub fn repair(plan: RawPlan, mandatory: &[MandatoryPlace], destination: &str) -> RepairedPlan {
    let missing = missing_places(&plan, mandatory);
    let RawPlan { meta, mut days } = plan;

    let created_day = !missing.is_empty() && days.is_empty();
    if created_day {
        days.push(RawDay {
            day_number: Some(1),
            theme: Some(format!("Highlights of {}", destination)),
            ..Default::default()
        });
    }

    let last_day = days.len().saturating_sub(1);
    let mut injected = Vec::with_capacity(missing.len());
    for (i, place) in missing.iter().enumerate() {
        days[i.min(last_day)]
            .events
            .insert(0, synthesize_event(place, destination));
        injected.push(place.name.clone());
    }

    let days = days
        .into_iter()
        .map(|day| RawDay {
            events: prioritize(day.events, mandatory),
            ..day
        })
        .collect();

    RepairedPlan {
        meta,
        days,
        injected,
        created_day,
    }
}
