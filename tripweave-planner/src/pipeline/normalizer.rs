//! Itinerary normalizer
//!
//! Reshapes an enriched plan into the canonical [`ComprehensiveItinerary`].

use chrono::{Duration, NaiveDate, Utc};
use tripweave_common::{
    ComprehensiveItinerary, DailyBudgetBreakdown, EmergencyInfo, ItineraryDay, ItineraryEvent,
    Meals, TripRequest,
};
use uuid::Uuid;

use super::enrichment::{EnrichedDay, EnrichedPlan};
use super::raw::{RawBudgetBreakdown, RawEmergencyInfo};

/// Things the normalizer had to decide on the generator's behalf
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationReport {
    /// (day number, event name) of meal events that lost their slot to an earlier one
    pub demoted_meals: Vec<(u32, String)>,
    /// Days whose date was computed from the trip start
    pub derived_dates: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

fn meal_slot(category: &str) -> Option<MealSlot> {
    match category.trim().to_ascii_lowercase().as_str() {
        "breakfast" => Some(MealSlot::Breakfast),
        "lunch" => Some(MealSlot::Lunch),
        "dinner" => Some(MealSlot::Dinner),
        _ => None,
    }
}

/// Split a day's events into meal slots and everything else
///
/// The first event of each meal category takes the slot; later ones stay
/// in `events` and are returned for reporting.
pub fn partition_meals(events: Vec<ItineraryEvent>) -> (Vec<ItineraryEvent>, Meals, Vec<String>) {
    let mut meals = Meals::default();
    let mut rest = Vec::with_capacity(events.len());
    let mut demoted = Vec::new();

    for event in events {
        let slot = match meal_slot(&event.category) {
            Some(MealSlot::Breakfast) => &mut meals.breakfast,
            Some(MealSlot::Lunch) => &mut meals.lunch,
            Some(MealSlot::Dinner) => &mut meals.dinner,
            None => {
                rest.push(event);
                continue;
            }
        };

        if slot.is_none() {
            *slot = Some(event);
        } else {
            demoted.push(event.name.clone());
            rest.push(event);
        }
    }

    (rest, meals, demoted)
}

fn budget_breakdown(raw: Option<RawBudgetBreakdown>) -> DailyBudgetBreakdown {
    let raw = raw.unwrap_or_default();
    let defaults = DailyBudgetBreakdown::default();
    DailyBudgetBreakdown {
        accommodation: raw.accommodation.unwrap_or(defaults.accommodation),
        food: raw.food.unwrap_or(defaults.food),
        activities: raw.activities.unwrap_or(defaults.activities),
        transportation: raw.transportation.unwrap_or(defaults.transportation),
        total: raw.total.unwrap_or(defaults.total),
    }
}

fn emergency_info(raw: Option<RawEmergencyInfo>) -> EmergencyInfo {
    let defaults = EmergencyInfo::default();
    let Some(raw) = raw else {
        return defaults;
    };
    EmergencyInfo {
        police: raw.police.unwrap_or(defaults.police),
        ambulance: raw.ambulance.unwrap_or(defaults.ambulance),
        fire: raw.fire.unwrap_or(defaults.fire),
        tourist_helpline: raw.tourist_helpline,
        notes: if raw.notes.is_empty() {
            defaults.notes
        } else {
            raw.notes
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `start + (day_number - 1)`, or `start + position` when that overflows
/// or lands after the trip ends
fn derive_date(day_number: u32, position: usize, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let offset = |days: i64| start.checked_add_signed(Duration::days(days));
    offset(i64::from(day_number) - 1)
        .filter(|date| *date <= end)
        .or_else(|| offset(i64::try_from(position).unwrap_or(0)))
        .unwrap_or(start)
}

fn normalize_day(
    day: EnrichedDay,
    position: usize,
    start_date: NaiveDate,
    end_date: NaiveDate,
    report: &mut NormalizationReport,
) -> ItineraryDay {
    let day_number = day
        .day_number
        .filter(|n| *n > 0)
        .unwrap_or(position as u32 + 1);

    let parsed_date = day
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
    let date = match parsed_date {
        Some(date) => date,
        None => {
            report.derived_dates.push(day_number);
            derive_date(day_number, position, start_date, end_date)
        }
    };

    let (events, meals, demoted) = partition_meals(day.events);
    report
        .demoted_meals
        .extend(demoted.into_iter().map(|name| (day_number, name)));

    ItineraryDay {
        day_number,
        date,
        theme: non_blank(day.theme).unwrap_or_else(|| format!("Day {}", day_number)),
        events,
        meals,
        daily_budget_breakdown: budget_breakdown(day.daily_budget_breakdown),
    }
}

/// Build the canonical itinerary
pub fn normalize(plan: EnrichedPlan, request: &TripRequest) -> ComprehensiveItinerary {
    normalize_with_report(plan, request).0
}

pub fn normalize_with_report(
    plan: EnrichedPlan,
    request: &TripRequest,
) -> (ComprehensiveItinerary, NormalizationReport) {
    let mut report = NormalizationReport::default();
    let meta = plan.meta;

    let days: Vec<ItineraryDay> = plan
        .days
        .into_iter()
        .enumerate()
        .map(|(position, day)| {
            normalize_day(day, position, request.start_date, request.end_date, &mut report)
        })
        .collect();

    let destination =
        non_blank(meta.destination).unwrap_or_else(|| request.destination.clone());
    let title = non_blank(meta.title)
        .unwrap_or_else(|| format!("{}-Day Trip to {}", days.len(), destination));

    let itinerary = ComprehensiveItinerary {
        id: Uuid::new_v4(),
        title,
        destination,
        start_date: request.start_date,
        end_date: request.end_date,
        total_estimated_cost: non_blank(meta.total_estimated_cost)
            .unwrap_or_else(|| "$0".to_string()),
        days,
        travel_tips: meta.travel_tips,
        packing_suggestions: meta.packing_suggestions,
        local_customs: meta.local_customs,
        emergency_info: emergency_info(meta.emergency_info),
        preferences: request.preferences_summary(),
        generated_at: Utc::now(),
    };

    (itinerary, report)
}
