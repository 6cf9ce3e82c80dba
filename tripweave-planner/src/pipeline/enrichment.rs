//! Geospatial enrichment
//!
//! Fills in missing coordinates through a [`Geocoder`] and attaches distance
//! and travel-time estimates from each event to its chronological successor
//! within the same day.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;
use tripweave_common::{Coordinates, ItineraryEvent};

use super::geo::{haversine_km, travel_time_minutes};
use super::raw::{PlanMeta, RawBudgetBreakdown, RawEvent, RepairedPlan};

const DEFAULT_EVENT_NAME: &str = "Unnamed stop";
const DEFAULT_CATEGORY: &str = "activity";
const DEFAULT_COST: &str = "$0";

/// Address → coordinates lookup
///
/// Implementations return `None` for not-found and for transport failures
/// alike; they never error.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Option<Coordinates>;
}

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Geocode lookups in flight at once within a day; 1 is strictly sequential
    pub geocode_concurrency: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            geocode_concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDay {
    pub day_number: Option<u32>,
    pub date: Option<String>,
    pub theme: Option<String>,
    /// Every event carries coordinates; list order is preserved from the repaired plan
    pub events: Vec<ItineraryEvent>,
    pub daily_budget_breakdown: Option<RawBudgetBreakdown>,
}

/// What the enricher had to look up
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    pub geocoded: usize,
    /// Names of events left at `{0,0}`
    pub geocode_failures: Vec<String>,
}

/// Output of the enricher
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPlan {
    pub meta: PlanMeta,
    pub days: Vec<EnrichedDay>,
    pub injected: Vec<String>,
    pub report: EnrichmentReport,
}

enum Resolution {
    Given(Coordinates),
    Geocoded(Coordinates),
    Failed,
}

impl Resolution {
    fn coordinates(&self) -> Coordinates {
        match self {
            Resolution::Given(c) | Resolution::Geocoded(c) => *c,
            Resolution::Failed => Coordinates::ZERO,
        }
    }
}

/// Coordinates the generator supplied, if usable
///
/// Zero, non-finite and out-of-range pairs are treated as missing.
fn given_coordinates(event: &RawEvent) -> Option<Coordinates> {
    let raw = event.coordinates?;
    let coords = Coordinates::new(raw.lat?, raw.lng?);
    let in_range = coords.lat.is_finite()
        && coords.lng.is_finite()
        && coords.lat.abs() <= 90.0
        && coords.lng.abs() <= 180.0;
    (in_range && !coords.is_zero()).then_some(coords)
}

async fn resolve_event(event: &RawEvent, geocoder: &dyn Geocoder) -> Resolution {
    if let Some(coords) = given_coordinates(event) {
        return Resolution::Given(coords);
    }

    let address = event.address.as_deref().unwrap_or("").trim();
    if address.is_empty() {
        return Resolution::Failed;
    }

    match geocoder.resolve(address).await {
        Some(coords) => Resolution::Geocoded(coords),
        None => Resolution::Failed,
    }
}

fn into_itinerary_event(event: RawEvent, coordinates: Coordinates) -> ItineraryEvent {
    ItineraryEvent {
        name: event
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
        description: event.description.unwrap_or_default(),
        address: event.address.unwrap_or_default(),
        coordinates,
        start_time: event.start_time.unwrap_or_default(),
        end_time: event.end_time.unwrap_or_default(),
        category: event
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        estimated_cost: event
            .estimated_cost
            .unwrap_or_else(|| DEFAULT_COST.to_string()),
        tips: event.tips,
        travel_time_to_next_minutes: None,
        travel_distance_to_next_km: None,
    }
}

/// Minutes past midnight for "HH:MM", "H:MM", "HH:MM:SS" and 12-hour "h:MM AM"
pub fn parse_clock(text: &str) -> Option<u32> {
    let lower = text.trim().to_ascii_lowercase();
    let (clock, meridiem) = if let Some(rest) = lower.strip_suffix("am") {
        (rest.trim(), Some(false))
    } else if let Some(rest) = lower.strip_suffix("pm") {
        (rest.trim(), Some(true))
    } else {
        (lower.as_str(), None)
    };

    let mut parts = clock.split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None if meridiem.is_some() => 0,
        None => return None,
    };
    if minutes >= 60 {
        return None;
    }

    let hours = match meridiem {
        Some(_) if hours == 0 || hours > 12 => return None,
        Some(false) => hours % 12,
        Some(true) => hours % 12 + 12,
        None if hours < 24 => hours,
        None => return None,
    };

    Some(hours * 60 + minutes)
}

/// Event indices in chronological order
///
/// Stable: ties and unparseable start times keep list order, with
/// unparseable ones last.
fn chronological_order(events: &[ItineraryEvent]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by_key(|&i| match parse_clock(&events[i].start_time) {
        Some(minutes) => (0, minutes),
        None => (1, 0),
    });
    order
}

fn attach_travel_metrics(events: &mut [ItineraryEvent]) {
    let order = chronological_order(events);
    for pair in order.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let distance = haversine_km(events[current].coordinates, events[next].coordinates);
        events[current].travel_distance_to_next_km = Some(distance);
        events[current].travel_time_to_next_minutes = Some(travel_time_minutes(distance));
    }
}

/// Resolve coordinates and compute travel metrics, day by day
pub async fn enrich(
    plan: RepairedPlan,
    geocoder: &dyn Geocoder,
    options: EnrichOptions,
) -> EnrichedPlan {
    let concurrency = options.geocode_concurrency.max(1);
    let mut report = EnrichmentReport::default();
    let mut days = Vec::with_capacity(plan.days.len());

    for day in plan.days {
        let lookups: Vec<_> = day
            .events
            .iter()
            .map(|event| resolve_event(event, geocoder))
            .collect();
        let resolutions: Vec<Resolution> = stream::iter(lookups)
            .buffered(concurrency)
            .collect()
            .await;

        let mut events = Vec::with_capacity(day.events.len());
        for (event, resolution) in day.events.into_iter().zip(resolutions) {
            match resolution {
                Resolution::Geocoded(_) => report.geocoded += 1,
                Resolution::Failed => report
                    .geocode_failures
                    .push(event.name_str().to_string()),
                Resolution::Given(_) => {}
            }
            events.push(into_itinerary_event(event, resolution.coordinates()));
        }

        attach_travel_metrics(&mut events);

        days.push(EnrichedDay {
            day_number: day.day_number,
            date: day.date,
            theme: day.theme,
            events,
            daily_budget_breakdown: day.daily_budget_breakdown,
        });
    }

    debug!(
        geocoded = report.geocoded,
        failures = report.geocode_failures.len(),
        "Enrichment complete"
    );

    EnrichedPlan {
        meta: plan.meta,
        days,
        injected: plan.injected,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::raw::{RawCoordinates, RawDay};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapGeocoder {
        known: HashMap<String, Coordinates>,
        calls: AtomicUsize,
    }

    impl MapGeocoder {
        fn new(entries: &[(&str, Coordinates)]) -> Self {
            Self {
                known: entries.iter().map(|(a, c)| (a.to_string(), *c)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for MapGeocoder {
        async fn resolve(&self, address: &str) -> Option<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.known.get(address).copied()
        }
    }

    fn event(name: &str, address: &str, start: &str, coords: Option<(f64, f64)>) -> RawEvent {
        RawEvent {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            start_time: Some(start.to_string()),
            coordinates: coords.map(|(lat, lng)| RawCoordinates {
                lat: Some(lat),
                lng: Some(lng),
            }),
            ..Default::default()
        }
    }

    fn repaired(days: Vec<Vec<RawEvent>>) -> RepairedPlan {
        RepairedPlan {
            meta: PlanMeta::default(),
            days: days
                .into_iter()
                .map(|events| RawDay {
                    events,
                    ..Default::default()
                })
                .collect(),
            injected: vec![],
            created_day: false,
        }
    }

    #[tokio::test]
    async fn test_supplied_coordinates_skip_geocoding() {
        let geocoder = MapGeocoder::new(&[]);
        let tower = event("Tower", "1 Main St", "09:00", Some((43.64, -79.38)));
        let plan = repaired(vec![vec![tower]]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(enriched.days[0].events[0].coordinates, Coordinates::new(43.64, -79.38));
        assert!(enriched.days[0].events[0].travel_time_to_next_minutes.is_none());
    }

    #[tokio::test]
    async fn test_zero_coordinates_are_geocoded() {
        let geocoder = MapGeocoder::new(&[("2 Side St", Coordinates::new(1.0, 2.0))]);
        let plan = repaired(vec![vec![event("Cafe", "2 Side St", "09:00", Some((0.0, 0.0)))]]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;

        assert_eq!(enriched.days[0].events[0].coordinates, Coordinates::new(1.0, 2.0));
        assert_eq!(enriched.report.geocoded, 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_zero() {
        let geocoder = MapGeocoder::new(&[]);
        let plan = repaired(vec![vec![
            event("Nowhere", "Unknown Rd", "09:00", None),
            event("No address", "", "10:00", None),
        ]]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;

        assert!(enriched.days[0].events.iter().all(|e| e.coordinates.is_zero()));
        assert_eq!(
            enriched.report.geocode_failures,
            vec!["Nowhere".to_string(), "No address".to_string()]
        );
        // Blank addresses never reach the geocoder
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metrics_follow_start_time_not_list_order() {
        let geocoder = MapGeocoder::new(&[]);
        let plan = repaired(vec![vec![
            event("Featured", "a", "12:00", Some((48.8606, 2.3376))),
            event("Breakfast", "b", "08:30", Some((48.8566, 2.3522))),
            event("Dinner", "c", "19:00", Some((48.8584, 2.2945))),
        ]]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;
        let events = &enriched.days[0].events;

        assert_eq!(events[0].name, "Featured");
        let breakfast_to_featured = haversine_km(events[1].coordinates, events[0].coordinates);
        assert_eq!(events[1].travel_distance_to_next_km, Some(breakfast_to_featured));
        let featured_to_dinner = haversine_km(events[0].coordinates, events[2].coordinates);
        assert_eq!(events[0].travel_distance_to_next_km, Some(featured_to_dinner));
        assert_eq!(
            events[0].travel_time_to_next_minutes,
            Some(travel_time_minutes(featured_to_dinner))
        );
        assert!(events[2].travel_distance_to_next_km.is_none());
    }

    #[tokio::test]
    async fn test_metrics_do_not_cross_days() {
        let geocoder = MapGeocoder::new(&[]);
        let plan = repaired(vec![
            vec![event("A", "a", "09:00", Some((1.0, 1.0)))],
            vec![event("B", "b", "09:00", Some((2.0, 2.0)))],
        ]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;

        assert!(enriched.days[0].events[0].travel_distance_to_next_km.is_none());
        assert!(enriched.days[1].events[0].travel_distance_to_next_km.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_geocoding_matches_sequential() {
        let entries = [
            ("a", Coordinates::new(10.0, 10.0)),
            ("b", Coordinates::new(10.01, 10.01)),
            ("c", Coordinates::new(10.05, 10.0)),
            ("d", Coordinates::new(10.1, 10.1)),
        ];
        let events = || {
            vec![
                event("A", "a", "09:00", None),
                event("B", "b", "10:00", None),
                event("C", "c", "11:00", None),
                event("D", "d", "12:00", None),
            ]
        };

        let sequential = enrich(
            repaired(vec![events()]),
            &MapGeocoder::new(&entries),
            EnrichOptions::default(),
        )
        .await;
        let concurrent = enrich(
            repaired(vec![events()]),
            &MapGeocoder::new(&entries),
            EnrichOptions {
                geocode_concurrency: 4,
            },
        )
        .await;

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_implausible_coordinates_are_geocoded() {
        let geocoder = MapGeocoder::new(&[("3 Quay St", Coordinates::new(5.0, 6.0))]);
        let plan = repaired(vec![vec![
            event("Pier", "3 Quay St", "09:00", Some((f64::NAN, f64::INFINITY))),
            event("Buoy", "Open sea", "10:00", Some((95.0, 12.0))),
        ]]);

        let enriched = enrich(plan, &geocoder, EnrichOptions::default()).await;
        let events = &enriched.days[0].events;

        assert_eq!(events[0].coordinates, Coordinates::new(5.0, 6.0));
        assert_eq!(events[1].coordinates, Coordinates::ZERO);
        assert_eq!(enriched.report.geocode_failures, vec!["Buoy".to_string()]);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parse_clock_formats() {
        assert_eq!(parse_clock("09:30"), Some(570));
        assert_eq!(parse_clock("9:05"), Some(545));
        assert_eq!(parse_clock("14:00:00"), Some(840));
        assert_eq!(parse_clock("7:15 PM"), Some(19 * 60 + 15));
        assert_eq!(parse_clock("12:00 am"), Some(0));
        assert_eq!(parse_clock("8 am"), Some(480));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("morning"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let converted = into_itinerary_event(RawEvent::default(), Coordinates::ZERO);
        assert_eq!(converted.name, "Unnamed stop");
        assert_eq!(converted.category, "activity");
        assert_eq!(converted.estimated_cost, "$0");
    }
}
