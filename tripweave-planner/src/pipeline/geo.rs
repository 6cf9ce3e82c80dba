//! Distance and travel-time estimates between stops
//!
//! No live routing: a great-circle distance and a three-segment
//! piecewise-linear travel time (walk, mixed transit, longer transit).

use tripweave_common::Coordinates;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers, rounded to 2 decimals
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Estimated minutes to cover `distance_km`
///
/// - up to 1 km: walking at 12 min/km
/// - up to 5 km: 5 min/km plus 10 min overhead
/// - beyond: 3 min/km plus 20 min overhead
///
/// Non-decreasing in distance: the segments meet at 12→15 and 35→35.
pub fn travel_time_minutes(distance_km: f64) -> u32 {
    let d = distance_km.max(0.0);
    let minutes = if d <= 1.0 {
        d * 12.0
    } else if d <= 5.0 {
        d * 5.0 + 10.0
    } else {
        d * 3.0 + 20.0
    };
    minutes.ceil() as u32
}
