//! HTTP API handlers for tripweave-planner

pub mod health;
pub mod itinerary;

pub use health::health_routes;
pub use itinerary::itinerary_routes;
