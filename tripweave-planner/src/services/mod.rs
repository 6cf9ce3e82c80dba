//! Clients for the generative-text and geocoding collaborators

pub mod gemini_client;
pub mod geocoding_client;
pub mod upstream;

pub use gemini_client::{GeminiClient, TextGenerator};
pub use geocoding_client::GoogleGeocoder;
pub use upstream::{UpstreamError, UpstreamKind};
