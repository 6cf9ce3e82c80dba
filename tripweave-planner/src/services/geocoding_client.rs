//! Google Geocoding client
//!
//! Implements [`Geocoder`] for the enrichment stage. Lookups are rate
//! limited with a token bucket and every failure degrades to `None`.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use tripweave_common::Coordinates;

use super::upstream::{UpstreamError, UpstreamKind};
use crate::pipeline::Geocoder;

const GEOCODING_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const SERVICE: &str = "geocoding";

/// Default lookups per second
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Outcome of one geocoding response body
#[derive(Debug, PartialEq)]
enum Lookup {
    Found(Coordinates),
    NotFound,
    Failed(UpstreamError),
}

fn interpret(response: GeocodeResponse) -> Lookup {
    match response.status.as_str() {
        "OK" => match response.results.into_iter().next() {
            Some(result) => {
                let location = result.geometry.location;
                Lookup::Found(Coordinates::new(location.lat, location.lng))
            }
            None => Lookup::NotFound,
        },
        "ZERO_RESULTS" => Lookup::NotFound,
        status => {
            let detail = response.error_message.unwrap_or_default();
            let kind = match status {
                "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => UpstreamKind::Quota,
                "REQUEST_DENIED" => UpstreamKind::Configuration,
                _ => UpstreamKind::classify(&detail),
            };
            Lookup::Failed(UpstreamError::new(
                kind,
                SERVICE,
                format!("{} {}", status, detail).trim().to_string(),
            ))
        }
    }
}

pub struct GoogleGeocoder {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl GoogleGeocoder {
    /// Without an API key every lookup resolves to `None`
    pub fn new(
        api_key: Option<String>,
        requests_per_second: u32,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| UpstreamError::new(UpstreamKind::Network, SERVICE, e.to_string()))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: GEOCODING_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn lookup(&self, api_key: &str, address: &str) -> Lookup {
        self.rate_limiter.until_ready().await;

        let response = match self
            .http_client
            .get(&self.base_url)
            .query(&[("address", address), ("key", api_key)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Lookup::Failed(UpstreamError::new(
                    UpstreamKind::Network,
                    SERVICE,
                    e.to_string(),
                ))
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Lookup::Failed(UpstreamError::from_response(
                SERVICE,
                status.as_u16(),
                &body,
            ));
        }

        match response.json::<GeocodeResponse>().await {
            Ok(body) => interpret(body),
            Err(e) => Lookup::Failed(UpstreamError::new(
                UpstreamKind::Network,
                SERVICE,
                e.to_string(),
            )),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Option<Coordinates> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(address = %address, "Geocoding skipped: no API key configured");
            return None;
        };

        match self.lookup(api_key, address).await {
            Lookup::Found(coordinates) => {
                debug!(
                    address = %address,
                    lat = coordinates.lat,
                    lng = coordinates.lng,
                    "Geocoded address"
                );
                Some(coordinates)
            }
            Lookup::NotFound => {
                warn!(address = %address, "Geocoding found no match");
                None
            }
            Lookup::Failed(err) => {
                warn!(address = %address, error = %err, "Geocoding failed");
                None
            }
        }
    }
}
