//! Upstream collaborator failures

use thiserror::Error;

/// Which kind of failure an upstream error is, and so which status it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Collaborator unreachable, timed out or misbehaving (503)
    Network,
    /// Quota exhausted or rate limited (429)
    Quota,
    /// Missing or rejected credentials (500)
    Configuration,
}

const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "rate-limit",
    "too many requests",
    "resource_exhausted",
    "resource exhausted",
];

const CONFIGURATION_MARKERS: &[&str] = &[
    "api key",
    "api_key",
    "apikey",
    "permission_denied",
    "permission denied",
    "unauthenticated",
    "unauthorized",
    "forbidden",
    "not configured",
];

impl UpstreamKind {
    /// Bucket a free-form failure message by its content
    ///
    /// Quota markers win over configuration markers; anything unrecognised
    /// is treated as a network failure.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
            UpstreamKind::Quota
        } else if CONFIGURATION_MARKERS.iter().any(|m| lower.contains(m)) {
            UpstreamKind::Configuration
        } else {
            UpstreamKind::Network
        }
    }

    /// Bucket an HTTP status from the collaborator, if it is a telling one
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(UpstreamKind::Quota),
            401 | 403 => Some(UpstreamKind::Configuration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamKind::Network => "network",
            UpstreamKind::Quota => "quota",
            UpstreamKind::Configuration => "configuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error from {}: {}", .kind.as_str(), .service, .message)]
pub struct UpstreamError {
    pub kind: UpstreamKind,
    pub service: &'static str,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamKind, service: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            service,
            message: message.into(),
        }
    }

    /// Build an error whose kind is read from the message
    pub fn classified(service: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: UpstreamKind::classify(&message),
            service,
            message,
        }
    }

    /// Build an error from a non-success HTTP response
    pub fn from_response(service: &'static str, status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        let kind = UpstreamKind::from_status(status)
            .unwrap_or_else(|| UpstreamKind::classify(body));
        Self {
            kind,
            service,
            message,
        }
    }
}
