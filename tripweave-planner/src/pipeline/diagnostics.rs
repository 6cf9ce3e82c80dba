//! Structured diagnostics collected during a pipeline run
//!
//! Stages report what they repaired or degraded through their return
//! values; the pipeline turns those reports into [`Diagnostic`] records that
//! travel with the result instead of being logged as they happen.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Recovery,
    Coverage,
    Enrichment,
    Normalization,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Recovery => "recovery",
            Stage::Coverage => "coverage",
            Stage::Enrichment => "enrichment",
            Stage::Normalization => "normalization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(DiagnosticLevel::Info, stage, message);
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(DiagnosticLevel::Warning, stage, message);
    }

    fn push(&mut self, level: DiagnosticLevel, stage: Stage, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            level,
            stage,
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.iter().filter(|d| d.level == DiagnosticLevel::Warning)
    }

    /// Write every record to the tracing subscriber
    pub fn emit(&self, request_id: &str) {
        for d in self.iter() {
            match d.level {
                DiagnosticLevel::Info => tracing::info!(
                    request_id = %request_id,
                    stage = d.stage.as_str(),
                    "{}",
                    d.message
                ),
                DiagnosticLevel::Warning => tracing::warn!(
                    request_id = %request_id,
                    stage = d.stage.as_str(),
                    "{}",
                    d.message
                ),
            }
        }
    }
}
