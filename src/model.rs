//! Data models for Incident Relay.
//!
//! Reports live only in process memory. Nothing in this module is persisted,
//! and every type here is created once per submission and never mutated
//! afterwards.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Emergency category assigned by the classifier.
///
/// Serialized as the human-readable label, e.g. `"General Assistance"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    Fire,
    Ambulance,
    Police,
    /// Sentinel used when nothing more specific matched.
    #[serde(rename = "General Assistance")]
    GeneralAssistance,
}

impl EmergencyType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EmergencyType::Fire => "Fire",
            EmergencyType::Ambulance => "Ambulance",
            EmergencyType::Police => "Police",
            EmergencyType::GeneralAssistance => "General Assistance",
        }
    }
}

/// How urgently a report needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
        }
    }
}

/// Outcome of classifying a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// Matched categories in order of first match. Never empty, no duplicates.
    pub emergency_types: Vec<EmergencyType>,

    /// Exactly one severity level.
    pub severity: Severity,

    /// Narrative summary derived from the categories and media flag.
    pub summary: String,
}

/// Reported coordinates. Missing values are stored as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

impl Location {
    /// Build a location from raw form values, substituting `0` for anything
    /// absent, blank or unparseable.
    pub fn from_raw(lat: Option<&str>, long: Option<&str>) -> Self {
        Self {
            lat: parse_coordinate(lat),
            long: parse_coordinate(long),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.long)
    }
}

fn parse_coordinate(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// A submitted incident report together with its classification.
#[derive(Debug, Clone)]
pub struct Report {
    /// Opaque tracking identifier, unique within this process.
    pub id: String,

    /// Raw description text; may be empty.
    pub description: String,

    pub location: Location,

    /// True iff an attachment was supplied.
    pub has_media: bool,

    /// Server-side timestamp of classification (UTC).
    pub created_at: DateTime<Utc>,

    pub classification: ClassificationResult,
}

/// Response body for POST /report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    #[serde(rename = "reportId")]
    pub report_id: String,

    /// ISO-8601 timestamp with millisecond precision.
    pub timestamp: String,

    pub emergency_type: Vec<EmergencyType>,

    pub severity: Severity,

    /// `"{lat},{long}"`.
    pub location: String,

    pub incident_summary: String,
}

impl From<&Report> for ReportResponse {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id.clone(),
            timestamp: report
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            emergency_type: report.classification.emergency_types.clone(),
            severity: report.classification.severity,
            location: report.location.to_string(),
            incident_summary: report.classification.summary.clone(),
        }
    }
}

/// One step of the dispatch progress shown to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    #[serde(rename = "Request Received")]
    RequestReceived,
    Preparing,
    #[serde(rename = "Team Dispatched")]
    TeamDispatched,
    #[serde(rename = "On the Way")]
    OnTheWay,
    #[serde(rename = "Action in Progress")]
    ActionInProgress,
    Resolved,
}

impl StatusLabel {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StatusLabel::RequestReceived => "Request Received",
            StatusLabel::Preparing => "Preparing",
            StatusLabel::TeamDispatched => "Team Dispatched",
            StatusLabel::OnTheWay => "On the Way",
            StatusLabel::ActionInProgress => "Action in Progress",
            StatusLabel::Resolved => "Resolved",
        }
    }
}

/// Every report walks through exactly these labels, in this order.
pub const STATUS_SEQUENCE: [StatusLabel; 6] = [
    StatusLabel::RequestReceived,
    StatusLabel::Preparing,
    StatusLabel::TeamDispatched,
    StatusLabel::OnTheWay,
    StatusLabel::ActionInProgress,
    StatusLabel::Resolved,
];

/// Status push sent to a registered client: `{"status": "Preparing"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: StatusLabel,
}

/// Messages a client may send over the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask for status pushes for a report.
    #[serde(rename = "REGISTER")]
    Register {
        #[serde(rename = "reportId")]
        report_id: String,
    },
}

impl ClientMessage {
    /// Parse a text frame. Anything malformed, including a blank or
    /// whitespace-only `reportId`, yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str::<ClientMessage>(text).ok()? {
            ClientMessage::Register { report_id } if report_id.trim().is_empty() => None,
            message => Some(message),
        }
    }
}

/// Issues report identifiers.
///
/// Identifiers are the current Unix time in milliseconds, bumped forward
/// when two reports land in the same millisecond so that every id handed
/// out by one generator is distinct and strictly increasing.
#[derive(Debug, Default)]
pub struct ReportIdGenerator {
    last: AtomicU64,
}

impl ReportIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_id_at(now).to_string()
    }

    fn next_id_at(&self, now_millis: u64) -> u64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}
