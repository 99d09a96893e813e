//! HTTP API handlers for Incident Relay.
//!
//! - **POST /report**: Accepts a multipart report form, classifies it,
//!   starts its status sequence and answers with the triage result.
//!
//! - **GET /ws**: WebSocket notification channel. Clients send
//!   `{"type": "REGISTER", "reportId": "..."}` and then receive
//!   `{"status": "..."}` pushes for that report.
//!
//! - **GET /health**: Liveness probe.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, instrument, warn};

use crate::classifier::{Classifier, KeywordClassifier};
use crate::dispatcher::Dispatcher;
use crate::error::ApiError;
use crate::model::{ClientMessage, Location, Report, ReportIdGenerator, ReportResponse};
use crate::registry::{Registry, StatusSender};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub registry: Registry,
    pub dispatcher: Dispatcher,
    pub report_ids: Arc<ReportIdGenerator>,
}

impl AppState {
    /// State with the keyword classifier and a fresh registry.
    pub fn new(tick_interval: Duration) -> Self {
        Self::with_classifier(Arc::new(KeywordClassifier::new()), tick_interval)
    }

    pub fn with_classifier(classifier: Arc<dyn Classifier>, tick_interval: Duration) -> Self {
        let registry = Registry::new();
        let dispatcher = Dispatcher::new(registry.clone(), tick_interval);

        Self {
            classifier,
            registry,
            dispatcher,
            report_ids: Arc::new(ReportIdGenerator::new()),
        }
    }

    /// Classify a submission, assign it an id and start its status sequence.
    pub fn file_report(&self, submission: ReportSubmission) -> Report {
        let has_media = submission.media_bytes.is_some();
        let classification = self
            .classifier
            .classify(&submission.description, has_media);

        let report = Report {
            id: self.report_ids.next_id(),
            description: submission.description,
            location: Location::from_raw(submission.lat.as_deref(), submission.long.as_deref()),
            has_media,
            created_at: Utc::now(),
            classification,
        };

        self.dispatcher.start_sequence(report.id.clone());
        report
    }
}

/// Raw fields of a report form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSubmission {
    pub description: String,
    pub lat: Option<String>,
    pub long: Option<String>,
    /// Size of the attachment, if a non-empty one was uploaded.
    pub media_bytes: Option<usize>,
}

impl ReportSubmission {
    /// Read the report form. Unknown fields are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "description" => submission.description = field.text().await?,
                "lat" => submission.lat = Some(field.text().await?),
                "long" => submission.long = Some(field.text().await?),
                "media" => {
                    // Attachment contents are not stored, only noted.
                    let data = field.bytes().await?;
                    if !data.is_empty() {
                        submission.media_bytes = Some(data.len());
                    }
                }
                other => debug!(field = other, "Ignoring unknown report field"),
            }
        }

        Ok(submission)
    }
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/report", post(post_report))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// POST /report - Submit an incident report.
///
/// # Request Body
///
/// `multipart/form-data` with the optional fields `description`, `lat`,
/// `long` and `media` (file).
///
/// # Response
///
/// ```json
/// {
///     "reportId": "1718000000000",
///     "timestamp": "2024-06-10T06:13:20.000Z",
///     "emergency_type": ["Fire"],
///     "severity": "Critical",
///     "location": "12.9,77.6",
///     "incident_summary": "Detected Fire emergency. Location triangulated. ..."
/// }
/// ```
#[instrument(skip(state, multipart))]
pub async fn post_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let submission = ReportSubmission::from_multipart(multipart)
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to read report form"))?;

    let media_bytes = submission.media_bytes.unwrap_or(0);
    let report = state.file_report(submission);

    info!(
        report_id = %report.id,
        severity = report.classification.severity.label(),
        types = ?report.classification.emergency_types,
        media_bytes,
        "Report classified"
    );

    Ok(Json(ReportResponse::from(&report)))
}

/// GET /ws - Notification channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry))
}

/// Pump status pushes out and registrations in until either side stops.
async fn handle_socket(socket: WebSocket, registry: Registry) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut outbound = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            let text = match serde_json::to_string(&update) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode status update");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    handle_client_message(&registry, &text, &tx);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }
    debug!("Notification channel closed");
}

/// Apply one inbound text frame. Returns whether it registered a report.
///
/// Malformed frames are dropped without a reply.
pub fn handle_client_message(registry: &Registry, text: &str, sender: &StatusSender) -> bool {
    match ClientMessage::parse(text) {
        Some(ClientMessage::Register { report_id }) => {
            info!(report_id = %report_id, "Client registered for status updates");
            registry.register(report_id, sender.clone());
            true
        }
        None => {
            debug!(len = text.len(), "Ignoring unrecognized client message");
            false
        }
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassificationResult, EmergencyType, Severity, StatusLabel, StatusUpdate};

    struct FixedClassifier;

    impl Classifier for FixedClassifier {
        fn classify(&self, _description: &str, _has_media: bool) -> ClassificationResult {
            ClassificationResult {
                emergency_types: vec![EmergencyType::Police],
                severity: Severity::High,
                summary: "fixed".to_string(),
            }
        }
    }

    #[test]
    fn test_register_message_installs_sender() {
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(handle_client_message(
            &registry,
            r#"{"type":"REGISTER","reportId":"r1"}"#,
            &tx
        ));

        let update = StatusUpdate {
            status: StatusLabel::Preparing,
        };
        registry.lookup("r1").unwrap().send(update).unwrap();
        assert_eq!(rx.try_recv().unwrap(), update);
    }

    #[test]
    fn test_one_connection_many_reports() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_client_message(&registry, r#"{"type":"REGISTER","reportId":"a"}"#, &tx);
        handle_client_message(&registry, r#"{"type":"REGISTER","reportId":"b"}"#, &tx);

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_malformed_messages_are_ignored() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        for text in ["", "{", r#"{"type":"HELLO"}"#, r#"{"reportId":"r1"}"#] {
            assert!(!handle_client_message(&registry, text, &tx));
        }
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_report_starts_sequence() {
        let state = AppState::new(Duration::from_secs(3));
        let report = state.file_report(ReportSubmission {
            description: "smoke from the kitchen".to_string(),
            lat: Some("12.9".to_string()),
            long: None,
            media_bytes: None,
        });

        assert_eq!(report.classification.emergency_types, vec![EmergencyType::Fire]);
        assert_eq!(report.location.to_string(), "12.9,0");
        assert!(!report.has_media);
        assert_eq!(state.dispatcher.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_report_uses_injected_classifier() {
        let state = AppState::with_classifier(Arc::new(FixedClassifier), Duration::from_secs(3));
        let first = state.file_report(ReportSubmission {
            media_bytes: Some(10),
            ..Default::default()
        });
        let second = state.file_report(ReportSubmission::default());

        assert_eq!(first.classification.summary, "fixed");
        assert!(first.has_media);
        assert_ne!(first.id, second.id);
        assert_eq!(state.dispatcher.in_flight(), 2);
    }
}
