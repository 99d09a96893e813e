//! Report triage.
//!
//! [`Classifier`] is the seam where real text or image inference would plug
//! in. The only implementation shipped here, [`KeywordClassifier`], is a
//! deterministic substring heuristic. It never fails: degenerate input
//! resolves to `General Assistance` at `Medium` severity.

use crate::model::{ClassificationResult, EmergencyType, Severity};

/// Maps a report's content to categories, severity and a summary.
pub trait Classifier: Send + Sync {
    fn classify(&self, description: &str, has_media: bool) -> ClassificationResult;
}

/// Substring keywords and the category each one implies.
///
/// Matching walks this table in order, so categories come out in table
/// order of their first matching keyword.
const CATEGORY_KEYWORDS: &[(&str, EmergencyType)] = &[
    ("fire", EmergencyType::Fire),
    ("smoke", EmergencyType::Fire),
    ("burn", EmergencyType::Fire),
    ("injur", EmergencyType::Ambulance),
    ("blood", EmergencyType::Ambulance),
    ("pain", EmergencyType::Ambulance),
    ("thief", EmergencyType::Police),
    ("gun", EmergencyType::Police),
    ("fight", EmergencyType::Police),
];

const CRITICAL_KEYWORDS: &[&str] = &["critical", "dying", "severe"];

const HIGH_KEYWORDS: &[&str] = &["hurt", "attack"];

/// Categories assumed when only an attachment is supplied.
///
/// Placeholder for visual analysis; low precision.
const MEDIA_ONLY_TYPES: [EmergencyType; 2] = [EmergencyType::Fire, EmergencyType::Ambulance];

const VISUAL_CONFIRMATION: &str = "Visual analysis confirms incident data. ";

/// Keyword heuristic classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, description: &str, has_media: bool) -> ClassificationResult {
        let text = description.to_lowercase();

        let mut emergency_types: Vec<EmergencyType> = Vec::new();
        for (keyword, category) in CATEGORY_KEYWORDS {
            if text.contains(keyword) && !emergency_types.contains(category) {
                emergency_types.push(*category);
            }
        }

        if emergency_types.is_empty() && has_media {
            emergency_types.extend(MEDIA_ONLY_TYPES);
        }

        if emergency_types.is_empty() {
            emergency_types.push(EmergencyType::GeneralAssistance);
        }

        let severity = assess_severity(&text, has_media);
        let summary = summarize(&emergency_types, has_media);

        ClassificationResult {
            emergency_types,
            severity,
            summary,
        }
    }
}

/// Critical keywords always win over the High rules.
fn assess_severity(text: &str, has_media: bool) -> Severity {
    if CRITICAL_KEYWORDS.iter().any(|k| text.contains(k)) {
        Severity::Critical
    } else if HIGH_KEYWORDS.iter().any(|k| text.contains(k)) || has_media {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn summarize(emergency_types: &[EmergencyType], has_media: bool) -> String {
    let categories = emergency_types
        .iter()
        .map(EmergencyType::label)
        .collect::<Vec<_>>()
        .join(" + ");

    format!(
        "{}Detected {} emergency. Location triangulated. Dispatching nearest units immediately.",
        if has_media { VISUAL_CONFIRMATION } else { "" },
        categories
    )
}
