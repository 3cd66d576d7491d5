use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Keys every extracted element must carry to be kept.
pub const REQUIRED_FIELDS: [&str; 5] = ["subject", "author", "datetime", "cause_number", "description"];

/// One mention of a cause of aging pulled out of an email thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingCause {
    pub subject: String,
    pub author: String,
    pub datetime: String,
    pub cause_number: String,
    pub description: String,
}

impl AgingCause {
    /// Builds a record from a JSON object, or `None` if any required key is absent.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        if !REQUIRED_FIELDS.iter().all(|field| object.contains_key(*field)) {
            return None;
        }

        Some(Self {
            subject: field_text(object, "subject"),
            author: field_text(object, "author"),
            datetime: field_text(object, "datetime"),
            cause_number: field_text(object, "cause_number"),
            description: field_text(object, "description"),
        })
    }
}

fn field_text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        // null renders as an empty cell, not the literal `None`
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Returns the slice from the first `[` to the last `]` inclusive, or the whole
/// text when no such pair exists.
pub fn extract_json_payload(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Parses a completion into validated records. Never fails: malformed JSON
/// yields an empty list and invalid elements are skipped.
pub fn parse_aging_causes(text: &str) -> Vec<AgingCause> {
    let payload = extract_json_payload(text);

    let parsed: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            error!("Error decoding JSON: {}", e);
            error!("Invalid JSON content: {}", payload);
            return Vec::new();
        }
    };

    let elements = match parsed {
        Value::Array(elements) => elements,
        other => {
            error!("Expected a JSON array of records, got: {}", other);
            return Vec::new();
        }
    };

    elements
        .into_iter()
        .filter_map(|element| {
            let record = element.as_object().and_then(AgingCause::from_object);
            if record.is_none() {
                warn!("Skipping invalid result: {}", element);
            }
            record
        })
        .collect()
}
