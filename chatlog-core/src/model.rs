use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Column headers written to tabular exports, in row order.
pub const COLUMNS: [&str; 10] = [
    "conversation_id",
    "request_timestamp",
    "response_timestamp",
    "User Input",
    "Output",
    "Intent",
    "Confidence",
    "Exit Reason",
    "Logging",
    "Context",
];

/// Opaque continuation token handed back by the log service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of log results.
#[derive(Debug, Clone, Default)]
pub struct LogPage {
    pub entries: Vec<RawLogEntry>,
    pub next_cursor: Option<Cursor>,
}

impl LogPage {
    pub fn new(entries: Vec<RawLogEntry>, next_cursor: Option<Cursor>) -> Self {
        Self {
            entries,
            next_cursor,
        }
    }

    /// A page with no continuation, i.e. the end of the collection.
    pub fn last(entries: Vec<RawLogEntry>) -> Self {
        Self::new(entries, None)
    }
}

/// A log record exactly as the service delivered it.
///
/// The raw JSON is kept untouched so the JSON export is lossless and the
/// context blob can be serialized verbatim; [`RawLogEntry::fields`] gives a
/// typed view of the parts the flattener reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLogEntry {
    raw: Value,
}

impl RawLogEntry {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn fields(&self) -> serde_json::Result<LogFields> {
        LogFields::deserialize(&self.raw)
    }
}

impl From<Value> for RawLogEntry {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

/// `null` and a missing key both mean "no items".
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Typed view over a [`RawLogEntry`]. Every field is optional here; the
/// flattener decides which absences are fatal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFields {
    pub request_timestamp: Option<String>,
    pub response_timestamp: Option<String>,
    pub response: Option<ResponseFields>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseFields {
    pub input: Option<InputFields>,
    pub output: Option<OutputFields>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub intents: Vec<RankedIntent>,
    pub context: Option<Value>,
}

impl ResponseFields {
    pub fn conversation_id(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.get("conversation_id"))
            .and_then(Value::as_str)
    }

    pub fn branch_exited_reason(&self) -> Option<String> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.get("system"))
            .and_then(|system| system.get("branch_exited_reason"))
            .filter(|reason| !reason.is_null())
            .map(|reason| match reason {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputFields {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputFields {
    pub text: Option<OutputText>,
    pub log_messaging: Option<Value>,
}

/// Output text is normally a list of strings, older payloads carry one string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputText {
    Many(Vec<String>),
    One(String),
}

impl OutputText {
    pub fn joined(&self) -> String {
        match self {
            OutputText::Many(parts) => parts.join(" "),
            OutputText::One(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedIntent {
    pub intent: String,
    pub confidence: f64,
}

/// The fixed ten-column row produced by flattening one log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub conversation_id: String,
    pub request_timestamp: DateTime<Utc>,
    pub response_timestamp: DateTime<Utc>,
    pub user_input: Option<String>,
    pub output_text: Option<String>,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub exit_reason: Option<String>,
    pub logging: Option<Value>,
    pub context: String,
}

impl ExportRow {
    /// Render every column as text; unset fields become empty strings.
    pub fn to_cells(&self) -> [String; 10] {
        [
            self.conversation_id.clone(),
            format_timestamp(&self.request_timestamp),
            format_timestamp(&self.response_timestamp),
            self.user_input.clone().unwrap_or_default(),
            self.output_text.clone().unwrap_or_default(),
            self.intent.clone().unwrap_or_default(),
            self.confidence.map(format_confidence).unwrap_or_default(),
            self.exit_reason.clone().unwrap_or_default(),
            self.logging_text().unwrap_or_default(),
            self.context.clone(),
        ]
    }

    /// Logging payloads are opaque; strings pass through, anything else is
    /// written as compact JSON.
    pub fn logging_text(&self) -> Option<String> {
        self.logging.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Integral scores keep a decimal point (`1.0`, not `1`).
pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:?}")
}
