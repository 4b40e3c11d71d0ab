//! Turns raw log pages into ordered, fixed-schema export rows.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{ExportError, Result};
use crate::model::{ExportRow, LogPage, RawLogEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Remove newline, carriage-return and `\l` sequences from output text
    pub strip_newlines: bool,
}

/// Result of flattening a page collection.
///
/// `NoRecords` is distinct from an empty row set so callers can tell the user
/// nothing matched instead of writing a header-only file.
#[derive(Debug, Clone, PartialEq)]
pub enum Flattened {
    NoRecords,
    Rows(Vec<ExportRow>),
}

impl Flattened {
    pub fn into_rows(self) -> Vec<ExportRow> {
        match self {
            Flattened::NoRecords => Vec::new(),
            Flattened::Rows(rows) => rows,
        }
    }
}

/// Flatten every entry of every page, then sort by conversation and request
/// time. Any entry missing a mandatory field fails the whole pass.
#[instrument(skip_all, fields(page_count = pages.len()))]
pub fn flatten(pages: &[LogPage], options: &FlattenOptions) -> Result<Flattened> {
    let entries = pages.iter().flat_map(|page| page.entries.iter());
    let mut rows = Vec::with_capacity(pages.iter().map(|p| p.entries.len()).sum());

    for (index, entry) in entries.enumerate() {
        rows.push(flatten_entry(index, entry, options)?);
    }

    if rows.is_empty() {
        debug!("no log entries to flatten");
        return Ok(Flattened::NoRecords);
    }

    // sort_by is stable: equal keys keep fetch order
    rows.sort_by(|a, b| {
        a.conversation_id
            .cmp(&b.conversation_id)
            .then_with(|| a.request_timestamp.cmp(&b.request_timestamp))
    });

    debug!(rows = rows.len(), "flattened log entries");
    Ok(Flattened::Rows(rows))
}

/// Flatten one entry. `index` is the entry's position across all pages and
/// only feeds error messages.
pub fn flatten_entry(
    index: usize,
    entry: &RawLogEntry,
    options: &FlattenOptions,
) -> Result<ExportRow> {
    let fields = entry.fields().map_err(|err| {
        ExportError::malformed_entry(index, format!("unexpected shape: {err}"))
    })?;

    let request_timestamp = parse_timestamp(
        index,
        "request_timestamp",
        fields.request_timestamp.as_deref(),
    )?;
    let response_timestamp = parse_timestamp(
        index,
        "response_timestamp",
        fields.response_timestamp.as_deref(),
    )?;

    let response = fields
        .response
        .ok_or_else(|| ExportError::malformed_entry(index, "missing response"))?;
    let conversation_id = response
        .conversation_id()
        .ok_or_else(|| ExportError::malformed_entry(index, "missing conversation_id"))?
        .to_owned();

    let user_input = response.input.as_ref().and_then(|input| input.text.clone());

    let output_text = response
        .output
        .as_ref()
        .and_then(|output| output.text.as_ref())
        .map(|text| {
            let joined = text.joined();
            if options.strip_newlines {
                strip_line_breaks(&joined)
            } else {
                joined
            }
        });

    let (intent, confidence) = match response.intents.first() {
        Some(top) => (Some(top.intent.clone()), Some(top.confidence)),
        None => (None, None),
    };

    let exit_reason = response.branch_exited_reason();

    let logging = response
        .output
        .as_ref()
        .and_then(|output| output.log_messaging.clone());

    // conversation_id was read from the context, so it is present here
    let context = response
        .context
        .as_ref()
        .map(|ctx| ctx.to_string())
        .unwrap_or_default();

    Ok(ExportRow {
        conversation_id,
        request_timestamp,
        response_timestamp,
        user_input,
        output_text,
        intent,
        confidence,
        exit_reason,
        logging,
        context,
    })
}

fn parse_timestamp(index: usize, field: &str, value: Option<&str>) -> Result<DateTime<Utc>> {
    let value =
        value.ok_or_else(|| ExportError::malformed_entry(index, format!("missing {field}")))?;
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            ExportError::malformed_entry(index, format!("invalid {field} '{value}': {err}"))
        })
}

/// Drop line breaks, including the literal two-character `\l` sequence some
/// dialog nodes emit.
pub fn strip_line_breaks(text: &str) -> String {
    static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\l|\r|\n").unwrap());

    LINE_BREAKS.replace_all(text, "").into_owned()
}
