//! Format-specific sinks for flattened rows and raw pages.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::model::{ExportRow, LogPage, RawLogEntry, COLUMNS};

/// Excel refuses string cells longer than this.
const XLSX_MAX_STRING: usize = 32_767;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
    #[default]
    Json,
}

impl ExportFormat {
    /// Tabular formats go through the flattener; JSON writes raw pages.
    pub fn is_tabular(self) -> bool {
        !matches!(self, ExportFormat::Json)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CSV" => Ok(ExportFormat::Csv),
            "TSV" => Ok(ExportFormat::Tsv),
            "XLSX" => Ok(ExportFormat::Xlsx),
            "JSON" => Ok(ExportFormat::Json),
            other => Err(ExportError::config(format!(
                "unknown file type '{other}' (expected CSV, TSV, XLSX or JSON)"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Tsv => "TSV",
            ExportFormat::Xlsx => "XLSX",
            ExportFormat::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// Write rows as delimited text with a header line.
pub fn write_delimited<W: Write>(writer: W, rows: &[ExportRow], delimiter: u8) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.write_record(row.to_cells())?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    write_delimited(BufWriter::new(File::create(path)?), rows, b',')
}

pub fn write_tsv(path: &Path, rows: &[ExportRow]) -> Result<()> {
    write_delimited(BufWriter::new(File::create(path)?), rows, b'\t')
}

/// Write rows to a single-sheet workbook. Timestamps become date-time cells
/// and confidence a number; everything else is text.
pub fn write_xlsx(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let header = Format::new().set_bold();
    let datetime = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss.000");

    for (col, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        worksheet.write_string(r, 0, row.conversation_id.as_str())?;
        worksheet.write_datetime_with_format(r, 1, &row.request_timestamp.naive_utc(), &datetime)?;
        worksheet.write_datetime_with_format(r, 2, &row.response_timestamp.naive_utc(), &datetime)?;

        let text_cells = [
            (3, row.user_input.clone()),
            (4, row.output_text.clone()),
            (5, row.intent.clone()),
            (7, row.exit_reason.clone()),
            (8, row.logging_text()),
            (9, Some(row.context.clone())),
        ];
        for (col, value) in text_cells {
            if let Some(value) = value {
                worksheet.write_string(r, col, fit_cell(value, r, col))?;
            }
        }
        if let Some(confidence) = row.confidence {
            worksheet.write_number(r, 6, confidence)?;
        }
    }

    workbook.save(path)?;
    debug!(rows = rows.len(), path = %path.display(), "wrote workbook");
    Ok(())
}

fn fit_cell(value: String, row: u32, col: u16) -> String {
    if value.chars().count() <= XLSX_MAX_STRING {
        return value;
    }
    warn!(row, col, "cell exceeds the spreadsheet limit and was truncated");
    value.chars().take(XLSX_MAX_STRING).collect()
}

/// Serialize the untouched page list as a JSON array of entry arrays.
pub fn write_json<W: Write>(mut writer: W, pages: &[LogPage]) -> Result<()> {
    let raw: Vec<&[RawLogEntry]> = pages.iter().map(|page| page.entries.as_slice()).collect();
    serde_json::to_writer(&mut writer, &raw)
        .map_err(|err| ExportError::json("raw log pages", err))?;
    writer.flush()?;
    Ok(())
}

pub fn write_raw(path: &Path, pages: &[LogPage]) -> Result<()> {
    write_json(BufWriter::new(File::create(path)?), pages)
}

/// Dispatch rows to the tabular writer for `format`.
pub fn write_rows(format: ExportFormat, path: &Path, rows: &[ExportRow]) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(path, rows),
        ExportFormat::Tsv => write_tsv(path, rows),
        ExportFormat::Xlsx => write_xlsx(path, rows),
        ExportFormat::Json => Err(ExportError::config(
            "JSON exports write raw pages, not flattened rows",
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::*;

    fn row(conv: &str) -> ExportRow {
        let ts: DateTime<Utc> = "2020-04-01T10:00:00Z".parse().unwrap();
        ExportRow {
            conversation_id: conv.into(),
            request_timestamp: ts,
            response_timestamp: ts,
            user_input: Some("hi, there".into()),
            output_text: Some("Hello".into()),
            intent: Some("greeting".into()),
            confidence: Some(0.5),
            exit_reason: None,
            logging: None,
            context: r#"{"conversation_id":"c1"}"#.into(),
        }
    }

    #[test]
    fn format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("Xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("parquet".parse::<ExportFormat>().is_err());
        assert!(!ExportFormat::Json.is_tabular());
        assert_eq!(ExportFormat::Tsv.to_string(), "TSV");
    }

    #[test]
    fn csv_quotes_fields_with_delimiters() {
        let mut out = Vec::new();
        write_delimited(&mut out, &[row("c1")], b',').unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "conversation_id,request_timestamp,response_timestamp,User Input,Output,Intent,Confidence,Exit Reason,Logging,Context"
        );
        assert_eq!(
            lines.next().unwrap(),
            r#"c1,2020-04-01T10:00:00.000Z,2020-04-01T10:00:00.000Z,"hi, there",Hello,greeting,0.5,,,"{""conversation_id"":""c1""}""#
        );
    }

    #[test]
    fn tsv_uses_tabs() {
        let mut out = Vec::new();
        write_delimited(&mut out, &[row("c1")], b'\t').unwrap();
        let text = String::from_utf8(out).unwrap();
        let second = text.lines().nth(1).unwrap();
        assert_eq!(second.split('\t').count(), 10);
        assert!(second.contains("\thi, there\t"));
    }

    #[test]
    fn json_keeps_page_structure() {
        let pages = vec![
            LogPage::new(vec![RawLogEntry::new(json!({"a": 1}))], None),
            LogPage::default(),
        ];
        let mut out = Vec::new();
        write_json(&mut out, &pages).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"[[{"a":1}],[]]"#);
    }

    #[test]
    fn json_writes_entries_byte_for_byte() {
        let text = r#"{"response_timestamp":"2020-04-01T10:00:01.000Z","request_timestamp":"2020-04-01T10:00:00.000Z","response":{"context":{"system":{"dialog_turn_counter":1},"conversation_id":"c1"},"input":{"text":"hi"}}}"#;
        let entry: RawLogEntry = serde_json::from_str(text).unwrap();
        let pages = vec![LogPage::last(vec![entry])];

        let mut out = Vec::new();
        write_json(&mut out, &pages).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("[[{text}]]"));
    }

    #[test]
    fn integral_confidence_keeps_decimal_point() {
        let mut one = row("c1");
        one.confidence = Some(1.0);

        let mut out = Vec::new();
        write_delimited(&mut out, &[one], b',').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().contains(",greeting,1.0,"));
    }

    #[test]
    fn json_rejected_for_rows() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_rows(ExportFormat::Json, &dir.path().join("x.json"), &[]).unwrap_err();
        assert!(matches!(err, ExportError::Config { .. }));
    }
}
