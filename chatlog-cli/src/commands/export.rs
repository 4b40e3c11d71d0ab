//! Export conversation logs to CSV, TSV, XLSX or raw JSON
//!
//! Command: export

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatlog_core::{
    cmd_export, ExportFormat, ExportRequest, FilterSource, FlattenOptions, LogScope, PageOptions,
    SaveOutcome,
};
use clap::Parser;
use tracing::info;

use super::{connect, AuthArgs, ServiceArgs};
use crate::config::ChatlogConfig;
use crate::ui;

// === Arg Structs ===

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Workspace, assistant or deployment ID to export
    pub id: String,

    /// Output file to write (overwritten if it exists)
    pub filename: PathBuf,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Field the ID filters on: WORKSPACE, ASSISTANT or DEPLOYMENT
    #[arg(long)]
    pub logtype: Option<String>,

    /// Language code to filter on [default: en]
    #[arg(long)]
    pub language: Option<String>,

    /// Output format: CSV, TSV, XLSX or JSON [default: JSON]
    #[arg(long)]
    pub filetype: Option<String>,

    /// Maximum number of pages to fetch [default: 999]
    #[arg(long)]
    pub totalpages: Option<u32>,

    /// Records requested per page [default: 200]
    #[arg(long)]
    pub pagelimit: Option<u32>,

    /// Raw filter expression; replaces the one built from ID, logtype and language
    #[arg(long)]
    pub filter: Option<String>,

    /// Remove line breaks from assistant output
    #[arg(long)]
    pub strip: bool,
}

impl ExportArgs {
    /// Merge flags over config defaults into a validated request.
    ///
    /// Everything here is local; a bad option fails before any network call.
    pub fn to_request(&self, cfg: &ChatlogConfig) -> Result<ExportRequest> {
        let defaults = &cfg.export;

        let scope = match &self.logtype {
            Some(raw) => raw.parse::<LogScope>()?,
            None => defaults.logtype,
        };
        let format = match &self.filetype {
            Some(raw) => raw.parse::<ExportFormat>()?,
            None => defaults.filetype,
        };
        let language = self.language.as_deref().unwrap_or(&defaults.language);

        let pages = PageOptions {
            page_size: self.pagelimit.unwrap_or(defaults.page_limit),
            max_pages: self.totalpages.unwrap_or(defaults.total_pages),
        };
        pages.validate()?;

        let filter = FilterSource::resolve(self.filter.clone(), language, scope, &self.id);
        // Surface an empty id or language now rather than after connecting
        filter.expression()?;

        Ok(ExportRequest {
            filter,
            pages,
            flatten: FlattenOptions {
                strip_newlines: self.strip || defaults.strip,
            },
            format,
        })
    }
}

// === Command Implementation ===

pub async fn run_export(args: ExportArgs, cfg: &ChatlogConfig) -> Result<()> {
    let request = args.to_request(cfg)?;
    let client = connect(&args.service, &args.auth, &cfg.service)?;

    info!("Reading logs for {}...", args.id);

    let pb = ui::spinner("Reading page 1...");
    let mut fetched = 0usize;
    let result = cmd_export(&client, &request, &args.filename, |page_number, page| {
        fetched += page.entries.len();
        ui::set_message(&pb, format!("Read page {page_number} ({fetched} records)"));
    })
    .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            ui::finish_error(pb, "Export failed");
            return Err(err).with_context(|| format!("Failed to export logs for {}", args.id));
        }
    };

    match outcome {
        SaveOutcome::Written { records } => {
            ui::finish_success(pb, format!("Fetched {records} records"));
            println!(
                "Writing {} records to: {} as file type: {}",
                records,
                args.filename.display(),
                request.format
            );
        }
        SaveOutcome::NoRecords => {
            ui::finish_success(pb, "Fetch complete");
            println!("No logs found.");
        }
    }

    Ok(())
}
