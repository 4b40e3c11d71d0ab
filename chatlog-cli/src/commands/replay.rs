//! Replay a scripted set of utterances against a workspace to generate logs
//!
//! Command: replay

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chatlog_core::{parse_script, run_script, ReplayMetadata};
use clap::Parser;
use tracing::info;

use super::{connect, AuthArgs, ServiceArgs};
use crate::config::ChatlogConfig;

// === Arg Structs ===

#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Workspace to send messages to
    pub workspace_id: String,

    /// CSV script with a `question` column (`:init:` starts a new conversation)
    pub script: PathBuf,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Sent as `X-Watson-Metadata: customer_id=...` on every message
    #[arg(long)]
    pub customer_id: Option<String>,

    /// Stored in the context as `metadata.deployment`
    #[arg(long)]
    pub deployment_id: Option<String>,

    /// Stored in the context as `metadata.user_id`
    #[arg(long)]
    pub user_id: Option<String>,
}

// === Command Implementation ===

pub async fn run_replay(args: ReplayArgs, cfg: &ChatlogConfig) -> Result<()> {
    let file = File::open(&args.script)
        .with_context(|| format!("Failed to open script {}", args.script.display()))?;
    let conversations = parse_script(file)
        .with_context(|| format!("Failed to parse script {}", args.script.display()))?;

    let client = connect(&args.service, &args.auth, &cfg.service)?;
    let messenger = client.messenger(&args.workspace_id, args.customer_id.clone());
    let metadata = ReplayMetadata {
        deployment: args.deployment_id.clone(),
        user_id: args.user_id.clone(),
    };

    info!(
        conversations = conversations.len(),
        workspace = %args.workspace_id,
        "replaying script"
    );

    let sent = run_script(&messenger, &conversations, &metadata, |turn| {
        if turn.turn == 1 {
            println!(
                "Conversation ID: {}",
                turn.conversation_id.as_deref().unwrap_or("<none>")
            );
        }
        println!("Input : {}", turn.input);
        println!("Output: {}", turn.output);
    })
    .await
    .context("Replay aborted")?;

    info!(sent, "replay complete");
    Ok(())
}
