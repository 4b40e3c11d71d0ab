//! Scripted conversations used to generate logs against a live assistant.
//!
//! A script is a CSV file with a `question` column. Each row is one user
//! utterance; `:init:` starts a new conversation and rows starting with `;`
//! are comments.

use std::io::Read;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::model::OutputText;
use crate::source::Messenger;

const QUESTION_COLUMN: &str = "question";
const NEW_CONVERSATION: &str = ":init:";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptedConversation {
    pub utterances: Vec<String>,
}

/// Parse a replay script into conversations, dropping comments and blanks.
pub fn parse_script<R: Read>(reader: R) -> Result<Vec<ScriptedConversation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .escape(Some(b'\\'))
        .flexible(true)
        .from_reader(reader);

    let column = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == QUESTION_COLUMN)
        .ok_or_else(|| ExportError::config("replay script has no 'question' column"))?;

    let mut conversations = Vec::new();
    let mut current = ScriptedConversation::default();

    for record in rdr.records() {
        let record = record?;
        let question = record.get(column).unwrap_or("").trim();

        if question.is_empty() || question.starts_with(';') {
            continue;
        }
        if question == NEW_CONVERSATION {
            if !current.utterances.is_empty() {
                conversations.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.utterances.push(question.to_owned());
    }

    if !current.utterances.is_empty() {
        conversations.push(current);
    }

    Ok(conversations)
}

/// Metadata seeded into the first turn of every conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayMetadata {
    pub deployment: Option<String>,
    pub user_id: Option<String>,
}

impl ReplayMetadata {
    pub fn initial_context(&self) -> Option<Value> {
        let mut metadata = Map::new();
        if let Some(deployment) = &self.deployment {
            metadata.insert("deployment".into(), json!(deployment));
        }
        if let Some(user_id) = &self.user_id {
            metadata.insert("user_id".into(), json!(user_id));
        }
        if metadata.is_empty() {
            None
        } else {
            Some(json!({ "metadata": metadata }))
        }
    }
}

/// One completed exchange, reported to the caller as it happens.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTurn {
    pub conversation_id: Option<String>,
    /// 1-based position within its conversation
    pub turn: usize,
    pub input: String,
    pub output: String,
}

/// Send each conversation's utterances in order, threading the context the
/// assistant returns into the next turn. Returns the number of turns sent.
pub async fn run_script<M, F>(
    messenger: &M,
    conversations: &[ScriptedConversation],
    metadata: &ReplayMetadata,
    mut on_turn: F,
) -> Result<usize>
where
    M: Messenger + ?Sized,
    F: FnMut(&ReplayTurn),
{
    let mut sent = 0;

    for (conv_idx, conversation) in conversations.iter().enumerate() {
        let mut context = metadata.initial_context();
        debug!(conversation = conv_idx, turns = conversation.utterances.len(), "replaying");

        for (idx, utterance) in conversation.utterances.iter().enumerate() {
            let response = messenger.send_message(utterance, context.as_ref()).await?;

            let output = response
                .get("output")
                .and_then(|output| output.get("text"))
                .and_then(|text| serde_json::from_value::<OutputText>(text.clone()).ok())
                .map(|text| text.joined())
                .unwrap_or_default();
            context = response.get("context").cloned();

            let turn = ReplayTurn {
                conversation_id: context
                    .as_ref()
                    .and_then(|ctx| ctx.get("conversation_id"))
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                turn: idx + 1,
                input: utterance.clone(),
                output,
            };
            on_turn(&turn);
            sent += 1;
        }
    }

    info!(turns = sent, conversations = conversations.len(), "replay finished");
    Ok(sent)
}
