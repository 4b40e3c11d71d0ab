//! Capabilities the core consumes from the outside world.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::{Cursor, LogPage};

/// Anything that can hand out pages of conversation logs.
///
/// Implementations own transport, authentication and the details of how a
/// continuation token is carried on the wire. Failures are returned as-is;
/// the paginator never retries them.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_page(
        &self,
        filter: &str,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<LogPage>;
}

/// Sends one user utterance to the assistant and returns the raw response.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, text: &str, context: Option<&Value>) -> Result<Value>;
}
