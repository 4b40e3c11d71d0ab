//! REST client for the assistant service.
//!
//! Implements [`LogSource`] over `GET /v1/logs` and [`Messenger`] over
//! `POST /v1/workspaces/{id}/message`. Continuation cursors are read from the
//! `pagination` block of each log page.

use std::time::Duration;

use async_trait::async_trait;
use chatlog_core::model::{Cursor, LogPage, RawLogEntry};
use chatlog_core::source::{LogSource, Messenger};
use chatlog_core::{ExportError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Longest error body echoed back to the user.
const MAX_ERROR_BODY: usize = 500;

/// Credentials for the service. Both modes use HTTP basic auth; API keys are
/// sent with the fixed `apikey` user name.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    ApiKey(String),
    UserPass { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::ApiKey(_) => f.write_str("Auth::ApiKey(***)"),
            Auth::UserPass { username, .. } => write!(f, "Auth::UserPass({username}:***)"),
        }
    }
}

impl Auth {
    /// Exactly one of the two modes must be supplied.
    pub fn resolve(apikey: Option<String>, userpass: Option<String>) -> Result<Self> {
        match (apikey, userpass) {
            (Some(key), None) => {
                if key.trim().is_empty() {
                    return Err(ExportError::config("--apikey must not be empty"));
                }
                Ok(Auth::ApiKey(key))
            }
            (None, Some(userpass)) => {
                let (username, password) = userpass.split_once(':').ok_or_else(|| {
                    ExportError::config("--userpass must be in the form username:password")
                })?;
                Ok(Auth::UserPass {
                    username: username.to_owned(),
                    password: password.to_owned(),
                })
            }
            (Some(_), Some(_)) => Err(ExportError::config(
                "--userpass and --apikey cannot be used together",
            )),
            (None, None) => Err(ExportError::config(
                "You must set --userpass or --apikey to run",
            )),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::ApiKey(key) => request.basic_auth("apikey", Some(key)),
            Auth::UserPass { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub version: String,
    pub timeout: Duration,
}

pub struct AssistantClient {
    http: Client,
    base_url: String,
    version: String,
    auth: Auth,
}

impl AssistantClient {
    pub fn new(options: &ClientOptions, auth: Auth) -> Result<Self> {
        Url::parse(&options.base_url).map_err(|err| {
            ExportError::config(format!("invalid service url '{}': {err}", options.base_url))
        })?;

        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|err| ExportError::transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_owned(),
            version: options.version.clone(),
            auth,
        })
    }

    /// Message endpoint bound to one workspace, for replaying conversations.
    pub fn messenger(&self, workspace_id: &str, customer_id: Option<String>) -> WorkspaceMessenger<'_> {
        WorkspaceMessenger {
            client: self,
            workspace_id: workspace_id.to_owned(),
            customer_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogCollection {
    logs: Vec<RawLogEntry>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    next_url: Option<String>,
    next_cursor: Option<String>,
}

impl Pagination {
    /// `next_cursor` when the service provides it, otherwise the `cursor`
    /// query parameter of `next_url`.
    fn cursor(&self) -> Result<Option<Cursor>> {
        if let Some(cursor) = self.next_cursor.as_deref().filter(|c| !c.is_empty()) {
            return Ok(Some(Cursor::new(cursor)));
        }
        match self.next_url.as_deref() {
            Some(next_url) => cursor_from_next_url(next_url).map(Some),
            None => Ok(None),
        }
    }
}

fn cursor_from_next_url(next_url: &str) -> Result<Cursor> {
    // next_url is usually relative ("/v1/logs?cursor=..."), so resolve it
    // against a throwaway base before reading the query
    let base = Url::parse("http://localhost/")
        .map_err(|err| ExportError::protocol(format!("url base: {err}")))?;
    let url = base
        .join(next_url)
        .map_err(|err| ExportError::protocol(format!("invalid next_url '{next_url}': {err}")))?;

    url.query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| Cursor::new(value.into_owned()))
        .filter(|cursor| !cursor.as_str().is_empty())
        .ok_or_else(|| ExportError::protocol(format!("next_url '{next_url}' carries no cursor")))
}

async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(|err| {
        if err.is_timeout() {
            ExportError::transport(format!("request timed out: {err}"))
        } else {
            ExportError::transport(format!("failed to reach the assistant service: {err}"))
        }
    })
}

async fn handle_response<T: for<'de> Deserialize<'de>>(response: Response, what: &str) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|err| ExportError::transport(format!("failed to read {what}: {err}")))?;
        return serde_json::from_str(&body)
            .map_err(|err| ExportError::protocol(format!("malformed {what}: {err}")));
    }

    let error_text = response.text().await.unwrap_or_default();
    // keep error bodies short, they can echo request details
    let truncated = if error_text.chars().count() > MAX_ERROR_BODY {
        format!("{}...", error_text.chars().take(MAX_ERROR_BODY).collect::<String>())
    } else {
        error_text
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ExportError::auth(status.as_u16(), truncated))
        }
        _ => Err(ExportError::transport(format!("{what} request failed ({status}): {truncated}"))),
    }
}

#[async_trait]
impl LogSource for AssistantClient {
    async fn fetch_page(
        &self,
        filter: &str,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<LogPage> {
        let url = format!("{}/v1/logs", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("version", self.version.clone()),
            ("filter", filter.to_owned()),
            ("page_limit", page_size.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.as_str().to_owned()));
        }
        debug!(%url, has_cursor = cursor.is_some(), page_size, "requesting log page");

        let request = self.auth.apply(self.http.get(&url).query(&query));
        let collection: LogCollection = handle_response(send(request).await?, "log page").await?;

        let next_cursor = collection.pagination.cursor()?;
        Ok(LogPage::new(collection.logs, next_cursor))
    }
}

pub struct WorkspaceMessenger<'a> {
    client: &'a AssistantClient,
    workspace_id: String,
    customer_id: Option<String>,
}

#[async_trait]
impl Messenger for WorkspaceMessenger<'_> {
    async fn send_message(&self, text: &str, context: Option<&Value>) -> Result<Value> {
        let url = format!(
            "{}/v1/workspaces/{}/message",
            self.client.base_url, self.workspace_id
        );
        let mut body = json!({ "input": { "text": text } });
        if let Some(context) = context {
            body["context"] = context.clone();
        }
        debug!(%url, "sending message");

        let mut request = self
            .client
            .http
            .post(&url)
            .query(&[("version", self.client.version.as_str())])
            .json(&body);
        if let Some(customer_id) = &self.customer_id {
            request = request.header("X-Watson-Metadata", format!("customer_id={customer_id}"));
        }
        let request = self.client.auth.apply(request);

        handle_response(send(request).await?, "message").await
    }
}
