//! Builds the search filter the log service expects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

pub const DEFAULT_LANGUAGE: &str = "en";

/// Which remote field an identifier filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogScope {
    #[default]
    Workspace,
    Assistant,
    Deployment,
}

impl LogScope {
    pub fn field_path(self) -> &'static str {
        match self {
            LogScope::Workspace => "workspace_id",
            LogScope::Assistant => "request.context.system.assistant_id",
            LogScope::Deployment => "request.context.metadata.deployment",
        }
    }
}

impl FromStr for LogScope {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WORKSPACE" => Ok(LogScope::Workspace),
            "ASSISTANT" => Ok(LogScope::Assistant),
            "DEPLOYMENT" => Ok(LogScope::Deployment),
            other => Err(ExportError::config(format!(
                "unknown log type '{other}' (expected WORKSPACE, ASSISTANT or DEPLOYMENT)"
            ))),
        }
    }
}

impl fmt::Display for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogScope::Workspace => "WORKSPACE",
            LogScope::Assistant => "ASSISTANT",
            LogScope::Deployment => "DEPLOYMENT",
        };
        f.write_str(name)
    }
}

/// Where the filter expression comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    /// Used verbatim; scope, identifier and language are ignored
    Explicit(String),
    Scoped {
        language: String,
        scope: LogScope,
        id: String,
    },
}

impl FilterSource {
    /// An explicit filter always wins over the scoped parts.
    pub fn resolve(explicit: Option<String>, language: &str, scope: LogScope, id: &str) -> Self {
        match explicit {
            Some(filter) => FilterSource::Explicit(filter),
            None => FilterSource::Scoped {
                language: language.to_owned(),
                scope,
                id: id.to_owned(),
            },
        }
    }

    pub fn expression(&self) -> Result<String> {
        match self {
            FilterSource::Explicit(filter) => {
                if filter.trim().is_empty() {
                    return Err(ExportError::config("filter must not be empty"));
                }
                Ok(filter.clone())
            }
            FilterSource::Scoped {
                language,
                scope,
                id,
            } => build_filter(language, *scope, id),
        }
    }
}

/// `language::{language},{field}::{id}`
pub fn build_filter(language: &str, scope: LogScope, id: &str) -> Result<String> {
    if id.trim().is_empty() {
        return Err(ExportError::config(format!("{scope} id must not be empty")));
    }
    if language.trim().is_empty() {
        return Err(ExportError::config("language must not be empty"));
    }
    Ok(format!(
        "language::{},{}::{}",
        language,
        scope.field_path(),
        id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_scoped_filters() {
        assert_eq!(
            build_filter("en", LogScope::Workspace, "ws-1").unwrap(),
            "language::en,workspace_id::ws-1"
        );
        assert_eq!(
            build_filter("de", LogScope::Assistant, "a-9").unwrap(),
            "language::de,request.context.system.assistant_id::a-9"
        );
        assert_eq!(
            build_filter("en", LogScope::Deployment, "web").unwrap(),
            "language::en,request.context.metadata.deployment::web"
        );
    }

    #[test]
    fn explicit_filter_takes_precedence() {
        let source = FilterSource::resolve(
            Some("response_timestamp>2020-01-01".into()),
            "fr",
            LogScope::Assistant,
            "ignored",
        );
        assert_eq!(source.expression().unwrap(), "response_timestamp>2020-01-01");
    }

    #[test]
    fn scope_parsing_is_case_insensitive() {
        assert_eq!("deployment".parse::<LogScope>().unwrap(), LogScope::Deployment);
        assert_eq!("Assistant".parse::<LogScope>().unwrap(), LogScope::Assistant);

        let err = "skill".parse::<LogScope>().unwrap_err();
        assert!(matches!(err, ExportError::Config { .. }));
    }

    #[test]
    fn empty_id_is_a_config_error() {
        let err = build_filter("en", LogScope::Workspace, " ").unwrap_err();
        assert!(matches!(err, ExportError::Config { .. }));
    }
}
