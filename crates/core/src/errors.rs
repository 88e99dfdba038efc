use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// A remote call that did not produce a 2xx response.
///
/// Returned as a value so tool handlers can hand the caller a structured
/// `{error, status_code, response, success: false}` object.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{error}")]
pub struct TransportFailure {
    pub error: String,
    /// `None` when no HTTP response was received at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub response: String,
}

impl TransportFailure {
    pub fn status(
        method: &str,
        path: &str,
        status_code: u16,
        reason: &str,
        response: impl Into<String>,
    ) -> Self {
        let reason = if reason.is_empty() { String::new() } else { format!(" {reason}") };
        Self {
            error: format!("HTTP {status_code}{reason} from {method} {path}"),
            status_code: Some(status_code),
            response: response.into(),
        }
    }

    pub fn network(method: &str, path: &str, detail: impl std::fmt::Display) -> Self {
        Self {
            error: format!("request {method} {path} failed: {detail}"),
            status_code: None,
            response: String::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "error": self.error,
            "response": self.response,
            "success": false,
        });
        if let Some(status_code) = self.status_code {
            value["status_code"] = json!(status_code);
        }
        value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Organization,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a get-or-create call could not produce an id.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("searching {entity} by `{key}` failed: {source}")]
    Search { entity: EntityKind, key: String, source: TransportFailure },
    #[error("creating {entity} `{name}` failed: {source}")]
    Create { entity: EntityKind, name: String, source: TransportFailure },
    #[error("creating {entity} `{name}` was rejected: {reason}")]
    Rejected { entity: EntityKind, name: String, reason: String },
    #[error("no {entity} matched `{key}` and no name was given to create one")]
    MissingName { entity: EntityKind, key: String },
}

impl ResolveError {
    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Search { entity, .. }
            | Self::Create { entity, .. }
            | Self::Rejected { entity, .. }
            | Self::MissingName { entity, .. } => *entity,
        }
    }
}
