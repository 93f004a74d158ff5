use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::RpcErrorBody;

/// Server-side exception family, derived from the exception name in `error.data.name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    UserError,
    ValidationError,
    AccessError,
    MissingRecord,
    SessionExpired,
    Other,
}

impl FaultKind {
    pub fn from_exception_name(name: &str) -> Self {
        let short = name.rsplit('.').next().unwrap_or(name);
        match short {
            "UserError" => Self::UserError,
            "ValidationError" => Self::ValidationError,
            "AccessError" | "AccessDenied" => Self::AccessError,
            "MissingError" => Self::MissingRecord,
            "SessionExpiredException" => Self::SessionExpired,
            _ => Self::Other,
        }
    }
}

/// A fault reported by the attendance service inside a JSON-RPC `error` object.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind:?}: {}", best_message(.server_message, .generic_message))]
pub struct ServerFault {
    pub kind: FaultKind,
    /// `error.data.message`: the message raised by the service's business logic.
    pub server_message: Option<String>,
    /// `error.message`: the RPC layer's generic description.
    pub generic_message: Option<String>,
}

impl ServerFault {
    pub fn new(kind: FaultKind, server_message: impl Into<String>) -> Self {
        Self {
            kind,
            server_message: Some(server_message.into()),
            generic_message: None,
        }
    }
}

impl From<&RpcErrorBody> for ServerFault {
    fn from(body: &RpcErrorBody) -> Self {
        let data = body.data.as_ref();
        Self {
            kind: data
                .map(|data| FaultKind::from_exception_name(&data.name))
                .unwrap_or(FaultKind::Other),
            server_message: data
                .and_then(|data| data.message.clone())
                .filter(|message| !message.trim().is_empty()),
            generic_message: Some(body.message.clone()).filter(|m| !m.trim().is_empty()),
        }
    }
}

fn best_message<'a>(server: &'a Option<String>, generic: &'a Option<String>) -> &'a str {
    server
        .as_deref()
        .or(generic.as_deref())
        .unwrap_or("no message")
}
