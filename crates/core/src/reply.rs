//! Reply service abstraction: ask the oracle a question, get an answer.
//!
//! Two interchangeable backends implement [`ReplyService`]: a deterministic
//! local responder and a remote HTTP responder. Callers never see which one
//! they hold beyond the initial factory choice.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Oracle,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Oracle => "oracle",
        }
    }
}

/// A single entry in the conversation transcript. Insertion order is
/// display order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
}

/// Optional details about the seeker, forwarded to the oracle and folded
/// into the system instruction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SeekerProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplyRequest {
    pub message: String,
    /// Conversation history before the current message.
    pub history: Vec<Message>,
    pub profile: Option<SeekerProfile>,
    pub client_context: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub id: String,
    pub text: String,
    /// The submitted message, echoed by the local backend.
    pub input: Option<String>,
    /// Raw response body kept by the remote backend for diagnostics.
    pub raw: Option<Value>,
}

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Oracle API error: {status} {body}")]
    Upstream { status: u16, body: String },
    #[error("Cancelled by user")]
    Cancelled,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed oracle response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ReplyService: Send + Sync {
    /// Produce a response to the request. Cancellation must surface as
    /// [`ReplyError::Cancelled`], never as a silent resolution.
    async fn send_message(
        &self,
        request: ReplyRequest,
        cancel: CancellationToken,
    ) -> Result<Reply, ReplyError>;
}

pub(crate) fn fresh_id(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().timestamp_millis())
}
