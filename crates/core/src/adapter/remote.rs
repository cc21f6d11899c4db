//! Remote HTTP responder for the oracle chat endpoint.
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{OracleConfig, StardustConfigError};
use crate::prompt::build_system_prompt;
use crate::reply::{Message, Reply, ReplyError, ReplyRequest, ReplyService, SeekerProfile, fresh_id};

const CHAT_ROUTE: &str = "/v1/oracle/chat";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    message: &'a str,
    history: &'a [Message],
    system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_profile: Option<&'a SeekerProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_context: Option<&'a Value>,
    app_id: &'a str,
}

pub struct RemoteReplyService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    app_id: String,
}

impl RemoteReplyService {
    /// Build the remote backend. The configured timeout is handed to the
    /// transport; no separate deadline is enforced here.
    pub fn new(config: &OracleConfig) -> Result<Self, StardustConfigError> {
        let api_key = config.resolved_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StardustConfigError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            app_id: config.app_id.clone(),
        })
    }

    fn extract_text(data: &Value) -> String {
        for key in ["reply", "message", "output"] {
            if let Some(text) = data.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
        String::new()
    }
}

#[async_trait]
impl ReplyService for RemoteReplyService {
    async fn send_message(
        &self,
        request: ReplyRequest,
        cancel: CancellationToken,
    ) -> Result<Reply, ReplyError> {
        if self.base_url.is_empty() {
            return Err(ReplyError::Configuration(
                "Oracle API base URL is not configured".to_string(),
            ));
        }

        let payload = WireRequest {
            message: &request.message,
            history: &request.history,
            system_prompt: build_system_prompt(request.profile.as_ref()),
            user_profile: request.profile.as_ref(),
            client_context: request.client_context.as_ref(),
            app_id: &self.app_id,
        };

        let url = format!("{}{CHAT_ROUTE}", self.base_url);
        let mut http_request = self.client.post(&url).json(&payload);
        if !self.api_key.is_empty() {
            http_request = http_request.bearer_auth(&self.api_key);
        }

        tracing::debug!("Requesting oracle reply from {url}");
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ReplyError::Cancelled),
            response = http_request.send() => response?,
        };

        let status = response.status();
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(ReplyError::Cancelled),
            body = response.text() => body?,
        };

        if !status.is_success() {
            return Err(ReplyError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = serde_json::from_str(&body)?;
        let id = data
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fresh_id("oracle"));
        let text = Self::extract_text(&data);

        Ok(Reply {
            id,
            text,
            input: None,
            raw: Some(data),
        })
    }
}
