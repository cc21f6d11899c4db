//! An oracle session ties the quota gate, the reply backend and the
//! entitlement handle to an append-only conversation transcript.
use chrono::Local;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::adapter::get_reply_service;
use crate::config::{Config, StardustConfigError};
use crate::entitlement::Entitlements;
use crate::quota::DailyQuota;
use crate::reply::{Message, ReplyError, ReplyRequest, ReplyService, Role, SeekerProfile, fresh_id};
use crate::store::{KeyValueStore, load_star_seed_id};

#[derive(Error, Debug)]
pub enum AskError {
    #[error("No free questions left today")]
    QuotaExhausted,
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

/// Single chat session with the oracle. Quota state is read-modify-write per
/// `ask`, so a session must have one caller at a time; callers that share a
/// session serialize access behind a mutex.
pub struct OracleSession {
    service: Box<dyn ReplyService>,
    quota: DailyQuota,
    entitlements: Arc<dyn Entitlements>,
    messages: Vec<Message>,
    profile: Option<SeekerProfile>,
    client_context: Value,
}

impl OracleSession {
    pub fn new(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        entitlements: Arc<dyn Entitlements>,
    ) -> Result<Self, StardustConfigError> {
        let service = get_reply_service(&config.oracle)?;
        let quota = DailyQuota::new(store.clone(), config.oracle.free_questions_per_day);
        let star_seed_id = load_star_seed_id(store.as_ref());
        let client_context = json!({
            "starSeedId": star_seed_id,
            "appId": config.oracle.app_id,
        });

        Ok(Self::from_parts(
            service,
            quota,
            entitlements,
            config.profile.clone(),
            client_context,
        ))
    }

    /// Assemble a session from already-built parts. Seam for tests and for
    /// hosts that bring their own backend.
    pub fn from_parts(
        service: Box<dyn ReplyService>,
        quota: DailyQuota,
        entitlements: Arc<dyn Entitlements>,
        profile: Option<SeekerProfile>,
        client_context: Value,
    ) -> Self {
        Self {
            service,
            quota,
            entitlements,
            messages: Vec::new(),
            profile,
            client_context,
        }
    }

    /// Submit a question. Consumption precedes the send: a refused question
    /// leaves the transcript untouched, while a failed send keeps the user
    /// message and the question stays spent.
    pub async fn ask(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<Message, AskError> {
        let today = Local::now().date_naive();
        let exempt = self.entitlements.is_subscribed();

        if !self.quota.try_consume(today, exempt) {
            tracing::debug!("Question refused, daily quota exhausted");
            return Err(AskError::QuotaExhausted);
        }

        let request = ReplyRequest {
            message: text.to_string(),
            history: self.messages.clone(),
            profile: self.profile.clone(),
            client_context: Some(self.client_context.clone()),
        };

        self.messages.push(Message {
            id: fresh_id("user"),
            role: Role::User,
            text: text.to_string(),
        });

        let reply = self.service.send_message(request, cancel).await?;
        let message = Message {
            id: reply.id,
            role: Role::Oracle,
            text: reply.text,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    pub fn remaining_today(&self) -> u32 {
        self.quota.remaining(Local::now().date_naive())
    }

    pub fn question_limit(&self) -> u32 {
        self.quota.limit()
    }

    pub fn is_subscribed(&self) -> bool {
        self.entitlements.is_subscribed()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }
}
