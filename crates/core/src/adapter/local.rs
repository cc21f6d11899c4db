//! Deterministic local responder. No I/O, never fails.
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

use crate::reply::{Reply, ReplyError, ReplyRequest, ReplyService, fresh_id};

const CANNED_RESPONSES: [&str; 6] = [
    "The comet you chase is already within reach. Move with devotion, not haste.",
    "A forgotten promise hums beneath your week. Honor it and the path clears.",
    "Protect your mornings. The first hour is a portal you keep leaving unguarded.",
    "Your next win is quiet. Whisper your work into the world and let it bloom.",
    "Say no to what scatters you. Your power is in the ritual of focus.",
    "The stars favor completion over perfection. Finish one sacred thing.",
];

/// Answers from a fixed rotation of canned responses. A fresh instance
/// starts the rotation from the beginning.
#[derive(Default)]
pub struct LocalReplyService {
    next_index: AtomicUsize,
}

impl LocalReplyService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplyService for LocalReplyService {
    async fn send_message(
        &self,
        request: ReplyRequest,
        _cancel: CancellationToken,
    ) -> Result<Reply, ReplyError> {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed) % CANNED_RESPONSES.len();
        Ok(Reply {
            id: fresh_id("mock"),
            text: CANNED_RESPONSES[index].to_string(),
            input: Some(request.message),
            raw: None,
        })
    }
}
