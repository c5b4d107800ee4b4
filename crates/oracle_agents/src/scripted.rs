//! In-memory [`ReasoningProvider`] replaying scripted answers.
//!
//! Used by stage, pipeline and router tests in place of a network provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::{ReasoningProvider, ReasoningRequest};

type Reply = Result<String, ProviderError>;

/// Provider that answers from a queue, then from a fallback.
pub struct ScriptedProvider {
    name: String,
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedProvider {
    /// Replay `replies` in order; afterwards every call fails with an invalid response.
    pub fn new(name: impl Into<String>, replies: Vec<Reply>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(replies.into()),
            fallback: Err(ProviderError::InvalidResponse("script exhausted".to_string())),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new("scripted", Vec::new()).with_fallback(Ok(text.into()))
    }

    /// Always fail with `err`.
    pub fn always_err(err: ProviderError) -> Self {
        Self::new("scripted", Vec::new()).with_fallback(Err(err))
    }

    /// Reply used once the queue is empty.
    pub fn with_fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received, in order.
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
