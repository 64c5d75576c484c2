//! In-process completion backends for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{normalize_key, ExtractionResult};

use super::{transcript_section, CompletionBackend, CompletionRequest};

/// Answers from a lookup table keyed by transcript text
///
/// Without exemplars in the prompt the answer loses its decisions, so
/// configurations that carry exemplars score higher.
#[derive(Default)]
pub struct FakeBackend {
    answers: HashMap<String, ExtractionResult>,
    pub calls: AtomicUsize,
    /// Normalized transcripts this backend was asked about
    pub seen: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, transcript: &str, answer: ExtractionResult) -> Self {
        self.answers.insert(normalize_key(transcript), answer);
        self
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let key = transcript_section(&request.user)
            .map(normalize_key)
            .unwrap_or_default();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(key.clone());
        }
        let mut answer = self
            .answers
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ExtractionResult::new("Nothing notable.", Vec::<String>::new(), Vec::<String>::new()));

        if !request.user.contains("### Example") {
            answer.decisions.clear();
        }

        Ok(serde_json::to_string(&answer)?)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Always fails at the transport level
#[derive(Default)]
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CompletionBackend for FailingBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("connection refused")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Sleeps longer than any reasonable timeout
pub struct SlowBackend {
    delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for SlowBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok("{}".to_string())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Returns the same raw text for every request
pub struct MalformedBackend {
    raw: String,
    pub calls: AtomicUsize,
}

impl MalformedBackend {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for MalformedBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw.clone())
    }

    fn name(&self) -> &str {
        "malformed"
    }
}
