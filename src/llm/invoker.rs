use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::InvocationError;
use crate::models::{ExtractionResult, ProgramConfiguration, Transcript};

use super::{build_request, parse_completion, repair_completion, CompletionBackend, CompletionRequest};

/// Limits applied to every learned-program invocation
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Upper bound on a single backend call
    pub timeout: Duration,
    /// Extra attempts after a timeout or transport failure
    pub max_call_retries: u32,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_call_retries: 1,
        }
    }
}

/// Where an invocation stands between backend round trips
enum Attempt {
    RawCall { retry: u32 },
    Repair { raw: String, strict_error: String },
    Failed(InvocationError),
}

/// Runs a program configuration against a completion backend
///
/// Every call is bounded by the configured timeout. A completion that fails
/// strict parsing gets exactly one repair pass before the invocation is
/// reported as malformed.
#[derive(Clone)]
pub struct Invoker {
    backend: Arc<dyn CompletionBackend>,
    config: InvokerConfig,
}

impl Invoker {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            config: InvokerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InvokerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Extract from one transcript under the given program
    pub async fn invoke(
        &self,
        transcript: &Transcript,
        program: &ProgramConfiguration,
    ) -> Result<ExtractionResult, InvocationError> {
        let request = build_request(transcript, program);
        let mut attempt = Attempt::RawCall { retry: 0 };

        loop {
            attempt = match attempt {
                Attempt::RawCall { retry } => match self.call(&request).await {
                    Ok(raw) => match parse_completion(&raw) {
                        Ok(result) => return Ok(result),
                        Err(strict_error) => Attempt::Repair { raw, strict_error },
                    },
                    Err(e) if retry < self.config.max_call_retries => {
                        warn!(
                            "Backend {} call failed ({}), retry {} of {}",
                            self.backend.name(),
                            e,
                            retry + 1,
                            self.config.max_call_retries
                        );
                        Attempt::RawCall { retry: retry + 1 }
                    }
                    Err(e) => Attempt::Failed(e),
                },
                Attempt::Repair { raw, strict_error } => match repair_completion(&raw) {
                    Ok(result) => {
                        debug!("Repaired completion after strict parse failed: {}", strict_error);
                        return Ok(result);
                    }
                    Err(repair_error) => Attempt::Failed(InvocationError::MalformedCompletion(
                        format!("{}; repair failed: {}", strict_error, repair_error),
                    )),
                },
                Attempt::Failed(e) => return Err(e),
            };
        }
    }

    async fn call(&self, request: &CompletionRequest) -> Result<String, InvocationError> {
        match tokio::time::timeout(self.config.timeout, self.backend.complete(request)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => Err(InvocationError::Transport(format!("{:#}", e))),
            Err(_) => Err(InvocationError::Timeout(self.config.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::{FailingBackend, FakeBackend, MalformedBackend, SlowBackend};
    use std::sync::atomic::Ordering;

    fn transcript() -> Transcript {
        Transcript::new("Alice will send the deck.")
    }

    #[tokio::test]
    async fn test_invoke_parses_completion() {
        let gold = ExtractionResult::new("Deck.", ["Alice: send the deck"], ["ship Friday"]);
        let backend = FakeBackend::new().with_answer("Alice will send the deck.", gold.clone());
        let invoker = Invoker::new(Arc::new(backend));

        let mut program = ProgramConfiguration::default();
        program.exemplars.push(crate::models::Exemplar {
            transcript: "Bob will call.".to_string(),
            output: ExtractionResult::new("Call.", ["Bob: call"], Vec::<String>::new()),
        });

        let result = invoker.invoke(&transcript(), &program).await.unwrap();

        assert_eq!(result, gold);
    }

    #[tokio::test]
    async fn test_transport_failure_retried_then_reported() {
        let backend = Arc::new(FailingBackend::default());
        let invoker = Invoker::new(backend.clone());

        let err = invoker
            .invoke(&transcript(), &ProgramConfiguration::default())
            .await
            .unwrap_err();

        assert!(matches!(err, InvocationError::Transport(_)));
        assert!(err.is_backend_failure());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_bounds_call() {
        let backend = Arc::new(SlowBackend::new(Duration::from_secs(5)));
        let invoker = Invoker::new(backend.clone()).with_config(InvokerConfig {
            timeout: Duration::from_millis(20),
            max_call_retries: 0,
        });

        let started = std::time::Instant::now();
        let err = invoker
            .invoke(&transcript(), &ProgramConfiguration::default())
            .await
            .unwrap_err();

        assert_eq!(err, InvocationError::Timeout(Duration::from_millis(20)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fenced_completion_repaired() {
        let raw = "```json\n{\"summary\": \"Deck.\", \"action_items\": [\"Alice: send the deck\"], \"decisions\": []}\n```";
        let backend = Arc::new(MalformedBackend::new(raw));
        let invoker = Invoker::new(backend.clone());

        let result = invoker
            .invoke(&transcript(), &ProgramConfiguration::default())
            .await
            .unwrap();

        assert_eq!(result.action_items, vec!["Alice: send the deck"]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrepairable_completion_is_malformed() {
        let backend = Arc::new(MalformedBackend::new("Sorry, I can't do that."));
        let invoker = Invoker::new(backend.clone());

        let err = invoker
            .invoke(&transcript(), &ProgramConfiguration::default())
            .await
            .unwrap_err();

        assert!(matches!(err, InvocationError::MalformedCompletion(_)));
        assert!(!err.is_backend_failure());
        // Malformed output is not a transport problem, so no second call
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
