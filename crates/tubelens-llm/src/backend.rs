//! Text completion backends.
//!
//! Pipeline nodes only ever send a single prompt and read back text, so the
//! backend surface is one method. Providers live in their own modules.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Trait for text completion providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send a prompt and return the model's text response.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// A shared backend that can be used across tasks.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "testing"))]
pub use mock::{MockBackend, MockResponse};

#[cfg(any(test, feature = "testing"))]
mod mock {
    use super::*;
    use crate::error::LlmError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

    /// A scripted reply from [`MockBackend`].
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        Text(String),
        Error(String),
    }

    /// A mock backend for testing.
    ///
    /// Replies come from a queue in order, or from a responder function when
    /// replies depend on the prompt (for example under concurrent callers).
    pub struct MockBackend {
        name: String,
        responses: Mutex<VecDeque<MockResponse>>,
        responder: Option<Box<Responder>>,
        request_log: Mutex<Vec<String>>,
    }

    impl MockBackend {
        /// Create a mock backend that returns `responses` in order.
        pub fn new(responses: Vec<MockResponse>) -> Self {
            Self {
                name: "mock".to_string(),
                responses: Mutex::new(responses.into()),
                responder: None,
                request_log: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock backend with a single text response.
        pub fn with_text(text: impl Into<String>) -> Self {
            Self::new(vec![MockResponse::Text(text.into())])
        }

        /// Create a mock backend answering each prompt with `responder`.
        pub fn with_responder<F>(responder: F) -> Self
        where
            F: Fn(&str) -> Result<String> + Send + Sync + 'static,
        {
            Self {
                responder: Some(Box::new(responder)),
                ..Self::new(Vec::new())
            }
        }

        /// All prompts sent to this backend.
        pub fn requests(&self) -> Vec<String> {
            self.request_log.lock().clone()
        }

        pub fn request_count(&self) -> usize {
            self.request_log.lock().len()
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.request_log.lock().push(prompt.to_string());

            if let Some(responder) = &self.responder {
                return responder(prompt);
            }

            match self.responses.lock().pop_front() {
                Some(MockResponse::Text(text)) => Ok(text),
                Some(MockResponse::Error(message)) => Err(LlmError::Backend(message)),
                None => Err(LlmError::Backend(
                    "MockBackend: no more responses available".to_string(),
                )),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::with_text("Hello!");

        let response = backend.complete("Hi").await.unwrap();
        assert_eq!(response, "Hello!");
        assert_eq!(backend.request_count(), 1);
        assert_eq!(backend.requests(), vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_mock_backend_queue_and_exhaustion() {
        let backend = MockBackend::new(vec![
            MockResponse::Text("First".into()),
            MockResponse::Error("boom".into()),
        ]);

        assert_eq!(backend.complete("1").await.unwrap(), "First");
        assert!(matches!(
            backend.complete("2").await,
            Err(LlmError::Backend(msg)) if msg == "boom"
        ));
        assert!(backend.complete("3").await.is_err());
        assert_eq!(backend.request_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_responder() {
        let backend = MockBackend::with_responder(|prompt| Ok(prompt.to_uppercase()));
        assert_eq!(backend.complete("abc").await.unwrap(), "ABC");
        assert_eq!(backend.complete("xyz").await.unwrap(), "XYZ");
    }
}
