//! Model-assisted extraction
//!
//! Fallback path used when the result markup no longer matches the
//! structural parser. Markup is sent to a schema-constrained text
//! generation service which returns the records as a JSON array.
//!
//! The service sits behind the [`Generator`] trait so the retry policy can
//! be exercised with a deterministic fake.

mod gemini;

pub use gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, GeminiConfig, GeminiGenerator};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AnnasError, Result};
use crate::extract::{Extraction, Extractor};
use crate::types::Book;

/// Default number of generation attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// What a generation call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Generated text payload
    Text(String),
    /// The service produced no content at all
    Empty,
    /// The service produced content that is not text
    NonText,
}

/// Schema-constrained text generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a payload for `prompt` that conforms to `schema`
    ///
    /// Transient failures must be reported with errors for which
    /// [`AnnasError::is_transient`] returns true.
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Generation>;
}

/// Exponential backoff for generation calls
///
/// The delay after failed attempt `n` (1-based) is
/// `initial_backoff * 2^(n-1)`: 2s, 4s, 8s, 16s with the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// JSON schema of the generated payload: an array of books, all eight
/// fields required strings
pub fn book_schema() -> Value {
    let field = |description: &str| json!({ "type": "STRING", "description": description });

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "language": field("The language of the book"),
                "format": field("The file format of the book (e.g., PDF, EPUB)"),
                "size": field("The file size of the book"),
                "title": field("The title of the book"),
                "publisher": field("The publisher of the book"),
                "authors": field("The authors of the book, comma-separated"),
                "url": field("The URL to the book's page on Anna's Archive"),
                "hash": field("The MD5 hash from the download link"),
            },
            "required": [
                "language", "format", "size", "title",
                "publisher", "authors", "url", "hash"
            ],
        },
    })
}

fn build_prompt(markup: &str) -> String {
    format!(
        "Please extract the list of matched book information from the following HTML content. \
Ignore any partial matches.

For each book, provide the following details:
- Language
- Format
- Size
- Title
- Publisher
- Authors
- URL
- Hash (from the download link)

If no books are found, return an empty JSON array: []

Here is the HTML content:
{markup}"
    )
}

/// Extracts books by delegating to a [`Generator`]
#[derive(Clone)]
pub struct AssistedExtractor {
    generator: Arc<dyn Generator>,
    retry: RetryPolicy,
}

impl AssistedExtractor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self::with_retry(generator, RetryPolicy::default())
    }

    pub fn with_retry(generator: Arc<dyn Generator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Extracts books from a markup fragment
    ///
    /// # Returns
    /// The generated records as-is; an empty vector when the service
    /// produced no content
    ///
    /// # Errors
    /// - `ConfigError` if the service credential is missing (not retried)
    /// - `RetriesExhausted` if every attempt failed transiently
    /// - `ApiError` if the service rejected the request or returned non-text content
    /// - `DecodeError` if the payload is not a JSON array of books
    pub async fn extract_books(&self, markup: &str) -> Result<Vec<Book>> {
        let prompt = build_prompt(markup);
        let schema = book_schema();

        match self.generate_with_retry(&prompt, &schema).await? {
            Generation::Empty => {
                info!("assisted extraction produced no content");
                Ok(Vec::new())
            }
            Generation::NonText => Err(AnnasError::ApiError(
                "response part is not text".to_string(),
            )),
            Generation::Text(text) => serde_json::from_str(&text).map_err(|e| {
                AnnasError::DecodeError(format!("generated payload is not a book array: {}", e))
            }),
        }
    }

    async fn generate_with_retry(&self, prompt: &str, schema: &Value) -> Result<Generation> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.generator.generate(prompt, schema).await {
                Ok(generation) => {
                    debug!(attempt, "generation succeeded");
                    return Ok(generation);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    return Err(AnnasError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(attempt, max_attempts, ?delay, error = %e, "generation failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl Extractor for AssistedExtractor {
    async fn extract(&self, markup: &str, _base_url: &Url) -> Result<Extraction> {
        self.extract_books(markup).await.map(Extraction::Matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails transiently `failures` times, then returns `outcome`
    struct FlakyGenerator {
        failures: u32,
        outcome: Generation,
        calls: Mutex<Vec<Instant>>,
    }

    impl FlakyGenerator {
        fn new(failures: u32, outcome: Generation) -> Self {
            Self {
                failures,
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for FlakyGenerator {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<Generation> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Instant::now());
                calls.len() as u32
            };
            if call <= self.failures {
                Err(AnnasError::BadStatus {
                    status: 503,
                    url: "https://generativelanguage.test".to_string(),
                })
            } else {
                Ok(self.outcome.clone())
            }
        }
    }

    struct FailingGenerator {
        error: fn() -> AnnasError,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<Generation> {
            *self.calls.lock().unwrap() += 1;
            Err((self.error)())
        }
    }

    const ONE_BOOK: &str = r#"[{"language":"English [en]","format":"pdf","size":"1MB",
        "title":"Assisted","publisher":"P","authors":"A","url":"/md5/abc","hash":"abc"}]"#;

    fn gaps(times: &[Instant]) -> Vec<Duration> {
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(16));
    }

    #[test]
    fn test_book_schema_requires_all_fields() {
        let schema = book_schema();
        assert_eq!(schema["type"], "ARRAY");
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 8);
        for field in ["language", "format", "size", "title", "publisher", "authors", "url", "hash"] {
            assert!(required.iter().any(|r| r == field), "missing {}", field);
            assert_eq!(schema["items"]["properties"][field]["type"], "STRING");
        }
    }

    #[test]
    fn test_prompt_embeds_markup() {
        let prompt = build_prompt("<div>markup</div>");
        assert!(prompt.contains("Ignore any partial matches"));
        assert!(prompt.contains("return an empty JSON array: []"));
        assert!(prompt.ends_with("<div>markup</div>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures_with_backoff() {
        let generator = Arc::new(FlakyGenerator::new(3, Generation::Text(ONE_BOOK.to_string())));
        let extractor = AssistedExtractor::new(generator.clone());

        let books = extractor.extract_books("<div/>").await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Assisted");

        let times = generator.call_times();
        assert_eq!(times.len(), 4);
        assert_eq!(
            gaps(&times),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_five_attempts() {
        let generator = Arc::new(FlakyGenerator::new(u32::MAX, Generation::Empty));
        let extractor = AssistedExtractor::new(generator.clone());

        let result = extractor.extract_books("<div/>").await;
        match result {
            Err(AnnasError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, AnnasError::BadStatus { status: 503, .. }));
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }

        let times = generator.call_times();
        assert_eq!(times.len(), 5);
        assert_eq!(
            gaps(&times),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_is_not_retried() {
        let generator = Arc::new(FailingGenerator {
            error: || AnnasError::ConfigError("GEMINI_API_KEY environment variable not set".into()),
            calls: Mutex::new(0),
        });
        let extractor = AssistedExtractor::new(generator.clone());

        let result = extractor.extract_books("<div/>").await;
        assert!(matches!(result, Err(AnnasError::ConfigError(_))));
        assert_eq!(*generator.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_generation_is_zero_books() {
        let extractor = AssistedExtractor::new(Arc::new(FlakyGenerator::new(0, Generation::Empty)));
        let books = extractor.extract_books("<div/>").await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn test_non_text_generation_is_error() {
        let extractor =
            AssistedExtractor::new(Arc::new(FlakyGenerator::new(0, Generation::NonText)));
        match extractor.extract_books("<div/>").await {
            Err(AnnasError::ApiError(msg)) => assert_eq!(msg, "response part is not text"),
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let extractor = AssistedExtractor::new(Arc::new(FlakyGenerator::new(
            0,
            Generation::Text("{\"not\": \"an array\"}".to_string()),
        )));
        let result = extractor.extract_books("<div/>").await;
        assert!(matches!(result, Err(AnnasError::DecodeError(_))));
    }
}
