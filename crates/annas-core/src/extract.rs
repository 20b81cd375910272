//! Extraction pipeline
//!
//! Runs the structural parser first and falls back to the assisted
//! extractor when the page markup is not recognized. Both strategies sit
//! behind the [`Extractor`] trait; the pipeline only sees outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AnnasError, Result};
use crate::parser::{StructuralOutcome, parse_books};
use crate::types::Book;
use crate::url::{build_record_url, resolve_link};

/// Result of running one extraction strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Records found, in site ranking order
    Matched(Vec<Book>),
    /// The strategy does not recognize the markup
    NoMatch { narrowed: Option<String> },
}

impl From<StructuralOutcome> for Extraction {
    fn from(outcome: StructuralOutcome) -> Self {
        match outcome {
            StructuralOutcome::Matched(books) => Extraction::Matched(books),
            StructuralOutcome::NoMatch { narrowed } => Extraction::NoMatch { narrowed },
        }
    }
}

/// A strategy that turns page markup into book records
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, markup: &str, base_url: &Url) -> Result<Extraction>;
}

/// Deterministic extraction through [`parse_books`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralExtractor;

#[async_trait]
impl Extractor for StructuralExtractor {
    async fn extract(&self, markup: &str, base_url: &Url) -> Result<Extraction> {
        parse_books(markup, base_url).map(Extraction::from)
    }
}

enum Stage {
    StructuralAttempt,
    AssistedFallback { markup: String },
    Done(Vec<Book>),
    Failed(AnnasError),
}

/// Two-tier extraction: structural first, assisted on no match
#[derive(Clone)]
pub struct ExtractionPipeline {
    structural: Arc<dyn Extractor>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractionPipeline {
    pub fn new(structural: Arc<dyn Extractor>, fallback: Arc<dyn Extractor>) -> Self {
        Self {
            structural,
            fallback,
        }
    }

    /// Extracts normalized books from a search results page
    ///
    /// # Arguments
    /// * `html` - Full page body
    /// * `base_url` - URL the page was served from
    ///
    /// # Errors
    /// Errors from the structural pass other than `ParseError` and every
    /// error from the fallback pass are propagated. A missing result list is
    /// not an error.
    pub async fn run(&self, html: &str, base_url: &Url) -> Result<Vec<Book>> {
        let mut stage = Stage::StructuralAttempt;

        loop {
            stage = match stage {
                Stage::StructuralAttempt => match self.structural.extract(html, base_url).await {
                    Ok(Extraction::Matched(books)) => {
                        info!(count = books.len(), "structural extraction matched");
                        Stage::Done(books)
                    }
                    Ok(Extraction::NoMatch { narrowed }) => {
                        warn!(
                            narrowed = narrowed.is_some(),
                            "result list not recognized, falling back to assisted extraction"
                        );
                        Stage::AssistedFallback {
                            markup: narrowed.unwrap_or_else(|| html.to_string()),
                        }
                    }
                    Err(AnnasError::ParseError(reason)) => {
                        warn!(%reason, "structural parse failed, falling back to assisted extraction");
                        Stage::AssistedFallback {
                            markup: html.to_string(),
                        }
                    }
                    Err(e) => Stage::Failed(e),
                },
                Stage::AssistedFallback { markup } => {
                    match self.fallback.extract(&markup, base_url).await {
                        Ok(Extraction::Matched(books)) => {
                            info!(count = books.len(), "assisted extraction matched");
                            Stage::Done(books)
                        }
                        Ok(Extraction::NoMatch { .. }) => Stage::Done(Vec::new()),
                        Err(e) => Stage::Failed(e),
                    }
                }
                Stage::Done(books) => return Ok(normalize_books(books, base_url)),
                Stage::Failed(e) => return Err(e),
            };
        }
    }
}

/// Trims every field, absolutizes URLs and drops records without a hash
fn normalize_books(books: Vec<Book>, base_url: &Url) -> Vec<Book> {
    books
        .into_iter()
        .filter_map(|book| normalize_book(book, base_url))
        .collect()
}

fn normalize_book(book: Book, base_url: &Url) -> Option<Book> {
    let trim = |value: String| value.trim().to_string();
    let hash = trim(book.hash);
    if hash.is_empty() {
        debug!(title = %book.title, "dropping record without hash");
        return None;
    }

    let url = trim(book.url);
    let url = if url.is_empty() {
        build_record_url(base_url, &hash)
    } else {
        resolve_link(base_url, &url)
    };
    let Some(url) = url else {
        debug!(%hash, "dropping record with unresolvable url");
        return None;
    };

    Some(Book {
        language: trim(book.language),
        format: trim(book.format),
        size: trim(book.size),
        title: trim(book.title),
        publisher: trim(book.publisher),
        authors: trim(book.authors),
        url,
        hash,
    })
}
