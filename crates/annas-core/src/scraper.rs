//! Main scraper API for Anna's Archive
//!
//! Provides the high-level API combining the HTTP client, the extraction
//! pipeline and the download components.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::assist::{AssistedExtractor, GeminiGenerator, Generator};
use crate::client::AnnasClient;
use crate::config::ScraperConfig;
use crate::download::{DownloadResolver, DownloadedFile, FileRetriever};
use crate::error::{AnnasError, Result};
use crate::extract::{ExtractionPipeline, StructuralExtractor};
use crate::types::Book;
use crate::url::build_search_url;

/// Main scraper API for Anna's Archive
///
/// Combines the HTTP client with the two-tier extraction pipeline and
/// the download resolver/retriever to provide a simple interface for
/// searching books and downloading them.
pub struct AnnasScraper {
    client: AnnasClient,
    base_url: String,
    pipeline: ExtractionPipeline,
    resolver: DownloadResolver,
    retriever: FileRetriever,
}

impl AnnasScraper {
    /// Create a new scraper with default configuration
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Self::with_config(ScraperConfig::default())
    }

    /// Create a new scraper with custom configuration
    ///
    /// The assisted extractor talks to Gemini using `config.gemini`.
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn with_config(config: ScraperConfig) -> Result<Self> {
        let client = AnnasClient::with_config(config.client.clone())?;
        let generator = GeminiGenerator::new(client.http().clone(), config.gemini.clone());
        Ok(Self::assemble(client, config, Arc::new(generator)))
    }

    /// Create a scraper whose assisted extractor uses `generator`
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn with_generator(config: ScraperConfig, generator: Arc<dyn Generator>) -> Result<Self> {
        let client = AnnasClient::with_config(config.client.clone())?;
        Ok(Self::assemble(client, config, generator))
    }

    fn assemble(client: AnnasClient, config: ScraperConfig, generator: Arc<dyn Generator>) -> Self {
        let assisted = AssistedExtractor::with_retry(generator, config.retry);
        let pipeline = ExtractionPipeline::new(Arc::new(StructuralExtractor), Arc::new(assisted));

        Self {
            resolver: DownloadResolver::new(client.clone(), config.base_url.clone()),
            retriever: FileRetriever::new(client.clone()),
            client,
            base_url: config.base_url,
            pipeline,
        }
    }

    /// Search for books by query
    ///
    /// # Arguments
    /// * `query` - Search query string
    ///
    /// # Returns
    /// Books in site ranking order, empty if nothing matched
    ///
    /// # Errors
    /// - `InvalidId` if query is empty or whitespace only
    /// - `HttpError` / `BadStatus` / `RateLimited` if the search page fetch fails
    /// - Any error of the assisted extractor when the fallback runs
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> annas_core::Result<()> {
    /// use annas_core::AnnasScraper;
    /// let scraper = AnnasScraper::new()?;
    /// let books = scraper.search("political ideas hearnshaw").await?;
    /// for book in books {
    ///     println!("{}: {}", book.title, book.hash);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AnnasError::InvalidId(
                "Search query cannot be empty".to_string(),
            ));
        }

        let search_url = build_search_url(&self.base_url, trimmed);
        info!(url = %search_url, "visiting search page");

        let page = self.client.fetch_page(&search_url).await?;
        self.pipeline.run(&page.body, &page.url).await
    }

    /// Resolve a one-time download URL for a content hash
    ///
    /// # Errors
    /// See [`DownloadResolver::resolve`]
    pub async fn resolve_download_url(&self, hash: &str, secret_key: &str) -> Result<String> {
        self.resolver.resolve(hash, secret_key).await
    }

    /// Download a book into `dest_dir`
    ///
    /// # Arguments
    /// * `book` - Record to download; `hash` keys the download, `title` and `format` name the file
    /// * `secret_key` - Fast download API key
    /// * `dest_dir` - Existing destination directory
    ///
    /// # Errors
    /// Resolution errors from [`DownloadResolver::resolve`] and retrieval
    /// errors from [`FileRetriever::retrieve`]
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> annas_core::Result<()> {
    /// use annas_core::AnnasScraper;
    /// use std::path::Path;
    /// let scraper = AnnasScraper::new()?;
    /// let books = scraper.search("political ideas hearnshaw").await?;
    /// if let Some(book) = books.first() {
    ///     let file = scraper.download(book, "secret", Path::new("/tmp")).await?;
    ///     println!("saved {}", file.path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download(
        &self,
        book: &Book,
        secret_key: &str,
        dest_dir: &Path,
    ) -> Result<DownloadedFile> {
        let url = self.resolver.resolve(&book.hash, secret_key).await?;
        self.retriever.retrieve(&url, book, dest_dir).await
    }
}
