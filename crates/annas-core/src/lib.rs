//! Anna's Archive Scraper Core Library
//!
//! Provides async API for searching books on Anna's Archive and downloading
//! them through the fast download API.
//!
//! # Overview
//!
//! This crate provides a complete search and download solution with:
//! - A structural parser for the search results page
//! - A schema-constrained generative fallback for when the markup drifts
//! - Keyed download URL resolution and streaming file retrieval
//!
//! # Example
//!
//! ```no_run
//! use annas_core::{AnnasScraper, ScraperConfig, DownloadSettings, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scraper = AnnasScraper::with_config(ScraperConfig::from_env())?;
//!
//!     // Search for books
//!     let books = scraper.search("development of political ideas").await?;
//!
//!     for book in &books {
//!         println!("{}\n", book);
//!     }
//!
//!     // Download the first hit
//!     if let Some(book) = books.first() {
//!         let settings = DownloadSettings::from_env()?;
//!         let file = scraper
//!             .download(book, &settings.secret_key, &settings.download_dir)
//!             .await?;
//!         println!("Saved to {}", file.path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Extraction
//!
//! [`AnnasScraper::search`] parses the result list structurally. When the
//! list container is missing or unreadable, the page (or just the container)
//! is handed to the assisted extractor, which needs `GEMINI_API_KEY`.
//!
//! **Logging:** the crate emits `tracing` events and never installs a
//! subscriber; that is up to the application.

pub mod assist;
mod client;
pub mod config;
pub mod download;
mod error;
pub mod extract;
pub mod parser;
mod scraper;
mod types;
pub mod url;

// Re-export client types
pub use client::{AnnasClient, ClientConfig, Page};

// Re-export configuration
pub use config::{DownloadSettings, ScraperConfig};

// Re-export error types
pub use error::{AnnasError, Result};

// Re-export extraction API
pub use assist::{AssistedExtractor, GeminiConfig, GeminiGenerator, Generation, Generator, RetryPolicy};
pub use extract::{Extraction, ExtractionPipeline, Extractor, StructuralExtractor};
pub use parser::{decode_meta, parse_books};

// Re-export download API
pub use download::{DownloadResolver, DownloadedFile, FileRetriever, book_filename};

// Re-export main scraper API
pub use crate::scraper::AnnasScraper;

// Re-export data types
pub use types::Book;

// Re-export URL helper functions for convenience
pub use crate::url::{build_fast_download_url, build_search_url, extract_hash};
