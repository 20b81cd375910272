//! Command implementations for the `annas` binary
//!
//! Each command returns the text to print on stdout so `main` owns all I/O.

use anyhow::{Context, Result};
use annas_core::{AnnasScraper, Book, DownloadSettings};
use tracing::debug;

/// Search for books and render them
///
/// # Arguments
/// * `scraper` - Configured scraper
/// * `terms` - Query words, joined with single spaces
/// * `json` - Render a pretty JSON array instead of labeled blocks
///
/// # Errors
/// Any search error from the core library
pub async fn search(scraper: &AnnasScraper, terms: &[String], json: bool) -> Result<String> {
    let query = terms.join(" ");
    let books = scraper.search(&query).await?;
    debug!(count = books.len(), "search finished");
    render_books(&books, json)
}

/// Renders books as blank-line separated blocks or as a JSON array
pub fn render_books(books: &[Book], json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(books).context("failed to encode results");
    }
    if books.is_empty() {
        return Ok("No books found.".to_string());
    }
    Ok(books
        .iter()
        .map(Book::to_string)
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// Download a book by hash and report where it was written
///
/// # Errors
/// Resolution and retrieval errors from the core library
pub async fn download(
    scraper: &AnnasScraper,
    hash: &str,
    title: &str,
    format: &str,
    settings: &DownloadSettings,
) -> Result<String> {
    let book = Book {
        title: title.to_string(),
        format: format.to_string(),
        hash: hash.to_string(),
        ..Book::default()
    };

    let file = scraper
        .download(&book, &settings.secret_key, &settings.download_dir)
        .await?;
    Ok(format!("Saved {} ({} bytes)", file.path.display(), file.bytes))
}

/// Renders an error as `{"error": "<message>"}`
pub fn error_json(error: &anyhow::Error) -> String {
    serde_json::json!({ "error": error.to_string() }).to_string()
}
