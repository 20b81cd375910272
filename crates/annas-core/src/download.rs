//! Download resolution and file retrieval
//!
//! A content hash is exchanged for a one-time URL through the keyed
//! fast-download API, then the file behind that URL is streamed to disk.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::client::AnnasClient;
use crate::error::{AnnasError, Result};
use crate::types::Book;
use crate::url::build_fast_download_url;

/// Response of the fast download endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FastDownloadResponse {
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl FastDownloadResponse {
    /// Interprets the payload
    ///
    /// # Errors
    /// - `ApiError` carrying the endpoint's message verbatim
    /// - `NoDownloadUrl` when neither a URL nor a message is present
    pub fn into_download_url(self) -> Result<String> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(self.download_url) {
            return Ok(url);
        }
        match non_empty(self.error) {
            Some(message) => Err(AnnasError::ApiError(message)),
            None => Err(AnnasError::NoDownloadUrl),
        }
    }
}

/// Exchanges content hashes for one-time download URLs
#[derive(Debug, Clone)]
pub struct DownloadResolver {
    client: AnnasClient,
    base_url: String,
}

impl DownloadResolver {
    pub fn new(client: AnnasClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Resolves a hash to a download URL
    ///
    /// No retry is performed; failures are reported immediately.
    ///
    /// # Errors
    /// - `InvalidId` if `hash` is empty
    /// - `ConfigError` if `secret_key` is empty
    /// - `ApiError` / `NoDownloadUrl` per [`FastDownloadResponse::into_download_url`]
    /// - `HttpError`, `BadStatus`, `DecodeError` for transport and payload failures
    pub async fn resolve(&self, hash: &str, secret_key: &str) -> Result<String> {
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(AnnasError::InvalidId("Hash cannot be empty".to_string()));
        }
        if secret_key.trim().is_empty() {
            return Err(AnnasError::ConfigError(
                "ANNAS_SECRET_KEY environment variable not set".to_string(),
            ));
        }

        let api_url = build_fast_download_url(&self.base_url, hash, secret_key.trim());
        debug!(%hash, "resolving download url");
        let response: FastDownloadResponse = self.client.fetch_json(&api_url).await?;
        response.into_download_url()
    }
}

/// A file written by [`FileRetriever::retrieve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Builds the destination filename for a book
///
/// `{title}.{format}` with every `/` replaced by `_`. A leading dot on the
/// format is not doubled, an empty format yields the bare title and an
/// empty title falls back to the hash.
///
/// # Example
/// ```
/// use annas_core::{Book, download::book_filename};
/// let book = Book { title: "A/B".into(), format: "pdf".into(), ..Book::default() };
/// assert_eq!(book_filename(&book), "A_B.pdf");
/// ```
pub fn book_filename(book: &Book) -> String {
    let title = book.title.trim();
    let stem = if title.is_empty() {
        book.hash.trim()
    } else {
        title
    };
    let extension = book.format.trim().trim_start_matches('.');

    let filename = if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    };
    filename.replace('/', "_")
}

/// Streams resolved download URLs to local files
#[derive(Debug, Clone)]
pub struct FileRetriever {
    client: AnnasClient,
}

impl FileRetriever {
    pub fn new(client: AnnasClient) -> Self {
        Self { client }
    }

    /// Downloads `url` into `dest_dir` under [`book_filename`]
    ///
    /// An existing file with the same name is truncated. The destination
    /// directory must already exist.
    ///
    /// # Errors
    /// - `DownloadFailed` for a non-success status
    /// - `HttpError` if the transfer breaks off
    /// - `Io` if the file cannot be created or written
    pub async fn retrieve(&self, url: &str, book: &Book, dest_dir: &Path) -> Result<DownloadedFile> {
        let response = self.client.start_download(url).await?;

        let path = dest_dir.join(book_filename(book));
        let mut file = File::create(&path)
            .await
            .map_err(|e| AnnasError::io(&path, e))?;
        let bytes = stream_to_file(&mut file, response, &path).await?;

        info!(path = %path.display(), bytes, "download complete");
        Ok(DownloadedFile { path, bytes })
    }
}

/// Streams a response body to `file`, returning the bytes written
async fn stream_to_file(file: &mut File, response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AnnasError::io(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| AnnasError::io(path, e))?;
    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn book(title: &str, format: &str) -> Book {
        Book {
            title: title.to_string(),
            format: format.to_string(),
            hash: "fc57224f94300bfba438a54500eaabeb".to_string(),
            ..Book::default()
        }
    }

    fn response(download_url: Option<&str>, error: Option<&str>) -> FastDownloadResponse {
        FastDownloadResponse {
            download_url: download_url.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_book_filename_replaces_slashes() {
        assert_eq!(book_filename(&book("A/B", "pdf")), "A_B.pdf");
        assert_eq!(book_filename(&book("../../etc/passwd", "txt")), ".._.._etc_passwd.txt");
    }

    #[test]
    fn test_book_filename_dotted_format() {
        assert_eq!(book_filename(&book("Political ideas", ".zip")), "Political ideas.zip");
    }

    #[test]
    fn test_book_filename_empty_parts() {
        assert_eq!(book_filename(&book("Untyped", "")), "Untyped");
        assert_eq!(
            book_filename(&book("  ", "epub")),
            "fc57224f94300bfba438a54500eaabeb.epub"
        );
    }

    #[test]
    fn test_response_with_url() {
        let url = response(Some("https://dl.example/f"), None)
            .into_download_url()
            .unwrap();
        assert_eq!(url, "https://dl.example/f");
    }

    #[test]
    fn test_response_error_is_verbatim() {
        match response(Some(""), Some("Not a member")).into_download_url() {
            Err(AnnasError::ApiError(msg)) => assert_eq!(msg, "Not a member"),
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_response_empty_is_generic_error() {
        let result = response(Some(""), Some("")).into_download_url();
        assert!(matches!(result, Err(AnnasError::NoDownloadUrl)));
        let result = response(None, None).into_download_url();
        assert!(matches!(result, Err(AnnasError::NoDownloadUrl)));
    }

    #[test]
    fn test_response_decodes_missing_fields() {
        let parsed: FastDownloadResponse =
            serde_json::from_str(r#"{"download_url": null}"#).unwrap();
        assert!(parsed.download_url.is_none());
        assert!(parsed.error.is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_inputs_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let resolver = DownloadResolver::new(AnnasClient::new().unwrap(), server.uri());
        assert!(matches!(
            resolver.resolve("  ", "key").await,
            Err(AnnasError::InvalidId(_))
        ));
        assert!(matches!(
            resolver.resolve("abc", "").await,
            Err(AnnasError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_sends_hash_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dyn/api/fast_download.json"))
            .and(query_param("md5", "abc"))
            .and(query_param("key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"download_url":"https://dl.example/abc.pdf"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = DownloadResolver::new(AnnasClient::new().unwrap(), server.uri());
        let url = resolver.resolve("abc", "secret").await.unwrap();
        assert_eq!(url, "https://dl.example/abc.pdf");
    }

    #[tokio::test]
    async fn test_retrieve_writes_and_truncates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A_B.pdf"), b"old and much longer contents").unwrap();

        let retriever = FileRetriever::new(AnnasClient::new().unwrap());
        let file = retriever
            .retrieve(&format!("{}/files/abc", server.uri()), &book("A/B", "pdf"), dir.path())
            .await
            .unwrap();

        assert_eq!(file.path, dir.path().join("A_B.pdf"));
        assert_eq!(file.bytes, 3);
        assert_eq!(std::fs::read(&file.path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_retrieve_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let retriever = FileRetriever::new(AnnasClient::new().unwrap());
        let result = retriever
            .retrieve(&format!("{}/files/abc", server.uri()), &book("T", "pdf"), dir.path())
            .await;

        assert!(matches!(result, Err(AnnasError::DownloadFailed { status: 403 })));
        assert!(!dir.path().join("T.pdf").exists());
    }

    #[tokio::test]
    async fn test_retrieve_missing_directory_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let retriever = FileRetriever::new(AnnasClient::new().unwrap());
        let result = retriever
            .retrieve(&format!("{}/f", server.uri()), &book("T", "pdf"), &missing)
            .await;

        assert!(matches!(result, Err(AnnasError::Io { .. })));
    }
}
