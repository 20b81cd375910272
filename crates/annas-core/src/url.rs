//! URL helper functions for Anna's Archive
//!
//! Provides functions for building search and fast-download URLs and
//! for turning record links into absolute URLs and content hashes.

use url::Url;

/// Default Anna's Archive mirror
pub const DEFAULT_BASE_URL: &str = "https://annas-archive.org";

/// Path prefix of a record's detail page; the remainder is the MD5 hash
pub const RECORD_PATH_PREFIX: &str = "/md5/";

/// Builds the search URL for a given query
///
/// URL encodes the query and appends it as the `q` parameter.
///
/// # Arguments
/// * `base_url` - Mirror root (e.g., "https://annas-archive.org")
/// * `query` - Search query string
///
/// # Example
/// ```
/// use annas_core::url::build_search_url;
/// let url = build_search_url("https://annas-archive.org", "political ideas");
/// assert_eq!(url, "https://annas-archive.org/search?q=political%20ideas");
/// ```
pub fn build_search_url(base_url: &str, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    format!("{}/search?q={}", base_url.trim_end_matches('/'), encoded)
}

/// Builds the keyed fast-download API URL for a content hash
///
/// # Example
/// ```
/// use annas_core::url::build_fast_download_url;
/// let url = build_fast_download_url("https://annas-archive.org", "abc123", "s3cr3t");
/// assert_eq!(
///     url,
///     "https://annas-archive.org/dyn/api/fast_download.json?md5=abc123&key=s3cr3t"
/// );
/// ```
pub fn build_fast_download_url(base_url: &str, hash: &str, secret_key: &str) -> String {
    format!(
        "{}/dyn/api/fast_download.json?md5={}&key={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(hash),
        urlencoding::encode(secret_key)
    )
}

/// Extracts the content hash from a record link
///
/// Accepts relative (`/md5/{hash}`) or absolute links; any query string or
/// fragment is dropped.
///
/// # Returns
/// `Some(hash)` if the link points at a record page with a non-empty hash
///
/// # Example
/// ```
/// use annas_core::url::extract_hash;
/// assert_eq!(extract_hash("/md5/fc57224f"), Some("fc57224f".to_string()));
/// assert_eq!(extract_hash("/search?q=x"), None);
/// ```
pub fn extract_hash(link: &str) -> Option<String> {
    let start = link.find(RECORD_PATH_PREFIX)?;
    let rest = &link[start + RECORD_PATH_PREFIX.len()..];
    let hash = rest
        .split(['?', '#', '/'])
        .next()
        .unwrap_or_default()
        .trim();

    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}

/// Resolves a possibly relative link against the page's base URL
///
/// # Returns
/// The absolute URL, or `None` if the link cannot be resolved
pub fn resolve_link(base: &Url, link: &str) -> Option<String> {
    base.join(link.trim()).ok().map(String::from)
}

/// Builds the detail page URL for a hash
///
/// # Example
/// ```
/// use annas_core::url::build_record_url;
/// use url::Url;
/// let base = Url::parse("https://annas-archive.org/search?q=x").unwrap();
/// assert_eq!(
///     build_record_url(&base, "abc").as_deref(),
///     Some("https://annas-archive.org/md5/abc")
/// );
/// ```
pub fn build_record_url(base: &Url, hash: &str) -> Option<String> {
    resolve_link(base, &format!("{}{}", RECORD_PATH_PREFIX, hash))
}
