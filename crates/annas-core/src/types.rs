//! Core data types for the Anna's Archive scraper
//!
//! Contains the book record shared by both extraction paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnnasError, Result};

/// Represents one catalog entry from an Anna's Archive search
///
/// Every field is a plain string; a missing value is the empty string.
/// `#[serde(default)]` keeps that true when deserializing generated payloads
/// that omit a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    /// Display language (e.g., "English [en]")
    pub language: String,

    /// File format token (e.g., ".zip", "pdf")
    pub format: String,

    /// File size as displayed by the site (e.g., "0.1MB")
    pub size: String,

    /// Book title
    pub title: String,

    /// Publisher line, may include edition and year
    pub publisher: String,

    /// Authors, possibly several joined with commas
    pub authors: String,

    /// Absolute URL of the record's detail page
    pub url: String,

    /// MD5 content identifier used as the download key
    pub hash: String,
}

impl Book {
    /// Renders the record as indented JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnnasError::DecodeError(e.to_string()))
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {}\nAuthors: {}\nPublisher: {}\nLanguage: {}\nFormat: {}\nSize: {}\nURL: {}\nHash: {}",
            self.title,
            self.authors,
            self.publisher,
            self.language,
            self.format,
            self.size,
            self.url,
            self.hash
        )
    }
}
