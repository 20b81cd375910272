//! Meta line decoder for search result records
//!
//! Each record carries a compact descriptor such as
//! `"English [en], .zip, 🚀/ia, 0.1MB, 📗 Book (unknown)"`.

const SEPARATOR: &str = ", ";
const MIN_TOKENS: usize = 4;

/// Typed fields decoded from a record's meta line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFields {
    pub language: String,
    pub format: String,
    pub size: String,
}

/// Decodes a comma-space separated meta line
///
/// Token 0 is the language, token 1 the format and token 3 the size.
/// Token 2 is an unlabeled source marker and is ignored. Lines with fewer
/// than four tokens decode to empty fields rather than failing.
///
/// # Example
/// ```
/// use annas_core::parser::decode_meta;
/// let meta = decode_meta("English [en], .zip, 12, 0.1MB");
/// assert_eq!(meta.language, "English [en]");
/// assert_eq!(meta.format, ".zip");
/// assert_eq!(meta.size, "0.1MB");
/// ```
pub fn decode_meta(meta: &str) -> MetaFields {
    let tokens: Vec<&str> = meta.split(SEPARATOR).collect();
    if tokens.len() < MIN_TOKENS {
        return MetaFields::default();
    }

    MetaFields {
        language: tokens[0].trim().to_string(),
        format: tokens[1].trim().to_string(),
        size: tokens[3].trim().to_string(),
    }
}
