//! Search results parser for Anna's Archive
//!
//! Parses HTML from the search results page and extracts book records.
//! All assumptions about the result markup live in [`RecordLayout`] so a
//! site redesign only touches this module.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::meta::decode_meta;
use crate::error::{AnnasError, Result};
use crate::types::Book;
use crate::url::{extract_hash, resolve_link};

/// Positional layout of a search result record
///
/// A record is an `<a href="/md5/…">` inside the list container. The
/// parent of its `<h3>` title holds the remaining fields as direct `<div>`
/// children, addressed by index.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    /// Class fragment identifying the record list container
    pub container_class: &'static str,
    /// Index of the meta line among the info block's `<div>` children
    pub meta_index: usize,
    /// Index of the publisher line
    pub publisher_index: usize,
    /// Index of the authors line
    pub authors_index: usize,
}

/// Layout of the current Anna's Archive result list
pub const RECORD_LAYOUT: RecordLayout = RecordLayout {
    container_class: "js-aarecord-list-outer",
    meta_index: 0,
    publisher_index: 1,
    authors_index: 2,
};

/// Outcome of a structural parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralOutcome {
    /// Container found and parsed; records are in document order
    Matched(Vec<Book>),
    /// The markup does not look like a result list
    ///
    /// `narrowed` carries the container's HTML when the container was found
    /// but none of its entries could be read, so a fallback can work on a
    /// smaller input.
    NoMatch { narrowed: Option<String> },
}

struct RecordSelectors {
    anchor: Selector,
    title: Selector,
}

impl RecordSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            anchor: parse_selector("a[href]")?,
            title: parse_selector("h3")?,
        })
    }
}

/// Parses search results HTML into book records
///
/// # Arguments
/// * `html` - Raw HTML string from the search results page
/// * `base_url` - URL the page was served from, used to absolutize links
///
/// # Returns
/// [`StructuralOutcome::Matched`] with the records in site ranking order, or
/// [`StructuralOutcome::NoMatch`] when the list container is missing or
/// unreadable. Malformed individual records are skipped.
///
/// # Errors
/// Returns `ParseError` if a selector cannot be compiled
pub fn parse_books(html: &str, base_url: &Url) -> Result<StructuralOutcome> {
    parse_books_with_layout(html, base_url, &RECORD_LAYOUT)
}

/// Same as [`parse_books`] with an explicit layout
pub fn parse_books_with_layout(
    html: &str,
    base_url: &Url,
    layout: &RecordLayout,
) -> Result<StructuralOutcome> {
    let document = Html::parse_document(html);

    let container_selector =
        parse_selector(&format!("div[class*='{}']", layout.container_class))?;
    let Some(container) = document.select(&container_selector).next() else {
        return Ok(StructuralOutcome::NoMatch { narrowed: None });
    };

    let selectors = RecordSelectors::new()?;
    let mut books = Vec::new();
    let mut saw_record_link = false;

    // Walk in tree order so records hidden in comments keep their rank
    for node in container.descendants() {
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() != "a" || !is_record_link(&element) {
                continue;
            }
            saw_record_link = true;
            if let Some(book) = parse_record(&element, base_url, layout, &selectors) {
                books.push(book);
            }
        } else if let Some(comment) = node.value().as_comment() {
            // Lazily rendered records are shipped as commented-out markup
            let fragment = Html::parse_fragment(comment);
            for element in fragment.select(&selectors.anchor) {
                if !is_record_link(&element) {
                    continue;
                }
                saw_record_link = true;
                if let Some(book) = parse_record(&element, base_url, layout, &selectors) {
                    books.push(book);
                }
            }
        }
    }

    // Only record-shaped links make an empty result suspicious
    if books.is_empty() && saw_record_link {
        return Ok(StructuralOutcome::NoMatch {
            narrowed: Some(container.html()),
        });
    }

    Ok(StructuralOutcome::Matched(books))
}

fn is_record_link(element: &ElementRef) -> bool {
    element
        .value()
        .attr("href")
        .and_then(extract_hash)
        .is_some()
}

/// Parses a single record anchor
///
/// # Returns
/// `Some(Book)` if the anchor is a record link with a title, `None` otherwise
fn parse_record(
    element: &ElementRef,
    base_url: &Url,
    layout: &RecordLayout,
    selectors: &RecordSelectors,
) -> Option<Book> {
    let href = element.value().attr("href")?;
    let hash = extract_hash(href)?;
    let url = resolve_link(base_url, href)?;

    let title_element = element.select(&selectors.title).next()?;
    let title = element_text(&title_element);
    if title.is_empty() {
        return None;
    }

    let info = title_element.parent().and_then(ElementRef::wrap)?;
    let fields: Vec<String> = info
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "div")
        .map(|child| element_text(&child))
        .collect();
    let field = |index: usize| fields.get(index).cloned().unwrap_or_default();

    let meta = decode_meta(&field(layout.meta_index));

    Some(Book {
        language: meta.language,
        format: meta.format,
        size: meta.size,
        title,
        publisher: field(layout.publisher_index),
        authors: field(layout.authors_index),
        url,
        hash,
    })
}

/// Collects an element's text with whitespace runs collapsed
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AnnasError::ParseError(format!("Invalid selector: {:?}", e)))
}
