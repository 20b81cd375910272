//! HTML parsers for Anna's Archive
//!
//! Contains the search results parser and the meta line decoder it uses.

pub mod meta;
pub mod search;

pub use meta::{MetaFields, decode_meta};
pub use search::{RECORD_LAYOUT, RecordLayout, StructuralOutcome, parse_books};
