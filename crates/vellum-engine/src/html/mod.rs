//! HTML <-> buffer conversion.
//!
//! Two total functions form the boundary with the outside world:
//! [`parse`] accepts any string (malformed markup degrades to preserved
//! raw spans, never an error) and [`serialize`] always produces valid
//! HTML for a well-formed document. Round trips are semantically
//! idempotent: output normalizes on the first pass, then reaches a fixed
//! point.

pub mod escape;
pub mod serializer;
pub mod tag_parser;
pub mod tokenizer;

use crate::editing::Document;

/// The marker element used to carry the caret position through a full
/// serialize/parse cycle.
pub const CURSOR_TAG: &str = "vellum_cursor";

/// Parse an HTML string into a document. Never fails.
pub fn parse(html: &str) -> Document {
    tag_parser::parse_document(html)
}

/// Serialize a document to HTML. Never fails.
pub fn serialize(doc: &Document) -> String {
    serializer::serialize_document(doc, None)
}

/// Serialize with a cursor marker element injected at the output position
/// equivalent to `cursor` (a byte offset into the buffer).
pub fn serialize_with_cursor(doc: &Document, cursor: usize) -> String {
    serializer::serialize_document(doc, Some(cursor))
}
