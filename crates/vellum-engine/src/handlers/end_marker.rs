//! End-of-buffer marker maintenance.
//!
//! The marker is a zero-width anchor kept at the tail of the buffer
//! whenever the text ends in a newline (or is empty but block-styled), so a
//! block range still has a character to cover on its final line. This pass
//! restores the invariant after every mutation: append the marker when it
//! is owed, drop it when it dangles. Appending dispatches a marker event to
//! the block maintainers so trailing items and heading bounds follow suit.

use crate::Document;
use crate::constants::{END_OF_BUFFER_MARKER, MARKER_LEN, NEWLINE};

pub(crate) fn ensure(doc: &mut Document, after_deletion: bool) {
    let text = doc.text();

    if text.is_empty() {
        if has_block_at(doc, 0, 0) {
            append_marker(doc, 0);
        }
        return;
    }

    let Some(last) = text.chars().next_back() else {
        return;
    };

    if last == NEWLINE {
        let at = text.len();
        append_marker(doc, at);
        return;
    }

    if last == END_OF_BUFFER_MARKER {
        let marker_start = text.len() - MARKER_LEN;
        if marker_start == 0 {
            // a lone marker survives only while a block still needs it
            if after_deletion && !has_block_at(doc, 0, MARKER_LEN) {
                doc.raw_delete(0..MARKER_LEN);
            }
            return;
        }
        let before = text[..marker_start].chars().next_back();
        if before != Some(NEWLINE) {
            // dangling: text grew past the newline the marker was anchoring
            doc.raw_delete(marker_start..text.len());
        }
    }
}

fn has_block_at(doc: &Document, start: usize, end: usize) -> bool {
    doc.spans
        .touching(start, end)
        .into_iter()
        .filter_map(|id| doc.spans.get(id))
        .any(|s| s.kind.is_block())
}

fn append_marker(doc: &mut Document, at: usize) {
    let mut marker = String::new();
    marker.push(END_OF_BUFFER_MARKER);
    doc.raw_insert(at, &marker);
    doc.dispatch_region(at, MARKER_LEN);
}
