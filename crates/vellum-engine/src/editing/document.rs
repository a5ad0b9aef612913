use std::rc::{Rc, Weak};

use thiserror::Error;
use xi_rope::Rope;
use xi_rope::delta::Builder;

use super::commands::{self, Cmd};
use super::logger::{EditorLogger, NoopLogger};
use super::observer::ContentChangeObserver;
use super::patch::Patch;
use crate::handlers;
use crate::spans::SpanStore;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// One editing session: a text buffer plus the styled spans over it.
///
/// The buffer is a single `xi_rope::Rope` holding the document text and the
/// engine's sentinel characters. All offsets handed to and returned from the
/// document are byte offsets into it; the document clamps and validates them
/// so no command can panic the rope.
///
/// Every mutation runs the same three-phase pipeline: the raw edit (rope
/// delta + span boundary transforms), a synchronous reconciliation pass
/// (block structural maintainers, then end-of-buffer marker maintenance),
/// and observer notification. Follow-up deletions requested during
/// reconciliation are queued and run on the next tick — see
/// [`Document::flush_deferred`] — never recursively inside the pass that
/// queued them.
///
/// Documents are single-threaded and exclusively own their buffer and spans.
pub struct Document {
    pub(crate) buffer: Rope,
    pub(crate) spans: SpanStore,
    pub(crate) selection: std::ops::Range<usize>,
    pub(crate) version: u64,
    pub(crate) pending_deletions: Vec<std::ops::Range<usize>>,
    pub(crate) logger: Rc<dyn EditorLogger>,
    observers: Vec<Weak<dyn ContentChangeObserver>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            buffer: Rope::from(""),
            spans: SpanStore::new(),
            selection: 0..0,
            version: 0,
            pending_deletions: Vec::new(),
            logger: Rc::new(NoopLogger),
            observers: Vec::new(),
        }
    }

    /// Creates a plain-text document (no spans) from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);
        let len = buffer.len();
        Ok(Self {
            buffer,
            selection: len..len,
            ..Self::new()
        })
    }

    /// Assembles a document from parser output.
    pub(crate) fn from_parts(text: String, spans: SpanStore, cursor: Option<usize>) -> Self {
        let len = text.len();
        let at = cursor.unwrap_or(len).min(len);
        Self {
            buffer: Rope::from(text.as_str()),
            spans,
            selection: at..at,
            ..Self::new()
        }
    }

    /// Replaces the logger the engine reports warnings through.
    pub fn with_logger(mut self, logger: Rc<dyn EditorLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> std::ops::Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, selection: std::ops::Range<usize>) {
        self.selection = selection;
    }

    pub fn spans(&self) -> &SpanStore {
        &self.spans
    }

    /// Slice the buffer, clamping the range to document bounds.
    pub(crate) fn slice_to_cow(&self, range: std::ops::Range<usize>) -> std::borrow::Cow<'_, str> {
        let doc_len = self.buffer.len();
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    pub fn add_observer(&mut self, observer: Rc<dyn ContentChangeObserver>) {
        self.observers.push(Rc::downgrade(&observer));
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|w| w.upgrade().is_some())
            .count()
    }

    /// Insert `text` at byte offset `at`. Runs any deferred work first.
    pub fn insert(&mut self, at: usize, text: &str) -> Patch {
        self.flush_deferred();
        self.apply(Cmd::Insert {
            at,
            text: text.to_string(),
        })
    }

    /// Delete the byte range. Runs any deferred work first.
    pub fn delete(&mut self, range: std::ops::Range<usize>) -> Patch {
        self.flush_deferred();
        self.apply(Cmd::Delete { range })
    }

    /// Replace the byte range with `text`. Runs any deferred work first.
    pub fn replace(&mut self, range: std::ops::Range<usize>, text: &str) -> Patch {
        self.flush_deferred();
        self.apply(Cmd::Replace {
            range,
            text: text.to_string(),
        })
    }

    /// Applies a command: raw mutation, span transforms, reconciliation,
    /// observer notification.
    ///
    /// Commands with out-of-bounds or mid-character offsets are logged and
    /// skipped rather than applied; the returned patch then reports no
    /// changes and an unchanged version.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let Some(cmd) = self.validate(cmd) else {
            return self.noop_patch();
        };
        let (start, removed, inserted) = cmd.shape();
        if removed == 0 && inserted == 0 {
            return self.noop_patch();
        }

        let delta = commands::compile_command(self, &cmd);
        if removed > 0 {
            self.spans.adjust_for_delete(start..start + removed);
        }
        if inserted > 0 {
            self.spans.adjust_for_insert(start, inserted);
        }
        self.buffer = delta.apply(&self.buffer);
        self.version += 1;
        self.selection = commands::transform_range(&self.selection, start, removed, inserted);

        if inserted > 0 {
            self.dispatch_region(start, inserted);
            handlers::end_marker::ensure(self, false);
        } else {
            handlers::end_marker::ensure(self, true);
        }
        self.notify_observers();

        Patch {
            changed: if inserted > 0 {
                vec![start..start + inserted]
            } else {
                Vec::new()
            },
            new_selection: self.selection.clone(),
            version: self.version,
        }
    }

    /// Runs deletions queued by the maintainers during earlier passes.
    ///
    /// Called automatically at the start of the next mutation; hosts with an
    /// event loop should also call it once per tick so swallowed newlines
    /// disappear without further input.
    pub fn flush_deferred(&mut self) {
        if self.pending_deletions.is_empty() {
            return;
        }
        let mut ranges = std::mem::take(&mut self.pending_deletions);
        ranges.sort_by(|a, b| b.start.cmp(&a.start));
        ranges.dedup();
        for range in ranges {
            let text = self.text();
            // only ever delete the newline the mark was placed on; anything
            // else means the mark went stale under a later edit
            if text.get(range.start..range.end) == Some("\n") {
                self.raw_delete(range);
            }
        }
        handlers::end_marker::ensure(self, true);
    }

    pub fn has_deferred_work(&self) -> bool {
        !self.pending_deletions.is_empty()
    }

    /// Serialize the document to HTML.
    pub fn to_html(&self) -> String {
        crate::html::serialize(self)
    }

    /// Serialize with a cursor marker element at the given buffer offset.
    pub fn to_html_with_cursor(&self, cursor: usize) -> String {
        crate::html::serialize_with_cursor(self, cursor)
    }

    // ---- internals ----

    fn noop_patch(&self) -> Patch {
        Patch {
            changed: Vec::new(),
            new_selection: self.selection.clone(),
            version: self.version,
        }
    }

    fn validate(&self, cmd: Cmd) -> Option<Cmd> {
        let text = self.text();
        let len = text.len();
        let ok = |pos: usize| pos <= len && text.is_char_boundary(pos);
        let valid = match &cmd {
            Cmd::Insert { at, .. } => ok(*at),
            Cmd::Delete { range } | Cmd::Replace { range, .. } => {
                range.start <= range.end && ok(range.start) && ok(range.end)
            }
        };
        if !valid {
            self.logger
                .warn(&format!("skipping out-of-bounds edit: {cmd:?}"));
            return None;
        }
        Some(cmd)
    }

    /// Buffer mutation without reconciliation: marker maintenance and
    /// deferred deletions use this so they cannot re-enter the pass that
    /// requested them.
    pub(crate) fn raw_insert(&mut self, at: usize, text: &str) {
        if text.is_empty() || at > self.buffer.len() {
            return;
        }
        let mut builder = Builder::new(self.buffer.len());
        builder.replace(at..at, Rope::from(text));
        self.spans.adjust_for_insert(at, text.len());
        self.buffer = builder.build().apply(&self.buffer);
        self.selection = commands::transform_range(&self.selection, at, 0, text.len());
        self.version += 1;
    }

    pub(crate) fn raw_delete(&mut self, range: std::ops::Range<usize>) {
        if range.start >= range.end || range.end > self.buffer.len() {
            return;
        }
        let mut builder = Builder::new(self.buffer.len());
        builder.delete(range.clone());
        self.spans.adjust_for_delete(range.clone());
        self.buffer = builder.build().apply(&self.buffer);
        self.selection =
            commands::transform_range(&self.selection, range.start, range.len(), 0);
        self.version += 1;
    }

    /// Runs the block maintainers over an inserted region.
    pub(crate) fn dispatch_region(&mut self, start: usize, len: usize) {
        let text = self.text();
        let mut ctx = handlers::ReconcileCtx {
            text: &text,
            spans: &mut self.spans,
            pending_deletions: &mut self.pending_deletions,
            replays: Vec::new(),
            logger: &*self.logger,
        };
        handlers::handle_text_changed(&mut ctx, start, len);
    }

    fn notify_observers(&mut self) {
        self.observers.retain(|w| w.upgrade().is_some());
        let version = self.version;
        for weak in self.observers.clone() {
            if let Some(observer) = weak.upgrade() {
                observer.on_content_changed(version);
            }
        }
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            spans: self.spans.clone(),
            selection: self.selection.clone(),
            version: self.version,
            pending_deletions: self.pending_deletions.clone(),
            logger: Rc::clone(&self.logger),
            // observers watch one session, not its copies
            observers: Vec::new(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.buffer.to_string() == other.buffer.to_string()
            && self.selection == other.selection
            && self.version == other.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_valid_utf8() {
        let doc = Document::from_bytes(b"hello world").expect("valid utf8");
        assert_eq!(doc.text(), "hello world");
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.selection(), 11..11);
    }

    #[test]
    fn from_bytes_invalid_utf8() {
        assert!(Document::from_bytes(&[0xFF, 0xFE, 0xFD]).is_err());
    }

    #[test]
    fn insert_and_delete_roundtrip_text() {
        let mut doc = Document::new();
        doc.insert(0, "hello world");
        doc.delete(5..11);
        assert_eq!(doc.text(), "hello");
        doc.replace(0..5, "bye");
        assert_eq!(doc.text(), "bye");
        assert!(doc.version() >= 3);
    }

    #[test]
    fn patch_reports_inserted_region_and_version() {
        let mut doc = Document::new();
        let patch = doc.insert(0, "abc");
        assert_eq!(patch.changed, vec![0..3]);
        assert_eq!(patch.version, doc.version());
    }

    #[test]
    fn out_of_bounds_edit_is_skipped() {
        let mut doc = Document::from_bytes(b"abc").unwrap();
        let before = doc.version();
        let patch = doc.insert(99, "x");
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.version(), before);
        assert!(patch.changed.is_empty());
    }

    #[test]
    fn mid_character_edit_is_skipped() {
        let mut doc = Document::from_bytes("héllo".as_bytes()).unwrap();
        let before = doc.version();
        // offset 2 is inside the two-byte 'é'
        doc.insert(2, "x");
        assert_eq!(doc.text(), "héllo");
        assert_eq!(doc.version(), before);
    }

    #[test]
    fn selection_follows_edits() {
        let mut doc = Document::from_bytes(b"abcdef").unwrap();
        doc.set_selection(4..4);
        doc.insert(1, "xy");
        assert_eq!(doc.selection(), 6..6);
        doc.delete(0..3);
        assert_eq!(doc.selection(), 3..3);
    }

    #[test]
    fn unicode_text_is_preserved() {
        let text = "Hello 世界! 🦀";
        let doc = Document::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(doc.text(), text);
    }

    #[test]
    fn slice_to_cow_clamps() {
        let doc = Document::from_bytes(b"abc").unwrap();
        assert_eq!(doc.slice_to_cow(1..100), "bc");
        assert_eq!(doc.slice_to_cow(50..100), "");
    }

    #[test]
    fn clone_is_independent() {
        let mut doc = Document::from_bytes(b"abc").unwrap();
        let copy = doc.clone();
        doc.insert(3, "d");
        assert_eq!(copy.text(), "abc");
        assert_eq!(doc.text(), "abcd");
    }
}
