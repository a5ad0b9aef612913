//! Block structural maintainers.
//!
//! After every mutation that inserted text, the inserted region is scanned
//! for newlines and end-of-buffer markers. Each newline is classified
//! against every block span it lands in, and the block's handler reacts:
//! splitting the block, shrinking it, removing it, or spawning a sibling.
//! The same machinery handles the end-of-buffer marker event so trailing
//! empty lines keep their block chrome.
//!
//! Handlers mutate spans and queue follow-up deletions; they never touch
//! the buffer text directly, so a single text snapshot stays valid for the
//! whole pass. A handler that cannot find the range it expects does
//! nothing — another pass will reconcile.

pub(crate) mod end_marker;
mod heading;
mod list;
mod list_item;
mod preformat;
mod quote;

use std::collections::VecDeque;

use crate::constants::{END_OF_BUFFER_MARKER, NEWLINE, is_filler};
use crate::editing::EditorLogger;
use crate::spans::{Span, SpanId, SpanKind, SpanStore};

use heading::HeadingHandler;
use list::ListHandler;
use list_item::ListItemHandler;
use preformat::PreformatHandler;
use quote::QuoteHandler;

/// Where a newly inserted newline sits relative to a block span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PositionType {
    StartOfBlock,
    EmptyLineAtBlockEnd,
    EmptyLineAtEmptyBody,
    BufferEnd,
    Body,
}

/// Mutable state shared by one reconciliation pass.
pub(crate) struct ReconcileCtx<'a> {
    /// Snapshot of the buffer after the raw mutation.
    pub text: &'a str,
    pub spans: &'a mut SpanStore,
    pub pending_deletions: &'a mut Vec<std::ops::Range<usize>>,
    /// Positions whose newline events should be replayed after the current
    /// event, set by handlers that retract a block out from under one.
    pub replays: Vec<usize>,
    pub logger: &'a dyn EditorLogger,
}

impl ReconcileCtx<'_> {
    pub(crate) fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..)?.chars().next()
    }

    pub(crate) fn prev_char(&self, pos: usize) -> Option<char> {
        self.text.get(..pos)?.chars().next_back()
    }

    pub(crate) fn mark_for_deletion(&mut self, range: std::ops::Range<usize>) {
        if !self.pending_deletions.contains(&range) {
            self.pending_deletions.push(range);
        }
    }

    pub(crate) fn is_marked_for_deletion(&self, range: &std::ops::Range<usize>) -> bool {
        self.pending_deletions
            .iter()
            .any(|r| r.start <= range.start && range.end <= r.end)
    }

    pub(crate) fn request_replay(&mut self, pos: usize) {
        self.replays.push(pos);
    }
}

/// Reaction hooks for one block kind. Defaults are all no-ops; each kind
/// overrides the cases it cares about.
pub(crate) trait BlockHandler {
    fn matches(&self, kind: &SpanKind) -> bool;

    fn should_handle(&self, block: &Span, nesting: usize) -> bool {
        block.nesting == nesting
    }

    fn on_newline_at_start(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _newline: usize) {}
    fn on_empty_line_at_block_end(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _newline: usize) {}
    fn on_empty_body(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _newline: usize) {}
    fn on_newline_at_text_end(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _newline: usize) {}
    fn on_newline_in_body(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _newline: usize) {}
    fn on_end_of_buffer_marker(&self, _ctx: &mut ReconcileCtx, _id: SpanId, _marker: usize) {}
}

fn handlers() -> [&'static dyn BlockHandler; 5] {
    [
        &HeadingHandler,
        &ListHandler,
        &ListItemHandler,
        &QuoteHandler,
        &PreformatHandler,
    ]
}

/// Entry point: dispatches the inserted region `[start, start+len)` to all
/// handlers, then services replay requests until none remain.
pub(crate) fn handle_text_changed(ctx: &mut ReconcileCtx, start: usize, len: usize) {
    let mut queue: VecDeque<(usize, usize, bool)> = VecDeque::new();
    queue.push_back((start, len, false));

    let mut rounds = 0;
    while let Some((start, len, is_replay)) = queue.pop_front() {
        rounds += 1;
        if rounds > 64 {
            ctx.logger.warn("replay limit reached during reconciliation");
            break;
        }
        let end = (start + len).min(ctx.text.len());
        let start = start.min(end);
        if ctx.text.get(start..end).is_none() {
            continue;
        }
        let nesting = nesting_level_at(ctx.text, ctx.spans, start, end);
        for handler in handlers() {
            drive(handler, ctx, start, end, nesting, is_replay);
        }
        let replays: Vec<usize> = ctx.replays.drain(..).collect();
        for pos in replays {
            queue.push_back((pos, NEWLINE.len_utf8(), true));
        }
    }
}

fn drive(
    handler: &dyn BlockHandler,
    ctx: &mut ReconcileCtx,
    start: usize,
    end: usize,
    nesting: usize,
    is_replay: bool,
) {
    let Some(region) = ctx.text.get(start..end) else {
        return;
    };
    let got_marker = {
        let mut chars = region.chars();
        chars.next() == Some(END_OF_BUFFER_MARKER) && chars.next().is_none()
    };

    let ids: Vec<SpanId> = ctx
        .spans
        .touching(start, end)
        .into_iter()
        .filter(|id| {
            ctx.spans
                .get(*id)
                .is_some_and(|s| handler.matches(&s.kind))
        })
        .collect();

    let newlines: Vec<usize> = region
        .char_indices()
        .filter(|(_, c)| *c == NEWLINE)
        .map(|(off, _)| start + off)
        .collect();

    for id in ids {
        for &newline in &newlines {
            let Some(block) = ctx.spans.get(id) else {
                break;
            };
            if !handler.should_handle(block, nesting) {
                continue;
            }
            let (bstart, bend) = (block.start, block.end);
            // a newline outside the block is some other span's business
            if newline < bstart || newline >= bend {
                continue;
            }
            match classify(ctx, bstart, bend, newline, is_replay) {
                PositionType::StartOfBlock => handler.on_newline_at_start(ctx, id, newline),
                PositionType::EmptyLineAtBlockEnd => {
                    handler.on_empty_line_at_block_end(ctx, id, newline)
                }
                PositionType::EmptyLineAtEmptyBody => handler.on_empty_body(ctx, id, newline),
                PositionType::BufferEnd => handler.on_newline_at_text_end(ctx, id, newline),
                PositionType::Body => handler.on_newline_in_body(ctx, id, newline),
            }
        }
        if got_marker {
            let eligible = ctx
                .spans
                .get(id)
                .is_some_and(|block| handler.should_handle(block, nesting));
            if eligible {
                handler.on_end_of_buffer_marker(ctx, id, start);
            }
        }
    }
}

pub(crate) fn classify(
    ctx: &ReconcileCtx,
    bstart: usize,
    bend: usize,
    newline: usize,
    is_replay: bool,
) -> PositionType {
    if newline == bstart && block_visually_empty(ctx.text, bstart, bend) {
        return PositionType::EmptyLineAtEmptyBody;
    }

    let at_end = at_end_of_block(ctx, bend, newline) || newline + 1 == ctx.text.len();

    if newline == bstart && !at_end {
        return PositionType::StartOfBlock;
    }
    if newline == bstart {
        return PositionType::EmptyLineAtBlockEnd;
    }

    // a newline right after a newline at the block's end is the
    // "double-enter" shape; the previous one must sit at the same nesting
    // level or this is an inner block's business
    if ctx.prev_char(newline) == Some(NEWLINE) {
        let prev_nesting = nesting_level_at(ctx.text, ctx.spans, newline - 1, newline);
        let curr_nesting = nesting_level_at(ctx.text, ctx.spans, newline, newline + 1);
        if (prev_nesting == curr_nesting || (prev_nesting > curr_nesting && !is_replay)) && at_end {
            return PositionType::EmptyLineAtBlockEnd;
        }
    }

    if newline + 1 == ctx.text.len() {
        return PositionType::BufferEnd;
    }

    PositionType::Body
}

/// True when the newline sits on the block's last actual character: the
/// only thing after it inside the block is the block's visual newline or
/// the end-of-buffer marker.
pub(crate) fn at_end_of_block(ctx: &ReconcileCtx, bend: usize, newline: usize) -> bool {
    let after = newline + 1;
    match ctx.char_at(after) {
        Some(c) => after + c.len_utf8() == bend && (c == NEWLINE || c == END_OF_BUFFER_MARKER),
        None => false,
    }
}

/// A block is visually empty when it holds nothing but filler characters
/// and at most one newline.
pub(crate) fn block_visually_empty(text: &str, bstart: usize, bend: usize) -> bool {
    let Some(content) = text.get(bstart..bend.min(text.len())) else {
        return false;
    };
    let mut newlines = 0;
    for c in content.chars() {
        if is_filler(c) {
            continue;
        }
        if c == NEWLINE {
            newlines += 1;
            if newlines > 1 {
                return false;
            }
            continue;
        }
        return false;
    }
    true
}

/// The deepest nesting level active over `[index, next]`, ignoring spans
/// that merely end at `index` after a completed line.
pub(crate) fn nesting_level_at(
    text: &str,
    spans: &SpanStore,
    index: usize,
    next: usize,
) -> usize {
    let prev_is_newline = index > 0
        && text
            .get(..index)
            .and_then(|t| t.chars().next_back())
            .is_some_and(|c| c == NEWLINE);
    spans
        .touching(index, next)
        .into_iter()
        .filter_map(|id| spans.get(id))
        .filter(|s| s.kind.is_nestable())
        .filter(|s| s.end != index || index == 0 || !prev_is_newline)
        .map(|s| s.nesting)
        .max()
        .unwrap_or(0)
}

/// The closest enclosing nestable span: covers the child's start and sits
/// at a shallower nesting level.
pub(crate) fn parent_of(spans: &SpanStore, id: SpanId) -> Option<SpanId> {
    let child = spans.get(id)?;
    let (start, nesting) = (child.start, child.nesting);
    spans
        .touching(start, start + 1)
        .into_iter()
        .filter(|pid| *pid != id)
        .filter_map(|pid| spans.get(pid).map(|s| (pid, s)))
        .filter(|(_, s)| s.kind.is_nestable() && s.nesting < nesting)
        .max_by_key(|(_, s)| s.nesting)
        .map(|(pid, _)| pid)
}

/// Inserts a block span, refusing (with a warning) degenerate or
/// misaligned ranges so a bad pass cannot corrupt the store.
pub(crate) fn set_block(ctx: &mut ReconcileCtx, span: Span) -> Option<SpanId> {
    if span.start >= span.end {
        ctx.logger.warn(&format!(
            "refusing degenerate block span {:?} at {}..{}",
            span.kind, span.start, span.end
        ));
        return None;
    }
    let on_boundary = span.start == 0
        || ctx.prev_char(span.start) == Some(NEWLINE)
        || ctx.is_marked_for_deletion(&(span.start..span.start + 1));
    if !on_boundary {
        ctx.logger.warn(&format!(
            "block span {:?} would start mid-line at {}; skipping",
            span.kind, span.start
        ));
        return None;
    }
    Some(ctx.spans.insert(span))
}

/// Shared "double-enter at block end" reaction: retract the block to before
/// the newline, queue the newline for deletion, and replay so outer blocks
/// can reprocess it.
pub(crate) fn shrink_to_newline(ctx: &mut ReconcileCtx, id: SpanId, newline: usize, replay: bool) {
    if let Some(block) = ctx.spans.get_mut(id) {
        block.end = newline.max(block.start);
    }
    ctx.mark_for_deletion(newline..newline + 1);
    if replay {
        ctx.request_replay(newline);
    }
}

/// Shared "empty block" reaction: drop the block and the newline that
/// closed it.
pub(crate) fn remove_block(ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
    ctx.spans.remove(id);
    ctx.mark_for_deletion(newline..newline + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::NoopLogger;
    use crate::spans::{Attributes, GrowthPolicy};
    use rstest::rstest;

    fn store_with(spans: Vec<Span>) -> SpanStore {
        let mut store = SpanStore::new();
        for s in spans {
            store.insert(s);
        }
        store
    }

    fn block(kind: SpanKind, nesting: usize, start: usize, end: usize) -> Span {
        Span::new(
            kind,
            Attributes::new(),
            nesting,
            start,
            end,
            GrowthPolicy::InclusiveInclusive,
        )
    }

    fn classify_in(
        text: &str,
        spans: &mut SpanStore,
        bstart: usize,
        bend: usize,
        newline: usize,
    ) -> PositionType {
        let mut pending = Vec::new();
        let ctx = ReconcileCtx {
            text,
            spans,
            pending_deletions: &mut pending,
            replays: Vec::new(),
            logger: &NoopLogger,
        };
        classify(&ctx, bstart, bend, newline, false)
    }

    #[rstest]
    // interior newline
    #[case("A\nB\nx", 0, 4, 1, PositionType::Body)]
    // newline at start of a non-empty block
    #[case("\nAB\nx", 0, 4, 0, PositionType::StartOfBlock)]
    // newline as the very last character of the buffer
    #[case("AB\n", 0, 3, 2, PositionType::BufferEnd)]
    fn newline_positions(
        #[case] text: &str,
        #[case] bstart: usize,
        #[case] bend: usize,
        #[case] newline: usize,
        #[case] expected: PositionType,
    ) {
        let mut spans = store_with(vec![block(SpanKind::Quote, 1, bstart, bend)]);
        assert_eq!(classify_in(text, &mut spans, bstart, bend, newline), expected);
    }

    #[test]
    fn newline_at_start_of_empty_block_is_empty_body() {
        // block holds only the newline
        let text = "\nx";
        let mut spans = store_with(vec![block(SpanKind::Quote, 1, 0, 1)]);
        assert_eq!(
            classify_in(text, &mut spans, 0, 1, 0),
            PositionType::EmptyLineAtEmptyBody
        );
    }

    #[test]
    fn double_enter_at_block_end() {
        // "q\n" then a second newline right before the end-of-buffer marker
        let text = "q\n\n\u{200B}";
        let mut spans = store_with(vec![block(SpanKind::Quote, 1, 0, 6)]);
        assert_eq!(
            classify_in(text, &mut spans, 0, 6, 2),
            PositionType::EmptyLineAtBlockEnd
        );
    }

    #[test]
    fn newline_at_start_with_only_marker_is_empty_body() {
        let text = "\n\u{200B}";
        let mut spans = store_with(vec![block(SpanKind::Quote, 1, 0, 4)]);
        assert_eq!(
            classify_in(text, &mut spans, 0, 4, 0),
            PositionType::EmptyLineAtEmptyBody
        );
    }

    #[test]
    fn visually_empty_blocks() {
        assert!(block_visually_empty("\n", 0, 1));
        assert!(block_visually_empty("\u{200B}\n", 0, 4));
        assert!(block_visually_empty("\n\u{200B}", 0, 4));
        assert!(!block_visually_empty("a\n", 0, 2));
        assert!(!block_visually_empty("\n\n", 0, 2));
    }

    #[test]
    fn nesting_level_ignores_span_ending_after_line() {
        let text = "a\nb";
        let mut store = SpanStore::new();
        store.insert(block(SpanKind::Quote, 1, 0, 2));
        // the quote ends at 2, right after its newline, so position 2 is
        // outside it
        assert_eq!(nesting_level_at(text, &store, 2, 3), 0);
        assert_eq!(nesting_level_at(text, &store, 1, 2), 1);
        store.insert(block(SpanKind::UnorderedList, 1, 2, 3));
        store.insert(block(SpanKind::ListItem, 2, 2, 3));
        assert_eq!(nesting_level_at(text, &store, 2, 3), 2);
    }

    #[test]
    fn parent_lookup() {
        let mut store = SpanStore::new();
        let list = store.insert(block(SpanKind::UnorderedList, 1, 0, 4));
        let item = store.insert(block(SpanKind::ListItem, 2, 0, 2));
        assert_eq!(parent_of(&store, item), Some(list));
        assert_eq!(parent_of(&store, list), None);
    }

    #[test]
    fn set_block_refuses_degenerate_and_mid_line_ranges() {
        let text = "ab\ncd";
        let mut spans = SpanStore::new();
        let mut pending = Vec::new();
        let mut ctx = ReconcileCtx {
            text,
            spans: &mut spans,
            pending_deletions: &mut pending,
            replays: Vec::new(),
            logger: &NoopLogger,
        };
        assert!(set_block(&mut ctx, block(SpanKind::Quote, 1, 2, 2)).is_none());
        assert!(set_block(&mut ctx, block(SpanKind::Quote, 1, 1, 4)).is_none());
        assert!(set_block(&mut ctx, block(SpanKind::Quote, 1, 3, 5)).is_some());
    }
}
