use super::{BlockHandler, ReconcileCtx, parent_of, set_block};
use crate::spans::{GrowthPolicy, Span, SpanId, SpanKind};

/// List items split, shift and remove themselves around newline edits.
/// Entering a newline on an empty trailing item removes the item rather
/// than adding another — the way out of a list is pressing Enter twice.
pub(crate) struct ListItemHandler;

impl ListItemHandler {
    fn new_item(
        ctx: &mut ReconcileCtx,
        start: usize,
        end: usize,
        nesting: usize,
    ) -> Option<SpanId> {
        set_block(
            ctx,
            Span::new(
                SpanKind::ListItem,
                crate::spans::Attributes::new(),
                nesting,
                start,
                end,
                GrowthPolicy::InclusiveInclusive,
            ),
        )
    }

    /// Drops a removed or superseded item from its list's bookkeeping.
    fn detach_from_list(ctx: &mut ReconcileCtx, id: SpanId, replacement: Option<SpanId>) {
        if let Some(list_id) = parent_of(ctx.spans, id)
            && let Some(list) = ctx.spans.get_mut(list_id)
            && list.last_item == Some(id)
        {
            list.last_item = replacement;
        }
    }
}

impl BlockHandler for ListItemHandler {
    fn matches(&self, kind: &SpanKind) -> bool {
        matches!(kind, SpanKind::ListItem)
    }

    fn on_newline_at_start(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        let Some(block) = ctx.spans.get(id) else {
            return;
        };
        let nesting = block.nesting;
        // a newline at the head of an item means a fresh empty item above
        // it; push the current one forward
        Self::new_item(ctx, newline, newline + 1, nesting);
        if let Some(block) = ctx.spans.get_mut(id)
            && newline + 1 <= block.end
        {
            block.start = newline + 1;
        }
    }

    fn on_empty_line_at_block_end(&self, ctx: &mut ReconcileCtx, id: SpanId, _newline: usize) {
        let parent = parent_of(ctx.spans, id);
        match parent {
            None => {
                // orphaned item; just drop it
                ctx.spans.remove(id);
            }
            Some(pid) => {
                let remove = match (ctx.spans.get(id), ctx.spans.get(pid)) {
                    (Some(item), Some(list)) => {
                        (list.start == 0 && list.end == 0) || item.end == list.end
                    }
                    _ => false,
                };
                if remove {
                    Self::detach_from_list(ctx, id, None);
                    ctx.spans.remove(id);
                }
            }
        }
    }

    fn on_empty_body(&self, ctx: &mut ReconcileCtx, id: SpanId, _newline: usize) {
        Self::detach_from_list(ctx, id, None);
        ctx.spans.remove(id);
    }

    fn on_newline_in_body(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        let Some(block) = ctx.spans.get(id) else {
            return;
        };
        let (bend, nesting) = (block.end, block.nesting);

        // a newline already queued for deletion is a double-enter artifact;
        // anchor the new item on the newline itself to avoid a collapse
        let mut new_start = newline + 1;
        if ctx.is_marked_for_deletion(&(newline..newline + 1)) {
            new_start = newline;
        }

        let created = Self::new_item(ctx, new_start, bend, nesting);
        if let Some(block) = ctx.spans.get_mut(id) {
            block.end = new_start.max(block.start);
        }
        if let Some(new_id) = created {
            Self::detach_from_list(ctx, id, Some(new_id));
        }
    }

    fn on_end_of_buffer_marker(&self, ctx: &mut ReconcileCtx, id: SpanId, marker: usize) {
        let Some(block) = ctx.spans.get_mut(id) else {
            return;
        };
        if block.start == marker {
            return;
        }
        // trailing-item creation is the list's job; here we only retract an
        // item that bled over the marker
        if block.end > marker && marker >= block.start {
            block.end = marker;
        }
    }
}
