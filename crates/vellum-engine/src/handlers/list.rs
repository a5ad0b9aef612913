use super::{BlockHandler, ReconcileCtx, set_block, shrink_to_newline};
use crate::constants::MARKER_LEN;
use crate::spans::{Attributes, GrowthPolicy, Span, SpanId, SpanKind};

/// Lists react like a generic block to double-enter (retract, queue the
/// newline for deletion, replay for outer blocks) and own the trailing
/// end-of-buffer item: when the marker lands at the tail of the list, a new
/// empty item wraps it so the empty last line still shows its bullet.
pub(crate) struct ListHandler;

impl BlockHandler for ListHandler {
    fn matches(&self, kind: &SpanKind) -> bool {
        kind.is_list()
    }

    fn should_handle(&self, block: &crate::spans::Span, nesting: usize) -> bool {
        // a list wraps its items, so it reacts one level above them too
        block.nesting + 1 == nesting || block.nesting == nesting
    }

    fn on_empty_line_at_block_end(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        shrink_to_newline(ctx, id, newline, true);
    }

    fn on_empty_body(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        super::remove_block(ctx, id, newline);
    }

    fn on_end_of_buffer_marker(&self, ctx: &mut ReconcileCtx, id: SpanId, marker: usize) {
        let Some(list) = ctx.spans.get(id) else {
            return;
        };
        if !list.contains(marker) {
            return;
        }
        let item_nesting = list.nesting + 1;
        let last_item = list.last_item;

        if let Some(last_id) = last_item
            && let Some(item) = ctx.spans.get(last_id)
            && item.start == marker
        {
            // the marker already heads an item; nothing to do
            return;
        }

        let created = set_block(
            ctx,
            Span::new(
                SpanKind::ListItem,
                Attributes::new(),
                item_nesting,
                marker,
                marker + MARKER_LEN,
                GrowthPolicy::InclusiveInclusive,
            ),
        );
        let Some(new_id) = created else { return };

        // an item that bled over the marker retracts to just before it
        if let Some(last_id) = last_item
            && let Some(item) = ctx.spans.get_mut(last_id)
            && item.start < marker
            && item.end > marker
        {
            item.end = marker;
        }
        if let Some(list) = ctx.spans.get_mut(id) {
            list.last_item = Some(new_id);
        }
    }
}
