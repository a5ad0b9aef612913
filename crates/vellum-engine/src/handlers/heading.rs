use super::{BlockHandler, ReconcileCtx, at_end_of_block, remove_block, set_block};
use crate::spans::{Span, SpanId, SpanKind};

/// Headings are strictly one line: an interior newline splits the heading
/// into a cloned sibling, and the end-of-buffer marker is pushed back out
/// of the range so a trailing empty line is not heading-styled.
pub(crate) struct HeadingHandler;

impl BlockHandler for HeadingHandler {
    fn matches(&self, kind: &SpanKind) -> bool {
        matches!(kind, SpanKind::Heading { .. })
    }

    fn on_newline_at_start(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        // push the heading past the fresh leading newline
        if let Some(block) = ctx.spans.get_mut(id)
            && newline + 1 <= block.end
        {
            block.start = newline + 1;
        }
    }

    fn on_empty_line_at_block_end(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        remove_block(ctx, id, newline);
    }

    fn on_empty_body(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        remove_block(ctx, id, newline);
    }

    fn on_newline_in_body(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        let Some(block) = ctx.spans.get(id) else {
            return;
        };
        let (bend, kind, attributes, nesting) = (
            block.end,
            block.kind.clone(),
            block.attributes.clone(),
            block.nesting,
        );
        // a newline on the last actual character just ends the block; any
        // deeper position splits it into two
        if !at_end_of_block(ctx, bend, newline) && newline + 1 < bend {
            set_block(
                ctx,
                Span::new(
                    kind,
                    attributes,
                    nesting,
                    newline + 1,
                    bend,
                    crate::spans::GrowthPolicy::InclusiveInclusive,
                ),
            );
        }
        if let Some(block) = ctx.spans.get_mut(id) {
            block.end = newline + 1;
        }
    }

    fn on_end_of_buffer_marker(&self, ctx: &mut ReconcileCtx, id: SpanId, marker: usize) {
        let Some(block) = ctx.spans.get_mut(id) else {
            return;
        };
        if block.start == marker {
            return;
        }
        // the heading bled over the marker; retract to just before it
        if block.end > marker && marker >= block.start {
            block.end = marker;
        }
    }
}
