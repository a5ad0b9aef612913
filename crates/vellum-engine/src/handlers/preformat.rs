use super::{BlockHandler, ReconcileCtx, at_end_of_block, remove_block, set_block};
use crate::spans::{GrowthPolicy, Span, SpanId, SpanKind};

/// Preformatted blocks behave like headings structurally: push past a
/// leading newline, split on interior newlines, vanish when emptied.
pub(crate) struct PreformatHandler;

impl BlockHandler for PreformatHandler {
    fn matches(&self, kind: &SpanKind) -> bool {
        matches!(kind, SpanKind::Preformat)
    }

    fn on_newline_at_start(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
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
        let (bend, attributes, nesting) = (block.end, block.attributes.clone(), block.nesting);
        if !at_end_of_block(ctx, bend, newline) && newline + 1 < bend {
            set_block(
                ctx,
                Span::new(
                    SpanKind::Preformat,
                    attributes,
                    nesting,
                    newline + 1,
                    bend,
                    GrowthPolicy::InclusiveInclusive,
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
        if block.start != marker && block.end > marker && marker >= block.start {
            block.end = marker;
        }
    }
}
