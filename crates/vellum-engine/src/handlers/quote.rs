use super::{BlockHandler, ReconcileCtx, remove_block};
use crate::spans::{SpanId, SpanKind};

/// Quotes engulf newlines at the text end and only react to the
/// double-enter shapes: an empty line at the end retracts the quote, an
/// empty quote removes itself.
pub(crate) struct QuoteHandler;

impl BlockHandler for QuoteHandler {
    fn matches(&self, kind: &SpanKind) -> bool {
        matches!(kind, SpanKind::Quote)
    }

    fn on_empty_line_at_block_end(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        // keep only the chars before the newline just added
        if let Some(block) = ctx.spans.get_mut(id) {
            block.end = newline.max(block.start);
        }
        ctx.mark_for_deletion(newline..newline + 1);
    }

    fn on_empty_body(&self, ctx: &mut ReconcileCtx, id: SpanId, newline: usize) {
        remove_block(ctx, id, newline);
    }
}
