pub mod constants;
pub mod editing;
mod handlers;
pub mod html;
pub mod spans;

// Re-export key types for easier usage
pub use editing::{
    Cmd, ContentChangeObserver, Document, DocumentError, EditorLogger, NoopLogger, Patch,
    TracingLogger,
};
pub use html::{CURSOR_TAG, parse, serialize, serialize_with_cursor};
pub use spans::{Attributes, GrowthPolicy, Span, SpanId, SpanKind, SpanStore};
