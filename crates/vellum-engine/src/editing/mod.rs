/*!
 * The editing core: one mutable buffer, a command pipeline, and the
 * reconciliation machinery around it.
 *
 * ## Architecture
 *
 * - **Single source of truth**: the whole document lives in one
 *   `xi_rope::Rope` buffer owned by [`Document`]. Spans annotate byte
 *   ranges of it; nothing else stores text.
 * - **Command-based editing**: every mutation is a [`Cmd`] compiled to a
 *   rope delta and applied atomically. The result is a [`Patch`] describing
 *   what changed, where the selection moved, and the new version.
 * - **Three-phase mutation**: raw edit, then a synchronous reconciliation
 *   pass (block maintainers + end-marker maintenance), then observer
 *   notification. Reconciliation never issues further edits synchronously;
 *   follow-up deletions queue for the next tick.
 * - **Observers**: collaborators register [`ContentChangeObserver`] handles
 *   held weakly by the document.
 * - **Injected logging**: invariant violations are reported through the
 *   document's [`EditorLogger`]; the default is a no-op.
 */

pub mod commands;
pub mod document;
pub mod logger;
pub mod observer;
pub mod patch;

pub use commands::Cmd;
pub use document::{Document, DocumentError};
pub use logger::{EditorLogger, NoopLogger, TracingLogger};
pub use observer::ContentChangeObserver;
pub use patch::Patch;
