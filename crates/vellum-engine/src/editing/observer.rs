//! Content-change observation.
//!
//! Collaborators (history, source view, autosave) register observer handles
//! on the document. The document holds weak references only: dropping the
//! observer unregisters it, and nothing in the observer direction keeps the
//! document alive.

pub trait ContentChangeObserver {
    fn on_content_changed(&self, version: u64);
}
