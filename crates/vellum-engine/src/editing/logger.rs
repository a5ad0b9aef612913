//! Injected logging handle.
//!
//! The engine never logs through a global hook; warnings flow through
//! whatever logger the document was constructed with. The default discards
//! everything.

pub trait EditorLogger {
    fn warn(&self, message: &str);
}

/// Discards all messages. The default for new documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl EditorLogger for NoopLogger {
    fn warn(&self, _message: &str) {}
}

/// Forwards warnings to the `tracing` subscriber, if one is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EditorLogger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "vellum", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    pub struct CapturingLogger {
        pub messages: RefCell<Vec<String>>,
    }

    impl EditorLogger for CapturingLogger {
        fn warn(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn capturing_logger_records() {
        let logger = Rc::new(CapturingLogger::default());
        logger.warn("something drifted");
        assert_eq!(logger.messages.borrow().len(), 1);
    }
}
