//! Leveled diagnostic messages and the context that routes them.
//!
//! Nothing in this crate writes to a terminal or log directly; every
//! diagnostic flows through a [`Messaging`] context, which is the only
//! place suppression, warning elevation and display policy are evaluated.
//! The context is threaded explicitly through the operations that raise
//! messages and must be reset per logical run with
//! [`Messaging::begin_session`] when reused.

use fxhash::FxHashSet;

use crate::source::SourceLineNumber;

/// Severity of a diagnostic message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Nothing,
    Verbose,
    Warning,
    Error,
}

/// One diagnostic, identified by a stable numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: u32,
    level: Level,
    source: Option<SourceLineNumber>,
    text: String,
}

impl Message {
    pub fn new(level: Level, id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            level,
            source: None,
            text: text.into(),
        }
    }

    pub fn verbose(id: u32, text: impl Into<String>) -> Self {
        Self::new(Level::Verbose, id, text)
    }

    pub fn warning(id: u32, text: impl Into<String>) -> Self {
        Self::new(Level::Warning, id, text)
    }

    pub fn error(id: u32, text: impl Into<String>) -> Self {
        Self::new(Level::Error, id, text)
    }

    pub fn with_source(mut self, source: SourceLineNumber) -> Self {
        self.source = Some(source);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn source(&self) -> Option<&SourceLineNumber> {
        self.source.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Raised when an error-level message reaches a context with no listener
/// attached.
#[derive(Debug, PartialEq, Eq)]
pub struct FatalMessage {
    pub id: u32,
    pub text: String,
    pub source: Option<SourceLineNumber>,
}

impl std::fmt::Display for FatalMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}: {}", self.id, self.text)
    }
}

impl std::error::Error for FatalMessage {}

impl From<Message> for FatalMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            text: message.text,
            source: message.source,
        }
    }
}

/// Receives messages the context decided to display.
pub trait MessageListener {
    fn display(&mut self, message: &Message);
}

impl<F: FnMut(&Message)> MessageListener for F {
    fn display(&mut self, message: &Message) {
        self(message)
    }
}

/// Diagnostic policy and accumulated state for one logical run.
#[derive(Default)]
pub struct Messaging {
    suppressed_warnings: FxHashSet<u32>,
    elevated_warnings: FxHashSet<u32>,
    warnings_as_errors: bool,
    show_verbose: bool,
    error_seen: bool,
    listener: Option<Box<dyn MessageListener>>,
}

impl std::fmt::Debug for Messaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messaging")
            .field("suppressed_warnings", &self.suppressed_warnings)
            .field("elevated_warnings", &self.elevated_warnings)
            .field("warnings_as_errors", &self.warnings_as_errors)
            .field("show_verbose", &self.show_verbose)
            .field("error_seen", &self.error_seen)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl Messaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-run state. Policy configuration (suppressions,
    /// elevations) is kept; the seen-error flag is not.
    pub fn begin_session(&mut self) {
        self.error_seen = false;
    }

    pub fn suppress_warning(&mut self, id: u32) {
        self.suppressed_warnings.insert(id);
    }

    pub fn elevate_warning(&mut self, id: u32) {
        self.elevated_warnings.insert(id);
    }

    pub fn set_warnings_as_errors(&mut self, enabled: bool) {
        self.warnings_as_errors = enabled;
    }

    pub fn set_show_verbose(&mut self, enabled: bool) {
        self.show_verbose = enabled;
    }

    pub fn set_listener(&mut self, listener: impl MessageListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Whether any error-level message has been reported this session.
    pub fn error_seen(&self) -> bool {
        self.error_seen
    }

    /// Route `message` through the configured policy.
    ///
    /// Warnings may be suppressed or elevated to errors; an error-level
    /// message with no listener attached escalates to a returned
    /// [`FatalMessage`].
    pub fn report(&mut self, message: Message) -> Result<(), FatalMessage> {
        let message = match message.level {
            Level::Nothing => return Ok(()),
            Level::Verbose if !self.show_verbose => return Ok(()),
            Level::Verbose => message,
            Level::Warning => {
                if self.suppressed_warnings.contains(&message.id) {
                    return Ok(());
                }
                if self.warnings_as_errors || self.elevated_warnings.contains(&message.id) {
                    Message {
                        level: Level::Error,
                        ..message
                    }
                } else {
                    message
                }
            }
            Level::Error => message,
        };

        if message.level == Level::Error {
            self.error_seen = true;
            match &mut self.listener {
                Some(listener) => listener.display(&message),
                None => return Err(message.into()),
            }
        } else if let Some(listener) = &mut self.listener {
            listener.display(&message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn capture() -> (Rc<RefCell<Vec<Message>>>, Messaging) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut messaging = Messaging::new();
        messaging.set_listener(move |message: &Message| sink.borrow_mut().push(message.clone()));
        (seen, messaging)
    }

    #[test]
    fn suppressed_warnings_are_dropped() {
        let (seen, mut messaging) = capture();
        messaging.suppress_warning(1044);
        messaging.report(Message::warning(1044, "ignored")).unwrap();
        messaging.report(Message::warning(1045, "kept")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert!(!messaging.error_seen());
    }

    #[test]
    fn elevated_warnings_become_errors() {
        let (seen, mut messaging) = capture();
        messaging.elevate_warning(1044);
        messaging.report(Message::warning(1044, "now fatal")).unwrap();
        assert_eq!(seen.borrow()[0].level(), Level::Error);
        assert!(messaging.error_seen());
    }

    #[test]
    fn errors_without_listener_escalate() {
        let mut messaging = Messaging::new();
        let error = messaging
            .report(Message::error(17, "no handler attached"))
            .unwrap_err();
        assert_eq!(error.id, 17);
        assert!(messaging.error_seen());
    }

    #[test]
    fn begin_session_clears_error_flag_but_keeps_policy() {
        let mut messaging = Messaging::new();
        messaging.suppress_warning(9);
        let _ = messaging.report(Message::error(1, "boom"));
        assert!(messaging.error_seen());

        messaging.begin_session();
        assert!(!messaging.error_seen());
        messaging.report(Message::warning(9, "still suppressed")).unwrap();
        assert!(!messaging.error_seen());
    }

    #[test]
    fn verbose_is_gated() {
        let (seen, mut messaging) = capture();
        messaging.report(Message::verbose(3, "hidden")).unwrap();
        assert!(seen.borrow().is_empty());
        messaging.set_show_verbose(true);
        messaging.report(Message::verbose(3, "shown")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }
}
