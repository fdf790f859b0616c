//! Channel for user facing warnings.

/// Receives warnings meant for the operator.
///
/// Implemented for closures taking the message, and for `Vec<String>` which
/// collects the messages.
pub trait Warn {
    /// Emit a warning.
    fn warn(&mut self, message: String);
}

impl<F: FnMut(String)> Warn for F {
    fn warn(&mut self, message: String) {
        self(message);
    }
}

impl Warn for Vec<String> {
    fn warn(&mut self, message: String) {
        self.push(message);
    }
}
