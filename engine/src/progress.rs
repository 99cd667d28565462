//! Caller-supplied sink traits.
//!
//! This module defines the three sink traits through which the engine
//! talks back to its caller, decoupling the copy logic from any specific
//! UI technology (CLI, GUI, etc.).
//!
//! All sinks are called synchronously during session execution. A sink
//! implementation must not start another backup run from inside a
//! callback; the engine rejects re-entrant invocation.

/// Receives progress updates during a session.
///
/// Every field is independently optional; the engine omits fields that
/// did not change for a given report.
pub trait ProgressSink: Send {
    /// Called multiple times per run.
    ///
    /// * `status_text` - current activity or the path being copied
    /// * `percent` - overall progress, 0 to 100
    /// * `disable_backup` - whether the caller should block further
    ///   backup invocations (true at run start, false at run end)
    fn report(&self, status_text: Option<&str>, percent: Option<u8>, disable_backup: Option<bool>);
}

/// Asks the caller a yes/no question.
///
/// Used once per run at most, when the destination directory is absent
/// but its root component exists. When no confirm sink is supplied the
/// engine treats the answer as "no".
pub trait ConfirmSink: Send {
    fn confirm(&self, title: &str, text: &str) -> bool;
}

/// Receives validation failures.
pub trait ErrorSink: Send {
    fn error(&self, title: &str, text: &str);
}
