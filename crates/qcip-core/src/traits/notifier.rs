//! Notification sink
//!
//! Notifications are best effort: a failed delivery is logged by the caller
//! and never aborts a run.

/// Trait for desktop notification backends
pub trait Notifier: Send + Sync {
    /// Show one notification
    fn notify(&self, title: &str, message: &str, succeeded: bool) -> Result<(), crate::Error>;
}

/// Notifier that drops everything (platforms without a toast backend)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str, _succeeded: bool) -> Result<(), crate::Error> {
        Ok(())
    }
}
