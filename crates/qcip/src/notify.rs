//! Desktop notifications
//!
//! Toast cards are only supported on Windows. Everywhere else the run
//! uses `NoopNotifier` and the `-n` flag is refused during parsing.

use qcip_core::traits::Notifier;

#[cfg(windows)]
use qcip_core::Error;

/// Windows toast notifier
#[cfg(windows)]
pub struct ToastNotifier;

#[cfg(windows)]
impl Notifier for ToastNotifier {
    fn notify(&self, title: &str, message: &str, succeeded: bool) -> Result<(), Error> {
        tracing::debug!("Sending notification: {} (succeeded: {})", title, succeeded);

        notify_rust::Notification::new()
            .appname("QCIP")
            .summary(title)
            .body(message)
            .show()
            .map(|_| ())
            .map_err(|e| Error::notify(e.to_string()))
    }
}

/// The notifier for this platform
pub fn desktop_notifier() -> Box<dyn Notifier> {
    #[cfg(windows)]
    {
        Box::new(ToastNotifier)
    }

    #[cfg(not(windows))]
    {
        Box::new(qcip_core::traits::NoopNotifier)
    }
}
