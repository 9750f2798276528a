//! Per-run context
//!
//! Holds the settings that come from the command line and the error lines
//! collected for the end-of-run notification. It is created once in `main`
//! and threaded through the run by reference.

use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::Error;
use crate::traits::{NoopNotifier, Notifier};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Title of the consolidated error notification
pub const ERROR_TITLE: &str = "QCIP | Error";

/// Title of the success notification
pub const SUCCESS_TITLE: &str = "QCIP | Success";

/// Settings and accumulated output for one run
pub struct RunContext {
    config_path: PathBuf,
    ip_override: Option<IpAddr>,
    notify_enabled: bool,
    notifier: Box<dyn Notifier>,
    pending_errors: Vec<String>,
}

impl RunContext {
    /// Context with the default config path and notifications off
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            ip_override: None,
            notify_enabled: false,
            notifier: Box::new(NoopNotifier),
            pending_errors: Vec::new(),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Use `ip` instead of asking an IP echo service
    pub fn with_ip_override(mut self, ip: Option<IpAddr>) -> Self {
        self.ip_override = ip;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Turn notifications on; errors reported from now on are collected
    pub fn enable_notifications(&mut self) {
        self.notify_enabled = true;
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notify_enabled
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn ip_override(&self) -> Option<IpAddr> {
        self.ip_override
    }

    /// Error lines waiting for the end-of-run notification, oldest first
    pub fn pending_errors(&self) -> &[String] {
        &self.pending_errors
    }

    /// Print an error and, with notifications on, keep it for the summary
    pub fn report_error(&mut self, err: &Error) {
        for line in err.to_string().lines() {
            self.report_line(line);
        }
    }

    /// Print a single error line
    pub fn report_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        error!("{}", line);
        if self.notify_enabled {
            self.pending_errors.push(line);
        }
    }

    /// Print a warning and, with notifications on, keep it for the summary
    pub fn report_warning(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!("{}", line);
        if self.notify_enabled {
            self.pending_errors.push(line);
        }
    }

    /// Show a success notification when enabled
    pub fn notify_success(&self, message: &str) {
        if self.notify_enabled {
            self.deliver(SUCCESS_TITLE, message, true);
        }
    }

    /// Send every collected error as one notification and clear the list
    ///
    /// Called right before exiting on a fatal error.
    pub fn flush_errors(&mut self) {
        if !self.notify_enabled || self.pending_errors.is_empty() {
            return;
        }

        let message = self
            .pending_errors
            .drain(..)
            .map(|line| line.replace('\t', "    "))
            .collect::<Vec<_>>()
            .join("\n");
        self.deliver(ERROR_TITLE, &message, false);
    }

    fn deliver(&self, title: &str, message: &str, succeeded: bool) {
        if let Err(e) = self.notifier.notify(title, message, succeeded) {
            error!("{}", e);
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
