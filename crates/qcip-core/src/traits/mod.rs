//! Core traits for qcip
//!
//! These are the seams between the reconciliation logic and the outside world:
//!
//! - [`IpSource`]: One attempt at asking a remote service for our public IP
//! - [`FirewallProvider`]: Fetch and replace a cloud firewall's rule set
//! - [`Notifier`]: Desktop notification sink

pub mod firewall_provider;
pub mod ip_source;
pub mod notifier;

pub use firewall_provider::{FirewallProvider, FirewallProviderFactory, FirewallRule, RuleSet};
pub use ip_source::IpSource;
pub use notifier::{Notifier, NoopNotifier};
