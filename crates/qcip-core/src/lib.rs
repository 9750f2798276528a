// # qcip-core
//
// Core library for qcip, which keeps cloud firewall rules pointed at the
// operator's current public IP.
//
// ## Architecture Overview
//
// - **Config**: Loads and validates the JSON config file
// - **IpSource**: One attempt at asking an "echo my IP" service
// - **resolve_ip**: Bounded retry loop around an `IpSource`
// - **FirewallProvider**: Fetches and replaces a cloud firewall's rules
// - **reconcile**: Rewrites tagged rules that no longer allow the current IP
// - **FirewallSync**: Runs one resolve → fetch → reconcile → update pass
// - **ProviderRegistry**: Maps machine types to provider factories
// - **RunContext**: Per-run settings and the end-of-run error summary
//
// ## Design Principles
//
// 1. **Single pass**: No daemon, no persisted state; schedule runs externally
// 2. **Library-first**: Everything the binary does can be driven from here
// 3. **Provider isolation**: Providers make single API calls; retries and
//    update decisions live in this crate

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod version;

// Re-export core types for convenience
pub use config::{Config, Credentials, MachineType, Target};
pub use context::RunContext;
pub use engine::{FirewallSync, SyncOutcome};
pub use error::{Error, Result};
pub use reconcile::{Reconciliation, reconcile};
pub use registry::ProviderRegistry;
pub use resolver::{RetryPolicy, resolve_ip, resolve_ip_in};
pub use traits::{FirewallProvider, FirewallRule, IpSource, Notifier, RuleSet};

/// User-Agent sent with every outgoing HTTP request
pub const USER_AGENT: &str = concat!("qcip/", env!("CARGO_PKG_VERSION"));
