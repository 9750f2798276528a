//! Firewall sync engine
//!
//! The engine runs one reconciliation pass:
//!
//! ```text
//! ┌─────────────┐   IpAddr   ┌──────────────┐  RuleSet  ┌──────────────────┐
//! │  IpSource   │──────────▶│ FirewallSync │◀─────────▶│ FirewallProvider │
//! │ (+ retries) │            └──────────────┘           │ (fetch / update) │
//! └─────────────┘                   │                   └──────────────────┘
//!                                   ▼
//!                            ┌─────────────┐
//!                            │ reconcile() │
//!                            └─────────────┘
//! ```
//!
//! 1. Resolve the current IP (or take the override)
//! 2. Fetch the provider's rules
//! 3. Rewrite the addresses of tagged rules that drifted
//! 4. Send the update only if something changed
//!
//! There is no loop and no state between runs; the operator schedules
//! repeated runs externally.

use crate::config::Config;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::reconcile::reconcile;
use crate::resolver::{RetryPolicy, resolve_ip_in};
use crate::traits::{FirewallProvider, IpSource};
use std::net::IpAddr;
use tracing::{debug, info};

/// Message logged (and notified) after a successful update
pub const UPDATED_MESSAGE: &str = "Successfully modified the firewall rules";

/// Message logged (and notified) when nothing needed changing
pub const UNCHANGED_MESSAGE: &str = "IP is the same";

/// What a sync pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Tagged rules were rewritten and the update call succeeded
    Updated {
        /// The IP the rules now allow
        ip: IpAddr,
        /// How many rules changed
        rules_changed: usize,
    },

    /// Every tagged rule already allowed the current IP
    Unchanged {
        /// The current IP
        ip: IpAddr,
    },
}

impl SyncOutcome {
    /// Human-readable summary, used for the success notification
    pub fn message(&self) -> &'static str {
        match self {
            SyncOutcome::Updated { .. } => UPDATED_MESSAGE,
            SyncOutcome::Unchanged { .. } => UNCHANGED_MESSAGE,
        }
    }

    pub fn ip(&self) -> IpAddr {
        match self {
            SyncOutcome::Updated { ip, .. } | SyncOutcome::Unchanged { ip } => *ip,
        }
    }
}

/// Core sync engine
///
/// Owns the IP source, the provider, the configured rule tags and the
/// retry policy for IP resolution.
pub struct FirewallSync {
    /// IP echo service; absent when every run supplies the IP
    ip_source: Option<Box<dyn IpSource>>,

    /// Firewall provider for the configured target
    provider: Box<dyn FirewallProvider>,

    /// Rule descriptions to keep pointed at the current IP
    tags: Vec<String>,

    /// Retry policy for IP resolution
    retry: RetryPolicy,
}

impl FirewallSync {
    /// Create a new engine from a validated config
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn FirewallProvider>,
        config: &Config,
    ) -> Result<Self> {
        let mut engine = Self::without_ip_source(provider, config)?;
        engine.ip_source = Some(ip_source);
        Ok(engine)
    }

    /// Create an engine that only runs with an IP override
    ///
    /// `GetIPAPI` is never looked at, so an unknown selector does not
    /// matter when the IP is given on the command line.
    pub fn without_ip_source(
        provider: Box<dyn FirewallProvider>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            ip_source: None,
            provider,
            tags: config.rules.clone(),
            retry: RetryPolicy::new(config.max_retries)?,
        })
    }

    /// Replace the IP resolution retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one sync pass
    ///
    /// With `ip_override` set, the IP source is never contacted.
    pub async fn run(&self, ip_override: Option<IpAddr>) -> Result<SyncOutcome> {
        let mut ctx = RunContext::new().with_ip_override(ip_override);
        self.run_in(&mut ctx).await
    }

    /// Run one sync pass with the IP override and error reporting of `ctx`
    pub async fn run_in(&self, ctx: &mut RunContext) -> Result<SyncOutcome> {
        let ip = match (ctx.ip_override(), &self.ip_source) {
            (Some(ip), _) => {
                info!("Using specified IP: {}", ip);
                ip
            }
            (None, Some(source)) => resolve_ip_in(source.as_ref(), &self.retry, ctx).await?,
            (None, None) => {
                return Err(Error::config("no IP source and no IP address given"));
            }
        };

        self.sync_to(ip).await
    }

    /// Reconcile the provider's rules against a known IP
    pub async fn sync_to(&self, ip: IpAddr) -> Result<SyncOutcome> {
        let rules = self.provider.fetch_rules().await?;
        debug!(
            "Fetched {} rule(s) from {}",
            rules.len(),
            self.provider.provider_name()
        );

        let result = reconcile(rules, &ip.to_string(), &self.tags);
        if !result.changed() {
            info!("{}", UNCHANGED_MESSAGE);
            return Ok(SyncOutcome::Unchanged { ip });
        }

        info!("IP is different, start updating");
        self.provider.update_rules(result.rules).await?;
        info!("{}", UPDATED_MESSAGE);

        Ok(SyncOutcome::Updated {
            ip,
            rules_changed: result.updated,
        })
    }
}
