// # Firewall Provider Trait
//
// Defines the interface for reading and replacing a cloud firewall's rules.
//
// ## Implementations
//
// - Tencent Cloud Lighthouse firewall: `qcip-provider-tencent` crate
// - Tencent Cloud VPC security group: `qcip-provider-tencent` crate
//
// ## Usage
//
// ```rust,ignore
// use qcip_core::traits::FirewallProvider;
//
// let mut rules = provider.fetch_rules().await?;
// rules.rules[0].address = "5.6.7.8".to_string();
// provider.update_rules(rules).await?;
// ```
//
// Providers are single-shot: one API call per method, no retries, no
// caching between calls. Whether an update is needed is decided by the
// reconciler, not by the provider.

use async_trait::async_trait;

/// One provider-reported firewall rule
///
/// Only `description` and `address` are interpreted. Everything else the
/// provider returned lives in `passthrough` and is handed back on update.
#[derive(Debug, Clone, PartialEq)]
pub struct FirewallRule {
    /// Free-text description, used as the matching tag
    pub description: String,

    /// CIDR block or plain address the rule allows
    pub address: String,

    /// Provider record as fetched; `description` and `address` take
    /// precedence over the same keys in here
    pub passthrough: serde_json::Value,
}

impl FirewallRule {
    /// Create a rule with no provider-specific fields
    pub fn new(description: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            address: address.into(),
            passthrough: serde_json::Value::Null,
        }
    }

    /// Attach provider-specific fields
    pub fn with_passthrough(mut self, passthrough: serde_json::Value) -> Self {
        self.passthrough = passthrough;
        self
    }
}

/// A provider's full rule collection, in provider order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    /// Provider revision marker (security group `Version`), if any
    pub version: Option<String>,

    /// Rules in the order the provider returned them
    pub rules: Vec<FirewallRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FirewallRule>) -> Self {
        Self {
            version: None,
            rules,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Trait for firewall provider implementations
///
/// A provider instance is bound to one credential pair, region and
/// resource (instance or security group) at construction time.
#[async_trait]
pub trait FirewallProvider: Send + Sync {
    /// Fetch the current rule set
    async fn fetch_rules(&self) -> Result<RuleSet, crate::Error>;

    /// Replace the rule set with `rules`
    ///
    /// Implementations normalize blank strings to absent fields before
    /// sending; callers pass rules exactly as reconciled.
    async fn update_rules(&self, rules: RuleSet) -> Result<(), crate::Error>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing firewall providers from configuration
pub trait FirewallProviderFactory: Send + Sync {
    /// Create a provider for the config's target
    fn create(
        &self,
        config: &crate::config::Config,
    ) -> Result<Box<dyn FirewallProvider>, crate::Error>;
}
