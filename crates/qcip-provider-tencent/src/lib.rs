// # Tencent Cloud Firewall Providers
//
// Firewall providers for the two Tencent Cloud resources qcip manages:
//
// - `lh`: a Lighthouse instance's built-in firewall (`lighthouse` module)
// - `cvm`: a VPC security group attached to a CVM instance
//   (`security_group` module)
//
// Both talk to Tencent Cloud API 3.0 through the signed `TencentClient`.
//
// ## Architectural Constraints
//
// - One API call per `fetch_rules()` / `update_rules()`
// - No retry or backoff; a failed call ends the run
// - No decision about *whether* to update; that belongs to the reconciler
//
// ## Security Requirements
//
// - SecretKey NEVER appears in logs or Debug output
// - Only the signature derived from it is sent over the wire
//
// ## API Reference
//
// - Signing: https://cloud.tencent.com/document/api/213/30654
// - Lighthouse firewall: `DescribeFirewallRules`, `ModifyFirewallRules`
// - VPC security group: `DescribeSecurityGroupPolicies`,
//   `ModifySecurityGroupPolicies`

pub mod client;
pub mod lighthouse;
mod normalize;
pub mod security_group;

pub use client::{ApiService, TencentClient};
pub use lighthouse::LighthouseProvider;
pub use security_group::SecurityGroupProvider;

use qcip_core::config::{Config, MachineType, Target};
use qcip_core::traits::{FirewallProvider, FirewallProviderFactory};
use qcip_core::{Error, ProviderRegistry, Result};

/// Factory for Lighthouse firewall providers
pub struct LighthouseFactory;

impl FirewallProviderFactory for LighthouseFactory {
    fn create(&self, config: &Config) -> Result<Box<dyn FirewallProvider>> {
        match &config.target {
            Target::Lighthouse {
                instance_id,
                region,
            } => Ok(Box::new(LighthouseProvider::new(
                config.credentials.clone(),
                region.clone(),
                instance_id.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Lighthouse provider")),
        }
    }
}

/// Factory for VPC security group providers
pub struct SecurityGroupFactory;

impl FirewallProviderFactory for SecurityGroupFactory {
    fn create(&self, config: &Config) -> Result<Box<dyn FirewallProvider>> {
        match &config.target {
            Target::SecurityGroup { group_id, region } => {
                Ok(Box::new(SecurityGroupProvider::new(
                    config.credentials.clone(),
                    region.clone(),
                    group_id.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for security group provider")),
        }
    }
}

/// Register both Tencent Cloud providers with a registry
///
/// # Example
///
/// ```rust
/// use qcip_core::ProviderRegistry;
/// use qcip_core::config::MachineType;
///
/// let registry = ProviderRegistry::new();
/// qcip_provider_tencent::register(&registry);
///
/// assert!(registry.has_provider(MachineType::Lighthouse));
/// assert!(registry.has_provider(MachineType::Cvm));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(MachineType::Lighthouse, Box::new(LighthouseFactory));
    registry.register_provider(MachineType::Cvm, Box::new(SecurityGroupFactory));
}
