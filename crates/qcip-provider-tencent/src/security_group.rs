//! VPC security group (used by CVM instances)
//!
//! ## API Calls
//!
//! ```text
//! DescribeSecurityGroupPolicies { SecurityGroupId }
//!   -> { SecurityGroupPolicySet: { Version, Ingress, Egress } }
//!
//! ModifySecurityGroupPolicies {
//!     SecurityGroupId,
//!     SecurityGroupPolicySet: { Version, Ingress }
//! }
//! ```
//!
//! Only ingress policies are managed. Egress is left out of the write
//! request entirely, which leaves it untouched on the server side.

use crate::client::{TencentClient, VPC};
use crate::normalize::BlankToAbsent;
use async_trait::async_trait;
use qcip_core::traits::{FirewallProvider, FirewallRule, RuleSet};
use qcip_core::{Credentials, Error, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceTemplateSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_group_id: Option<String>,
}

impl BlankToAbsent for ServiceTemplateSpecification {
    fn blank_to_absent(&mut self) {
        self.service_id.blank_to_absent();
        self.service_group_id.blank_to_absent();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressTemplateSpecification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_group_id: Option<String>,
}

/// One ingress or egress policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_template: Option<ServiceTemplateSpecification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_template: Option<AddressTemplateSpecification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify_time: Option<String>,
}

impl SecurityGroupPolicy {
    /// Remove fields the modify call must not carry
    fn strip_server_fields(&mut self) {
        self.policy_index = None;
        self.ipv6_cidr_block = None;
        self.security_group_id = None;
        self.address_template = None;
    }
}

impl BlankToAbsent for SecurityGroupPolicy {
    fn blank_to_absent(&mut self) {
        self.protocol.blank_to_absent();
        self.port.blank_to_absent();
        if let Some(template) = self.service_template.as_mut() {
            template.blank_to_absent();
        }
        self.cidr_block.blank_to_absent();
        self.ipv6_cidr_block.blank_to_absent();
        self.security_group_id.blank_to_absent();
        self.action.blank_to_absent();
        self.policy_description.blank_to_absent();
        self.modify_time.blank_to_absent();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupPolicySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub ingress: Vec<SecurityGroupPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress: Option<Vec<SecurityGroupPolicy>>,
}

impl BlankToAbsent for SecurityGroupPolicySet {
    fn blank_to_absent(&mut self) {
        self.version.blank_to_absent();
        self.ingress.blank_to_absent();
        if let Some(egress) = self.egress.as_mut() {
            egress.blank_to_absent();
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupPoliciesRequest<'a> {
    security_group_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupPoliciesResponse {
    security_group_policy_set: SecurityGroupPolicySet,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModifySecurityGroupPoliciesRequest<'a> {
    security_group_id: &'a str,
    security_group_policy_set: SecurityGroupPolicySet,
}

/// Firewall provider for one VPC security group
#[derive(Debug)]
pub struct SecurityGroupProvider {
    client: TencentClient,
    group_id: String,
}

impl SecurityGroupProvider {
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: TencentClient::new(credentials, region, VPC)?,
            group_id: group_id.into(),
        })
    }

    /// Point the provider at a different API endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.client = self.client.with_endpoint(endpoint)?;
        Ok(self)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }
}

fn to_rule(policy: SecurityGroupPolicy) -> Result<FirewallRule> {
    let passthrough = serde_json::to_value(&policy)
        .map_err(|e| Error::invalid_response(format!("Unrepresentable policy: {}", e)))?;

    Ok(FirewallRule::new(
        policy.policy_description.unwrap_or_default(),
        policy.cidr_block.unwrap_or_default(),
    )
    .with_passthrough(passthrough))
}

fn to_policy(rule: FirewallRule) -> Result<SecurityGroupPolicy> {
    let mut policy: SecurityGroupPolicy = if rule.passthrough.is_null() {
        SecurityGroupPolicy::default()
    } else {
        serde_json::from_value(rule.passthrough)
            .map_err(|e| Error::config(format!("Rule is not a security group policy: {}", e)))?
    };

    policy.cidr_block = Some(rule.address);
    policy.policy_description = Some(rule.description);
    policy.strip_server_fields();
    Ok(policy)
}

/// Assemble the write-side policy set
fn to_policy_set(rules: RuleSet) -> Result<SecurityGroupPolicySet> {
    let ingress = rules
        .rules
        .into_iter()
        .map(to_policy)
        .collect::<Result<Vec<_>>>()?;

    let mut set = SecurityGroupPolicySet {
        version: rules.version,
        ingress,
        egress: None,
    };
    set.blank_to_absent();
    Ok(set)
}

#[async_trait]
impl FirewallProvider for SecurityGroupProvider {
    async fn fetch_rules(&self) -> Result<RuleSet> {
        let request = DescribeSecurityGroupPoliciesRequest {
            security_group_id: &self.group_id,
        };

        let response: DescribeSecurityGroupPoliciesResponse = self
            .client
            .call("DescribeSecurityGroupPolicies", &request)
            .await?;

        let set = response.security_group_policy_set;
        tracing::debug!(
            "Fetched {} ingress policies for {} (version {})",
            set.ingress.len(),
            self.group_id,
            set.version.as_deref().unwrap_or("-")
        );

        let rules = set
            .ingress
            .into_iter()
            .map(to_rule)
            .collect::<Result<Vec<_>>>()?;

        let mut rule_set = RuleSet::new(rules);
        rule_set.version = set.version;
        Ok(rule_set)
    }

    async fn update_rules(&self, rules: RuleSet) -> Result<()> {
        let request = ModifySecurityGroupPoliciesRequest {
            security_group_id: &self.group_id,
            security_group_policy_set: to_policy_set(rules)?,
        };

        let _: IgnoredAny = self
            .client
            .call("ModifySecurityGroupPolicies", &request)
            .await?;

        tracing::debug!("Ingress policies of {} replaced", self.group_id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "vpc"
    }
}
