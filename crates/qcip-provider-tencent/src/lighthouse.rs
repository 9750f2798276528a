//! Lighthouse instance firewall
//!
//! ## API Calls
//!
//! ```text
//! DescribeFirewallRules { InstanceId, Offset: 0, Limit: 100 }
//!   -> { FirewallRuleSet: [FirewallRuleInfo], TotalCount }
//!
//! ModifyFirewallRules { InstanceId, FirewallRules: [FirewallRule] }
//! ```
//!
//! `ModifyFirewallRules` replaces the whole rule list, so every rule is
//! sent back, not only the reconciled ones.

use crate::client::{LIGHTHOUSE, TencentClient};
use crate::normalize::BlankToAbsent;
use async_trait::async_trait;
use qcip_core::traits::{FirewallProvider, FirewallRule, RuleSet};
use qcip_core::{Credentials, Error, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// Page size for `DescribeFirewallRules`; the API maximum
const PAGE_LIMIT: u32 = 100;

/// A rule as returned by `DescribeFirewallRules`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FirewallRuleInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_rule_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
}

/// A rule as accepted by `ModifyFirewallRules`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FirewallRuleSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_rule_description: Option<String>,
}

impl From<FirewallRuleInfo> for FirewallRuleSpec {
    fn from(info: FirewallRuleInfo) -> Self {
        Self {
            protocol: info.protocol,
            port: info.port,
            cidr_block: info.cidr_block,
            action: info.action,
            firewall_rule_description: info.firewall_rule_description,
        }
    }
}

impl BlankToAbsent for FirewallRuleSpec {
    fn blank_to_absent(&mut self) {
        self.protocol.blank_to_absent();
        self.port.blank_to_absent();
        self.cidr_block.blank_to_absent();
        self.action.blank_to_absent();
        self.firewall_rule_description.blank_to_absent();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeFirewallRulesRequest<'a> {
    instance_id: &'a str,
    offset: u32,
    limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeFirewallRulesResponse {
    #[serde(default)]
    firewall_rule_set: Vec<FirewallRuleInfo>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModifyFirewallRulesRequest<'a> {
    instance_id: &'a str,
    firewall_rules: Vec<FirewallRuleSpec>,
}

/// Firewall provider for one Lighthouse instance
#[derive(Debug)]
pub struct LighthouseProvider {
    client: TencentClient,
    instance_id: String,
}

impl LighthouseProvider {
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: TencentClient::new(credentials, region, LIGHTHOUSE)?,
            instance_id: instance_id.into(),
        })
    }

    /// Point the provider at a different API endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.client = self.client.with_endpoint(endpoint)?;
        Ok(self)
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

/// Wrap a fetched rule for the reconciler
fn to_rule(info: FirewallRuleInfo) -> Result<FirewallRule> {
    let passthrough = serde_json::to_value(&info)
        .map_err(|e| Error::invalid_response(format!("Unrepresentable firewall rule: {}", e)))?;

    Ok(FirewallRule::new(
        info.firewall_rule_description.unwrap_or_default(),
        info.cidr_block.unwrap_or_default(),
    )
    .with_passthrough(passthrough))
}

/// Rebuild the write-side rule from a reconciled one
fn to_spec(rule: FirewallRule) -> Result<FirewallRuleSpec> {
    let info: FirewallRuleInfo = if rule.passthrough.is_null() {
        FirewallRuleInfo::default()
    } else {
        serde_json::from_value(rule.passthrough)
            .map_err(|e| Error::config(format!("Rule is not a Lighthouse rule: {}", e)))?
    };

    let mut spec = FirewallRuleSpec::from(info);
    spec.cidr_block = Some(rule.address);
    spec.firewall_rule_description = Some(rule.description);
    spec.blank_to_absent();
    Ok(spec)
}

#[async_trait]
impl FirewallProvider for LighthouseProvider {
    async fn fetch_rules(&self) -> Result<RuleSet> {
        let request = DescribeFirewallRulesRequest {
            instance_id: &self.instance_id,
            offset: 0,
            limit: PAGE_LIMIT,
        };

        let response: DescribeFirewallRulesResponse = self
            .client
            .call("DescribeFirewallRules", &request)
            .await?;

        let fetched = response.firewall_rule_set.len();
        if let Some(total) = response.total_count {
            if total > fetched as u64 {
                tracing::warn!(
                    "Instance {} has {} firewall rules, only the first {} are managed",
                    self.instance_id,
                    total,
                    fetched
                );
            }
        }
        tracing::debug!("Fetched {} firewall rules for {}", fetched, self.instance_id);

        let rules = response
            .firewall_rule_set
            .into_iter()
            .map(to_rule)
            .collect::<Result<Vec<_>>>()?;

        Ok(RuleSet::new(rules))
    }

    async fn update_rules(&self, rules: RuleSet) -> Result<()> {
        let firewall_rules = rules
            .rules
            .into_iter()
            .map(to_spec)
            .collect::<Result<Vec<_>>>()?;

        let request = ModifyFirewallRulesRequest {
            instance_id: &self.instance_id,
            firewall_rules,
        };

        let _: IgnoredAny = self.client.call("ModifyFirewallRules", &request).await?;

        tracing::debug!("Firewall rules of {} replaced", self.instance_id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "lighthouse"
    }
}
