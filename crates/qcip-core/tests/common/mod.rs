//! Test doubles and common utilities for contract tests
//!
//! These doubles record how they are called so tests can assert on
//! attempt counts and update calls without touching the network.

#![allow(dead_code)]

use qcip_core::config::Config;
use qcip_core::error::{Error, Result};
use qcip_core::context::RunContext;
use qcip_core::traits::{FirewallProvider, FirewallRule, IpSource, Notifier, RuleSet};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An IpSource that replays a script of results, one per fetch()
pub struct ScriptedIpSource {
    script: Mutex<VecDeque<Result<IpAddr>>>,
    fetch_call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<Result<IpAddr>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail `failures` times with a network error, then answer `ip`
    pub fn failing_then(failures: usize, ip: IpAddr) -> Self {
        let mut script: Vec<Result<IpAddr>> = (0..failures)
            .map(|i| Err(Error::network(format!("HTTP error: 503 (attempt {})", i + 1))))
            .collect();
        script.push(Ok(ip));
        Self::new(script)
    }

    /// Never answers successfully
    pub fn always_failing(times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Err(Error::network("connection refused")))
                .collect(),
        )
    }

    /// Handle to the call counter, usable after the source is boxed
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_call_count)
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn fetch(&self) -> Result<IpAddr> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::network("script exhausted")))
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

/// A FirewallProvider backed by an in-memory rule set
pub struct MockFirewallProvider {
    rules: Arc<Mutex<RuleSet>>,
    updates: Arc<Mutex<Vec<RuleSet>>>,
    fetch_error: Option<(String, String)>,
}

impl MockFirewallProvider {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(Mutex::new(rules)),
            updates: Arc::new(Mutex::new(Vec::new())),
            fetch_error: None,
        }
    }

    /// fetch_rules() fails with this provider error code
    pub fn failing_fetch(code: &str, message: &str) -> Self {
        let mut provider = Self::new(RuleSet::default());
        provider.fetch_error = Some((code.to_string(), message.to_string()));
        provider
    }

    /// Create a provider that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            rules: Arc::clone(&other.rules),
            updates: Arc::clone(&other.updates),
            fetch_error: other.fetch_error.clone(),
        }
    }

    /// Every rule set passed to update_rules(), in call order
    pub fn updates(&self) -> Vec<RuleSet> {
        self.updates.lock().unwrap().clone()
    }

    pub fn current_rules(&self) -> RuleSet {
        self.rules.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FirewallProvider for MockFirewallProvider {
    async fn fetch_rules(&self) -> Result<RuleSet> {
        if let Some((code, message)) = &self.fetch_error {
            return Err(Error::provider("mock", code.clone(), message.clone()));
        }
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn update_rules(&self, rules: RuleSet) -> Result<()> {
        self.updates.lock().unwrap().push(rules.clone());
        *self.rules.lock().unwrap() = rules;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Notifications captured by a RecordingNotifier: (title, message, succeeded)
pub type Sent = Arc<Mutex<Vec<(String, String, bool)>>>;

/// A Notifier that keeps every notification it is asked to show
pub struct RecordingNotifier {
    sent: Sent,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str, succeeded: bool) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string(), succeeded));
        Ok(())
    }
}

/// A run context wired to a RecordingNotifier
pub fn recording_context() -> (RunContext, Sent) {
    let sent: Sent = Arc::new(Mutex::new(Vec::new()));
    let ctx = RunContext::new().with_notifier(Box::new(RecordingNotifier {
        sent: Arc::clone(&sent),
    }));
    (ctx, sent)
}

/// A rule carrying opaque provider fields
pub fn rule(description: &str, address: &str) -> FirewallRule {
    FirewallRule::new(description, address).with_passthrough(serde_json::json!({
        "Protocol": "TCP",
        "Port": "22",
        "Action": "ACCEPT",
        "FirewallRuleDescription": description,
        "CidrBlock": address,
    }))
}

/// Helper to create a minimal security group config for testing
pub fn minimal_config(tags: &[&str]) -> Config {
    let doc = serde_json::json!({
        "MType": "cvm",
        "SecretId": "test-id",
        "SecretKey": "test-key",
        "SecurityGroupId": "sg-test",
        "SecurityGroupRegion": "ap-shanghai",
        "MaxRetries": 3,
        "Rules": tags,
    });
    Config::from_json_str(&doc.to_string()).expect("minimal config is valid")
}
