//! Configuration for qcip
//!
//! The on-disk format is a flat JSON object with PascalCase keys. It is
//! parsed into a loose [`RawConfig`] first so that every missing, empty or
//! placeholder field can be reported in one go, then narrowed into a typed
//! [`Config`] whose [`Target`] depends on the machine type.

use crate::context::RunContext;
use crate::error::{Error, FieldIssue, FieldProblem, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Config path used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Retry count used when `MaxRetries` is absent
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound for `MaxRetries`
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Validated qcip configuration
///
/// Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// API credential pair
    pub credentials: Credentials,

    /// Which firewall to reconcile
    pub target: Target,

    /// Raw `GetIPAPI` selector; `None` picks the default endpoint
    pub ip_api: Option<String>,

    /// Attempts allowed against the IP echo endpoint
    pub max_retries: u32,

    /// `EnableWinNotify` from the file
    pub enable_notify: bool,

    /// Rule descriptions to keep pointed at the current IP
    pub rules: Vec<String>,
}

impl Config {
    /// Load and validate the config file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = RawConfig::read(path.as_ref())?.validate()?;
        tracing::info!("Config loaded");
        Ok(config)
    }

    /// Load the config file named by `ctx`
    ///
    /// Notifications are switched on as soon as `EnableWinNotify` is
    /// accepted, so field errors found afterwards reach the error summary.
    pub fn load_in(ctx: &mut RunContext) -> Result<Self> {
        let raw = RawConfig::read(ctx.config_path())?;
        if raw.notify_requested()? {
            ctx.enable_notifications();
        }

        let config = raw.validate()?;
        tracing::info!("Config loaded");
        Ok(config)
    }

    /// Parse and validate a config document
    pub fn from_json_str(content: &str) -> Result<Self> {
        RawConfig::parse(content)?.validate()
    }

    /// The machine type this config targets
    pub fn machine_type(&self) -> MachineType {
        self.target.machine_type()
    }
}

/// Secret pair used to sign provider API calls
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    secret_id: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

// Never print secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

/// Supported machine types (`MType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineType {
    /// Lighthouse instance firewall
    Lighthouse,
    /// CVM instance behind a VPC security group
    Cvm,
}

impl MachineType {
    /// The `MType` spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Lighthouse => "lh",
            MachineType::Cvm => "cvm",
        }
    }

    fn required_fields(&self) -> &'static [RequiredField] {
        match self {
            MachineType::Lighthouse => LIGHTHOUSE_FIELDS,
            MachineType::Cvm => CVM_FIELDS,
        }
    }
}

impl FromStr for MachineType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lh" => Ok(MachineType::Lighthouse),
            "cvm" => Ok(MachineType::Cvm),
            other => Err(Error::InvalidMachineType(other.to_string())),
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The firewall resource a config points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Lighthouse instance firewall
    Lighthouse { instance_id: String, region: String },
    /// VPC security group
    SecurityGroup { group_id: String, region: String },
}

impl Target {
    pub fn machine_type(&self) -> MachineType {
        match self {
            Target::Lighthouse { .. } => MachineType::Lighthouse,
            Target::SecurityGroup { .. } => MachineType::Cvm,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            Target::Lighthouse { region, .. } | Target::SecurityGroup { region, .. } => region,
        }
    }

    /// Instance ID or security group ID
    pub fn resource_id(&self) -> &str {
        match self {
            Target::Lighthouse { instance_id, .. } => instance_id,
            Target::SecurityGroup { group_id, .. } => group_id,
        }
    }
}

/// The config document as written, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    #[serde(rename = "MType")]
    mtype: Option<String>,
    secret_id: Option<String>,
    secret_key: Option<String>,
    #[serde(rename = "GetIPAPI")]
    get_ip_api: Option<String>,
    instance_id: Option<String>,
    instance_region: Option<String>,
    security_group_id: Option<String>,
    security_group_region: Option<String>,
    max_retries: Option<RetryValue>,
    enable_win_notify: Option<bool>,
    rules: Option<Vec<String>>,
}

/// `MaxRetries` has been written both as a number and as a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RetryValue {
    Number(i64),
    Text(String),
}

impl RawConfig {
    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                Error::ConfigUnreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            use serde_json::error::Category;
            match e.classify() {
                Category::Syntax | Category::Eof => Error::ConfigInvalidJson(e.to_string()),
                Category::Data | Category::Io => Error::ConfigFormat(e.to_string()),
            }
        })
    }

    /// `EnableWinNotify`, refused off Windows
    fn notify_requested(&self) -> Result<bool> {
        let enable_notify = self.enable_win_notify.unwrap_or(false);
        if enable_notify && !cfg!(windows) {
            return Err(Error::config("EnableWinNotify is only available on Windows"));
        }
        Ok(enable_notify)
    }

    fn validate(self) -> Result<Config> {
        let enable_notify = self.notify_requested()?;

        let machine_type: MachineType = self.mtype.as_deref().unwrap_or_default().parse()?;

        let issues: Vec<FieldIssue> = machine_type
            .required_fields()
            .iter()
            .filter_map(|field| field.check(&self))
            .collect();
        if !issues.is_empty() {
            return Err(Error::ConfigFields(issues));
        }

        let max_retries = self.max_retries()?;

        // Presence was checked by the schema above
        let text = |value: Option<String>| value.unwrap_or_default();

        let target = match machine_type {
            MachineType::Lighthouse => Target::Lighthouse {
                instance_id: text(self.instance_id),
                region: text(self.instance_region),
            },
            MachineType::Cvm => Target::SecurityGroup {
                group_id: text(self.security_group_id),
                region: text(self.security_group_region),
            },
        };

        Ok(Config {
            credentials: Credentials::new(text(self.secret_id), text(self.secret_key)),
            target,
            ip_api: self.get_ip_api.filter(|api| !api.is_empty()),
            max_retries,
            enable_notify,
            rules: self.rules.unwrap_or_default(),
        })
    }

    fn max_retries(&self) -> Result<u32> {
        let value = match &self.max_retries {
            None => return Ok(DEFAULT_MAX_RETRIES),
            Some(RetryValue::Number(n)) => *n,
            Some(RetryValue::Text(s)) if s.trim().is_empty() => return Ok(DEFAULT_MAX_RETRIES),
            Some(RetryValue::Text(s)) => s.trim().parse::<i64>().map_err(|_| {
                Error::ConfigFormat(format!("MaxRetries must be an integer, got {s:?}"))
            })?,
        };

        if !(0..=i64::from(MAX_RETRIES_LIMIT)).contains(&value) {
            return Err(Error::RetriesOutOfRange(value));
        }
        Ok(value as u32)
    }
}

/// Borrowed view of a required field's value
enum FieldValue<'a> {
    Text(Option<&'a str>),
    List(Option<&'a [String]>),
}

/// One entry of a per-machine-type required field schema
struct RequiredField {
    name: &'static str,
    value: fn(&RawConfig) -> FieldValue<'_>,
}

impl RequiredField {
    fn check(&self, raw: &RawConfig) -> Option<FieldIssue> {
        let problem = match (self.value)(raw) {
            FieldValue::Text(None) | FieldValue::List(None) => FieldProblem::Missing,
            FieldValue::Text(Some("")) => FieldProblem::Empty,
            FieldValue::Text(Some(v)) if v == self.name => FieldProblem::Placeholder,
            FieldValue::List(Some([])) => FieldProblem::Empty,
            FieldValue::List(Some([only])) if only == self.name => FieldProblem::Placeholder,
            _ => return None,
        };

        Some(FieldIssue {
            field: self.name,
            problem,
        })
    }
}

fn secret_id(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.secret_id.as_deref())
}

fn secret_key(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.secret_key.as_deref())
}

fn instance_id(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.instance_id.as_deref())
}

fn instance_region(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.instance_region.as_deref())
}

fn security_group_id(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.security_group_id.as_deref())
}

fn security_group_region(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::Text(c.security_group_region.as_deref())
}

fn rules(c: &RawConfig) -> FieldValue<'_> {
    FieldValue::List(c.rules.as_deref())
}

const LIGHTHOUSE_FIELDS: &[RequiredField] = &[
    RequiredField { name: "SecretId", value: secret_id },
    RequiredField { name: "SecretKey", value: secret_key },
    RequiredField { name: "InstanceId", value: instance_id },
    RequiredField { name: "InstanceRegion", value: instance_region },
    RequiredField { name: "Rules", value: rules },
];

const CVM_FIELDS: &[RequiredField] = &[
    RequiredField { name: "SecretId", value: secret_id },
    RequiredField { name: "SecretKey", value: secret_key },
    RequiredField { name: "SecurityGroupId", value: security_group_id },
    RequiredField { name: "SecurityGroupRegion", value: security_group_region },
    RequiredField { name: "Rules", value: rules },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn lighthouse_doc() -> serde_json::Value {
        serde_json::json!({
            "MType": "lh",
            "SecretId": "AKIDexample",
            "SecretKey": "secret",
            "InstanceId": "lhins-abc",
            "InstanceRegion": "ap-guangzhou",
            "Rules": ["home-ip"]
        })
    }

    #[test]
    fn test_lighthouse_config_parses() {
        let config = Config::from_json_str(&lighthouse_doc().to_string()).unwrap();

        assert_eq!(config.machine_type(), MachineType::Lighthouse);
        assert_eq!(config.target.resource_id(), "lhins-abc");
        assert_eq!(config.target.region(), "ap-guangzhou");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.ip_api, None);
        assert_eq!(config.rules, vec!["home-ip".to_string()]);
    }

    #[test]
    fn test_max_retries_accepts_number_or_string() {
        let mut doc = lighthouse_doc();
        doc["MaxRetries"] = serde_json::json!("5");
        assert_eq!(Config::from_json_str(&doc.to_string()).unwrap().max_retries, 5);

        doc["MaxRetries"] = serde_json::json!(0);
        assert_eq!(Config::from_json_str(&doc.to_string()).unwrap().max_retries, 0);
    }

    #[test]
    fn test_max_retries_out_of_range() {
        let mut doc = lighthouse_doc();
        doc["MaxRetries"] = serde_json::json!(11);

        let err = Config::from_json_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, Error::RetriesOutOfRange(11)));

        doc["MaxRetries"] = serde_json::json!("-1");
        let err = Config::from_json_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, Error::RetriesOutOfRange(-1)));
    }

    #[test]
    fn test_max_retries_not_a_number() {
        let mut doc = lighthouse_doc();
        doc["MaxRetries"] = serde_json::json!("three");

        let err = Config::from_json_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, Error::ConfigFormat(_)));
    }

    #[test]
    fn test_rules_placeholder_is_incorrect() {
        let mut doc = lighthouse_doc();
        doc["Rules"] = serde_json::json!(["Rules"]);

        match Config::from_json_str(&doc.to_string()).unwrap_err() {
            Error::ConfigFields(issues) => assert_eq!(
                issues,
                vec![FieldIssue {
                    field: "Rules",
                    problem: FieldProblem::Placeholder
                }]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_value_type_is_format_error() {
        let mut doc = lighthouse_doc();
        doc["Rules"] = serde_json::json!("home-ip");

        let err = Config::from_json_str(&doc.to_string()).unwrap_err();
        assert!(matches!(err, Error::ConfigFormat(_)));
    }

    #[test]
    fn test_empty_ip_api_means_default() {
        let mut doc = lighthouse_doc();
        doc["GetIPAPI"] = serde_json::json!("");
        assert_eq!(Config::from_json_str(&doc.to_string()).unwrap().ip_api, None);

        doc["GetIPAPI"] = serde_json::json!("SB");
        assert_eq!(
            Config::from_json_str(&doc.to_string()).unwrap().ip_api.as_deref(),
            Some("SB")
        );
    }

    #[test]
    fn test_credentials_not_exposed_in_debug() {
        let config = Config::from_json_str(&lighthouse_doc().to_string()).unwrap();
        let debug_str = format!("{:?}", config);

        assert!(!debug_str.contains("AKIDexample"));
        assert!(!debug_str.contains("\"secret\""));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_win_notify_rejected_off_windows() {
        let mut doc = lighthouse_doc();
        doc["EnableWinNotify"] = serde_json::json!(true);

        let err = Config::from_json_str(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("only available on Windows"));
    }
}
