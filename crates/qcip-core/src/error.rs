//! Error types for qcip
//!
//! Every failure the program can hit is one variant of [`Error`]. All of
//! them are terminal for a run except [`Error::Notify`], which callers
//! reduce to a log line.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qcip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for qcip
#[derive(Error, Debug)]
pub enum Error {
    /// The config file does not exist
    #[error("Config error: config file {} does not exist", path.display())]
    ConfigNotFound { path: PathBuf },

    /// The config file exists but could not be read
    #[error("Config error: failed to read {}: {source}", path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not syntactically valid JSON
    #[error("Config error: config file is not valid json ({0})")]
    ConfigInvalidJson(String),

    /// Valid JSON, but a value has the wrong type or shape
    #[error("Config error: config file format is incorrect ({0})")]
    ConfigFormat(String),

    /// One or more required fields are missing, empty or placeholders
    #[error("Config error:{}", render_issues(.0))]
    ConfigFields(Vec<FieldIssue>),

    /// `MType` is empty or not a known machine type
    #[error("Config error: {}", machine_type_message(.0))]
    InvalidMachineType(String),

    /// `MaxRetries` is outside `[0, 10]`
    #[error(
        "Config error: maxRetries should be an integer greater than or equal to 0 and less than or equal to 10 (got {0})"
    )]
    RetriesOutOfRange(i64),

    /// Any other configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// `GetIPAPI` names an endpoint we don't know
    #[error("IP API calling error: unknown API {0}")]
    UnknownIpApi(String),

    /// Every attempt against the IP echo endpoint failed
    #[error("IP API call failed {attempts} times, exiting... (last error: {last_error})")]
    IpApiUnreachable { attempts: u32, last_error: String },

    /// Transport failure or 4xx/5xx status; eligible for retry
    #[error("Network error: {0}")]
    Network(String),

    /// A remote answered, but the body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The cloud provider API rejected a request
    #[error("Provider error ({provider}): [{code}] {message}")]
    ProviderApi {
        /// Provider name
        provider: String,
        /// Provider error code
        code: String,
        /// Error message
        message: String,
    },

    /// Invalid or contradictory command line arguments
    #[error("Error arguments: {0}")]
    Argument(String),

    /// Desktop notification could not be delivered
    #[error("Error while sending notification: {0}")]
    Notify(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a retryable network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a provider API error
    pub fn provider(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderApi {
            provider: provider.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an argument error
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Whether the IP resolver may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Why a required config field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    /// Key absent from the document
    Missing,
    /// Empty string or empty list
    Empty,
    /// Value left as its own field name
    Placeholder,
}

/// A rejected required config field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.problem {
            FieldProblem::Missing => "not found",
            FieldProblem::Empty => "is empty",
            FieldProblem::Placeholder => "is incorrect",
        };
        write!(f, "{} {}", self.field, what)
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues.iter().map(|issue| format!("\n\t{issue}")).collect()
}

fn machine_type_message(mtype: &str) -> String {
    if mtype.is_empty() {
        "machine type is empty".to_string()
    } else {
        format!("machine type {mtype} is incorrect")
    }
}
