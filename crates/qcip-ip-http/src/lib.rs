// # HTTP IP Source
//
// This crate asks an external "echo my IP" service for the caller's
// public address.
//
// ## Endpoints
//
// | selector   | URL                          | body              |
// |------------|------------------------------|-------------------|
// | `LanceAPI` | https://api.lance.fun/ip     | plain text        |
// | `IPIP`     | https://myip.ipip.net/ip     | `{"ip": "..."}`   |
// | `SB`       | https://api-ipv4.ip.sb/ip    | plain text        |
// | `IPCONF`   | https://ifconfig.co/ip       | plain text        |
//
// `IPCONF` is used when no selector is configured.
//
// ## Architecture
//
// Each `fetch()` is a single GET. Retries and backoff are owned by
// `qcip_core::resolver`; this crate only classifies failures:
// transport errors and 4xx/5xx statuses are `Error::Network` (retryable),
// an unparseable body is `Error::InvalidResponse` (final).

use qcip_core::traits::IpSource;
use qcip_core::{Error, Result, USER_AGENT};

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

/// Request timeout for IP echo services
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How an endpoint encodes the address in its response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The address as text, possibly surrounded by whitespace
    PlainText,
    /// A JSON object with an `ip` field
    JsonIp,
}

/// Known IP echo services (`GetIPAPI`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpApi {
    LanceApi,
    Ipip,
    Sb,
    #[default]
    IpConf,
}

impl IpApi {
    /// Look up a `GetIPAPI` selector; `None` or empty selects the default
    pub fn from_selector(selector: Option<&str>) -> Result<Self> {
        match selector {
            None | Some("") => Ok(Self::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn selector(&self) -> &'static str {
        match self {
            IpApi::LanceApi => "LanceAPI",
            IpApi::Ipip => "IPIP",
            IpApi::Sb => "SB",
            IpApi::IpConf => "IPCONF",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            IpApi::LanceApi => "https://api.lance.fun/ip",
            IpApi::Ipip => "https://myip.ipip.net/ip",
            IpApi::Sb => "https://api-ipv4.ip.sb/ip",
            IpApi::IpConf => "https://ifconfig.co/ip",
        }
    }

    pub fn format(&self) -> ResponseFormat {
        match self {
            IpApi::Ipip => ResponseFormat::JsonIp,
            IpApi::LanceApi | IpApi::Sb | IpApi::IpConf => ResponseFormat::PlainText,
        }
    }
}

impl FromStr for IpApi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LanceAPI" => Ok(IpApi::LanceApi),
            "IPIP" => Ok(IpApi::Ipip),
            "SB" => Ok(IpApi::Sb),
            "IPCONF" => Ok(IpApi::IpConf),
            other => Err(Error::UnknownIpApi(other.to_string())),
        }
    }
}

impl fmt::Display for IpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

#[derive(Deserialize)]
struct JsonIpBody {
    ip: String,
}

/// HTTP-based IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// Service name (for logging)
    name: String,

    /// URL to fetch IP from
    url: String,

    /// Body encoding
    format: ResponseFormat,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source for one of the known services
    pub fn new(api: IpApi) -> Result<Self> {
        Self::with_url(api.selector(), api.url(), api.format())
    }

    /// Create a source from a `GetIPAPI` selector
    pub fn from_selector(selector: Option<&str>) -> Result<Self> {
        Self::new(IpApi::from_selector(selector)?)
    }

    /// Create a source for an arbitrary URL
    pub fn with_url(
        name: impl Into<String>,
        url: impl Into<String>,
        format: ResponseFormat,
    ) -> Result<Self> {
        // Binding to 0.0.0.0 keeps the request on IPv4, so the echoed
        // address is the one IPv4 firewall rules need.
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            format,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn fetch(&self) -> Result<IpAddr> {
        tracing::debug!("Fetching IP from {} ({})", self.name, self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::network(format!("HTTP error: {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        parse_body(self.format, &body)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Extract the address from a response body
fn parse_body(format: ResponseFormat, body: &str) -> Result<IpAddr> {
    let text = match format {
        ResponseFormat::PlainText => body.trim().to_string(),
        ResponseFormat::JsonIp => {
            let parsed: JsonIpBody = serde_json::from_str(body)
                .map_err(|e| Error::invalid_response(format!("Bad JSON from IP API: {}", e)))?;
            parsed.ip.trim().to_string()
        }
    };

    text.parse()
        .map_err(|_| Error::invalid_response(format!("Invalid IP address: {:?}", text)))
}
