//! Tencent Cloud API 3.0 client
//!
//! Every action is a JSON `POST /` to `https://<service>.tencentcloudapi.com`,
//! signed with TC3-HMAC-SHA256. The client makes exactly one HTTP request
//! per [`TencentClient::call`]; retrying is left to the caller.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use qcip_core::{Credentials, Error, Result, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";

type HmacSha256 = Hmac<Sha256>;

/// A Tencent Cloud product API: its service name and pinned version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiService {
    pub name: &'static str,
    pub version: &'static str,
}

/// Lighthouse (lightweight application server) API
pub const LIGHTHOUSE: ApiService = ApiService {
    name: "lighthouse",
    version: "2020-03-24",
};

/// Virtual Private Cloud API
pub const VPC: ApiService = ApiService {
    name: "vpc",
    version: "2017-03-12",
};

/// Signed API client bound to one service and region
#[derive(Debug)]
pub struct TencentClient {
    /// Credentials (Debug output is redacted)
    credentials: Credentials,

    region: String,
    service: ApiService,

    /// Base URL requests are POSTed to
    endpoint: String,

    /// Value of the signed `Host` header
    host: String,

    client: reqwest::Client,
}

impl TencentClient {
    /// Create a client for the public endpoint of `service`
    pub fn new(credentials: Credentials, region: impl Into<String>, service: ApiService) -> Result<Self> {
        let host = format!("{}.tencentcloudapi.com", service.name);
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            region: region.into(),
            service,
            endpoint: format!("https://{}/", host),
            host,
            client,
        })
    }

    /// Send requests to `endpoint` instead of the public API host
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid API endpoint {}: {}", endpoint, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("API endpoint {} has no host", endpoint)))?;

        self.host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        self.endpoint = url.to_string();
        Ok(self)
    }

    pub fn service(&self) -> ApiService {
        self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Invoke `action` with `request` as its JSON body
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: The `Response` object, minus its `RequestId`
    /// - `Err(Error::Network)`: The request never got an HTTP answer
    /// - `Err(Error::ProviderApi)`: The API answered with an error
    /// - `Err(Error::InvalidResponse)`: The answer could not be decoded
    pub async fn call<Req, T>(&self, action: &str, request: &Req) -> Result<T>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_string(request)
            .map_err(|e| Error::config(format!("Failed to encode {} request: {}", action, e)))?;
        let now = Utc::now();
        let authorization = sign(
            &self.credentials,
            self.service.name,
            &self.host,
            action,
            &payload,
            now,
        )?;

        tracing::debug!(
            "Calling {}:{} in {}",
            self.service.name,
            action,
            self.region
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &self.host)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", now.timestamp().to_string())
            .header("X-TC-Version", self.service.version)
            .header("X-TC-Region", &self.region)
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::network(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read {} response: {}", action, e)))?;

        let mut json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(Error::provider(
                    self.service.name,
                    format!("HTTP {}", status.as_u16()),
                    body,
                ));
            }
            Err(e) => {
                return Err(Error::invalid_response(format!(
                    "{} returned malformed JSON: {}",
                    action, e
                )));
            }
        };

        let mut inner = json
            .get_mut("Response")
            .map(Value::take)
            .ok_or_else(|| {
                if status.is_success() {
                    Error::invalid_response(format!("{} response has no Response object", action))
                } else {
                    Error::provider(self.service.name, format!("HTTP {}", status.as_u16()), body.clone())
                }
            })?;

        if let Some(error) = inner.get("Error") {
            let code = error["Code"].as_str().unwrap_or("Unknown");
            let message = error["Message"].as_str().unwrap_or_default();
            return Err(Error::provider(self.service.name, code, message));
        }

        if !status.is_success() {
            return Err(Error::provider(
                self.service.name,
                format!("HTTP {}", status.as_u16()),
                body,
            ));
        }

        if let Some(obj) = inner.as_object_mut() {
            obj.remove("RequestId");
        }

        serde_json::from_value(inner).map_err(|e| {
            Error::invalid_response(format!("Unexpected {} response: {}", action, e))
        })
    }
}

/// Build the TC3-HMAC-SHA256 `Authorization` header value
pub(crate) fn sign(
    credentials: &Credentials,
    service: &str,
    host: &str,
    action: &str,
    payload: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let date = now.format("%Y-%m-%d").to_string();
    let scope = format!("{}/{}/tc3_request", date, service);

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\nx-tc-action:{}\n\n{}\n{}",
        CONTENT_TYPE,
        host,
        action.to_lowercase(),
        SIGNED_HEADERS,
        sha256_hex(payload)
    );

    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        now.timestamp(),
        scope,
        sha256_hex(&canonical_request)
    );

    let secret_date = hmac_sha256(
        format!("TC3{}", credentials.secret_key()).as_bytes(),
        &date,
    )?;
    let secret_service = hmac_sha256(&secret_date, service)?;
    let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, &string_to_sign)?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        credentials.secret_id(),
        scope,
        SIGNED_HEADERS,
        signature
    ))
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::config(format!("Invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "topsecretkey")
    }

    fn at(timestamp: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(timestamp, 0).unwrap()
    }

    #[test]
    fn test_authorization_layout() {
        let auth = sign(
            &credentials(),
            "lighthouse",
            "lighthouse.tencentcloudapi.com",
            "DescribeFirewallRules",
            "{}",
            at(1_551_113_065),
        )
        .unwrap();

        assert!(auth.starts_with(
            "TC3-HMAC-SHA256 Credential=AKIDEXAMPLE/2019-02-25/lighthouse/tc3_request, \
             SignedHeaders=content-type;host;x-tc-action, Signature="
        ));

        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "X", "{}", at(1_700_000_000)).unwrap();
        let b = sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "X", "{}", at(1_700_000_000)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_covers_payload_and_action() {
        let base = sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "A", "{}", at(1_700_000_000)).unwrap();
        let other_payload =
            sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "A", "{\"x\":1}", at(1_700_000_000)).unwrap();
        let other_action = sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "B", "{}", at(1_700_000_000)).unwrap();

        assert_ne!(base, other_payload);
        assert_ne!(base, other_action);
    }

    #[test]
    fn test_secret_key_never_in_header() {
        let auth = sign(&credentials(), "vpc", "vpc.tencentcloudapi.com", "A", "{}", at(1_700_000_000)).unwrap();

        assert!(!auth.contains("topsecretkey"));
    }

    #[test]
    fn test_sha256_hex_of_empty_string() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_endpoint_override_sets_host() {
        let client = TencentClient::new(credentials(), "ap-guangzhou", LIGHTHOUSE)
            .unwrap()
            .with_endpoint("http://127.0.0.1:8080")
            .unwrap();

        assert_eq!(client.host, "127.0.0.1:8080");
        assert_eq!(client.endpoint, "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_default_endpoint() {
        let client = TencentClient::new(credentials(), "ap-shanghai", VPC).unwrap();

        assert_eq!(client.host, "vpc.tencentcloudapi.com");
        assert_eq!(client.endpoint, "https://vpc.tencentcloudapi.com/");
        assert_eq!(client.region(), "ap-shanghai");
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = TencentClient::new(credentials(), "ap-shanghai", VPC).unwrap();

        let debug = format!("{:?}", client);
        assert!(!debug.contains("topsecretkey"));
        assert!(!debug.contains("AKIDEXAMPLE"));
    }
}
