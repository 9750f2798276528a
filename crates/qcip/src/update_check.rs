//! `qcip -v`: version banner and update check

use qcip_core::{Error, Result, USER_AGENT, version};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Program version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build timestamp, injected by the release pipeline
pub const BUILD_TIME: &str = match option_env!("QCIP_BUILD_TIME") {
    Some(time) => time,
    None => "unknown",
};

/// Returns the latest released version as plain text
pub const LATEST_VERSION_URL: &str = "https://api.lance.fun/proj/qcip/version";

const RELEASE_URL_BASE: &str = "https://github.com/cnlancehu/qcip/releases/tag/";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of comparing against the latest release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// A newer release exists
    Available(String),
    UpToDate,
}

/// Download page for a release
pub fn release_url(version: &str) -> String {
    format!("{}{}", RELEASE_URL_BASE, version)
}

/// Version, platform and build time
pub fn version_banner() -> String {
    format!(
        "QCIP v{} | {} {}\nBuild time: {}",
        VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH,
        BUILD_TIME
    )
}

/// Ask `url` for the latest version and compare it with `current`
pub async fn check_latest(url: &str, current: &str) -> Result<UpdateStatus> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
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
    let latest = body.trim();

    if version::is_newer(current, latest)? {
        Ok(UpdateStatus::Available(latest.to_string()))
    } else {
        Ok(UpdateStatus::UpToDate)
    }
}

/// Print the banner and the update check result
pub async fn show_version_info() {
    println!("{}", version_banner());
    println!("Checking for update...");

    match check_latest(LATEST_VERSION_URL, VERSION).await {
        Ok(UpdateStatus::Available(latest)) => {
            println!("New version available: {}", latest);
            println!("Download it here: \n  {}", release_url(&latest));
        }
        Ok(UpdateStatus::UpToDate) => println!("You are using the latest version"),
        Err(e) => {
            tracing::debug!("Update check failed: {}", e);
            println!("Failed to check updates");
        }
    }
}
