//! IP resolver
//!
//! Wraps an [`IpSource`] in a bounded retry loop. The source makes one
//! attempt per call; this module owns how many attempts are made and how
//! long to wait between them.

use crate::config::MAX_RETRIES_LIMIT;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::traits::IpSource;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed delay between attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// How the resolver retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default 1-second backoff
    ///
    /// `max_retries` must be within `[0, 10]`.
    pub fn new(max_retries: u32) -> Result<Self> {
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::RetriesOutOfRange(i64::from(max_retries)));
        }
        Ok(Self {
            max_retries,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Override the delay between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts, counting the first one
    ///
    /// A budget of zero still makes a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

/// Resolve the current public IP through `source`
///
/// Retryable failures ([`Error::is_retryable`]) are retried after
/// sleeping for the policy's backoff until the attempt budget is spent,
/// then reported as [`Error::IpApiUnreachable`]. Any other error, and the
/// first successful answer, end the loop immediately.
pub async fn resolve_ip(source: &dyn IpSource, policy: &RetryPolicy) -> Result<IpAddr> {
    resolve_ip_in(source, policy, &mut RunContext::new()).await
}

/// Like [`resolve_ip`], reporting the first failed attempt through `ctx`
///
/// With notifications on, that failure ends up in the end-of-run summary.
pub async fn resolve_ip_in(
    source: &dyn IpSource,
    policy: &RetryPolicy,
    ctx: &mut RunContext,
) -> Result<IpAddr> {
    let attempts = policy.attempts();

    for attempt in 1..=attempts {
        match source.fetch().await {
            Ok(ip) => {
                info!("Current IP: {} (via {})", ip, source.source_name());
                return Ok(ip);
            }
            Err(e) if e.is_retryable() => {
                if attempt == 1 {
                    ctx.report_warning(format!("IP API calling error: {}", e));
                } else {
                    debug!("IP API attempt {} failed: {}", attempt, e);
                }

                if attempt == attempts {
                    return Err(Error::IpApiUnreachable {
                        attempts,
                        last_error: e.to_string(),
                    });
                }

                warn!("retrying {}/{}", attempt, attempts - 1);
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }

    // attempts() is never zero
    Err(Error::IpApiUnreachable {
        attempts,
        last_error: "no attempt made".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_bounds() {
        assert!(RetryPolicy::new(0).is_ok());
        assert!(RetryPolicy::new(10).is_ok());
        assert!(matches!(
            RetryPolicy::new(11),
            Err(Error::RetriesOutOfRange(11))
        ));
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(RetryPolicy::new(0).unwrap().attempts(), 1);
        assert_eq!(RetryPolicy::new(1).unwrap().attempts(), 1);
        assert_eq!(RetryPolicy::new(3).unwrap().attempts(), 3);
    }

    #[test]
    fn test_default_backoff_is_one_second() {
        assert_eq!(
            RetryPolicy::new(3).unwrap().backoff(),
            Duration::from_secs(1)
        );
    }
}
