// # IP Source Trait
//
// Defines the interface for asking an external "echo my IP" service for
// the caller's public address.
//
// ## Implementations
//
// - HTTP endpoints (LanceAPI, IPIP, SB, IPCONF): `qcip-ip-http` crate
//
// ## Retry Ownership
//
// An `IpSource` makes exactly one attempt per `fetch()` call. Retries and
// the backoff between them belong to `resolver::resolve_ip`, which decides
// what to retry from `Error::is_retryable()`:
//
// - transport failure or HTTP 4xx/5xx → `Error::Network` (retried)
// - well-formed reply with an unusable body → `Error::InvalidResponse` (terminal)

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Make a single attempt at fetching the current public IP
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address reported by the service
    /// - `Err(Error::Network)`: The attempt failed and may be retried
    /// - `Err(_)`: Any other error is final
    async fn fetch(&self) -> Result<IpAddr, crate::Error>;

    /// Name of the service (for logging)
    fn source_name(&self) -> &str;
}
