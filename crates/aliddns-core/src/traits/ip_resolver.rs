// # IP Resolver Trait
//
// Defines the interface for discovering the host's public addresses.
//
// ## Implementations
//
// - HTTP "what is my IP" endpoints: `aliddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use aliddns_core::IpResolver;
//
// let resolver = /* IpResolver implementation */;
// let ips = resolver.resolve().await;
// if let Some(v4) = ips.ipv4 {
//     println!("public IPv4: {v4}");
// }
// ```

use async_trait::async_trait;

use crate::types::CurrentIps;

/// Trait for public IP discovery
///
/// # Behavior
///
/// - Never fails: a family that cannot be determined is `None`
/// - A failure for one family must not prevent the other lookup
/// - Returned addresses must already be validated
///   (see [`crate::ip::is_valid_ipv4`] and [`crate::ip::is_valid_ipv6`])
/// - Every network call must be bounded by a timeout
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IPv4 and IPv6 addresses
    async fn resolve(&self) -> CurrentIps;
}
