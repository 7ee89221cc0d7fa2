// # HTTP IP Resolver
//
// This crate provides an HTTP-based IpResolver for the aliddns system.
//
// ## Architecture
//
// Two plain-text "what is my IP" endpoints are queried concurrently, one
// reachable only over IPv4 and one over IPv6 (by default `4.ipw.cn` and
// `6.ipw.cn`). Each body is trimmed and validated against the textual
// address pattern for its family.
//
// ## Failure Handling
//
// A lookup that times out, returns a non-2xx status or a malformed body
// yields no address for that family and a warning log. It never affects the
// other family and never fails the resolver.

use std::time::Duration;

use aliddns_core::config::IpLookupConfig;
use aliddns_core::ip::{self, IpFamily};
use aliddns_core::traits::IpResolver;
use aliddns_core::{CurrentIps, Error, Result};

/// HTTP-based public address resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    ipv4_url: String,
    ipv6_url: String,
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver from the lookup configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the HTTP client cannot be built.
    pub fn new(config: &IpLookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(config, client))
    }

    /// Create a resolver using a preconfigured HTTP client
    ///
    /// The client is used as-is; `timeout_secs` and `user_agent` from
    /// `config` are ignored.
    pub fn with_client(config: &IpLookupConfig, client: reqwest::Client) -> Self {
        Self {
            ipv4_url: config.ipv4_url.clone(),
            ipv6_url: config.ipv6_url.clone(),
            client,
        }
    }

    /// Resolve a single family
    pub async fn lookup(&self, family: IpFamily) -> Option<String> {
        let url = match family {
            IpFamily::V4 => &self.ipv4_url,
            IpFamily::V6 => &self.ipv6_url,
        };

        match self.fetch(url).await {
            Ok(body) => match parse_address(family, &body) {
                Some(address) => {
                    tracing::debug!("Resolved {} address: {}", family, address);
                    Some(address)
                }
                None => {
                    tracing::warn!(
                        "{} lookup via {} returned an invalid address: {:?}",
                        family,
                        url,
                        body.trim()
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!("{} lookup via {} failed: {}", family, url, e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> CurrentIps {
        let (ipv4, ipv6) = tokio::join!(self.lookup(IpFamily::V4), self.lookup(IpFamily::V6));
        let ips = CurrentIps::new(ipv4, ipv6);

        if ips.is_empty() {
            tracing::warn!("Could not resolve any public address");
        } else {
            tracing::info!("Current public addresses: {}", ips);
        }

        ips
    }
}

/// Trim a response body and keep it if it is a valid address of `family`
fn parse_address(family: IpFamily, body: &str) -> Option<String> {
    let candidate = body.trim();
    ip::is_valid_for(family, candidate).then(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `responses` (status, body) to consecutive connections on a local port
    async fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}/")
    }

    fn config(ipv4_url: String, ipv6_url: String) -> IpLookupConfig {
        IpLookupConfig {
            ipv4_url,
            ipv6_url,
            ..IpLookupConfig::default()
        }
    }

    /// Resolver for local test servers, unaffected by proxy variables
    fn local_resolver(ipv4_url: String, ipv6_url: String) -> HttpIpResolver {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpIpResolver::with_client(&config(ipv4_url, ipv6_url), client)
    }

    #[test]
    fn builds_from_default_config() {
        assert!(HttpIpResolver::new(&IpLookupConfig::default()).is_ok());
    }

    #[test]
    fn parse_trims_and_validates() {
        assert_eq!(
            parse_address(IpFamily::V4, " 1.2.3.4\n").as_deref(),
            Some("1.2.3.4")
        );
        assert_eq!(parse_address(IpFamily::V4, "256.1.1.1"), None);
        assert_eq!(parse_address(IpFamily::V4, "<html>blocked</html>"), None);
        assert_eq!(
            parse_address(IpFamily::V6, "2408:8207:0:0:0:0:0:1\n").as_deref(),
            Some("2408:8207:0:0:0:0:0:1")
        );
        assert_eq!(parse_address(IpFamily::V6, "2408:8207::1"), None);
        assert_eq!(parse_address(IpFamily::V6, "1.2.3.4"), None);
    }

    #[tokio::test]
    async fn resolves_both_families() {
        let v4 = serve(vec![(200, "1.2.3.4\n")]).await;
        let v6 = serve(vec![(200, "2001:db8:0:0:0:0:0:1")]).await;
        let resolver = local_resolver(v4, v6);

        let ips = resolver.resolve().await;

        assert_eq!(ips.ipv4.as_deref(), Some("1.2.3.4"));
        assert_eq!(ips.ipv6.as_deref(), Some("2001:db8:0:0:0:0:0:1"));
    }

    #[tokio::test]
    async fn failing_family_does_not_affect_the_other() {
        let v4 = serve(vec![(200, "5.6.7.8")]).await;
        let v6 = serve(vec![(503, "unavailable")]).await;
        let resolver = local_resolver(v4, v6);

        let ips = resolver.resolve().await;

        assert_eq!(ips.ipv4.as_deref(), Some("5.6.7.8"));
        assert_eq!(ips.ipv6, None);
    }

    #[tokio::test]
    async fn malformed_body_yields_no_address() {
        let v4 = serve(vec![(200, "999.1.1.1")]).await;
        let v6 = serve(vec![(200, "::1")]).await;
        let resolver = local_resolver(v4, v6);

        assert!(resolver.resolve().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_no_address() {
        // Bind then drop to get a local port with nothing listening
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let url = format!("http://{addr}/");
        let resolver = local_resolver(url.clone(), url);

        assert!(resolver.resolve().await.is_empty());
    }
}
