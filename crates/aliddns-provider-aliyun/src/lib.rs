// # Alibaba Cloud DNS Provider
//
// This crate implements the `DnsApi` transport for Alibaba Cloud DNS
// (Alidns), API version `2015-01-09`.
//
// ## Scope
//
// - One HTTP request per trait call
// - Errors are classified and returned; pagination, retries and the
//   "write only when changed" decision belong to `ProviderClient`
// - No background tasks and no caching
//
// ## Request Shape
//
// RPC-style `POST https://alidns.<region>.aliyuncs.com/?<params>` with an
// empty body. Parameters are sorted and RFC 3986 encoded; the request is
// signed with ACS3-HMAC-SHA256 (see `sign.rs`).
//
// ## Security Requirements
//
// - The AccessKey secret NEVER appears in logs or `Debug` output
// - Empty credentials are rejected at construction
//
// ## API Reference
//
// - DescribeDomains: list domains of the account
// - DescribeDomainRecords: list records of a domain, optional `RRKeyWord`/`Type` filters
// - UpdateDomainRecord: overwrite a record by `RecordId`

mod sign;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use aliddns_core::error::DUPLICATE_RECORD_CODE;
use aliddns_core::traits::{DnsApi, Page, RecordQuery, RecordUpdate};
use aliddns_core::{Credentials, DomainRecord, Error, RecordType, Result};

use crate::types::{
    ApiErrorBody, DescribeDomainRecordsRequest, DescribeDomainRecordsResponse,
    DescribeDomainsRequest, DescribeDomainsResponse, UpdateDomainRecordRequest,
    UpdateDomainRecordResponse, serialize_to_query_string,
};

/// Provider name used in errors and logs
pub const PROVIDER_NAME: &str = "aliyun";

/// Alidns API version
pub(crate) const ALIYUN_DNS_VERSION: &str = "2015-01-09";

/// SHA-256 of the empty request body
pub(crate) const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Connect timeout for API requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall timeout for API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Alidns API client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the secret.
pub struct AliyunDnsApi {
    access_key_id: String,
    /// ⚠️ NEVER log this value
    access_key_secret: String,
    /// `alidns.<region>.aliyuncs.com`
    host: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AliyunDnsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunDnsApi")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("host", &self.host)
            .finish()
    }
}

impl AliyunDnsApi {
    /// Create a client for the credentials' region
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a credential field is empty or the HTTP
    /// client cannot be built.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access_key_id: credentials.access_key_id.trim().to_string(),
            access_key_secret: credentials.access_key_secret.trim().to_string(),
            host: format!("alidns.{}.aliyuncs.com", credentials.region.trim()),
            client,
        })
    }

    /// API endpoint host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Send one signed RPC request and decode the response
    async fn request<T: DeserializeOwned, B: Serialize>(&self, action: &str, params: &B) -> Result<T> {
        let query_string = serialize_to_query_string(params)?;
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();

        let authorization = self.sign(action, &query_string, &timestamp, &nonce);

        let url = if query_string.is_empty() {
            format!("https://{}/", self.host)
        } else {
            format!("https://{}/?{}", self.host, query_string)
        };

        tracing::debug!("Alidns {} request to {}", action, self.host);

        let response = self
            .client
            .post(&url)
            .header("host", &self.host)
            .header("x-acs-action", action)
            .header("x-acs-version", ALIYUN_DNS_VERSION)
            .header("x-acs-date", &timestamp)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| {
                Error::provider(PROVIDER_NAME, format!("{} request failed: {}", action, e))
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("Failed to read {} response: {}", action, e),
            )
        })?;

        parse_response(action, status, &text)
    }
}

/// Classify a response body
///
/// A `{Code, Message}` body is an API error regardless of status. Other
/// bodies on 4xx/5xx become a provider error carrying the status.
fn parse_response<T: DeserializeOwned>(action: &str, status: u16, text: &str) -> Result<T> {
    let value = serde_json::from_str::<serde_json::Value>(text);

    if let Ok(value) = &value
        && value.get("Code").is_some_and(|c| c.is_string())
        && let Ok(body) = serde_json::from_value::<ApiErrorBody>(value.clone())
    {
        tracing::warn!("Alidns {} failed: {} - {}", action, body.code, body.message);
        return Err(map_api_error(body));
    }

    if status >= 400 {
        return Err(Error::provider(
            PROVIDER_NAME,
            format!("HTTP {}: {}", status, text.trim()),
        ));
    }

    let value = value.map_err(|e| {
        Error::provider(
            PROVIDER_NAME,
            format!("Failed to parse {} response: {}", action, e),
        )
    })?;

    serde_json::from_value(value).map_err(|e| {
        Error::provider(
            PROVIDER_NAME,
            format!("Unexpected {} response: {}", action, e),
        )
    })
}

fn map_api_error(body: ApiErrorBody) -> Error {
    if body.code == DUPLICATE_RECORD_CODE {
        Error::duplicate(format!("{}: {}", body.code, body.message))
    } else {
        Error::provider(PROVIDER_NAME, format!("{}: {}", body.code, body.message))
    }
}

#[async_trait]
impl DnsApi for AliyunDnsApi {
    async fn describe_domains(&self, page_number: u32, page_size: u32) -> Result<Page<String>> {
        let request = DescribeDomainsRequest {
            page_number,
            page_size,
        };

        let response: DescribeDomainsResponse = self.request("DescribeDomains", &request).await?;

        let domains: Vec<String> = response
            .domains
            .and_then(|d| d.domain)
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.domain_name)
            .collect();
        let total = response.total_count.unwrap_or(domains.len() as u64);

        Ok(Page::new(domains, total))
    }

    async fn describe_domain_records(&self, query: &RecordQuery) -> Result<Page<DomainRecord>> {
        let request = DescribeDomainRecordsRequest {
            domain_name: query.domain_name.clone(),
            page_number: query.page_number,
            page_size: query.page_size,
            rr_keyword: query.rr_keyword.clone(),
            record_type: query.record_type.as_ref().map(|t| t.as_str().to_string()),
        };

        let response: DescribeDomainRecordsResponse =
            self.request("DescribeDomainRecords", &request).await?;

        let records: Vec<DomainRecord> = response
            .domain_records
            .and_then(|r| r.record)
            .unwrap_or_default()
            .into_iter()
            .map(|r| DomainRecord {
                record_id: r.record_id,
                domain_name: r.domain_name.unwrap_or_else(|| query.domain_name.clone()),
                rr: r.rr,
                record_type: RecordType::from(r.record_type),
                value: r.value,
                ttl: r.ttl,
            })
            .collect();
        let total = response.total_count.unwrap_or(records.len() as u64);

        Ok(Page::new(records, total))
    }

    async fn update_domain_record(&self, update: &RecordUpdate) -> Result<()> {
        let request = UpdateDomainRecordRequest {
            record_id: update.record_id.clone(),
            rr: update.rr.clone(),
            record_type: update.record_type.as_str().to_string(),
            value: update.value.clone(),
            ttl: update.ttl,
            line: update.line.clone(),
        };

        let _: UpdateDomainRecordResponse = self.request("UpdateDomainRecord", &request).await?;

        tracing::debug!(
            "Alidns accepted update of record {} ({} {})",
            update.record_id,
            update.record_type,
            update.value
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("LTAI5tTestKeyId", "test_secret_12345")
    }

    #[test]
    fn test_host_follows_region() {
        let api = AliyunDnsApi::new(&credentials()).unwrap();
        assert_eq!(api.host(), "alidns.cn-hangzhou.aliyuncs.com");

        let api = AliyunDnsApi::new(&credentials().with_region("ap-southeast-1")).unwrap();
        assert_eq!(api.host(), "alidns.ap-southeast-1.aliyuncs.com");
        assert_eq!(api.provider_name(), "aliyun");
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = AliyunDnsApi::new(&Credentials::new("  ", "secret"));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = AliyunDnsApi::new(&Credentials::new("key", ""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_secret_not_exposed_in_debug() {
        let api = AliyunDnsApi::new(&credentials()).unwrap();
        let debug_output = format!("{:?}", api);

        assert!(
            !debug_output.contains("test_secret_12345"),
            "Debug output should not contain the secret"
        );
        assert!(debug_output.contains("<REDACTED>"));
    }

    #[test]
    fn test_success_body_decoded() {
        let body = r#"{"RequestId": "abc", "RecordId": "9999985"}"#;
        let response: UpdateDomainRecordResponse =
            parse_response("UpdateDomainRecord", 200, body).unwrap();
        assert_eq!(response.record_id.as_deref(), Some("9999985"));
    }

    #[test]
    fn test_duplicate_code_classified() {
        let body = r#"{"RequestId": "abc", "Code": "DomainRecordDuplicate", "Message": "The DNS record already exists."}"#;
        let err = parse_response::<UpdateDomainRecordResponse>("UpdateDomainRecord", 400, body)
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateRecord { .. }));
        assert!(err.is_duplicate_conflict());
        assert_eq!(
            err.raw_message(),
            "DomainRecordDuplicate: The DNS record already exists."
        );
    }

    #[test]
    fn test_api_error_carries_code_and_message() {
        let body = r#"{"Code": "InvalidAccessKeyId.NotFound", "Message": "Specified access key is not found."}"#;
        let err = parse_response::<DescribeDomainsResponse>("DescribeDomains", 404, body)
            .unwrap_err();

        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "aliyun");
                assert_eq!(
                    message,
                    "InvalidAccessKeyId.NotFound: Specified access key is not found."
                );
            }
            other => panic!("Expected Provider error, got: {:?}", other),
        }
    }

    #[test]
    fn test_error_code_in_200_body() {
        let body = r#"{"Code": "Throttling.User", "Message": "Request was denied due to user flow control."}"#;
        let err = parse_response::<DescribeDomainsResponse>("DescribeDomains", 200, body)
            .unwrap_err();
        assert!(err.raw_message().starts_with("Throttling.User: "));
        assert!(!err.is_duplicate_conflict());
    }

    #[test]
    fn test_non_json_error_carries_status() {
        let err = parse_response::<DescribeDomainsResponse>(
            "DescribeDomains",
            502,
            "<html>Bad Gateway</html>",
        )
        .unwrap_err();
        assert_eq!(err.raw_message(), "HTTP 502: <html>Bad Gateway</html>");
    }

    #[test]
    fn test_malformed_success_body() {
        let err = parse_response::<DescribeDomainsResponse>("DescribeDomains", 200, "not json")
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
