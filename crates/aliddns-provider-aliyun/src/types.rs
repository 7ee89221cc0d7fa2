//! Alidns request parameters, response bodies and query encoding

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// RFC 3986 percent-encoding (unreserved characters pass through)
pub fn url_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => result.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    let _ = write!(result, "%{byte:02X}");
                }
            }
        }
    }
    result
}

/// Flatten a JSON value into dotted key/value pairs
///
/// Arrays use 1-based indices (`Key.1`, `Key.2`); nulls are dropped.
pub fn flatten_value(
    prefix: &str,
    value: &serde_json::Value,
    result: &mut BTreeMap<String, String>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_value(&key, v, result);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_value(&format!("{}.{}", prefix, i + 1), v, result);
            }
        }
        serde_json::Value::String(s) => {
            result.insert(prefix.to_string(), s.clone());
        }
        serde_json::Value::Number(n) => {
            result.insert(prefix.to_string(), n.to_string());
        }
        serde_json::Value::Bool(b) => {
            result.insert(prefix.to_string(), b.to_string());
        }
        serde_json::Value::Null => {}
    }
}

/// Serialize request parameters into a key-sorted, encoded query string
pub fn serialize_to_query_string<T: Serialize>(params: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(params)?;

    let mut flat = BTreeMap::new();
    flatten_value("", &value, &mut flat);

    Ok(flat
        .iter()
        .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
        .collect::<Vec<_>>()
        .join("&"))
}

// ============ Requests ============

#[derive(Debug, Serialize)]
pub struct DescribeDomainsRequest {
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
    #[serde(rename = "PageSize")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct DescribeDomainRecordsRequest {
    #[serde(rename = "DomainName")]
    pub domain_name: String,
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
    #[serde(rename = "PageSize")]
    pub page_size: u32,
    #[serde(rename = "RRKeyWord", skip_serializing_if = "Option::is_none")]
    pub rr_keyword: Option<String>,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDomainRecordRequest {
    #[serde(rename = "RecordId")]
    pub record_id: String,
    #[serde(rename = "RR")]
    pub rr: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "TTL")]
    pub ttl: u32,
    #[serde(rename = "Line")]
    pub line: String,
}

// ============ Responses ============

#[derive(Debug, Deserialize)]
pub struct DescribeDomainsResponse {
    #[serde(rename = "Domains")]
    pub domains: Option<DomainsWrapper>,
    #[serde(rename = "TotalCount")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DomainsWrapper {
    #[serde(rename = "Domain")]
    pub domain: Option<Vec<AliyunDomain>>,
}

#[derive(Debug, Deserialize)]
pub struct AliyunDomain {
    #[serde(rename = "DomainName")]
    pub domain_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DescribeDomainRecordsResponse {
    #[serde(rename = "DomainRecords")]
    pub domain_records: Option<DomainRecordsWrapper>,
    #[serde(rename = "TotalCount")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DomainRecordsWrapper {
    #[serde(rename = "Record")]
    pub record: Option<Vec<AliyunRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct AliyunRecord {
    #[serde(rename = "RecordId")]
    pub record_id: String,
    #[serde(rename = "DomainName")]
    pub domain_name: Option<String>,
    #[serde(rename = "RR")]
    pub rr: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDomainRecordResponse {
    #[serde(rename = "RecordId")]
    pub record_id: Option<String>,
}

/// `{Code, Message}` body returned on API failures
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
}
