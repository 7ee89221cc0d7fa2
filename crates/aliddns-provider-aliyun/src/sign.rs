//! ACS3-HMAC-SHA256 request signing
//!
//! RPC-style requests carry their parameters in the query string and an
//! empty body, so the payload hash is always the hash of the empty string.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::{ALIYUN_DNS_VERSION, AliyunDnsApi, EMPTY_BODY_SHA256};

pub(crate) const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

pub(crate) const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

impl AliyunDnsApi {
    /// Build the `Authorization` header value for one request
    pub(crate) fn sign(
        &self,
        action: &str,
        query_string: &str,
        timestamp: &str,
        nonce: &str,
    ) -> String {
        let host = &self.host;
        let canonical_headers = format!(
            "host:{host}\nx-acs-action:{action}\nx-acs-content-sha256:{EMPTY_BODY_SHA256}\nx-acs-date:{timestamp}\nx-acs-signature-nonce:{nonce}\nx-acs-version:{ALIYUN_DNS_VERSION}\n"
        );

        let canonical_request = format!(
            "POST\n/\n{query_string}\n{canonical_headers}\n{SIGNED_HEADERS}\n{EMPTY_BODY_SHA256}"
        );
        tracing::trace!("Canonical request:\n{}", canonical_request);

        let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!("{SIGNATURE_ALGORITHM}\n{hashed_request}");

        let signature = hex::encode(hmac_sha256(
            self.access_key_secret.as_bytes(),
            string_to_sign.as_bytes(),
        ));

        format!(
            "{SIGNATURE_ALGORITHM} Credential={},SignedHeaders={},Signature={}",
            self.access_key_id, SIGNED_HEADERS, signature
        )
    }
}
