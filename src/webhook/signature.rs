use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Accepted clock skew between the sender and us, in seconds.
pub const TOLERANCE_SECONDS: u64 = 5 * 60;

const ID_HEADERS: [&str; 2] = ["signature-id", "svix-id"];
const TIMESTAMP_HEADERS: [&str; 2] = ["signature-timestamp", "svix-timestamp"];
const SIGNATURE_HEADERS: [&str; 2] = ["signature-value", "svix-signature"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

impl SignatureHeaders {
    /// `None` when any of the three headers is absent or empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(SignatureHeaders {
            id: first_header(headers, &ID_HEADERS)?,
            timestamp: first_header(headers, &TIMESTAMP_HEADERS)?,
            signature: first_header(headers, &SIGNATURE_HEADERS)?,
        })
    }
}

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, ServiceError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::ConfigurationError(format!("webhook secret is not valid base64: {e}")))?;

        Ok(WebhookVerifier { key })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ServiceError::ConfigurationError(format!("unusable webhook secret: {e}")))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Produces a `v1,<base64>` signature entry for the given message.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, ServiceError> {
        let mac = self.mac(id, &timestamp.to_string(), body)?;
        let digest = mac.finalize().into_bytes();
        Ok(format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(digest)))
    }

    pub fn verify(&self, headers: &SignatureHeaders, body: &[u8]) -> Result<(), ServiceError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, headers: &SignatureHeaders, body: &[u8], now: i64) -> Result<(), ServiceError> {
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| ServiceError::VerificationFailure("invalid signature timestamp".to_string()))?;

        if now.abs_diff(timestamp) > TOLERANCE_SECONDS {
            return Err(ServiceError::VerificationFailure(
                "signature timestamp outside tolerance".to_string(),
            ));
        }

        let mac = self.mac(&headers.id, &headers.timestamp, body)?;

        for entry in headers.signature.split_whitespace() {
            let Some((version, encoded)) = entry.split_once(',') else {
                continue;
            };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(expected) = STANDARD.decode(encoded) else {
                continue;
            };
            if mac.clone().verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(ServiceError::VerificationFailure(
            "no matching signature".to_string(),
        ))
    }
}
