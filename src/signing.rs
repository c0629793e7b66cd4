//! Request signing for robot webhooks.
//!
//! Both robots sign the text `"{timestamp}\n{secret}"` with HMAC-SHA256 and
//! send the base64 digest. They differ in the timestamp unit and in which
//! side of the HMAC that text goes:
//!
//! | Robot | Timestamp | HMAC key | HMAC message |
//! |-------|-----------|----------|--------------|
//! | DingTalk | milliseconds | secret | `"{ts}\n{secret}"` |
//! | FeiShu | seconds | `"{ts}\n{secret}"` | empty |

use crate::{Error, Result};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScheme {
    /// Key is the secret, message is the string to sign (DingTalk).
    SecretKeyed,
    /// Key is the string to sign, message is empty (FeiShu).
    PayloadKeyed,
}

/// A timestamp and the signature computed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub timestamp: i64,
    pub sign: String,
}

pub fn string_to_sign(timestamp: i64, secret: &str) -> String {
    format!("{}\n{}", timestamp, secret)
}

pub fn sign(scheme: SignScheme, secret: &str, timestamp: i64) -> Result<String> {
    let payload = string_to_sign(timestamp, secret);
    let (key, message) = match scheme {
        SignScheme::SecretKeyed => (secret.as_bytes(), payload.as_bytes()),
        SignScheme::PayloadKeyed => (payload.as_bytes(), &[][..]),
    };
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::signature(format!("HMAC init: {e}")))?;
    mac.update(message);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn sign_at(scheme: SignScheme, secret: &str, timestamp: i64) -> Result<Signature> {
    Ok(Signature {
        timestamp,
        sign: sign(scheme, secret, timestamp)?,
    })
}

pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
