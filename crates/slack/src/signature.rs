//! Slack request signing.
//!
//! Every webhook carries `x-slack-request-timestamp` and `x-slack-signature`
//! headers. The signature is `v0=` followed by the hex HMAC-SHA256 of
//! `v0:{timestamp}:{raw body}` keyed with the app's signing secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Maximum distance between the request timestamp and `now`, in seconds.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Returns `true` only for a fresh request whose signature matches the body.
///
/// Never errors: absent headers, unparseable timestamps, stale requests and
/// mismatched signatures all yield `false`.
pub fn verify_request(
    signing_secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> bool {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    let Ok(request_time) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    if now.abs_diff(request_time) > MAX_TIMESTAMP_SKEW_SECS as u64 {
        return false;
    }

    let Some(expected) = compute_signature(signing_secret, timestamp, body) else {
        return false;
    };

    let expected = expected.as_bytes();
    let provided = signature.as_bytes();
    expected.len() == provided.len() && bool::from(expected.ct_eq(provided))
}

/// `v0=<hex hmac>` for the given timestamp and body.
pub fn compute_signature(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes()).ok()?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}
