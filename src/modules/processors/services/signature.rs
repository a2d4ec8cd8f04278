//! Webhook signature primitives shared by the processor adapters.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` under `secret`
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time equality over hex digests
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parse a `key1=v,key2=v` signature header into (timestamp, digest) using the
/// given element keys, e.g. (`t`, `v1`) or (`ts`, `v1`)
pub fn parse_signature_header(
    header: &str,
    ts_key: &str,
    digest_key: &str,
) -> Option<(i64, String)> {
    let mut timestamp = None;
    let mut digest = None;

    for element in header.split(',') {
        let (key, value) = element.trim().split_once('=')?;
        if key == ts_key {
            timestamp = value.parse::<i64>().ok();
        } else if key == digest_key {
            digest = Some(value.to_string());
        }
    }

    Some((timestamp?, digest?))
}
