use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn keyed_digest(secret: &str, payload: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex HMAC-SHA256 digest using constant-time comparison.
///
/// Hex case is ignored, since gateways differ on it.
pub fn verify_keyed_digest(
    secret: &str,
    payload: &str,
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected = keyed_digest(secret, payload)?;
    let received = signature.trim().to_ascii_lowercase();

    let expected_bytes = expected.as_bytes();
    let received_bytes = received.as_bytes();

    if expected_bytes.len() != received_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(received_bytes).into())
}

/// Canonical `k=v&k=v` string of gateway parameters.
///
/// Drops the signature fields and empty values, then sorts by key.
pub fn canonical_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(k, v)| !v.is_empty() && *k != "sign" && *k != "sign_type")
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
