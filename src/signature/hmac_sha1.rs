//! The `HMAC-SHA1` signature method, RFC 5849 section 3.4.2.
//!
//! The MAC key is the same `enc(consumer_secret)&enc(token_secret)` string `PLAINTEXT` would
//! emit as its signature; the message is the signature base string. Verification recomputes the
//! tag and compares in constant time, so a mismatched signature costs an attacker nothing to
//! learn beyond the mismatch itself.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::protocol::parameter;
use crate::signature::{SignatureError, SigningKey};

type HmacSha1 = Hmac<Sha1>;

fn mac(base: &str, key: &SigningKey) -> Result<HmacSha1, SignatureError> {
    let (consumer_secret, token_secret) = match key {
        SigningKey::Shared {
            consumer_secret,
            token_secret,
        } => (consumer_secret, token_secret),
        SigningKey::Rsa { .. } => return Err(SignatureError::MissingKeyMaterial),
    };

    let key_material = format!(
        "{}&{}",
        parameter::encode(consumer_secret),
        parameter::encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(key_material.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    Ok(mac)
}

/// Sign the base string, returning the base64 tag.
pub(crate) fn sign(base: &str, key: &SigningKey) -> Result<String, SignatureError> {
    let tag = mac(base, key)?.finalize().into_bytes();
    Ok(BASE64.encode(tag))
}

/// Recompute the tag and compare it against the supplied signature in constant time.
///
/// A signature that is not even valid base64 is simply a mismatch, not an error.
pub(crate) fn validate(base: &str, key: &SigningKey, supplied: &str) -> Result<bool, SignatureError> {
    let supplied = match BASE64.decode(supplied) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };

    Ok(mac(base, key)?.verify_slice(&supplied).is_ok())
}
