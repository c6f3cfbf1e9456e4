//! The `PLAINTEXT` signature method, RFC 5849 section 3.4.4.
//!
//! No hashing at all: the signature is the two percent-encoded secrets joined by `&`, relying
//! entirely on the transport layer for confidentiality. The signature base string is never
//! consulted.
use crate::protocol::parameter;
use crate::signature::{SignatureError, SigningKey};

/// The signature value for the given key, `enc(consumer_secret)&enc(token_secret)`.
///
/// An empty token secret still contributes its separator, so a consumer-only key signs as
/// `secret&`.
pub(crate) fn signature(key: &SigningKey) -> Result<String, SignatureError> {
    match key {
        SigningKey::Shared {
            consumer_secret,
            token_secret,
        } => Ok(format!(
            "{}&{}",
            parameter::encode(consumer_secret),
            parameter::encode(token_secret)
        )),
        SigningKey::Rsa { .. } => Err(SignatureError::MissingKeyMaterial),
    }
}

/// Compare a supplied signature against the value the key produces.
pub(crate) fn validate(key: &SigningKey, supplied: &str) -> Result<bool, SignatureError> {
    Ok(signature(key)? == supplied)
}
