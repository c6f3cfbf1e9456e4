//! The `RSA-SHA1` signature method, RFC 5849 section 3.4.3.
//!
//! PKCS#1 v1.5 over the SHA-1 digest of the signature base string. Signing takes the consumer's
//! private key, verification its public key; a provider obtains the latter from its consumer
//! store. Missing key material is a configuration error distinct from an invalid signature.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};

use crate::signature::{SignatureError, SigningKey};

/// Sign the base string with the private key, returning the base64 signature.
pub(crate) fn sign(base: &str, key: &SigningKey) -> Result<String, SignatureError> {
    let private = match key {
        SigningKey::Rsa {
            private: Some(private),
            ..
        } => private,
        _ => return Err(SignatureError::MissingKeyMaterial),
    };

    let digest = Sha1::digest(base.as_bytes());
    let signature = private
        .sign(Pkcs1v15Sign::new::<Sha1>(), digest.as_slice())
        .map_err(|_| SignatureError::SignatureFailed)?;

    Ok(BASE64.encode(signature))
}

/// Verify the supplied signature over the base string with the public key.
pub(crate) fn validate(base: &str, key: &SigningKey, supplied: &str) -> Result<bool, SignatureError> {
    let public = match key {
        SigningKey::Rsa {
            public: Some(public),
            ..
        } => public,
        _ => return Err(SignatureError::AlgorithmKeyMissing),
    };

    let supplied = match BASE64.decode(supplied) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(false),
    };

    let digest = Sha1::digest(base.as_bytes());
    Ok(public
        .verify(Pkcs1v15Sign::new::<Sha1>(), digest.as_slice(), &supplied)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rsa::{RsaPrivateKey, RsaPublicKey};

    const BASE: &str = "GET&http%3A%2F%2Fexample.com%2Frequest&a%3D1";

    #[test]
    fn sign_then_verify() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let signature = sign(BASE, &SigningKey::rsa_private(private)).unwrap();
        assert!(validate(BASE, &SigningKey::rsa_public(public), &signature).unwrap());
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let foreign = RsaPublicKey::from(&RsaPrivateKey::new(&mut rng, 2048).unwrap());

        let signature = sign(BASE, &SigningKey::rsa_private(private)).unwrap();
        assert!(!validate(BASE, &SigningKey::rsa_public(foreign), &signature).unwrap());
    }

    #[test]
    fn tampered_base_does_not_verify() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let signature = sign(BASE, &SigningKey::rsa_private(private)).unwrap();
        let tampered = BASE.replace("a%3D1", "a%3D2");
        assert!(!validate(&tampered, &SigningKey::rsa_public(public), &signature).unwrap());
    }

    #[test]
    fn undecodable_signature_is_a_mismatch() {
        let mut rng = rand::thread_rng();
        let public = RsaPublicKey::from(&RsaPrivateKey::new(&mut rng, 2048).unwrap());
        assert!(!validate(BASE, &SigningKey::rsa_public(public), "!!!").unwrap());
    }

    #[test]
    fn missing_public_key_is_a_configuration_error() {
        let key = SigningKey::shared("secret", None);
        assert_eq!(
            validate(BASE, &key, "sig"),
            Err(SignatureError::AlgorithmKeyMissing),
        );
    }
}
