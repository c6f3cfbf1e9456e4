//! Signing and verifying requests.
//!
//! Three signature methods exist behind one contract: `PLAINTEXT`, `HMAC-SHA1` and `RSA-SHA1`.
//! The set is closed; [`SignatureMethod`] enumerates it and the free functions [`sign`] and
//! [`validate`] dispatch on the method a context declares. Adding a method is a controlled
//! extension of this module, not open-ended dynamic dispatch.
//!
//! Both operations are pure apart from [`sign`] writing the computed signature back into the
//! context. Key material is borrowed per call and never cached, so the engine is safe to drive
//! concurrently over independent contexts.
//!
//! A mismatched signature is a regular `Ok(false)` result of [`validate`]. Errors are reserved
//! for configuration defects such as selecting `RSA-SHA1` without any key material, which a
//! provider must not confuse with an attacker-controlled signal.
//!
//! [`SignatureMethod`]: enum.SignatureMethod.html
//! [`sign`]: fn.sign.html
//! [`validate`]: fn.validate.html
use std::fmt;

use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::protocol::context::ProtocolContext;

pub mod base;
mod hmac_sha1;
mod plaintext;
mod rsa_sha1;

/// The closed set of signature methods.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureMethod {
    /// Secrets travel in the clear, protected only by the transport layer.
    Plaintext,

    /// HMAC-SHA1 over the signature base string, keyed by the concatenated secrets.
    HmacSha1,

    /// RSA-PKCS#1 v1.5 over the SHA-1 digest of the signature base string.
    RsaSha1,
}

impl SignatureMethod {
    /// The `oauth_signature_method` value for this method.
    pub fn name(self) -> &'static str {
        match self {
            SignatureMethod::Plaintext => "PLAINTEXT",
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::RsaSha1 => "RSA-SHA1",
        }
    }

    /// Look a method up by its `oauth_signature_method` value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLAINTEXT" => Some(SignatureMethod::Plaintext),
            "HMAC-SHA1" => Some(SignatureMethod::HmacSha1),
            "RSA-SHA1" => Some(SignatureMethod::RsaSha1),
            _ => None,
        }
    }

    /// Whether validation requires fetching asymmetric key material.
    ///
    /// Providers use this to avoid touching the certificate side of a consumer store for the
    /// symmetric methods.
    pub fn is_asymmetric(self) -> bool {
        matches!(self, SignatureMethod::RsaSha1)
    }
}

impl AsRef<str> for SignatureMethod {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The composite secret a signature operation runs with.
///
/// Ownership stays with the caller or the store collaborator that produced it; the engine only
/// borrows a key for the duration of one call.
#[derive(Clone)]
pub enum SigningKey {
    /// Consumer secret and token secret for the symmetric methods.
    Shared {
        /// The consumer's shared secret.
        consumer_secret: String,

        /// The token secret, empty when no token is in play.
        token_secret: String,
    },

    /// RSA key material for `RSA-SHA1`.
    ///
    /// Signing needs the private half, verification the public half; either may be absent when
    /// the caller only performs the other operation.
    Rsa {
        /// The consumer's private key, required for signing.
        private: Option<RsaPrivateKey>,

        /// The consumer's public key, required for verification.
        public: Option<RsaPublicKey>,
    },
}

impl SigningKey {
    /// A symmetric key from a consumer secret and an optional token secret.
    pub fn shared<C: Into<String>>(consumer_secret: C, token_secret: Option<String>) -> Self {
        SigningKey::Shared {
            consumer_secret: consumer_secret.into(),
            token_secret: token_secret.unwrap_or_default(),
        }
    }

    /// An RSA key that can only sign.
    pub fn rsa_private(private: RsaPrivateKey) -> Self {
        SigningKey::Rsa {
            private: Some(private),
            public: None,
        }
    }

    /// An RSA key that can only verify.
    pub fn rsa_public(public: RsaPublicKey) -> Self {
        SigningKey::Rsa {
            private: None,
            public: Some(public),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SigningKey::Shared { .. } => write!(f, "<shared secrets>"),
            SigningKey::Rsa { private, public } => write!(
                f,
                "<rsa private: {}, public: {}>",
                private.is_some(),
                public.is_some()
            ),
        }
    }
}

/// Failures of the signature engine.
///
/// None of these mean "the signature did not match"; that outcome is the `Ok(false)` result of
/// [`validate`].
///
/// [`validate`]: fn.validate.html
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignatureError {
    /// The context does not declare a signature method.
    MissingSignatureMethod,

    /// Signing was attempted without the secret or private key the method requires.
    MissingKeyMaterial,

    /// An asymmetric method was selected but no verification key material is available.
    ///
    /// A configuration defect of the provider deployment, not an attacker signal.
    AlgorithmKeyMissing,

    /// Validation was attempted on a context that carries no signature.
    MissingSignature,

    /// The cryptographic back-end refused the operation, for example because the RSA modulus is
    /// too small for the digest.
    SignatureFailed,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignatureError::MissingSignatureMethod => {
                write!(f, "context declares no signature method")
            }
            SignatureError::MissingKeyMaterial => {
                write!(f, "signing key material missing for the selected method")
            }
            SignatureError::AlgorithmKeyMissing => {
                write!(f, "no verification key material for the asymmetric method")
            }
            SignatureError::MissingSignature => write!(f, "context carries no signature"),
            SignatureError::SignatureFailed => write!(f, "cryptographic back-end refused"),
        }
    }
}

/// Sign the context with the given key and store the signature in it.
///
/// Returns the signature string that was stored. Apart from the signature field the context is
/// not mutated.
pub fn sign(context: &mut ProtocolContext, key: &SigningKey) -> Result<String, SignatureError> {
    let method = context
        .signature_method
        .ok_or(SignatureError::MissingSignatureMethod)?;

    let signature = match method {
        SignatureMethod::Plaintext => plaintext::signature(key)?,
        SignatureMethod::HmacSha1 => hmac_sha1::sign(&base::signature_base(context), key)?,
        SignatureMethod::RsaSha1 => rsa_sha1::sign(&base::signature_base(context), key)?,
    };

    context.signature = Some(signature.clone());
    Ok(signature)
}

/// Check the signature the context carries against the given key.
///
/// Never mutates the context. `Ok(false)` means the signature does not match; an `Err` means the
/// operation could not be attempted at all.
pub fn validate(context: &ProtocolContext, key: &SigningKey) -> Result<bool, SignatureError> {
    let method = context
        .signature_method
        .ok_or(SignatureError::MissingSignatureMethod)?;
    let supplied = context
        .signature
        .as_deref()
        .ok_or(SignatureError::MissingSignature)?;

    match method {
        SignatureMethod::Plaintext => plaintext::validate(key, supplied),
        SignatureMethod::HmacSha1 => {
            hmac_sha1::validate(&base::signature_base(context), key, supplied)
        }
        SignatureMethod::RsaSha1 => {
            rsa_sha1::validate(&base::signature_base(context), key, supplied)
        }
    }
}
