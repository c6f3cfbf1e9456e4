//! The standard inspectors a provider runs against incoming requests.
//!
//! Each inspector owns a handle to the store it consults and judges exactly one aspect of a
//! request. They share no state with one another; the [`Provider`] merely runs them in order.
//!
//! [`Provider`]: ../struct.Provider.html
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::primitives::consumer::ConsumerStore;
use crate::primitives::nonce::NonceStore;
use crate::primitives::token::{TokenStatus, TokenStore};
use crate::protocol::context::ProtocolContext;
use crate::protocol::parameter;
use crate::protocol::problem::{Problem, ProblemReport};
use crate::provider::{Error, Phase};
use crate::signature::{self, SigningKey};

/// One validation step of the provider pipeline.
pub trait Inspector {
    /// Whether this inspector has anything to say about the given phase.
    ///
    /// The default applies the inspector to every phase.
    fn applies_to(&self, phase: Phase) -> bool {
        let _ = phase;
        true
    }

    /// Judge the context, failing with the first problem found.
    fn inspect(&self, phase: Phase, context: &ProtocolContext) -> Result<(), Error>;
}

/// Verifies that the presented consumer key belongs to a registered consumer.
pub struct ConsumerInspector {
    consumers: Arc<dyn ConsumerStore + Send + Sync>,
}

impl ConsumerInspector {
    /// An inspector over the given consumer store.
    pub fn new(consumers: Arc<dyn ConsumerStore + Send + Sync>) -> Self {
        ConsumerInspector { consumers }
    }
}

impl Inspector for ConsumerInspector {
    fn inspect(&self, _phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
        let consumer_key = context.consumer_key.as_deref().unwrap_or_default();

        if !self.consumers.is_consumer(consumer_key) {
            return Err(ProblemReport::new(Problem::ConsumerKeyUnknown).into());
        }

        Ok(())
    }
}

/// Recomputes the signature base string and verifies the supplied signature against it.
///
/// Key material is resolved per method: the symmetric methods read the consumer secret and, when
/// a token travels with the request, its token secret; only `RSA-SHA1` ever touches the
/// consumer store's verification key.
pub struct SignatureInspector {
    consumers: Arc<dyn ConsumerStore + Send + Sync>,
    tokens: Arc<dyn TokenStore + Send + Sync>,
}

impl SignatureInspector {
    /// An inspector resolving key material from the given stores.
    pub fn new(
        consumers: Arc<dyn ConsumerStore + Send + Sync>,
        tokens: Arc<dyn TokenStore + Send + Sync>,
    ) -> Self {
        SignatureInspector { consumers, tokens }
    }

    fn resolve_key(&self, context: &ProtocolContext) -> Result<SigningKey, Error> {
        let method = context
            .signature_method
            .ok_or(signature::SignatureError::MissingSignatureMethod)?;
        let consumer_key = context.consumer_key.as_deref().unwrap_or_default();

        if method.is_asymmetric() {
            let public = self
                .consumers
                .verification_key(consumer_key)
                .ok_or(signature::SignatureError::AlgorithmKeyMissing)?;
            return Ok(SigningKey::rsa_public(public));
        }

        let consumer_secret = match self.consumers.consumer_secret(consumer_key) {
            Some(secret) => secret,
            None => return Err(ProblemReport::new(Problem::ConsumerKeyUnknown).into()),
        };
        let token_secret = context
            .token
            .as_deref()
            .and_then(|token| self.tokens.token_secret(token));

        Ok(SigningKey::shared(consumer_secret, token_secret))
    }
}

impl Inspector for SignatureInspector {
    fn inspect(&self, _phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
        let key = self.resolve_key(context)?;

        if !signature::validate(context, &key)? {
            return Err(ProblemReport::new(Problem::SignatureInvalid)
                .with_advice("Failed to validate signature")
                .into());
        }

        Ok(())
    }
}

/// Enforces the freshness window and single use of each nonce/timestamp tuple.
///
/// The timestamp is judged first; only requests inside the window reach the nonce store, so the
/// store never fills up with tuples a clock-skewed client was going to be refused anyway.
pub struct FreshnessInspector {
    nonces: Arc<dyn NonceStore + Send + Sync>,
    window: Duration,
}

impl FreshnessInspector {
    /// An inspector accepting timestamps within `window` of the provider clock, either way.
    pub fn new(nonces: Arc<dyn NonceStore + Send + Sync>, window: Duration) -> Self {
        FreshnessInspector { nonces, window }
    }
}

impl Inspector for FreshnessInspector {
    fn inspect(&self, _phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
        let timestamp = match context.timestamp {
            Some(timestamp) => timestamp,
            None => return Err(ProblemReport::absent([parameter::TIMESTAMP]).into()),
        };
        let nonce = match context.nonce.as_deref() {
            Some(nonce) => nonce,
            None => return Err(ProblemReport::absent([parameter::NONCE]).into()),
        };

        let now = Utc::now();
        if (now.timestamp() - timestamp).abs() > self.window.num_seconds() {
            let mut report = ProblemReport::new(Problem::TimestampRefused);
            report.acceptable_timestamps = Some((now - self.window, now + self.window));
            return Err(report.into());
        }

        let fresh = self.nonces.check_and_record(
            context.consumer_key.as_deref().unwrap_or_default(),
            context.token.as_deref(),
            nonce,
            timestamp,
        );
        if !fresh {
            return Err(ProblemReport::new(Problem::NonceUsed).into());
        }

        Ok(())
    }
}

/// Confirms the presented token for the phases that require an issued one.
pub struct TokenInspector {
    tokens: Arc<dyn TokenStore + Send + Sync>,
}

impl TokenInspector {
    /// An inspector over the given token store.
    pub fn new(tokens: Arc<dyn TokenStore + Send + Sync>) -> Self {
        TokenInspector { tokens }
    }
}

impl Inspector for TokenInspector {
    fn applies_to(&self, phase: Phase) -> bool {
        matches!(phase, Phase::AccessToken | Phase::ProtectedResource)
    }

    fn inspect(&self, _phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
        let token = match context.token.as_deref() {
            Some(token) => token,
            None => return Err(ProblemReport::absent([parameter::TOKEN]).into()),
        };
        let consumer_key = context.consumer_key.as_deref().unwrap_or_default();

        match self.tokens.status(token, consumer_key) {
            TokenStatus::Valid => Ok(()),
            TokenStatus::Expired => Err(ProblemReport::new(Problem::TokenExpired).into()),
            TokenStatus::Unknown | TokenStatus::WrongConsumer => {
                Err(ProblemReport::new(Problem::TokenRejected).into())
            }
        }
    }
}
