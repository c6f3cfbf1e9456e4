//! The provider-side validation pipeline.
//!
//! A provider reconstructs each incoming request into a [`ProtocolContext`] and hands it to a
//! [`Provider`], an ordered, immutable list of [`Inspector`]s. Inspection is parameterized by
//! the protocol [`Phase`] the request arrived at; each inspector declares which phases it
//! applies to and the first failing inspector stops the run. Success means the request is
//! authenticated for that phase — what to respond with is transport work above this crate.
//!
//! Inspectors are independent of one another: none may rely on side effects of an inspector
//! that did not run, so a provider assembling a custom subset for its own phase stays correct.
//!
//! [`ProtocolContext`]: ../protocol/context/struct.ProtocolContext.html
//! [`Provider`]: struct.Provider.html
//! [`Inspector`]: trait.Inspector.html
//! [`Phase`]: enum.Phase.html
use std::fmt;
use std::sync::Arc;

use chrono::Duration;

use crate::primitives::consumer::ConsumerStore;
use crate::primitives::nonce::NonceStore;
use crate::primitives::token::TokenStore;
use crate::protocol::context::ProtocolContext;
use crate::protocol::parameter;
use crate::protocol::problem::{Problem, ProblemReport};
use crate::signature::SignatureError;

pub mod inspector;

pub use self::inspector::{
    ConsumerInspector, FreshnessInspector, Inspector, SignatureInspector, TokenInspector,
};

/// The stage of the OAuth flow an incoming request claims to be at.
///
/// Validation requirements differ per phase; most prominently, only the token-bearing phases
/// require an issued token to be presented.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// A consumer asks for an unauthorized request token.
    RequestToken,

    /// The user is sent to the provider to authorize a request token.
    UserAuthorization,

    /// An authorized request token is traded for an access token.
    AccessToken,

    /// An access token accompanies a protected resource request.
    ProtectedResource,
}

/// The failure of a pipeline run.
#[derive(Clone, Debug)]
pub enum Error {
    /// The request was rejected; the report is ready to be rendered into the response body.
    Rejected(ProblemReport),

    /// A pipeline component was misconfigured, for example an asymmetric signature method
    /// without registered key material. Not an attacker signal and not reportable to the
    /// consumer as a protocol problem.
    Primitive(SignatureError),
}

impl Error {
    /// The problem report of a rejection, if this is one.
    pub fn report(&self) -> Option<&ProblemReport> {
        match self {
            Error::Rejected(report) => Some(report),
            Error::Primitive(_) => None,
        }
    }
}

impl From<ProblemReport> for Error {
    fn from(report: ProblemReport) -> Self {
        Error::Rejected(report)
    }
}

impl From<SignatureError> for Error {
    fn from(err: SignatureError) -> Self {
        Error::Primitive(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Rejected(report) => write!(f, "request rejected: {}", report),
            Error::Primitive(err) => write!(f, "pipeline misconfigured: {}", err),
        }
    }
}

/// An ordered set of inspectors run against incoming requests.
pub struct Provider {
    inspectors: Vec<Box<dyn Inspector + Send + Sync>>,
}

impl Provider {
    /// Assemble a provider from a custom inspector list.
    ///
    /// The list order is the execution order.
    pub fn with_inspectors(inspectors: Vec<Box<dyn Inspector + Send + Sync>>) -> Provider {
        Provider { inspectors }
    }

    /// The standard pipeline over the given stores.
    ///
    /// Consumer validation, signature validation, nonce/timestamp freshness, then token
    /// validation for the phases that present a token. `window` is the accepted clock skew in
    /// either direction.
    pub fn standard(
        consumers: Arc<dyn ConsumerStore + Send + Sync>,
        nonces: Arc<dyn NonceStore + Send + Sync>,
        tokens: Arc<dyn TokenStore + Send + Sync>,
        window: Duration,
    ) -> Provider {
        Provider::with_inspectors(vec![
            Box::new(ConsumerInspector::new(Arc::clone(&consumers))),
            Box::new(SignatureInspector::new(consumers, Arc::clone(&tokens))),
            Box::new(FreshnessInspector::new(nonces, window)),
            Box::new(TokenInspector::new(tokens)),
        ])
    }

    /// Run the pipeline against one request.
    ///
    /// Success authenticates the context for the phase. The first failure aborts the run and
    /// carries either a ready-to-serialize problem report or a configuration error.
    pub fn inspect(&self, phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
        required_parameters(phase, context)?;

        for inspector in &self.inspectors {
            if inspector.applies_to(phase) {
                inspector.inspect(phase, context)?;
            }
        }

        Ok(())
    }
}

/// Reject requests that do not even carry the parameters the phase needs.
///
/// Also pins the protocol version: a context may leave `oauth_version` out entirely, but a
/// supplied version other than `1.0` is rejected with the acceptable range.
fn required_parameters(phase: Phase, context: &ProtocolContext) -> Result<(), Error> {
    let mut absent = Vec::new();

    if context.consumer_key.is_none() {
        absent.push(parameter::CONSUMER_KEY);
    }
    if context.signature_method.is_none() {
        absent.push(parameter::SIGNATURE_METHOD);
    }
    if context.signature.is_none() {
        absent.push(parameter::SIGNATURE);
    }
    if context.timestamp.is_none() {
        absent.push(parameter::TIMESTAMP);
    }
    if context.nonce.is_none() {
        absent.push(parameter::NONCE);
    }

    match phase {
        Phase::RequestToken => {
            if context.callback.is_none() {
                absent.push(parameter::CALLBACK);
            }
        }
        Phase::UserAuthorization => (),
        Phase::AccessToken => {
            if context.token.is_none() {
                absent.push(parameter::TOKEN);
            }
            if context.verifier.is_none() {
                absent.push(parameter::VERIFIER);
            }
        }
        Phase::ProtectedResource => {
            if context.token.is_none() {
                absent.push(parameter::TOKEN);
            }
        }
    }

    if !absent.is_empty() {
        return Err(ProblemReport::absent(absent).into());
    }

    match context.version.as_deref() {
        None | Some(parameter::VERSION_1_0) => Ok(()),
        Some(_) => {
            let mut report = ProblemReport::new(Problem::VersionRejected);
            report.acceptable_versions = Some((
                parameter::VERSION_1_0.to_string(),
                parameter::VERSION_1_0.to_string(),
            ));
            Err(report.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use rsa::{RsaPrivateKey, RsaPublicKey};
    use url::Url;

    use crate::primitives::consumer::{Consumer, ConsumerMap};
    use crate::primitives::generator;
    use crate::primitives::nonce::MemoryNonceStore;
    use crate::primitives::token::TokenMap;
    use crate::signature::{self, SignatureMethod, SigningKey};

    const CONSUMER_KEY: &str = "dpf43f3p2l4k5l03";
    const CONSUMER_SECRET: &str = "kd94hf93k423kf44";
    const TOKEN: &str = "nnch734d00sl2jdk";
    const TOKEN_SECRET: &str = "pfkkdhi9sl3r4s00";

    /// A consumer store that counts how often its key material is fetched.
    struct CountingStore {
        inner: ConsumerMap,
        key_fetches: AtomicUsize,
    }

    impl CountingStore {
        fn new(inner: ConsumerMap) -> Self {
            CountingStore {
                inner,
                key_fetches: AtomicUsize::new(0),
            }
        }
    }

    impl ConsumerStore for CountingStore {
        fn is_consumer(&self, consumer_key: &str) -> bool {
            self.inner.is_consumer(consumer_key)
        }

        fn consumer_secret(&self, consumer_key: &str) -> Option<String> {
            self.inner.consumer_secret(consumer_key)
        }

        fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey> {
            self.key_fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.verification_key(consumer_key)
        }
    }

    fn unsigned_context(method: SignatureMethod) -> ProtocolContext {
        let uri: Url = "http://photos.example.net/photos".parse().unwrap();
        let mut context = ProtocolContext::new("GET", uri).unwrap();
        context.consumer_key = Some(CONSUMER_KEY.to_string());
        context.token = Some(TOKEN.to_string());
        context.signature_method = Some(method);
        context.timestamp = Some(generator::epoch_now());
        context.nonce = Some("kllo9940pd9333jh".to_string());
        context.version = Some("1.0".to_string());
        context
    }

    fn provider_over(consumers: Arc<dyn ConsumerStore + Send + Sync>) -> Provider {
        let tokens = TokenMap::new();
        tokens.issue(TOKEN, TOKEN_SECRET, CONSUMER_KEY);

        Provider::standard(
            consumers,
            Arc::new(MemoryNonceStore::new()),
            Arc::new(tokens),
            Duration::minutes(5),
        )
    }

    fn shared_consumers() -> ConsumerMap {
        let mut map = ConsumerMap::new();
        map.register_consumer(Consumer::shared(CONSUMER_KEY, CONSUMER_SECRET));
        map
    }

    #[test]
    fn signed_request_passes_all_phases_that_need_no_extras() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap();
    }

    #[test]
    fn unknown_consumer_is_rejected_first() {
        let provider = provider_over(Arc::new(ConsumerMap::new()));

        let mut context = unsigned_context(SignatureMethod::Plaintext);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        assert_eq!(err.report().unwrap().problem, Problem::ConsumerKeyUnknown);
    }

    #[test]
    fn tampered_request_fails_signature_validation() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();
        context
            .apply_query_parameter("file", "somebody-elses.jpg")
            .unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        assert_eq!(err.report().unwrap().problem, Problem::SignatureInvalid);
    }

    #[test]
    fn replayed_request_is_refused() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap();
        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        assert_eq!(err.report().unwrap().problem, Problem::NonceUsed);
    }

    #[test]
    fn stale_timestamp_reports_the_acceptable_range() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        context.timestamp = Some(generator::epoch_now() - 3600);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.problem, Problem::TimestampRefused);

        let (from, to) = report.acceptable_timestamps.unwrap();
        assert!(from < to);
    }

    #[test]
    fn missing_parameters_are_reported_together() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let uri: Url = "http://photos.example.net/photos".parse().unwrap();
        let mut context = ProtocolContext::new("GET", uri).unwrap();
        context.consumer_key = Some(CONSUMER_KEY.to_string());

        let err = provider.inspect(Phase::RequestToken, &context).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.problem, Problem::ParameterAbsent);
        assert_eq!(
            report.parameters_absent,
            vec![
                "oauth_signature_method",
                "oauth_signature",
                "oauth_timestamp",
                "oauth_nonce",
                "oauth_callback",
            ]
        );
    }

    #[test]
    fn foreign_version_is_rejected_with_the_acceptable_range() {
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        context.version = Some("2.0".to_string());
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.problem, Problem::VersionRejected);
        assert_eq!(
            report.acceptable_versions,
            Some(("1.0".to_string(), "1.0".to_string()))
        );
    }

    #[test]
    fn expired_token_is_distinguished_from_a_rejected_one() {
        let consumers: Arc<dyn ConsumerStore + Send + Sync> = Arc::new(shared_consumers());
        let tokens = TokenMap::new();
        tokens.register(crate::primitives::token::IssuedToken {
            token: TOKEN.to_string(),
            secret: TOKEN_SECRET.to_string(),
            consumer_key: CONSUMER_KEY.to_string(),
            until: Some(chrono::Utc::now() - Duration::seconds(1)),
        });
        let provider = Provider::standard(
            consumers,
            Arc::new(MemoryNonceStore::new()),
            Arc::new(tokens),
            Duration::minutes(5),
        );

        let mut context = unsigned_context(SignatureMethod::HmacSha1);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        assert_eq!(err.report().unwrap().problem, Problem::TokenExpired);
    }

    #[test]
    fn symmetric_methods_never_fetch_key_material() {
        let store = Arc::new(CountingStore::new(shared_consumers()));
        let provider = provider_over(store.clone());

        let mut context = unsigned_context(SignatureMethod::Plaintext);
        let key = SigningKey::shared(CONSUMER_SECRET, Some(TOKEN_SECRET.to_string()));
        signature::sign(&mut context, &key).unwrap();

        provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap();
        assert_eq!(store.key_fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn asymmetric_method_fetches_key_material_exactly_once() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);

        let mut consumers = ConsumerMap::new();
        consumers.register_consumer(Consumer::asymmetric(CONSUMER_KEY, public));
        let store = Arc::new(CountingStore::new(consumers));
        let provider = provider_over(store.clone());

        let mut context = unsigned_context(SignatureMethod::RsaSha1);
        signature::sign(&mut context, &SigningKey::rsa_private(private)).unwrap();

        provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap();
        assert_eq!(store.key_fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn asymmetric_method_without_registered_key_is_a_configuration_error() {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();

        // The consumer is known but only for symmetric use.
        let provider = provider_over(Arc::new(shared_consumers()));

        let mut context = unsigned_context(SignatureMethod::RsaSha1);
        signature::sign(&mut context, &SigningKey::rsa_private(private)).unwrap();

        let err = provider
            .inspect(Phase::ProtectedResource, &context)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Primitive(SignatureError::AlgorithmKeyMissing)
        ));
    }
}
