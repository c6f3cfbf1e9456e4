//! The mutable record of one request's protocol parameters.
//!
//! A [`ProtocolContext`] is filled from two directions. A consumer constructs one, sets its
//! credential fields and signs it. A provider reconstructs one from the wire, routing parameters
//! from whichever transport the consumer chose (the `Authorization` header, the query string or a
//! form-encoded body) back into the typed fields before handing the context to the inspector
//! pipeline.
//!
//! The context enforces one invariant while parameters are applied: neither `realm` nor any
//! `oauth_*` parameter may arrive twice with conflicting values. A repeated parameter with an
//! identical value is accepted, a conflicting one aborts parsing.
//!
//! [`ProtocolContext`]: struct.ProtocolContext.html
use std::fmt;

use url::Url;

use crate::protocol::parameter::{self, ProtocolParameter};
use crate::signature::SignatureMethod;

/// Errors raised while populating a context from wire parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// A `realm` or `oauth_*` parameter appeared twice with different values.
    ConflictingParameter(String),

    /// The `oauth_signature_method` parameter named a method outside the supported set.
    UnsupportedSignatureMethod(String),

    /// The `oauth_timestamp` parameter was not a whole number of epoch seconds.
    InvalidTimestamp(String),

    /// An `Authorization` header did not follow the `OAuth key="value"` scheme.
    MalformedHeader,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContextError::ConflictingParameter(name) => {
                write!(f, "parameter {} supplied twice with conflicting values", name)
            }
            ContextError::UnsupportedSignatureMethod(name) => {
                write!(f, "unsupported signature method {}", name)
            }
            ContextError::InvalidTimestamp(value) => {
                write!(f, "timestamp {} is not in epoch seconds", value)
            }
            ContextError::MalformedHeader => write!(f, "malformed OAuth authorization header"),
        }
    }
}

/// Where an incoming application parameter was carried.
enum Transport {
    Query,
    Form,
}

/// The unit of work for one request.
///
/// All fields are public; the typed `oauth_*` fields hold the protocol parameters while `query`
/// and `form` hold the application parameters that travelled alongside them. The request URI
/// never carries a query of its own, the constructor splits it off into `query`.
#[derive(Clone, Debug)]
pub struct ProtocolContext {
    /// The consumer key identifying the client.
    pub consumer_key: Option<String>,

    /// The request or access token, if this phase uses one.
    pub token: Option<String>,

    /// The active signature method. Exactly one method governs a context.
    pub signature_method: Option<SignatureMethod>,

    /// The signature, computed locally or supplied by the wire.
    pub signature: Option<String>,

    /// The single-use nonce paired with the timestamp.
    pub nonce: Option<String>,

    /// Seconds since the Unix epoch, UTC.
    pub timestamp: Option<i64>,

    /// The protocol version, `1.0` when present.
    pub version: Option<String>,

    /// The consumer's callback URI (request token phase).
    pub callback: Option<String>,

    /// The verification code (access token phase).
    pub verifier: Option<String>,

    /// The protection realm. Carried in headers, excluded from signing.
    pub realm: Option<String>,

    /// The HTTP method, uppercased during canonicalization.
    pub method: String,

    /// Scheme, host and path of the request. The query lives in `query` instead.
    pub uri: Url,

    /// Application parameters from the query string.
    pub query: Vec<ProtocolParameter>,

    /// Application parameters from a form-encoded body.
    ///
    /// Only populated when the request body actually is `application/x-www-form-urlencoded`;
    /// any other body belongs in `body` and stays out of the signature.
    pub form: Vec<ProtocolParameter>,

    /// Raw request headers, untouched by this library.
    pub headers: Vec<(String, String)>,

    /// Raw request body for non-form content.
    pub body: Option<Vec<u8>>,
}

impl ProtocolContext {
    /// Create a context for a request line.
    ///
    /// A query attached to the URI is split off into the `query` parameter list, routing any
    /// `oauth_*` parameters into their typed fields.
    pub fn new(method: &str, mut uri: Url) -> Result<Self, ContextError> {
        let pairs: Vec<(String, String)> = uri
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        uri.set_query(None);
        uri.set_fragment(None);

        let mut context = ProtocolContext {
            consumer_key: None,
            token: None,
            signature_method: None,
            signature: None,
            nonce: None,
            timestamp: None,
            version: None,
            callback: None,
            verifier: None,
            realm: None,
            method: method.to_string(),
            uri,
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
            body: None,
        };

        for (name, value) in pairs {
            context.apply_query_parameter(&name, &value)?;
        }

        Ok(context)
    }

    /// Apply one parameter from the query string.
    pub fn apply_query_parameter(&mut self, name: &str, value: &str) -> Result<(), ContextError> {
        self.apply_parameter(name, value, Transport::Query)
    }

    /// Apply one parameter from a form-encoded body.
    pub fn apply_form_parameter(&mut self, name: &str, value: &str) -> Result<(), ContextError> {
        self.apply_parameter(name, value, Transport::Form)
    }

    /// Parse an `Authorization: OAuth …` header into the context.
    ///
    /// Accepts the comma-separated `key="percent-encoded value"` scheme of RFC 5849 section
    /// 3.5.1. The `realm` parameter lands in its field, `oauth_*` parameters in theirs, anything
    /// else in the header is ignored.
    pub fn apply_authorization_header(&mut self, header: &str) -> Result<(), ContextError> {
        let header = header.trim();
        let scheme = header.get(..5).ok_or(ContextError::MalformedHeader)?;
        if !scheme.eq_ignore_ascii_case("oauth") {
            return Err(ContextError::MalformedHeader);
        }

        for part in header[5..].split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (name, quoted) = part.split_once('=').ok_or(ContextError::MalformedHeader)?;
            let quoted = quoted.trim();
            let encoded = quoted
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .ok_or(ContextError::MalformedHeader)?;
            let value = parameter::decode(encoded)
                .map_err(|_| ContextError::MalformedHeader)?
                .into_owned();

            let name = name.trim();
            if name == parameter::REALM {
                self.set_checked(parameter::REALM, value, |context| &mut context.realm)?;
            } else if name.starts_with("oauth_") {
                self.apply_oauth_parameter(name, &value)?;
            }
        }

        Ok(())
    }

    /// Render the protocol parameters as an `Authorization` header value.
    ///
    /// The realm comes first when set, the signature last, every value percent-encoded and
    /// quoted. Application parameters never travel in the header.
    pub fn authorization_header(&self) -> String {
        let mut parts = Vec::new();

        if let Some(realm) = &self.realm {
            parts.push(format!("realm=\"{}\"", parameter::encode(realm)));
        }

        for param in self.oauth_parameters() {
            parts.push(format!(
                "{}=\"{}\"",
                param.name,
                parameter::encode(&param.value)
            ));
        }

        if let Some(signature) = &self.signature {
            parts.push(format!(
                "{}=\"{}\"",
                parameter::SIGNATURE,
                parameter::encode(signature)
            ));
        }

        format!("OAuth {}", parts.join(", "))
    }

    /// The set `oauth_*` fields as parameter pairs, signature excluded.
    ///
    /// This is the exact protocol contribution to a signature base string; the signature itself
    /// and the realm never sign themselves.
    pub fn oauth_parameters(&self) -> Vec<ProtocolParameter> {
        let mut params = Vec::new();

        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                params.push(ProtocolParameter::new(name, value));
            }
        };

        push(parameter::CONSUMER_KEY, self.consumer_key.clone());
        push(parameter::TOKEN, self.token.clone());
        push(
            parameter::SIGNATURE_METHOD,
            self.signature_method.map(|method| method.name().to_string()),
        );
        push(
            parameter::TIMESTAMP,
            self.timestamp.map(|stamp| stamp.to_string()),
        );
        push(parameter::NONCE, self.nonce.clone());
        push(parameter::VERSION, self.version.clone());
        push(parameter::CALLBACK, self.callback.clone());
        push(parameter::VERIFIER, self.verifier.clone());

        params
    }

    fn apply_parameter(
        &mut self,
        name: &str,
        value: &str,
        transport: Transport,
    ) -> Result<(), ContextError> {
        if name.starts_with("oauth_") {
            return self.apply_oauth_parameter(name, value);
        }

        let param = ProtocolParameter::new(name, value);
        match transport {
            Transport::Query => self.query.push(param),
            Transport::Form => self.form.push(param),
        }
        Ok(())
    }

    fn apply_oauth_parameter(&mut self, name: &str, value: &str) -> Result<(), ContextError> {
        let value = value.to_string();
        match name {
            parameter::CONSUMER_KEY => {
                self.set_checked(name, value, |context| &mut context.consumer_key)
            }
            parameter::TOKEN => self.set_checked(name, value, |context| &mut context.token),
            parameter::SIGNATURE => self.set_checked(name, value, |context| &mut context.signature),
            parameter::NONCE => self.set_checked(name, value, |context| &mut context.nonce),
            parameter::VERSION => self.set_checked(name, value, |context| &mut context.version),
            parameter::CALLBACK => self.set_checked(name, value, |context| &mut context.callback),
            parameter::VERIFIER => self.set_checked(name, value, |context| &mut context.verifier),
            parameter::SIGNATURE_METHOD => {
                let method = SignatureMethod::from_name(&value)
                    .ok_or_else(|| ContextError::UnsupportedSignatureMethod(value.clone()))?;
                match self.signature_method {
                    None => {
                        self.signature_method = Some(method);
                        Ok(())
                    }
                    Some(active) if active == method => Ok(()),
                    Some(_) => Err(ContextError::ConflictingParameter(name.to_string())),
                }
            }
            parameter::TIMESTAMP => {
                let stamp: i64 = value
                    .parse()
                    .map_err(|_| ContextError::InvalidTimestamp(value.clone()))?;
                match self.timestamp {
                    None => {
                        self.timestamp = Some(stamp);
                        Ok(())
                    }
                    Some(active) if active == stamp => Ok(()),
                    Some(_) => Err(ContextError::ConflictingParameter(name.to_string())),
                }
            }
            // Unknown oauth-prefixed names are application data by the time they reach us.
            _ => {
                self.query.push(ProtocolParameter::new(name, value));
                Ok(())
            }
        }
    }

    fn set_checked<F>(&mut self, name: &str, value: String, field: F) -> Result<(), ContextError>
    where
        F: FnOnce(&mut Self) -> &mut Option<String>,
    {
        let slot = field(self);
        match slot {
            None => {
                *slot = Some(value);
                Ok(())
            }
            Some(active) if *active == value => Ok(()),
            Some(_) => Err(ContextError::ConflictingParameter(name.to_string())),
        }
    }
}
