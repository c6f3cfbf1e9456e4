//! Token stores keep track of issued request and access tokens.
//!
//! The pipeline asks two things of a token: whether it may be used by the presenting consumer
//! right now, and which secret signs alongside it. Issuing, trading and revoking tokens is
//! provider work-flow above this crate; the store only has to answer for what was issued.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// The verdict on a presented token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenStatus {
    /// The token exists, belongs to the consumer and has not expired.
    Valid,

    /// The token is not known at all.
    Unknown,

    /// The token exists but was issued to a different consumer.
    WrongConsumer,

    /// The token exists but its validity has lapsed.
    Expired,
}

/// Token stores resolve tokens for the phases that require one.
pub trait TokenStore {
    /// Judge the token as presented by the given consumer.
    fn status(&self, token: &str, consumer_key: &str) -> TokenStatus;

    /// The secret issued with the token, needed to verify symmetric signatures.
    fn token_secret(&self, token: &str) -> Option<String>;
}

/// One issued token as the store remembers it.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    /// The token string handed to the consumer.
    pub token: String,

    /// The secret handed out alongside it.
    pub secret: String,

    /// The consumer the token was issued to.
    pub consumer_key: String,

    /// Expiration timestamp (Utc), or `None` for tokens that do not lapse.
    pub until: Option<DateTime<Utc>>,
}

/// Keeps track of issued tokens in a hash map.
///
/// Tokens registered through [`issue`] inherit the configured validity duration; tokens
/// registered whole keep whatever expiry they carry.
///
/// [`issue`]: #method.issue
#[derive(Default)]
pub struct TokenMap {
    duration: Option<Duration>,
    tokens: Mutex<HashMap<String, IssuedToken>>,
}

impl TokenMap {
    /// Create an empty map without any tokens in it.
    pub fn new() -> TokenMap {
        TokenMap::default()
    }

    /// Set the validity of all subsequently issued tokens to the specified duration.
    pub fn valid_for(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    /// Subsequently issued tokens do not lapse.
    pub fn valid_for_default(&mut self) {
        self.duration = None;
    }

    /// Record a newly issued token under the configured duration.
    pub fn issue(&self, token: &str, secret: &str, consumer_key: &str) {
        self.register(IssuedToken {
            token: token.to_string(),
            secret: secret.to_string(),
            consumer_key: consumer_key.to_string(),
            until: self.duration.map(|duration| Utc::now() + duration),
        });
    }

    /// Insert or update a token record as-is.
    pub fn register(&self, token: IssuedToken) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.token.clone(), token);
    }

    /// Unconditionally remove a token, for example when it is revoked or traded in.
    pub fn revoke(&self, token: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

impl TokenStore for TokenMap {
    fn status(&self, token: &str, consumer_key: &str) -> TokenStatus {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);

        let issued = match tokens.get(token) {
            Some(issued) => issued,
            None => return TokenStatus::Unknown,
        };

        if issued.consumer_key != consumer_key {
            return TokenStatus::WrongConsumer;
        }

        match issued.until {
            Some(until) if until < Utc::now() => TokenStatus::Expired,
            _ => TokenStatus::Valid,
        }
    }

    fn token_secret(&self, token: &str) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .map(|issued| issued.secret.clone())
    }
}

impl<'s, S: TokenStore + ?Sized> TokenStore for &'s S {
    fn status(&self, token: &str, consumer_key: &str) -> TokenStatus {
        (**self).status(token, consumer_key)
    }

    fn token_secret(&self, token: &str) -> Option<String> {
        (**self).token_secret(token)
    }
}

impl<S: TokenStore + ?Sized> TokenStore for Box<S> {
    fn status(&self, token: &str, consumer_key: &str) -> TokenStatus {
        (**self).status(token, consumer_key)
    }

    fn token_secret(&self, token: &str) -> Option<String> {
        (**self).token_secret(token)
    }
}

impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    fn status(&self, token: &str, consumer_key: &str) -> TokenStatus {
        (**self).status(token, consumer_key)
    }

    fn token_secret(&self, token: &str) -> Option<String> {
        (**self).token_secret(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_is_valid_for_its_consumer() {
        let map = TokenMap::new();
        map.issue("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00", "dpf43f3p2l4k5l03");

        assert_eq!(
            map.status("nnch734d00sl2jdk", "dpf43f3p2l4k5l03"),
            TokenStatus::Valid
        );
        assert_eq!(
            map.status("nnch734d00sl2jdk", "somebody-else"),
            TokenStatus::WrongConsumer
        );
        assert_eq!(map.status("unknown", "dpf43f3p2l4k5l03"), TokenStatus::Unknown);
        assert_eq!(
            map.token_secret("nnch734d00sl2jdk").as_deref(),
            Some("pfkkdhi9sl3r4s00")
        );
    }

    #[test]
    fn lapsed_token_is_expired() {
        let map = TokenMap::new();
        map.register(IssuedToken {
            token: "stale".to_string(),
            secret: "secret".to_string(),
            consumer_key: "key".to_string(),
            until: Some(Utc::now() - Duration::seconds(1)),
        });

        assert_eq!(map.status("stale", "key"), TokenStatus::Expired);
    }

    #[test]
    fn revoked_token_is_unknown() {
        let map = TokenMap::new();
        map.issue("short-lived", "secret", "key");
        map.revoke("short-lived");

        assert_eq!(map.status("short-lived", "key"), TokenStatus::Unknown);
    }
}
