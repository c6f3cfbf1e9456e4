//! Consumer stores administer the database of known consumers.
//!
//! A consumer is identified by its key and authenticated by whatever credential its signature
//! method runs on: a shared secret for `PLAINTEXT` and `HMAC-SHA1`, or a registered public key
//! for `RSA-SHA1`. The store hands that material out per request; loading keys from certificate
//! files or platform stores is a concern of whoever fills the store, not of this trait.
use std::collections::HashMap;
use std::sync::Arc;

use rsa::RsaPublicKey;

/// Consumer stores resolve consumer keys to registration data.
///
/// Implementations must not require `verification_key` to be cheap or even available for
/// consumers that only ever sign symmetrically; the pipeline guarantees it is consulted for
/// asymmetric signature methods only.
pub trait ConsumerStore {
    /// Whether the consumer key belongs to a registered consumer.
    fn is_consumer(&self, consumer_key: &str) -> bool;

    /// The shared secret of the consumer, for the symmetric signature methods.
    fn consumer_secret(&self, consumer_key: &str) -> Option<String>;

    /// The registered public key of the consumer, for `RSA-SHA1` verification.
    fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey>;
}

/// Registration data of one consumer.
#[derive(Clone, Debug)]
pub struct Consumer {
    consumer_key: String,
    secret: Option<String>,
    public_key: Option<RsaPublicKey>,
}

impl Consumer {
    /// Register a consumer that signs with a shared secret.
    pub fn shared(consumer_key: &str, secret: &str) -> Consumer {
        Consumer {
            consumer_key: consumer_key.to_string(),
            secret: Some(secret.to_string()),
            public_key: None,
        }
    }

    /// Register a consumer that signs with an RSA key pair.
    pub fn asymmetric(consumer_key: &str, public_key: RsaPublicKey) -> Consumer {
        Consumer {
            consumer_key: consumer_key.to_string(),
            secret: None,
            public_key: Some(public_key),
        }
    }

    /// Additionally register a public key, for consumers switching between methods.
    pub fn with_verification_key(mut self, public_key: RsaPublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }
}

/// A very simple, in-memory hash map of consumer keys to registrations.
#[derive(Clone, Debug, Default)]
pub struct ConsumerMap {
    consumers: HashMap<String, Consumer>,
}

impl ConsumerMap {
    /// Create an empty map without any consumers in it.
    pub fn new() -> ConsumerMap {
        ConsumerMap::default()
    }

    /// Insert or update the consumer record.
    pub fn register_consumer(&mut self, consumer: Consumer) {
        self.consumers
            .insert(consumer.consumer_key.clone(), consumer);
    }
}

impl Extend<Consumer> for ConsumerMap {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = Consumer>,
    {
        iter.into_iter()
            .for_each(|consumer| self.register_consumer(consumer))
    }
}

impl FromIterator<Consumer> for ConsumerMap {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Consumer>,
    {
        let mut into = ConsumerMap::new();
        into.extend(iter);
        into
    }
}

impl ConsumerStore for ConsumerMap {
    fn is_consumer(&self, consumer_key: &str) -> bool {
        self.consumers.contains_key(consumer_key)
    }

    fn consumer_secret(&self, consumer_key: &str) -> Option<String> {
        self.consumers
            .get(consumer_key)
            .and_then(|consumer| consumer.secret.clone())
    }

    fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey> {
        self.consumers
            .get(consumer_key)
            .and_then(|consumer| consumer.public_key.clone())
    }
}

impl<'s, S: ConsumerStore + ?Sized> ConsumerStore for &'s S {
    fn is_consumer(&self, consumer_key: &str) -> bool {
        (**self).is_consumer(consumer_key)
    }

    fn consumer_secret(&self, consumer_key: &str) -> Option<String> {
        (**self).consumer_secret(consumer_key)
    }

    fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey> {
        (**self).verification_key(consumer_key)
    }
}

impl<S: ConsumerStore + ?Sized> ConsumerStore for Box<S> {
    fn is_consumer(&self, consumer_key: &str) -> bool {
        (**self).is_consumer(consumer_key)
    }

    fn consumer_secret(&self, consumer_key: &str) -> Option<String> {
        (**self).consumer_secret(consumer_key)
    }

    fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey> {
        (**self).verification_key(consumer_key)
    }
}

impl<S: ConsumerStore + ?Sized> ConsumerStore for Arc<S> {
    fn is_consumer(&self, consumer_key: &str) -> bool {
        (**self).is_consumer(consumer_key)
    }

    fn consumer_secret(&self, consumer_key: &str) -> Option<String> {
        (**self).consumer_secret(consumer_key)
    }

    fn verification_key(&self, consumer_key: &str) -> Option<RsaPublicKey> {
        (**self).verification_key(consumer_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_consumer_has_no_public_key() {
        let mut map = ConsumerMap::new();
        map.register_consumer(Consumer::shared("key", "kd94hf93k423kf44"));

        assert!(map.is_consumer("key"));
        assert!(!map.is_consumer("other"));
        assert_eq!(map.consumer_secret("key").as_deref(), Some("kd94hf93k423kf44"));
        assert!(map.verification_key("key").is_none());
    }

    #[test]
    fn asymmetric_consumer_exposes_its_key() {
        let mut rng = rand::thread_rng();
        let public = RsaPublicKey::from(&rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap());

        let map: ConsumerMap = [Consumer::asymmetric("key", public.clone())]
            .into_iter()
            .collect();

        assert!(map.consumer_secret("key").is_none());
        assert_eq!(map.verification_key("key"), Some(public));
    }
}
