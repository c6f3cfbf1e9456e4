//! Nonce stores remember which requests were already seen.
//!
//! Replay protection hinges on one contract: checking whether a `(consumer key, token, nonce,
//! timestamp)` tuple was used before and recording it must be a single atomic operation. A
//! read-then-write implementation has a window in which two concurrent requests bearing the same
//! tuple both pass, and at that point the nonce protects nothing.
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Nonce stores answer "has this exact request identity been seen before" exactly once per
/// identity.
pub trait NonceStore {
    /// Record the tuple, returning whether it was fresh.
    ///
    /// `true` accepts the request; every later call with the same tuple must return `false`, and
    /// when calls race, exactly one caller may see `true`. Implementations over shared state
    /// must use a single compare-and-insert, not a separate lookup followed by an insert.
    fn check_and_record(
        &self,
        consumer_key: &str,
        token: Option<&str>,
        nonce: &str,
        timestamp: i64,
    ) -> bool;
}

#[derive(Hash, PartialEq, Eq)]
struct SeenTuple {
    consumer_key: String,
    token: Option<String>,
    nonce: String,
    timestamp: i64,
}

/// An in-memory nonce store over a mutex-guarded set.
///
/// The single lock makes the check-and-insert atomic. The set grows with every accepted
/// request.
// TODO: bound the set by evicting tuples older than the provider's freshness window.
#[derive(Default)]
pub struct MemoryNonceStore {
    seen: Mutex<HashSet<SeenTuple>>,
}

impl MemoryNonceStore {
    /// Create an empty store.
    pub fn new() -> MemoryNonceStore {
        MemoryNonceStore::default()
    }
}

impl NonceStore for MemoryNonceStore {
    fn check_and_record(
        &self,
        consumer_key: &str,
        token: Option<&str>,
        nonce: &str,
        timestamp: i64,
    ) -> bool {
        let tuple = SeenTuple {
            consumer_key: consumer_key.to_string(),
            token: token.map(str::to_string),
            nonce: nonce.to_string(),
            timestamp,
        };

        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tuple)
    }
}

impl<'s, S: NonceStore + ?Sized> NonceStore for &'s S {
    fn check_and_record(
        &self,
        consumer_key: &str,
        token: Option<&str>,
        nonce: &str,
        timestamp: i64,
    ) -> bool {
        (**self).check_and_record(consumer_key, token, nonce, timestamp)
    }
}

impl<S: NonceStore + ?Sized> NonceStore for Box<S> {
    fn check_and_record(
        &self,
        consumer_key: &str,
        token: Option<&str>,
        nonce: &str,
        timestamp: i64,
    ) -> bool {
        (**self).check_and_record(consumer_key, token, nonce, timestamp)
    }
}

impl<S: NonceStore + ?Sized> NonceStore for std::sync::Arc<S> {
    fn check_and_record(
        &self,
        consumer_key: &str,
        token: Option<&str>,
        nonce: &str,
        timestamp: i64,
    ) -> bool {
        (**self).check_and_record(consumer_key, token, nonce, timestamp)
    }
}
