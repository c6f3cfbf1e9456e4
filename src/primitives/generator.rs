//! Generators produce the per-request freshness material on the consumer side.
//!
//! Every signed request carries a nonce and a timestamp; a provider remembers the pair to refuse
//! replays. The nonce only has to be unique within the provider's freshness window, entropy from
//! `rand::thread_rng` is far beyond that.
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::protocol::context::ProtocolContext;
use crate::protocol::parameter;

/// Nonce generators produce single-use values for outgoing requests.
pub trait NonceGenerator {
    /// Produce the next nonce.
    fn nonce(&self) -> String;
}

/// Generates nonces from random alphanumeric characters.
///
/// Each character is chosen from `rand::thread_rng`. This generator will always succeed.
pub struct RandomNonce {
    len: usize,
}

impl RandomNonce {
    /// Generates nonces with a specific character length.
    pub fn new(length: usize) -> RandomNonce {
        RandomNonce { len: length }
    }
}

impl Default for RandomNonce {
    /// Sixteen characters, comfortably unique within any sane freshness window.
    fn default() -> Self {
        RandomNonce::new(16)
    }
}

impl NonceGenerator for RandomNonce {
    fn nonce(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.len)
            .map(char::from)
            .collect()
    }
}

/// The current time in whole seconds since the Unix epoch, UTC.
///
/// All timestamp handling in this crate converts through UTC; local time never participates.
pub fn epoch_now() -> i64 {
    Utc::now().timestamp()
}

/// Stamp a context with fresh request material before signing.
///
/// Fills the nonce, the timestamp and the protocol version, leaving any value the caller set
/// beforehand untouched.
pub fn stamp(context: &mut ProtocolContext, generator: &dyn NonceGenerator) {
    if context.nonce.is_none() {
        context.nonce = Some(generator.nonce());
    }
    if context.timestamp.is_none() {
        context.timestamp = Some(epoch_now());
    }
    if context.version.is_none() {
        context.version = Some(parameter::VERSION_1_0.to_string());
    }
}
