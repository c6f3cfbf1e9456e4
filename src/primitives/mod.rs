//! A collection of primitives useful for either side of the protocol.
//!
//! A primitive is the smallest independent unit of policy used in OAuth related endpoints. For
//! example, a `NonceStore` decides whether a nonce/timestamp tuple was seen before. Abstracting
//! the primitives away behind traits makes it possible to provide –e.g.– an independent database
//! based implementation. The provider pipeline only ever talks to these traits; it owns none of
//! the state behind them.
//!
//! There is a simple, in-memory implementation provided for each trait. These are suitable for
//! testing and single-process deployments; anything distributed will want its own, keeping the
//! contracts spelled out on each trait — in particular the atomicity contract of
//! [`NonceStore::check_and_record`].
//!
//! [`NonceStore::check_and_record`]: nonce/trait.NonceStore.html#tymethod.check_and_record

pub mod consumer;
pub mod generator;
pub mod nonce;
pub mod token;

/// Commonly used primitives for transports and back-ends.
pub mod prelude {
    pub use super::consumer::{Consumer, ConsumerMap, ConsumerStore};
    pub use super::generator::{NonceGenerator, RandomNonce};
    pub use super::nonce::{MemoryNonceStore, NonceStore};
    pub use super::token::{IssuedToken, TokenMap, TokenStatus, TokenStore};
}
