//! # patina-oauth
//!
//! An OAuth 1.0a (RFC 5849) library for use on both sides of the protocol, featuring a set of
//! configurable and pluggable back-ends.
//!
//! ## About
//!
//! `patina-oauth` provides the signature engine and the provider-side validation pipeline of
//! OAuth 1.0a. This depends on a front-end facing transport for network operations and a back-end
//! implementation for credential storage. The main interface is designed around traits in both
//! directions, so that the transport is as easily pluggable as the back-end.
//!
//! A consumer populates a [`ProtocolContext`] with its credentials and request parameters, signs
//! it through the [`signature`] module and renders the result into an `Authorization` header or
//! request parameters. A provider parses an incoming request back into a context and hands it to
//! a [`Provider`] pipeline, which runs an ordered set of inspectors against it for the current
//! protocol phase. Rejections are rendered as standardized `oauth_problem` reports which the
//! consumer side can parse back into typed values.
//!
//! ## Signing and verifying
//!
//! Three signature methods are supported behind one contract: `PLAINTEXT`, `HMAC-SHA1` and
//! `RSA-SHA1`. The set is closed by design; the `oauth_signature_method` parameter of a context
//! selects the variant and [`signature::sign`]/[`signature::validate`] dispatch on it. All key
//! material is supplied per call and never cached.
//!
//! ## Validating a provider request
//!
//! A set of [`primitives`] needs to be chosen. These will depend on the policies of your use case
//! but will in general encompass a [`ConsumerStore`], a [`NonceStore`], and a [`TokenStore`].
//! There is a simple, in-memory implementation provided for each of those. More complex solutions
//! might require a customized trait implementation, especially when specific consistency
//! requirements are needed. The nonce store in particular carries an atomicity contract that
//! replay protection depends on, see its module documentation.
//!
//! [`ProtocolContext`]: protocol/context/struct.ProtocolContext.html
//! [`Provider`]: provider/struct.Provider.html
//! [`signature`]: signature/index.html
//! [`signature::sign`]: signature/fn.sign.html
//! [`signature::validate`]: signature/fn.validate.html
//! [`primitives`]: primitives/index.html
//! [`ConsumerStore`]: primitives/consumer/trait.ConsumerStore.html
//! [`NonceStore`]: primitives/nonce/trait.NonceStore.html
//! [`TokenStore`]: primitives/token/trait.TokenStore.html
#![warn(missing_docs)]

pub mod primitives;
pub mod protocol;
pub mod provider;
pub mod signature;
