//! Construction of the signature base string, RFC 5849 section 3.4.1.
//!
//! The base string is the canonical, byte-exact input every signature method except `PLAINTEXT`
//! runs over. Both sides of the protocol must derive the identical string from the same request,
//! so everything here is a pure function of the context: same context in, same bytes out.
use url::Url;

use crate::protocol::context::ProtocolContext;
use crate::protocol::parameter::{self, ProtocolParameter};

/// Build the signature base string for a context.
///
/// Three `&`-joined, individually percent-encoded parts: the uppercased HTTP method, the
/// normalized request URI and the normalized parameter string.
pub fn signature_base(context: &ProtocolContext) -> String {
    format!(
        "{}&{}&{}",
        context.method.to_uppercase(),
        parameter::encode(&normalize_uri(&context.uri)),
        parameter::encode(&normalized_parameters(context))
    )
}

/// Normalize a request URI for signing.
///
/// Scheme and host are lowercased, default ports (80 for http, 443 for https) are dropped, the
/// path is preserved verbatim and query and fragment never participate.
pub fn normalize_uri(uri: &Url) -> String {
    let mut normalized = format!("{}://", uri.scheme());

    if let Some(host) = uri.host_str() {
        normalized.push_str(&host.to_lowercase());
    }

    // `Url::port` already reports None for the scheme's default port.
    if let Some(port) = uri.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }

    normalized.push_str(uri.path());
    normalized
}

/// Collect, sort and join every parameter that participates in the signature.
///
/// That is every `oauth_*` field except the signature itself, plus the query and form parameter
/// lists. The realm and the `oauth_token_secret` pseudo-parameter stay out, duplicates stay in
/// and sort among themselves by value.
fn normalized_parameters(context: &ProtocolContext) -> String {
    let mut params = context.oauth_parameters();
    params.extend(context.query.iter().cloned());
    params.extend(context.form.iter().cloned());
    params.retain(|param| param.name != parameter::TOKEN_SECRET);

    params.sort();

    let encoded: Vec<String> = params.iter().map(ProtocolParameter::encoded).collect();
    encoded.join("&")
}
