//! Named protocol parameters and the percent-encoding discipline they share.
//!
//! OAuth 1.0a prescribes a stricter encoding than generic form encoding: every octet outside the
//! RFC 3986 unreserved set (`A-Za-z0-9`, `-`, `.`, `_`, `~`) is percent-encoded, spaces included.
//! The same rule applies to signature base strings, `Authorization` headers and problem reports,
//! so it lives here and everything else borrows it.
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::Utf8Error;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// The `oauth_consumer_key` parameter name.
pub const CONSUMER_KEY: &str = "oauth_consumer_key";
/// The `oauth_token` parameter name.
pub const TOKEN: &str = "oauth_token";
/// The `oauth_token_secret` parameter name.
///
/// Never part of a signature base string, even when a caller smuggles it into a parameter list.
pub const TOKEN_SECRET: &str = "oauth_token_secret";
/// The `oauth_signature_method` parameter name.
pub const SIGNATURE_METHOD: &str = "oauth_signature_method";
/// The `oauth_signature` parameter name.
pub const SIGNATURE: &str = "oauth_signature";
/// The `oauth_nonce` parameter name.
pub const NONCE: &str = "oauth_nonce";
/// The `oauth_timestamp` parameter name.
pub const TIMESTAMP: &str = "oauth_timestamp";
/// The `oauth_version` parameter name.
pub const VERSION: &str = "oauth_version";
/// The `oauth_callback` parameter name.
pub const CALLBACK: &str = "oauth_callback";
/// The `oauth_verifier` parameter name.
pub const VERIFIER: &str = "oauth_verifier";
/// The `realm` parameter name, carried in `Authorization` headers but excluded from signing.
pub const REALM: &str = "realm";

/// The protocol version all contexts speak.
pub const VERSION_1_0: &str = "1.0";

/// Every octet outside the unreserved set, as mandated by RFC 5849 section 3.6.
const RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a parameter name or value.
///
/// Returns a borrowed string when nothing needed escaping, which is the common case for the
/// protocol's own parameter names.
pub fn encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, RESERVED).into()
}

/// Reverse [`encode`], failing when the escaped bytes are not valid UTF-8.
///
/// [`encode`]: fn.encode.html
pub fn decode(value: &str) -> Result<Cow<'_, str>, Utf8Error> {
    percent_decode_str(value).decode_utf8()
}

/// A single name/value pair of a request.
///
/// Parameter names are case-sensitive and the same name may appear any number of times, each
/// occurrence counting as its own pair. The canonical order used for signature base strings sorts
/// by encoded name first and encoded value second, which [`Ord`] implements directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolParameter {
    /// The parameter name, unencoded.
    pub name: String,

    /// The parameter value, unencoded.
    pub value: String,
}

impl ProtocolParameter {
    /// Create a parameter from unencoded parts.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        ProtocolParameter {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this parameter belongs to the protocol itself rather than the application.
    pub fn is_oauth(&self) -> bool {
        self.name.starts_with("oauth_")
    }

    /// Render the pair as `encoded_name=encoded_value`.
    pub fn encoded(&self) -> String {
        format!("{}={}", encode(&self.name), encode(&self.value))
    }
}

impl PartialOrd for ProtocolParameter {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl Ord for ProtocolParameter {
    /// Byte order of the encoded name, ties broken by byte order of the encoded value.
    fn cmp(&self, rhs: &Self) -> Ordering {
        encode(&self.name)
            .as_bytes()
            .cmp(encode(&rhs.name).as_bytes())
            .then_with(|| encode(&self.value).as_bytes().cmp(encode(&rhs.value).as_bytes()))
    }
}

impl fmt::Display for ProtocolParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!(encode("abcXYZ019-._~"), "abcXYZ019-._~");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(encode("ab cd"), "ab%20cd");
        assert_eq!(encode("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode("100%"), "100%25");
        assert_eq!(encode("/path?q"), "%2Fpath%3Fq");
    }

    #[test]
    fn encode_decode_round_trip() {
        let original = "The supplied consumer key has been black-listed due to complaints.";
        let encoded = encode(original).into_owned();
        assert!(!encoded.contains(' '));
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn non_ascii_is_utf8_escaped() {
        assert_eq!(encode("ä"), "%C3%A4");
        assert_eq!(decode("%C3%A4").unwrap(), "ä");
    }

    #[test]
    fn ordering_is_by_encoded_pair() {
        let a = ProtocolParameter::new("a", "2");
        let b = ProtocolParameter::new("a", "10");
        // "10" sorts before "2" bytewise.
        assert!(b < a);

        let space = ProtocolParameter::new("a b", "");
        let plain = ProtocolParameter::new("ab", "");
        // '%' (0x25) sorts before 'b'.
        assert!(space < plain);
    }
}
