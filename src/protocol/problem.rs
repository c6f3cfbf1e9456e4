//! The standardized `oauth_problem` error payload.
//!
//! Providers answer rejected requests with a small form-encoded body whose mandatory first field
//! names a problem code from a fixed enumeration; depending on the code, additional fields carry
//! the missing parameter names, free-text advice or an acceptable version or timestamp range.
//! [`ProblemReport`] models one such payload, [`Display`] renders it onto the wire and
//! [`FromStr`] parses a provider's rejection back into typed values so consumer code can branch
//! on the cause.
//!
//! A report is immutable once serialized and never reused across requests.
//!
//! [`ProblemReport`]: struct.ProblemReport.html
//! [`Display`]: struct.ProblemReport.html#impl-Display
//! [`FromStr`]: struct.ProblemReport.html#impl-FromStr
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::protocol::parameter;

/// All defined problem codes.
///
/// The set follows the OAuth Problem Reporting extension; codes outside it are treated as
/// unknown by the parser rather than silently passed through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Problem {
    /// The `oauth_version` given is not acceptable to the provider.
    VersionRejected,

    /// A required parameter was not received.
    ParameterAbsent,

    /// A supplied parameter was refused.
    ParameterRejected,

    /// The `oauth_timestamp` lies outside the provider's freshness window.
    TimestampRefused,

    /// The nonce/timestamp tuple was already used.
    NonceUsed,

    /// The `oauth_signature_method` is unacceptable to the provider.
    SignatureMethodRejected,

    /// The supplied signature does not match the request.
    SignatureInvalid,

    /// The consumer key is unknown to the provider.
    ConsumerKeyUnknown,

    /// The consumer key was permanently rejected.
    ConsumerKeyRejected,

    /// The consumer key was temporarily refused, for example when throttled or black-listed.
    ConsumerKeyRefused,

    /// The request token was already traded for an access token.
    TokenUsed,

    /// The token has passed its expiry.
    TokenExpired,

    /// The token was revoked by the user or the provider.
    TokenRevoked,

    /// The token is unknown or not bound to the presenting consumer.
    TokenRejected,

    /// The user must grant further authorization before the request can proceed.
    AdditionalAuthorizationRequired,

    /// The provider cannot map the request onto a permission decision.
    PermissionUnknown,

    /// The user denied the requested permission.
    PermissionDenied,
}

impl Problem {
    /// The wire representation of the code.
    pub fn description(self) -> &'static str {
        match self {
            Problem::VersionRejected => "version_rejected",
            Problem::ParameterAbsent => "parameter_absent",
            Problem::ParameterRejected => "parameter_rejected",
            Problem::TimestampRefused => "timestamp_refused",
            Problem::NonceUsed => "nonce_used",
            Problem::SignatureMethodRejected => "signature_method_rejected",
            Problem::SignatureInvalid => "signature_invalid",
            Problem::ConsumerKeyUnknown => "consumer_key_unknown",
            Problem::ConsumerKeyRejected => "consumer_key_rejected",
            Problem::ConsumerKeyRefused => "consumer_key_refused",
            Problem::TokenUsed => "token_used",
            Problem::TokenExpired => "token_expired",
            Problem::TokenRevoked => "token_revoked",
            Problem::TokenRejected => "token_rejected",
            Problem::AdditionalAuthorizationRequired => "additional_authorization_required",
            Problem::PermissionUnknown => "permission_unknown",
            Problem::PermissionDenied => "permission_denied",
        }
    }

    /// Look a code up by its wire representation.
    pub fn from_description(name: &str) -> Option<Self> {
        Some(match name {
            "version_rejected" => Problem::VersionRejected,
            "parameter_absent" => Problem::ParameterAbsent,
            "parameter_rejected" => Problem::ParameterRejected,
            "timestamp_refused" => Problem::TimestampRefused,
            "nonce_used" => Problem::NonceUsed,
            "signature_method_rejected" => Problem::SignatureMethodRejected,
            "signature_invalid" => Problem::SignatureInvalid,
            "consumer_key_unknown" => Problem::ConsumerKeyUnknown,
            "consumer_key_rejected" => Problem::ConsumerKeyRejected,
            "consumer_key_refused" => Problem::ConsumerKeyRefused,
            "token_used" => Problem::TokenUsed,
            "token_expired" => Problem::TokenExpired,
            "token_revoked" => Problem::TokenRevoked,
            "token_rejected" => Problem::TokenRejected,
            "additional_authorization_required" => Problem::AdditionalAuthorizationRequired,
            "permission_unknown" => Problem::PermissionUnknown,
            "permission_denied" => Problem::PermissionDenied,
            _ => return None,
        })
    }
}

impl AsRef<str> for Problem {
    fn as_ref(&self) -> &str {
        self.description()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Errors raised while parsing a wire payload into a [`ProblemReport`].
///
/// The distinction between a missing `oauth_problem` field and an unknown code is deliberate:
/// callers may want to surface an "unknown problem" from a newer provider rather than hard-fail,
/// which requires telling the two cases apart.
///
/// [`ProblemReport`]: struct.ProblemReport.html
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportParseError {
    /// The mandatory `oauth_problem` field was not present.
    MissingProblem,

    /// The `oauth_problem` code is not part of the known enumeration.
    UnknownProblem(String),

    /// A field value could not be decoded, named by its wire key.
    MalformedField(&'static str),
}

impl fmt::Display for ReportParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportParseError::MissingProblem => write!(f, "report carries no oauth_problem field"),
            ReportParseError::UnknownProblem(code) => {
                write!(f, "unknown problem code {}", code)
            }
            ReportParseError::MalformedField(field) => write!(f, "malformed field {}", field),
        }
    }
}

/// A machine-readable description of why a request was rejected.
///
/// Constructed by the provider pipeline on failure and serialized into the response body, or
/// parsed from such a body on the consumer side to interpret the rejection.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemReport {
    /// The problem code.
    pub problem: Problem,

    /// Names of required parameters that were absent.
    pub parameters_absent: Vec<String>,

    /// Names of supplied parameters that were refused.
    pub parameters_rejected: Vec<String>,

    /// Free-text advice for a human reading the rejection.
    pub advice: Option<String>,

    /// The inclusive range of protocol versions the provider accepts.
    pub acceptable_versions: Option<(String, String)>,

    /// The inclusive range of timestamps the provider currently accepts.
    pub acceptable_timestamps: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl ProblemReport {
    /// A bare report for the given code.
    pub fn new(problem: Problem) -> Self {
        ProblemReport {
            problem,
            parameters_absent: Vec::new(),
            parameters_rejected: Vec::new(),
            advice: None,
            acceptable_versions: None,
            acceptable_timestamps: None,
        }
    }

    /// Attach free-text advice.
    pub fn with_advice<A: Into<String>>(mut self, advice: A) -> Self {
        self.advice = Some(advice.into());
        self
    }

    /// A `parameter_absent` report listing the missing parameter names.
    pub fn absent<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut report = ProblemReport::new(Problem::ParameterAbsent);
        report.parameters_absent = names.into_iter().map(Into::into).collect();
        report
    }
}

/// Parameter-name sets travel as a single value, the names joined by `&` before the value as a
/// whole is percent-encoded. Parsing also tolerates space or `+` separators seen from other
/// implementations.
fn join_names(names: &[String]) -> String {
    names.join("&")
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split(|c| c == '&' || c == ' ')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Display for ProblemReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "oauth_problem={}", self.problem)?;

        if !self.parameters_absent.is_empty() {
            write!(
                f,
                "&oauth_parameters_absent={}",
                parameter::encode(&join_names(&self.parameters_absent))
            )?;
        }

        if !self.parameters_rejected.is_empty() {
            write!(
                f,
                "&oauth_parameters_rejected={}",
                parameter::encode(&join_names(&self.parameters_rejected))
            )?;
        }

        if let Some(advice) = &self.advice {
            write!(f, "&oauth_problem_advice={}", parameter::encode(advice))?;
        }

        if let Some((from, to)) = &self.acceptable_versions {
            write!(
                f,
                "&oauth_acceptable_versions={}-{}",
                parameter::encode(from),
                parameter::encode(to)
            )?;
        }

        if let Some((from, to)) = &self.acceptable_timestamps {
            write!(
                f,
                "&oauth_acceptable_timestamps={}-{}",
                from.timestamp(),
                to.timestamp()
            )?;
        }

        Ok(())
    }
}

impl FromStr for ProblemReport {
    type Err = ReportParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let mut problem = None;
        let mut parameters_absent = Vec::new();
        let mut parameters_rejected = Vec::new();
        let mut advice = None;
        let mut acceptable_versions = None;
        let mut acceptable_timestamps = None;

        for field in payload.split('&') {
            if field.is_empty() {
                continue;
            }

            let (name, value) = match field.split_once('=') {
                Some(pair) => pair,
                None => (field, ""),
            };

            match name {
                "oauth_problem" => {
                    let code = Problem::from_description(value)
                        .ok_or_else(|| ReportParseError::UnknownProblem(value.to_string()))?;
                    problem = Some(code);
                }
                "oauth_parameters_absent" => {
                    let value = decode_value(value, "oauth_parameters_absent")?;
                    parameters_absent = split_names(&value);
                }
                "oauth_parameters_rejected" => {
                    let value = decode_value(value, "oauth_parameters_rejected")?;
                    parameters_rejected = split_names(&value);
                }
                "oauth_problem_advice" => {
                    advice = Some(decode_value(value, "oauth_problem_advice")?);
                }
                "oauth_acceptable_versions" => {
                    let value = decode_value(value, "oauth_acceptable_versions")?;
                    let (from, to) = value
                        .split_once('-')
                        .ok_or(ReportParseError::MalformedField("oauth_acceptable_versions"))?;
                    acceptable_versions = Some((from.to_string(), to.to_string()));
                }
                "oauth_acceptable_timestamps" => {
                    let value = decode_value(value, "oauth_acceptable_timestamps")?;
                    let field = "oauth_acceptable_timestamps";
                    let (from, to) = value
                        .split_once('-')
                        .ok_or(ReportParseError::MalformedField(field))?;
                    let from = parse_epoch(from, field)?;
                    let to = parse_epoch(to, field)?;
                    acceptable_timestamps = Some((from, to));
                }
                // Tolerate fields this enumeration does not know about.
                _ => (),
            }
        }

        Ok(ProblemReport {
            problem: problem.ok_or(ReportParseError::MissingProblem)?,
            parameters_absent,
            parameters_rejected,
            advice,
            acceptable_versions,
            acceptable_timestamps,
        })
    }
}

fn decode_value(value: &str, field: &'static str) -> Result<String, ReportParseError> {
    // Other stacks encode spaces as '+'; accept both on the way in.
    let value = value.replace('+', " ");
    parameter::decode(&value)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ReportParseError::MalformedField(field))
}

fn parse_epoch(value: &str, field: &'static str) -> Result<DateTime<Utc>, ReportParseError> {
    let seconds: i64 = value
        .parse()
        .map_err(|_| ReportParseError::MalformedField(field))?;
    DateTime::from_timestamp(seconds, 0).ok_or(ReportParseError::MalformedField(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn format_missing_parameter_report() {
        let report = ProblemReport::absent([parameter::NONCE]);

        assert_eq!(
            report.to_string(),
            "oauth_problem=parameter_absent&oauth_parameters_absent=oauth_nonce"
        );
    }

    #[test]
    fn format_rejected_parameter_report() {
        let mut report = ProblemReport::new(Problem::ParameterRejected);
        report.parameters_rejected = vec![parameter::TIMESTAMP.to_string()];

        assert_eq!(
            report.to_string(),
            "oauth_problem=parameter_rejected&oauth_parameters_rejected=oauth_timestamp"
        );
    }

    #[test]
    fn format_report_with_advice() {
        let report = ProblemReport::new(Problem::ConsumerKeyRefused)
            .with_advice("The supplied consumer key has been black-listed due to complaints.");

        assert_eq!(
            report.to_string(),
            "oauth_problem=consumer_key_refused&oauth_problem_advice=\
             The%20supplied%20consumer%20key%20has%20been%20black-listed%20due%20to%20complaints."
        );
    }

    #[test]
    fn format_timestamp_range_report() {
        let from = Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2009, 1, 1, 0, 0, 0).unwrap();

        let mut report = ProblemReport::new(Problem::TimestampRefused);
        report.acceptable_timestamps = Some((from, to));

        assert_eq!(
            report.to_string(),
            format!(
                "oauth_problem=timestamp_refused&oauth_acceptable_timestamps={}-{}",
                from.timestamp(),
                to.timestamp()
            )
        );
    }

    #[test]
    fn format_version_range_report() {
        let mut report = ProblemReport::new(Problem::VersionRejected);
        report.acceptable_versions = Some(("1.0".to_string(), "2.0".to_string()));

        assert_eq!(
            report.to_string(),
            "oauth_problem=version_rejected&oauth_acceptable_versions=1.0-2.0"
        );
    }

    #[test]
    fn populate_from_formatted_missing_parameter_report() {
        let report: ProblemReport = "oauth_problem=parameter_absent&oauth_parameters_absent=oauth_nonce"
            .parse()
            .unwrap();

        assert_eq!(report.problem, Problem::ParameterAbsent);
        assert_eq!(report.parameters_absent, vec!["oauth_nonce"]);
    }

    #[test]
    fn populate_from_formatted_report_with_advice() {
        let report: ProblemReport = "oauth_problem=consumer_key_refused&oauth_problem_advice=\
             The%20supplied%20consumer%20key%20has%20been%20black-listed%20due%20to%20complaints."
            .parse()
            .unwrap();

        assert_eq!(report.problem, Problem::ConsumerKeyRefused);
        assert_eq!(
            report.advice.as_deref(),
            Some("The supplied consumer key has been black-listed due to complaints.")
        );
    }

    #[test]
    fn populate_from_formatted_timestamp_range_report() {
        let from = Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2009, 1, 1, 0, 0, 0).unwrap();

        let formatted = format!(
            "oauth_problem=timestamp_refused&oauth_acceptable_timestamps={}-{}",
            from.timestamp(),
            to.timestamp()
        );
        let report: ProblemReport = formatted.parse().unwrap();

        assert_eq!(report.problem, Problem::TimestampRefused);
        assert_eq!(report.acceptable_timestamps, Some((from, to)));
    }

    #[test]
    fn populate_from_formatted_version_range_report() {
        let report: ProblemReport = "oauth_problem=version_rejected&oauth_acceptable_versions=1.0-2.0"
            .parse()
            .unwrap();

        assert_eq!(report.problem, Problem::VersionRejected);
        assert_eq!(
            report.acceptable_versions,
            Some(("1.0".to_string(), "2.0".to_string()))
        );
    }

    #[test]
    fn round_trip_every_report_shape() {
        let mut full = ProblemReport::new(Problem::TimestampRefused)
            .with_advice("Stale timestamp; resynchronize your clock.");
        full.parameters_absent = vec!["oauth_nonce".to_string(), "oauth_timestamp".to_string()];
        full.parameters_rejected = vec!["oauth_version".to_string()];
        full.acceptable_versions = Some(("1.0".to_string(), "1.0".to_string()));
        full.acceptable_timestamps = Some((
            Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2009, 1, 1, 0, 0, 0).unwrap(),
        ));

        for report in [
            ProblemReport::absent(["oauth_consumer_key"]),
            ProblemReport::new(Problem::SignatureInvalid),
            full,
        ] {
            let parsed: ProblemReport = report.to_string().parse().unwrap();
            assert_eq!(parsed, report);
        }
    }

    #[test]
    fn field_order_is_irrelevant_when_parsing() {
        let report: ProblemReport =
            "oauth_acceptable_versions=1.0-2.0&oauth_problem=version_rejected"
                .parse()
                .unwrap();
        assert_eq!(report.problem, Problem::VersionRejected);
    }

    #[test]
    fn absent_and_unknown_problem_are_distinct() {
        assert_eq!(
            "oauth_parameters_absent=oauth_nonce".parse::<ProblemReport>(),
            Err(ReportParseError::MissingProblem),
        );
        assert_eq!(
            "oauth_problem=flux_capacitor_drained".parse::<ProblemReport>(),
            Err(ReportParseError::UnknownProblem(
                "flux_capacitor_drained".to_string()
            )),
        );
    }

    #[test]
    fn plus_separated_names_are_tolerated() {
        let report: ProblemReport =
            "oauth_problem=parameter_absent&oauth_parameters_absent=oauth_nonce+oauth_timestamp"
                .parse()
                .unwrap();
        assert_eq!(report.parameters_absent, vec!["oauth_nonce", "oauth_timestamp"]);
    }
}
