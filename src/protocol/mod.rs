//! The protocol parameter model, the per-request context and problem reporting.
//!
//! Everything in this module is request-scoped. A [`ProtocolContext`] is the unit of work for one
//! request: the consumer side fills it before signing, the provider side reconstructs it from the
//! wire before inspection. [`ProblemReport`] is the standardized, machine-readable rejection
//! payload exchanged between the two sides.
//!
//! [`ProtocolContext`]: context/struct.ProtocolContext.html
//! [`ProblemReport`]: problem/struct.ProblemReport.html

pub mod context;
pub mod parameter;
pub mod problem;

pub use self::context::{ContextError, ProtocolContext};
pub use self::parameter::ProtocolParameter;
pub use self::problem::{Problem, ProblemReport, ReportParseError};
