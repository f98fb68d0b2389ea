//! The error taxonomy for the planning pipeline.
//!
//! Configuration-level errors abort a request before any solving happens. The other kinds are
//! recorded against the scenario in which they occurred and never escape the sweep.
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// An error raised by one of the planning components
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// The request or configuration is invalid
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// A location could not be resolved to a cost basis
    #[error("Unresolved location: {0}")]
    UnresolvedLocation(String),
    /// The facility-count bounds cannot be met with the available capacity
    #[error("Infeasible: {0}")]
    Infeasible(String),
    /// The solver stopped without finding a valid assignment
    #[error("No solution: {0}")]
    NoSolution(String),
    /// An external collaborator (baseline lookup, estimators) failed
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// The kind of a [`PlanningError`], as reported in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// See [`PlanningError::Configuration`]
    Configuration,
    /// See [`PlanningError::UnresolvedLocation`]
    UnresolvedLocation,
    /// See [`PlanningError::Infeasible`]
    Infeasible,
    /// See [`PlanningError::NoSolution`]
    NoSolution,
    /// See [`PlanningError::UpstreamUnavailable`]
    UpstreamUnavailable,
}

impl PlanningError {
    /// The kind of error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnresolvedLocation(_) => ErrorKind::UnresolvedLocation,
            Self::Infeasible(_) => ErrorKind::Infeasible,
            Self::NoSolution(_) => ErrorKind::NoSolution,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(msg)
            | Self::UnresolvedLocation(msg)
            | Self::Infeasible(msg)
            | Self::NoSolution(msg)
            | Self::UpstreamUnavailable(msg) => msg,
        }
    }

    /// Whether the error stems from the request itself rather than from a particular scenario
    pub fn is_request_level(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnresolvedLocation(_))
    }

    /// Prefix the message with some context, keeping the kind of error
    pub fn context<C: Display>(self, context: C) -> Self {
        let wrap = |msg: String| format!("{context}: {msg}");
        match self {
            Self::Configuration(msg) => Self::Configuration(wrap(msg)),
            Self::UnresolvedLocation(msg) => Self::UnresolvedLocation(wrap(msg)),
            Self::Infeasible(msg) => Self::Infeasible(wrap(msg)),
            Self::NoSolution(msg) => Self::NoSolution(wrap(msg)),
            Self::UpstreamUnavailable(msg) => Self::UpstreamUnavailable(wrap(msg)),
        }
    }
}

/// Convenience alias for results of the planning components
pub type PlanningResult<T> = Result<T, PlanningError>;

/// Return early with a [`PlanningError::Configuration`] if the condition doesn't hold
macro_rules! ensure_config {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::PlanningError::Configuration(format!($($arg)+)));
        }
    };
}
pub(crate) use ensure_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind() {
        let err = PlanningError::Infeasible("not enough capacity".into()).context("Year 2026");
        assert_eq!(err.kind(), ErrorKind::Infeasible);
        assert_eq!(err.message(), "Year 2026: not enough capacity");
        assert_eq!(err.to_string(), "Infeasible: Year 2026: not enough capacity");
    }

    #[test]
    fn test_is_request_level() {
        assert!(PlanningError::Configuration(String::new()).is_request_level());
        assert!(PlanningError::UnresolvedLocation(String::new()).is_request_level());
        assert!(!PlanningError::NoSolution(String::new()).is_request_level());
        assert_eq!(ErrorKind::NoSolution.to_string(), "no_solution");
    }
}
