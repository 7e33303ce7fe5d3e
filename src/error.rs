//! Error types for url_classifier.
//!
//! Untrusted input never produces an [`Error`]; it produces a
//! [`Classification`](crate::Classification). These errors describe
//! mistakes made while configuring classifiers.

use thiserror::Error;

/// Errors that can occur while configuring a classifier.
#[derive(Debug, Error)]
pub enum Error {
    /// The base URL of a [`UrlContext`](crate::UrlContext) is unusable.
    #[error("Invalid context URL {url}: {reason}")]
    InvalidContext { url: String, reason: String },

    /// A CIDR range could not be parsed.
    #[error("Invalid CIDR {cidr}: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    /// A value pattern failed to compile.
    #[error("Invalid pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A declarative policy could not be read.
    #[error("Invalid policy config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    pub(crate) fn invalid_context(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidContext {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_cidr(cidr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCidr {
            cidr: cidr.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
