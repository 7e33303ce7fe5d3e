//! Diagnostics explain why a classifier rejected its input.
//!
//! Diagnostics never change a verdict. They are handed to a
//! [`DiagnosticReceiver`] supplied by the caller on every call to
//! [`UrlClassifier::classify`](crate::UrlClassifier::classify).
//!
//! The tag strings returned by [`Diagnostic::tag`] are stable and may be
//! matched on by callers.

use std::fmt;

use crate::url_value::UrlValue;

/// Reasons reported by the query classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryDiagnostic {
    DisallowedQueryKey,
    DisallowedQueryKeyRepetition,
    DisallowedQueryValue,
    MissingRequiredQueryKey,
}

/// Reasons reported by the fragment classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentDiagnostic {
    FragmentDidNotMatch,
}

/// Reasons reported by the authority classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityDiagnostic {
    MissingAuthority,
    PlaceholderAuthority,
    BlockedAddress,
    BlockedHost,
    DisallowedHost,
}

/// A diagnostic tagged with the component that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    Query(QueryDiagnostic),
    Fragment(FragmentDiagnostic),
    Authority(AuthorityDiagnostic),
}

impl Diagnostic {
    /// Stable, human readable tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Diagnostic::Query(QueryDiagnostic::DisallowedQueryKey) => "disallowed query key",
            Diagnostic::Query(QueryDiagnostic::DisallowedQueryKeyRepetition) => {
                "disallowed query key repetition"
            }
            Diagnostic::Query(QueryDiagnostic::DisallowedQueryValue) => "disallowed query value",
            Diagnostic::Query(QueryDiagnostic::MissingRequiredQueryKey) => {
                "missing required query key"
            }
            Diagnostic::Fragment(FragmentDiagnostic::FragmentDidNotMatch) => {
                "fragment did not match"
            }
            Diagnostic::Authority(AuthorityDiagnostic::MissingAuthority) => "missing authority",
            Diagnostic::Authority(AuthorityDiagnostic::PlaceholderAuthority) => {
                "placeholder authority"
            }
            Diagnostic::Authority(AuthorityDiagnostic::BlockedAddress) => "blocked address",
            Diagnostic::Authority(AuthorityDiagnostic::BlockedHost) => "blocked host",
            Diagnostic::Authority(AuthorityDiagnostic::DisallowedHost) => "disallowed host",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<QueryDiagnostic> for Diagnostic {
    fn from(d: QueryDiagnostic) -> Self {
        Diagnostic::Query(d)
    }
}

impl From<FragmentDiagnostic> for Diagnostic {
    fn from(d: FragmentDiagnostic) -> Self {
        Diagnostic::Fragment(d)
    }
}

impl From<AuthorityDiagnostic> for Diagnostic {
    fn from(d: AuthorityDiagnostic) -> Self {
        Diagnostic::Authority(d)
    }
}

/// A sink for diagnostics.
///
/// Implementations must not panic. Classification continues regardless of
/// what the receiver does with a note.
pub trait DiagnosticReceiver {
    fn note(&mut self, diagnostic: Diagnostic, url: &UrlValue);
}

impl<F> DiagnosticReceiver for F
where
    F: FnMut(Diagnostic, &UrlValue),
{
    fn note(&mut self, diagnostic: Diagnostic, url: &UrlValue) {
        self(diagnostic, url)
    }
}

/// Discards every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReceiver;

impl DiagnosticReceiver for NullReceiver {
    fn note(&mut self, _diagnostic: Diagnostic, _url: &UrlValue) {}
}

/// Logs each diagnostic as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReceiver;

impl DiagnosticReceiver for TracingReceiver {
    fn note(&mut self, diagnostic: Diagnostic, url: &UrlValue) {
        tracing::debug!(
            diagnostic = diagnostic.tag(),
            url = %url.url_text(),
            "url classifier diagnostic"
        );
    }
}

/// Records diagnostics so they can be inspected or forwarded later.
///
/// Useful when a caller only wants to surface diagnostics for a verdict it
/// did not expect.
#[derive(Debug, Clone, Default)]
pub struct CollectingReceiver {
    notes: Vec<(Diagnostic, UrlValue)>,
}

impl CollectingReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The diagnostics seen so far, in the order they were noted.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.notes.iter().map(|(d, _)| *d).collect()
    }

    pub fn notes(&self) -> &[(Diagnostic, UrlValue)] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Forward everything recorded to `receiver`, then forget it.
    pub fn flush_to(&mut self, receiver: &mut dyn DiagnosticReceiver) {
        for (diagnostic, url) in self.notes.drain(..) {
            receiver.note(diagnostic, &url);
        }
    }

    /// Forget everything recorded.
    pub fn clear(&mut self) {
        self.notes.clear();
    }
}

impl DiagnosticReceiver for CollectingReceiver {
    fn note(&mut self, diagnostic: Diagnostic, url: &UrlValue) {
        self.notes.push((diagnostic, url.clone()));
    }
}
