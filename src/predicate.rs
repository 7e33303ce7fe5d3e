//! Composable predicates used to configure classifiers.
//!
//! Predicates are cheap to clone and safe to share between threads, so a
//! built classifier can hold the same predicate a builder was given without
//! copying it.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A predicate over text, such as a decoded query key.
#[derive(Clone)]
pub struct TextPredicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl TextPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Holds for exactly `expected`.
    pub fn equals(expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self::new(move |s| s == expected)
    }

    /// Holds for any of `options`.
    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        Self::new(move |s| options.iter().any(|o| o == s))
    }

    /// Holds when `regex` matches somewhere in the text.
    ///
    /// Anchor the pattern with `^...$` to require a full match.
    pub fn matches(regex: Regex) -> Self {
        Self::new(move |s| regex.is_match(s))
    }

    pub fn test(&self, s: &str) -> bool {
        (self.0)(s)
    }

    pub fn and(self, other: TextPredicate) -> Self {
        Self::new(move |s| self.test(s) && other.test(s))
    }

    pub fn or(self, other: TextPredicate) -> Self {
        Self::new(move |s| self.test(s) || other.test(s))
    }

    pub fn negate(self) -> Self {
        Self::new(move |s| !self.test(s))
    }
}

impl fmt::Debug for TextPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextPredicate(..)")
    }
}

/// A predicate over text that may be absent.
///
/// Query values are absent for `?k` and empty for `?k=`. Fragments are
/// absent when the URL has no `#`.
#[derive(Clone)]
pub struct OptionalTextPredicate(Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>);

impl OptionalTextPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Holds only when the text is absent.
    pub fn absent() -> Self {
        Self::new(|s| s.is_none())
    }

    /// Holds only when the text is present and equal to `expected`.
    pub fn equals(expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self::new(move |s| s == Some(expected.as_str()))
    }

    /// Holds when the text is present and satisfies `predicate`.
    pub fn present_and(predicate: TextPredicate) -> Self {
        Self::new(move |s| s.is_some_and(|s| predicate.test(s)))
    }

    pub fn test(&self, s: Option<&str>) -> bool {
        (self.0)(s)
    }

    pub fn and(self, other: OptionalTextPredicate) -> Self {
        Self::new(move |s| self.test(s) && other.test(s))
    }

    pub fn or(self, other: OptionalTextPredicate) -> Self {
        Self::new(move |s| self.test(s) || other.test(s))
    }
}

impl fmt::Debug for OptionalTextPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptionalTextPredicate(..)")
    }
}

/// Combines an optional accumulated predicate with a new one by disjunction.
pub(crate) fn or_into(slot: &mut Option<TextPredicate>, p: TextPredicate) {
    *slot = Some(match slot.take() {
        Some(old) => old.or(p),
        None => p,
    });
}
