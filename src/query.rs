//! Query classification.
//!
//! A query such as `?a=b%20c&a=d&e` is decomposed into the decoded pairs
//! `[("a", Some("b c")), ("a", Some("d")), ("e", None)]`, and the pairs are
//! checked against may / once / must key rules and per-key value
//! predicates.
//!
//! ```rust
//! use url_classifier::{Classification, NullReceiver, QueryClassifier, UrlClassifier, UrlContext, UrlValue};
//! use url_classifier::OptionalTextPredicate;
//!
//! let classifier = QueryClassifier::builder()
//!     .may_have_keys(["q", "page"])
//!     .may_not_repeat_keys(["page"])
//!     .value_must_match("page", OptionalTextPredicate::equals("1"))
//!     .build();
//!
//! let url = UrlValue::parse(&UrlContext::default(), "/search?q=rust&page=1");
//! assert_eq!(classifier.classify(&url, &mut NullReceiver), Classification::Match);
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::classification::Classification;
use crate::classifier::UrlClassifier;
use crate::diagnostic::{DiagnosticReceiver, QueryDiagnostic};
use crate::percent;
use crate::predicate::{or_into, OptionalTextPredicate, TextPredicate};
use crate::url_value::UrlValue;

/// One decoded `key[=value]` segment of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPair<'a> {
    pub key: Cow<'a, str>,
    /// `None` for `k`, `Some("")` for `k=`.
    pub value: Option<Cow<'a, str>>,
}

/// A segment of the query contained a malformed percent escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedEscape;

/// Lazily decodes a raw query into [`QueryPair`]s, left to right.
///
/// Segments are separated by `&` and split at their first `=`. Empty
/// segments, as in `a&&b` or a trailing `&`, produce no pair. Both halves
/// are percent decoded with `+` kept literal.
///
/// Iteration stops after the first segment that fails to decode; that
/// segment is reported as `Err(MalformedEscape)`. The iterator is `Clone`,
/// so a query can be walked again from the start.
#[derive(Debug, Clone)]
pub struct QueryPairs<'a> {
    rest: Option<&'a str>,
}

impl<'a> QueryPairs<'a> {
    /// `query` excludes the leading `?`. `None` yields nothing.
    pub fn new(query: Option<&'a str>) -> Self {
        Self { rest: query }
    }
}

/// Shorthand for [`QueryPairs::new`].
pub fn query_pairs(query: Option<&str>) -> QueryPairs<'_> {
    QueryPairs::new(query)
}

impl<'a> Iterator for QueryPairs<'a> {
    type Item = Result<QueryPair<'a>, MalformedEscape>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.rest?;
            let (segment, tail) = match rest.find('&') {
                Some(i) => (&rest[..i], Some(&rest[i + 1..])),
                None => (rest, None),
            };
            self.rest = tail;

            if segment.is_empty() {
                continue;
            }

            let (raw_key, raw_value) = match segment.find('=') {
                Some(eq) => (&segment[..eq], Some(&segment[eq + 1..])),
                None => (segment, None),
            };

            let decoded = percent::decode(raw_key, true).and_then(|key| {
                let value = match raw_value {
                    Some(v) => Some(percent::decode(v, true)?),
                    None => None,
                };
                Some(QueryPair { key, value })
            });

            return match decoded {
                Some(pair) => Some(Ok(pair)),
                None => {
                    self.rest = None;
                    Some(Err(MalformedEscape))
                }
            };
        }
    }
}

impl std::iter::FusedIterator for QueryPairs<'_> {}

/// Which keys may appear at all.
#[derive(Debug, Clone)]
enum KeyPermission {
    /// No may-rule was configured.
    Any,
    Restricted {
        keys: BTreeSet<String>,
        predicate: Option<TextPredicate>,
    },
}

impl KeyPermission {
    fn permits(&self, key: &str) -> bool {
        match self {
            KeyPermission::Any => true,
            KeyPermission::Restricted { keys, predicate } => {
                keys.contains(key) || predicate.as_ref().is_some_and(|p| p.test(key))
            }
        }
    }
}

#[derive(Debug)]
struct QueryRules {
    may: KeyPermission,
    once_keys: BTreeSet<String>,
    once_predicate: Option<TextPredicate>,
    must_keys: BTreeSet<String>,
    values: BTreeMap<String, OptionalTextPredicate>,
}

impl QueryRules {
    fn may_not_repeat(&self, key: &str) -> bool {
        self.once_keys.contains(key) || self.once_predicate.as_ref().is_some_and(|p| p.test(key))
    }
}

/// Classifies the query portion of a URL.
///
/// Created with [`QueryClassifier::builder`]. Cloning is cheap and clones
/// share their rules.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    rules: Arc<QueryRules>,
}

impl QueryClassifier {
    pub fn builder() -> QueryClassifierBuilder {
        QueryClassifierBuilder::default()
    }
}

impl UrlClassifier for QueryClassifier {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        if !url.is_parsed() {
            return Classification::Invalid;
        }

        let rules = &*self.rules;
        let mut keys_seen: HashSet<Cow<'_, str>> = HashSet::new();
        let mut result = Classification::Match;

        // Decoding continues after a policy rejection so that a malformed
        // escape later in the query still yields Invalid.
        for pair in query_pairs(url.raw_query()) {
            let Ok(QueryPair { key, value }) = pair else {
                tracing::trace!(url = %url.url_text(), "malformed percent escape in query");
                return Classification::Invalid;
            };

            let first_occurrence = !keys_seen.contains(key.as_ref());
            if result == Classification::Match {
                if !rules.may.permits(&key) {
                    receiver.note(QueryDiagnostic::DisallowedQueryKey.into(), url);
                    result = Classification::NotAMatch;
                } else if !first_occurrence && rules.may_not_repeat(&key) {
                    receiver.note(QueryDiagnostic::DisallowedQueryKeyRepetition.into(), url);
                    result = Classification::NotAMatch;
                } else if let Some(p) = rules.values.get(key.as_ref()) {
                    if !p.test(value.as_deref()) {
                        receiver.note(QueryDiagnostic::DisallowedQueryValue.into(), url);
                        result = Classification::NotAMatch;
                    }
                }
            }
            if first_occurrence {
                keys_seen.insert(key);
            }
        }

        if result == Classification::Match
            && !rules
                .must_keys
                .iter()
                .all(|k| keys_seen.contains(k.as_str()))
        {
            receiver.note(QueryDiagnostic::MissingRequiredQueryKey.into(), url);
            result = Classification::NotAMatch;
        }

        result
    }
}

/// Builder for [`QueryClassifier`].
///
/// All key rules operate on percent-decoded keys. The builder may be reused
/// after [`build`](Self::build); later changes do not affect classifiers
/// that were already built.
#[derive(Debug, Clone, Default)]
pub struct QueryClassifierBuilder {
    may_keys: BTreeSet<String>,
    may_predicate: Option<TextPredicate>,
    once_keys: BTreeSet<String>,
    once_predicate: Option<TextPredicate>,
    must_keys: BTreeSet<String>,
    values: BTreeMap<String, OptionalTextPredicate>,
}

impl QueryClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that MAY appear. Multiple calls union.
    ///
    /// If no `may_have_keys*` method is ever called, any key may appear.
    /// Once one is, keys outside every may, once and must rule are
    /// rejected.
    pub fn may_have_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.may_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Keys matching `p` MAY appear. Multiple calls union.
    pub fn may_have_keys_matching(mut self, p: TextPredicate) -> Self {
        or_into(&mut self.may_predicate, p);
        self
    }

    /// Keys that may appear at most once.
    pub fn may_not_repeat_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.once_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Keys matching `p` may appear at most once.
    pub fn may_not_repeat_keys_matching(mut self, p: TextPredicate) -> Self {
        or_into(&mut self.once_predicate, p);
        self
    }

    /// Keys that MUST appear, in any order.
    pub fn must_have_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Every value of `key` must satisfy `p`.
    ///
    /// For `?k=v` the predicate sees `Some("v")`, for `?k=` it sees
    /// `Some("")` and for `?k` it sees `None`. Values are percent decoded.
    /// This does not require `key` to appear. Registering several
    /// predicates for one key requires all of them to hold.
    pub fn value_must_match(mut self, key: impl Into<String>, p: OptionalTextPredicate) -> Self {
        let key = key.into();
        let combined = match self.values.remove(&key) {
            Some(old) => old.and(p),
            None => p,
        };
        self.values.insert(key, combined);
        self
    }

    pub fn build(&self) -> QueryClassifier {
        let may = if self.may_keys.is_empty() && self.may_predicate.is_none() {
            KeyPermission::Any
        } else {
            // A key that may appear once, or must appear, may appear.
            let mut keys = self.may_keys.clone();
            keys.extend(self.once_keys.iter().cloned());
            keys.extend(self.must_keys.iter().cloned());
            let predicate = match (&self.may_predicate, &self.once_predicate) {
                (Some(may), Some(once)) => Some(may.clone().or(once.clone())),
                (may, once) => may.clone().or_else(|| once.clone()),
            };
            KeyPermission::Restricted { keys, predicate }
        };

        tracing::trace!(
            may_keys = self.may_keys.len(),
            once_keys = self.once_keys.len(),
            must_keys = self.must_keys.len(),
            value_rules = self.values.len(),
            "built query classifier"
        );

        QueryClassifier {
            rules: Arc::new(QueryRules {
                may,
                once_keys: self.once_keys.clone(),
                once_predicate: self.once_predicate.clone(),
                must_keys: self.must_keys.clone(),
                values: self.values.clone(),
            }),
        }
    }
}
