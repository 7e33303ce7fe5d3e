//! Fragment classification.
//!
//! A fragment can be matched as raw text, or reinterpreted as a relative
//! URL and handed to another classifier. The latter is how single page
//! applications that route on `#/path` can be policed with the same
//! classifiers used for whole URLs.

use std::fmt;
use std::sync::Arc;

use crate::classification::Classification;
use crate::classifier::UrlClassifier;
use crate::diagnostic::{DiagnosticReceiver, FragmentDiagnostic};
use crate::predicate::OptionalTextPredicate;
use crate::url_value::UrlValue;

#[derive(Clone)]
enum FragmentRule {
    /// Holds on the raw fragment, including its `#`, or `None`.
    Text(OptionalTextPredicate),
    /// Classifies the fragment body as a URL.
    AsUrl(Arc<dyn UrlClassifier>),
}

impl FragmentRule {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        match self {
            FragmentRule::Text(p) => {
                if p.test(url.raw_fragment()) {
                    Classification::Match
                } else {
                    Classification::NotAMatch
                }
            }
            FragmentRule::AsUrl(classifier) => match url.raw_fragment() {
                None => Classification::NotAMatch,
                Some(fragment) => {
                    let fragment_url = url.resolve_fragment_reference(&fragment[1..]);
                    classifier.classify(&fragment_url, receiver)
                }
            },
        }
    }
}

impl fmt::Debug for FragmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentRule::Text(p) => f.debug_tuple("Text").field(p).finish(),
            FragmentRule::AsUrl(_) => f.write_str("AsUrl(..)"),
        }
    }
}

/// Classifies the fragment portion of a URL.
///
/// Rules are tried in the order they were added and the first match wins.
/// With no rules nothing matches, not even a URL without a fragment.
#[derive(Debug, Clone)]
pub struct FragmentClassifier {
    rules: Arc<[FragmentRule]>,
}

impl FragmentClassifier {
    pub fn builder() -> FragmentClassifierBuilder {
        FragmentClassifierBuilder::default()
    }
}

impl UrlClassifier for FragmentClassifier {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        if !url.is_parsed() {
            return Classification::Invalid;
        }

        let mut result = Classification::NotAMatch;
        for rule in self.rules.iter() {
            result = result.or(rule.classify(url, receiver));
            if result != Classification::NotAMatch {
                break;
            }
        }

        if result == Classification::NotAMatch {
            receiver.note(FragmentDiagnostic::FragmentDidNotMatch.into(), url);
        }
        result
    }
}

/// Builder for [`FragmentClassifier`].
#[derive(Debug, Clone, Default)]
pub struct FragmentClassifierBuilder {
    rules: Vec<FragmentRule>,
}

impl FragmentClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match when `p` holds on the raw fragment.
    ///
    /// The predicate sees the fragment exactly as written, including the
    /// leading `#` and without percent decoding, or `None` when the URL has
    /// no fragment.
    ///
    /// ```rust
    /// use url_classifier::{Classification, FragmentClassifier, NullReceiver, OptionalTextPredicate};
    /// use url_classifier::{UrlClassifier, UrlContext, UrlValue};
    ///
    /// let classifier = FragmentClassifier::builder()
    ///     .match_fragment(OptionalTextPredicate::absent())
    ///     .match_fragment(OptionalTextPredicate::equals("#top"))
    ///     .build();
    ///
    /// let ctx = UrlContext::default();
    /// assert!(classifier.classify(&UrlValue::parse(&ctx, "/a"), &mut NullReceiver).is_match());
    /// assert!(classifier.classify(&UrlValue::parse(&ctx, "/a#top"), &mut NullReceiver).is_match());
    /// assert!(!classifier.classify(&UrlValue::parse(&ctx, "/a#x"), &mut NullReceiver).is_match());
    /// ```
    pub fn match_fragment(mut self, p: OptionalTextPredicate) -> Self {
        self.rules.push(FragmentRule::Text(p));
        self
    }

    /// Match when the fragment, read as a relative URL, is matched by
    /// `classifier`.
    ///
    /// The text after `#` is resolved against the URL's own
    /// `scheme://authority/`, so `https://a.com/app#foo/../bar` is
    /// classified as `https://a.com/bar`. When the URL has no authority of
    /// its own, the placeholder authority is used instead and `#foo/../bar`
    /// is classified as `http://example.org./bar`. The classifier can use
    /// [`UrlValue::inherits_placeholder_authority`] to tell an inherited
    /// placeholder from an authority written in the fragment. A URL with no
    /// fragment never matches this rule.
    pub fn match_as_url<C>(mut self, classifier: C) -> Self
    where
        C: UrlClassifier + 'static,
    {
        self.rules.push(FragmentRule::AsUrl(Arc::new(classifier)));
        self
    }

    /// Like [`match_as_url`](Self::match_as_url) for an already shared
    /// classifier.
    pub fn match_as_shared_url(mut self, classifier: Arc<dyn UrlClassifier>) -> Self {
        self.rules.push(FragmentRule::AsUrl(classifier));
        self
    }

    pub fn build(&self) -> FragmentClassifier {
        tracing::trace!(rules = self.rules.len(), "built fragment classifier");
        FragmentClassifier {
            rules: self.rules.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classifier_fn;
    use crate::diagnostic::{CollectingReceiver, Diagnostic};
    use crate::query::QueryClassifier;
    use crate::url_value::UrlContext;

    const NO_FRAGMENT: [&str; 3] = ["", "/foo", "mailto:you@example.com"];
    const SIMPLE: [&str; 3] = ["#foo", "/bar#foo", "mailto:you@example.com#foo"];
    const COMPLEX: [&str; 3] = [
        "#foo/../bar/baz",
        "/boo#foo/../bar/baz",
        "mailto:you@example.com#foo/../bar/baz",
    ];

    fn classify(classifier: &FragmentClassifier, url: &str) -> Classification {
        let url = UrlValue::parse(&UrlContext::default(), url);
        classifier.classify(&url, &mut CollectingReceiver::new())
    }

    fn always_match() -> FragmentClassifier {
        FragmentClassifier::builder()
            .match_as_url(classifier_fn(
                |_: &UrlValue, _: &mut dyn DiagnosticReceiver| Classification::Match,
            ))
            .build()
    }

    // ==================== No fragment tests ====================

    #[test]
    fn test_no_fragment() {
        for url in NO_FRAGMENT {
            assert_eq!(
                classify(&FragmentClassifier::builder().build(), url),
                Classification::NotAMatch,
                "{}",
                url
            );
            assert_eq!(
                classify(
                    &FragmentClassifier::builder()
                        .match_fragment(OptionalTextPredicate::absent())
                        .build(),
                    url
                ),
                Classification::Match,
                "{}",
                url
            );
            assert_eq!(
                classify(
                    &FragmentClassifier::builder()
                        .match_fragment(OptionalTextPredicate::equals("#foo"))
                        .build(),
                    url
                ),
                Classification::NotAMatch,
                "{}",
                url
            );
            assert_eq!(classify(&always_match(), url), Classification::NotAMatch, "{}", url);
        }
    }

    // ==================== Simple fragment tests ====================

    #[test]
    fn test_simple_fragment() {
        for url in SIMPLE {
            assert_eq!(
                classify(&FragmentClassifier::builder().build(), url),
                Classification::NotAMatch
            );
            assert_eq!(
                classify(
                    &FragmentClassifier::builder()
                        .match_fragment(OptionalTextPredicate::absent())
                        .build(),
                    url
                ),
                Classification::NotAMatch
            );
            assert_eq!(
                classify(
                    &FragmentClassifier::builder()
                        .match_fragment(OptionalTextPredicate::equals("#foo"))
                        .build(),
                    url
                ),
                Classification::Match
            );
            assert_eq!(
                classify(
                    &FragmentClassifier::builder()
                        .match_fragment(OptionalTextPredicate::equals("#bar"))
                        .build(),
                    url
                ),
                Classification::NotAMatch
            );
        }
    }

    #[test]
    fn test_simple_fragment_as_url() {
        let c = FragmentClassifier::builder()
            .match_as_url(classifier_fn(
                |x: &UrlValue, _: &mut dyn DiagnosticReceiver| {
                    if x.url_text() == "http://example.org./foo"
                        && x.inherits_placeholder_authority()
                    {
                        Classification::Match
                    } else {
                        Classification::NotAMatch
                    }
                },
            ))
            .build();
        for url in SIMPLE {
            assert_eq!(classify(&c, url), Classification::Match, "{}", url);
        }
    }

    // ==================== Complex fragment tests ====================

    #[test]
    fn test_complex_fragment() {
        let exact = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#foo/../bar/baz"))
            .build();
        let by_path = FragmentClassifier::builder()
            .match_as_url(classifier_fn(
                |x: &UrlValue, _: &mut dyn DiagnosticReceiver| {
                    if x.raw_path() == Some("/bar/baz") {
                        Classification::Match
                    } else {
                        Classification::NotAMatch
                    }
                },
            ))
            .build();
        for url in COMPLEX {
            assert_eq!(classify(&exact, url), Classification::Match, "{}", url);
            assert_eq!(classify(&by_path, url), Classification::Match, "{}", url);
            assert_eq!(
                classify(&FragmentClassifier::builder().build(), url),
                Classification::NotAMatch
            );
        }
    }

    #[test]
    fn test_fragment_is_not_decoded() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a%20b"))
            .build();
        assert_eq!(classify(&c, "/#a%20b"), Classification::Match);
    }

    #[test]
    fn test_fragment_is_not_reencoded() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a b<c>"))
            .build();
        assert_eq!(classify(&c, "/x#a b<c>"), Classification::Match);
        assert_eq!(classify(&c, "/x#a%20b%3Cc%3E"), Classification::NotAMatch);
    }

    #[test]
    fn test_fragment_resolved_against_own_authority() {
        let c = FragmentClassifier::builder()
            .match_as_url(classifier_fn(
                |x: &UrlValue, _: &mut dyn DiagnosticReceiver| {
                    if x.url_text() == "https://real.example.com/bar"
                        && !x.inherits_placeholder_authority()
                    {
                        Classification::Match
                    } else {
                        Classification::NotAMatch
                    }
                },
            ))
            .build();
        assert_eq!(
            classify(&c, "https://real.example.com/app#foo/../bar"),
            Classification::Match
        );
        assert_eq!(
            classify(&c, "https://other.example.com/app#foo/../bar"),
            Classification::NotAMatch
        );
        assert_eq!(classify(&c, "/app#foo/../bar"), Classification::NotAMatch);
    }

    #[test]
    fn test_empty_fragment_is_present() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#"))
            .build();
        assert_eq!(classify(&c, "/x#"), Classification::Match);
        assert_eq!(classify(&c, "/x"), Classification::NotAMatch);
    }

    // ==================== Rule combination tests ====================

    #[test]
    fn test_rules_or_combine() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a"))
            .match_fragment(OptionalTextPredicate::equals("#b"))
            .build();
        assert_eq!(classify(&c, "#a"), Classification::Match);
        assert_eq!(classify(&c, "#b"), Classification::Match);
        assert_eq!(classify(&c, "#c"), Classification::NotAMatch);
    }

    #[test]
    fn test_invalid_before_match_propagates() {
        let c = FragmentClassifier::builder()
            .match_as_url(
                QueryClassifier::builder().may_have_keys(["ok"]).build(),
            )
            .match_fragment(OptionalTextPredicate::new(|_| true))
            .build();
        assert_eq!(classify(&c, "#/x?ok=%zz"), Classification::Invalid);
        assert_eq!(classify(&c, "#/x?ok=1"), Classification::Match);
        assert_eq!(classify(&c, "#/x?no=1"), Classification::Match);
    }

    #[test]
    fn test_prior_match_wins_over_invalid() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::new(|_| true))
            .match_as_url(QueryClassifier::builder().build())
            .build();
        assert_eq!(classify(&c, "#/x?ok=%zz"), Classification::Match);
    }

    #[test]
    fn test_fragment_query_classified_as_url() {
        let c = FragmentClassifier::builder()
            .match_as_url(
                QueryClassifier::builder()
                    .may_have_keys(["tab"])
                    .build(),
            )
            .build();
        assert_eq!(classify(&c, "/app#/settings?tab=1"), Classification::Match);
        assert_eq!(classify(&c, "/app#/settings?next=x"), Classification::NotAMatch);
    }

    #[test]
    fn test_nested_fragment_classifier() {
        let inner = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#deep"))
            .build();
        let outer = FragmentClassifier::builder().match_as_url(inner).build();
        // A second '#' stays in the outer fragment as data.
        assert_eq!(classify(&outer, "/x#/a#deep"), Classification::Match);
        assert_eq!(classify(&outer, "/x#/a#shallow"), Classification::NotAMatch);
    }

    // ==================== Diagnostic tests ====================

    #[test]
    fn test_diagnostic_on_rejection_only() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a"))
            .build();
        let ctx = UrlContext::default();

        let mut receiver = CollectingReceiver::new();
        c.classify(&UrlValue::parse(&ctx, "#a"), &mut receiver);
        assert!(receiver.is_empty());

        c.classify(&UrlValue::parse(&ctx, "#b"), &mut receiver);
        assert_eq!(
            receiver.diagnostics(),
            vec![Diagnostic::Fragment(FragmentDiagnostic::FragmentDidNotMatch)]
        );
    }

    // ==================== Builder tests ====================

    #[test]
    fn test_builder_reuse_does_not_affect_built() {
        let builder = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a"));
        let first = builder.build();
        let second = builder
            .match_fragment(OptionalTextPredicate::equals("#b"))
            .build();

        assert_eq!(classify(&first, "#b"), Classification::NotAMatch);
        assert_eq!(classify(&second, "#b"), Classification::Match);
    }

    #[test]
    fn test_unparseable_url_is_invalid() {
        let c = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::new(|_| true))
            .build();
        assert_eq!(classify(&c, "http://[::1/#x"), Classification::Invalid);
    }
}
