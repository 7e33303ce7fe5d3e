//! The classifier contract and boolean composition.

use std::fmt;
use std::sync::Arc;

use crate::classification::Classification;
use crate::diagnostic::DiagnosticReceiver;
use crate::url_value::UrlValue;

/// Anything that can classify a [`UrlValue`].
///
/// Built classifiers are immutable, so they are `Send + Sync` and may be
/// shared freely between threads.
pub trait UrlClassifier: Send + Sync {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification;
}

impl<C: UrlClassifier + ?Sized> UrlClassifier for &C {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        (**self).classify(url, receiver)
    }
}

impl<C: UrlClassifier + ?Sized> UrlClassifier for Box<C> {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        (**self).classify(url, receiver)
    }
}

impl<C: UrlClassifier + ?Sized> UrlClassifier for Arc<C> {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        (**self).classify(url, receiver)
    }
}

/// A classifier backed by a closure. See [`classifier_fn`].
#[derive(Clone)]
pub struct FnClassifier<F>(F);

impl<F> UrlClassifier for FnClassifier<F>
where
    F: Fn(&UrlValue, &mut dyn DiagnosticReceiver) -> Classification + Send + Sync,
{
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        (self.0)(url, receiver)
    }
}

impl<F> fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnClassifier(..)")
    }
}

/// Wrap a closure as a classifier.
///
/// ```rust
/// use url_classifier::{classifier_fn, Classification, NullReceiver, UrlClassifier, UrlContext, UrlValue};
///
/// let https_only = classifier_fn(|url: &UrlValue, _: &mut dyn url_classifier::DiagnosticReceiver| {
///     if url.scheme() == Some("https") {
///         Classification::Match
///     } else {
///         Classification::NotAMatch
///     }
/// });
/// let url = UrlValue::parse(&UrlContext::default(), "https://example.com/");
/// assert_eq!(https_only.classify(&url, &mut NullReceiver), Classification::Match);
/// ```
pub fn classifier_fn<F>(f: F) -> FnClassifier<F>
where
    F: Fn(&UrlValue, &mut dyn DiagnosticReceiver) -> Classification + Send + Sync,
{
    FnClassifier(f)
}

/// Matches only when every member matches. See [`all`].
#[derive(Clone)]
pub struct All(Vec<Arc<dyn UrlClassifier>>);

/// Matches when any member matches. See [`any`].
#[derive(Clone)]
pub struct Any(Vec<Arc<dyn UrlClassifier>>);

/// Inverts its member. See [`not`].
#[derive(Clone)]
pub struct Not(Arc<dyn UrlClassifier>);

/// Conjunction of classifiers, evaluated left to right.
///
/// Stops at the first `Invalid`. A classifier that returns `NotAMatch` does
/// not stop evaluation, so later members may still report `Invalid`. An
/// empty conjunction matches.
pub fn all<I>(classifiers: I) -> All
where
    I: IntoIterator<Item = Arc<dyn UrlClassifier>>,
{
    All(classifiers.into_iter().collect())
}

/// Disjunction of classifiers, evaluated left to right.
///
/// Stops at the first `Match` or `Invalid`. An empty disjunction does not
/// match.
pub fn any<I>(classifiers: I) -> Any
where
    I: IntoIterator<Item = Arc<dyn UrlClassifier>>,
{
    Any(classifiers.into_iter().collect())
}

/// Swaps `Match` and `NotAMatch`. `Invalid` input stays invalid.
pub fn not(classifier: Arc<dyn UrlClassifier>) -> Not {
    Not(classifier)
}

impl UrlClassifier for All {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        let mut result = Classification::Match;
        for classifier in &self.0 {
            result = result.combine(classifier.classify(url, receiver));
            if result == Classification::Invalid {
                break;
            }
        }
        result
    }
}

impl UrlClassifier for Any {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        let mut result = Classification::NotAMatch;
        for classifier in &self.0 {
            result = result.or(classifier.classify(url, receiver));
            if result != Classification::NotAMatch {
                break;
            }
        }
        result
    }
}

impl UrlClassifier for Not {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        self.0.classify(url, receiver).invert()
    }
}

impl fmt::Debug for All {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All({} classifiers)", self.0.len())
    }
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Any({} classifiers)", self.0.len())
    }
}

impl fmt::Debug for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Not(..)")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::diagnostic::NullReceiver;
    use crate::url_value::UrlContext;

    fn constant(c: Classification) -> Arc<dyn UrlClassifier> {
        Arc::new(classifier_fn(move |_: &UrlValue, _: &mut dyn DiagnosticReceiver| c))
    }

    fn url() -> UrlValue {
        UrlValue::parse(&UrlContext::default(), "/")
    }

    fn run(c: &dyn UrlClassifier) -> Classification {
        c.classify(&url(), &mut NullReceiver)
    }

    #[test]
    fn test_all() {
        use Classification::*;
        assert_eq!(run(&all(vec![])), Match);
        assert_eq!(run(&all(vec![constant(Match), constant(Match)])), Match);
        assert_eq!(run(&all(vec![constant(Match), constant(NotAMatch)])), NotAMatch);
        assert_eq!(run(&all(vec![constant(NotAMatch), constant(Invalid)])), Invalid);
    }

    #[test]
    fn test_any() {
        use Classification::*;
        assert_eq!(run(&any(vec![])), NotAMatch);
        assert_eq!(run(&any(vec![constant(NotAMatch), constant(Match)])), Match);
        assert_eq!(run(&any(vec![constant(Match), constant(Invalid)])), Match);
        assert_eq!(run(&any(vec![constant(Invalid), constant(Match)])), Invalid);
        assert_eq!(run(&any(vec![constant(NotAMatch), constant(NotAMatch)])), NotAMatch);
    }

    #[test]
    fn test_any_short_circuits_on_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Arc::new(classifier_fn(move |_: &UrlValue, _: &mut dyn DiagnosticReceiver| {
                calls.fetch_add(1, Ordering::SeqCst);
                Classification::Match
            })) as Arc<dyn UrlClassifier>
        };
        let c = any(vec![constant(Classification::Match), counted]);
        assert_eq!(run(&c), Classification::Match);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_not() {
        use Classification::*;
        assert_eq!(run(&not(constant(Match))), NotAMatch);
        assert_eq!(run(&not(constant(NotAMatch))), Match);
        assert_eq!(run(&not(constant(Invalid))), Invalid);
    }

    #[test]
    fn test_smart_pointer_impls() {
        let boxed: Box<dyn UrlClassifier> = Box::new(all(vec![]));
        assert_eq!(run(&boxed), Classification::Match);
        let shared = constant(Classification::NotAMatch);
        assert_eq!(run(&&shared), Classification::NotAMatch);
    }
}
