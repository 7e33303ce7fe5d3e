use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use url_classifier::{
    query_pairs, Classification, CollectingReceiver, Diagnostic, FragmentClassifier,
    OptionalTextPredicate, QueryClassifier, QueryDiagnostic, UrlClassifier, UrlContext, UrlValue,
};

fn classify(classifier: &dyn UrlClassifier, url: &str) -> (Classification, Vec<Diagnostic>) {
    let mut receiver = CollectingReceiver::new();
    let url = UrlValue::parse(&UrlContext::default(), url);
    (classifier.classify(&url, &mut receiver), receiver.diagnostics())
}

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._~-]{0,10}"
}

proptest! {
    #[test]
    fn tokenizer_is_total(query in ".{0,64}") {
        let mut count = 0;
        for pair in query_pairs(Some(&query)) {
            count += 1;
            if pair.is_err() {
                break;
            }
        }
        prop_assert!(count <= query.split('&').count());
    }

    #[test]
    fn permissive_classifier_matches_any_key(k in key(), v in value()) {
        let c = QueryClassifier::builder().build();
        let url = format!("/?{}={}", k, v);
        prop_assert_eq!(classify(&c, &url), (Classification::Match, vec![]));
    }

    #[test]
    fn malformed_escape_is_invalid_regardless_of_rules(k in key(), bad in "[g-z]{2}") {
        let classifiers = [
            QueryClassifier::builder().build(),
            QueryClassifier::builder().may_have_keys([k.clone()]).build(),
            QueryClassifier::builder().must_have_keys(["absent"]).build(),
            QueryClassifier::builder()
                .value_must_match(k.clone(), OptionalTextPredicate::new(|_| false))
                .build(),
        ];
        let url = format!("/?{}=%{}", k, bad);
        for c in &classifiers {
            prop_assert_eq!(classify(c, &url).0, Classification::Invalid);
        }
    }

    #[test]
    fn repeated_once_key_rejected(k in key(), v1 in value(), v2 in value()) {
        let c = QueryClassifier::builder().may_not_repeat_keys([k.clone()]).build();
        prop_assert_eq!(classify(&c, &format!("/?{}={}", k, v1)).0, Classification::Match);
        prop_assert_eq!(
            classify(&c, &format!("/?{}={}&{}={}", k, v1, k, v2)),
            (
                Classification::NotAMatch,
                vec![Diagnostic::Query(QueryDiagnostic::DisallowedQueryKeyRepetition)]
            )
        );
    }

    #[test]
    fn classification_is_idempotent(query in "[a-c=&%0-9]{0,16}", fragment in "[a-c/.#]{0,8}") {
        let query_classifier = QueryClassifier::builder()
            .may_have_keys(["a", "b"])
            .may_not_repeat_keys(["a"])
            .must_have_keys(["b"])
            .value_must_match("b", OptionalTextPredicate::equals("1"))
            .build();
        let fragment_classifier = FragmentClassifier::builder()
            .match_fragment(OptionalTextPredicate::equals("#a"))
            .match_as_url(query_classifier.clone())
            .build();
        let url = format!("/?{}#{}", query, fragment);
        prop_assert_eq!(classify(&query_classifier, &url), classify(&query_classifier, &url));
        prop_assert_eq!(classify(&fragment_classifier, &url), classify(&fragment_classifier, &url));
    }
}

#[test]
fn builder_reuse_leaves_earlier_classifiers_untouched() {
    let builder = QueryClassifier::builder().may_have_keys(["a"]);
    let first = builder.build();
    let second = builder.clone().may_have_keys(["b"]).build();
    let third = builder.must_have_keys(["z"]).build();

    assert_eq!(classify(&first, "/?b").0, Classification::NotAMatch);
    assert_eq!(classify(&first, "/?a").0, Classification::Match);
    assert_eq!(classify(&second, "/?b").0, Classification::Match);
    assert_eq!(classify(&third, "/?a").0, Classification::NotAMatch);
    assert_eq!(classify(&third, "/?z").0, Classification::Match);
}

#[test]
fn classifiers_are_shareable_across_threads() {
    let classifier: Arc<dyn UrlClassifier> = Arc::new(
        QueryClassifier::builder()
            .may_have_keys(["id"])
            .may_not_repeat_keys(["id"])
            .build(),
    );

    thread::scope(|s| {
        for i in 0..8 {
            let classifier = Arc::clone(&classifier);
            s.spawn(move || {
                let ok = format!("/?id={}", i);
                let repeated = format!("/?id={}&id={}", i, i);
                for _ in 0..100 {
                    assert_eq!(classify(&*classifier, &ok).0, Classification::Match);
                    assert_eq!(classify(&*classifier, &repeated).0, Classification::NotAMatch);
                }
            });
        }
    });
}
