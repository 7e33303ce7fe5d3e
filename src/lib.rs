//! # url_classifier
//!
//! Declarative URL classification for guarding against SSRF, open redirects
//! and parameter injection.
//!
//! Instead of hand-rolled regexes, callers describe which URL shapes are
//! acceptable with builders. Each built classifier returns one of three
//! verdicts:
//!
//! - [`Classification::Match`]: the URL satisfies the policy,
//! - [`Classification::NotAMatch`]: the URL is well formed but rejected,
//! - [`Classification::Invalid`]: the URL is malformed, e.g. `?a=%zz`.
//!
//! Rejections are explained through a [`DiagnosticReceiver`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use url_classifier::{
//!     all, AuthorityClassifier, Classification, CollectingReceiver, QueryClassifier,
//!     UrlClassifier, UrlContext, UrlValue,
//! };
//!
//! let policy = all([
//!     Arc::new(AuthorityClassifier::builder().match_hosts(["example.com"]).build())
//!         as Arc<dyn UrlClassifier>,
//!     Arc::new(QueryClassifier::builder().may_have_keys(["q"]).build()) as Arc<dyn UrlClassifier>,
//! ]);
//!
//! let url = UrlValue::parse(&UrlContext::default(), "https://example.com/?q=1&next=//evil");
//! let mut receiver = CollectingReceiver::new();
//! assert_eq!(policy.classify(&url, &mut receiver), Classification::NotAMatch);
//! assert_eq!(receiver.diagnostics()[0].tag(), "disallowed query key");
//! ```

mod authority;
mod blocklist;
mod classification;
mod classifier;
mod config;
mod diagnostic;
mod error;
mod fragment;
pub mod percent;
mod policy;
mod predicate;
mod query;
mod url_value;

pub use authority::{AuthorityClassifier, AuthorityClassifierBuilder};
pub use classification::Classification;
pub use classifier::{all, any, classifier_fn, not, All, Any, FnClassifier, Not, UrlClassifier};
pub use config::{AuthorityConfig, FragmentConfig, PolicyConfig, QueryConfig};
pub use diagnostic::{
    AuthorityDiagnostic, CollectingReceiver, Diagnostic, DiagnosticReceiver, FragmentDiagnostic,
    NullReceiver, QueryDiagnostic, TracingReceiver,
};
pub use error::Error;
pub use fragment::{FragmentClassifier, FragmentClassifierBuilder};
pub use policy::Policy;
pub use predicate::{OptionalTextPredicate, TextPredicate};
pub use query::{
    query_pairs, MalformedEscape, QueryClassifier, QueryClassifierBuilder, QueryPair, QueryPairs,
};
pub use url_value::{UrlContext, UrlValue, PLACEHOLDER_ROOT};
