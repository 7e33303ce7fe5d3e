//! Declarative policies.
//!
//! A policy file describes the same rules the builders accept:
//!
//! ```toml
//! [query]
//! may_have_keys = ["q", "page"]
//! may_not_repeat_keys = ["page"]
//! values = { page = "[0-9]{1,3}" }
//!
//! [fragment]
//! allow_absent = true
//! allow = ["#top"]
//!
//! [fragment.as_url.authority]
//! hosts = ["*.example.com"]
//! allow_placeholder = true
//!
//! [authority]
//! hosts = ["*.example.com"]
//! cidrs = ["93.184.216.0/24"]
//! address_policy = "public_only"
//! ```
//!
//! Every configured section must match. A policy with no sections matches
//! any parseable URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;

use crate::authority::{AuthorityClassifier, AuthorityClassifierBuilder};
use crate::classification::Classification;
use crate::classifier::{all, classifier_fn, UrlClassifier};
use crate::diagnostic::DiagnosticReceiver;
use crate::error::Error;
use crate::fragment::{FragmentClassifier, FragmentClassifierBuilder};
use crate::policy::Policy;
use crate::predicate::{OptionalTextPredicate, TextPredicate};
use crate::query::{QueryClassifier, QueryClassifierBuilder};
use crate::url_value::UrlValue;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub query: Option<QueryConfig>,
    #[serde(default)]
    pub fragment: Option<FragmentConfig>,
    #[serde(default)]
    pub authority: Option<AuthorityConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default)]
    pub may_have_keys: Vec<String>,
    #[serde(default)]
    pub may_not_repeat_keys: Vec<String>,
    #[serde(default)]
    pub must_have_keys: Vec<String>,
    /// Key to regex. The value must be present and match in full.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FragmentConfig {
    #[serde(default)]
    pub allow_absent: bool,
    /// Raw fragments, including the `#`.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Policy for the fragment read as a relative URL.
    #[serde(default)]
    pub as_url: Option<Box<PolicyConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityConfig {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub cidrs: Vec<String>,
    #[serde(default)]
    pub allow_placeholder: bool,
    #[serde(default)]
    pub address_policy: Policy,
}

impl PolicyConfig {
    /// Parse a policy from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Build a classifier requiring every configured section to match.
    ///
    /// # Errors
    ///
    /// Returns an error if a value pattern or CIDR range is malformed.
    pub fn build(&self) -> Result<Arc<dyn UrlClassifier>, Error> {
        let mut parts: Vec<Arc<dyn UrlClassifier>> = Vec::new();
        if let Some(authority) = &self.authority {
            parts.push(Arc::new(authority.build()?));
        }
        if let Some(query) = &self.query {
            parts.push(Arc::new(query.build()?));
        }
        if let Some(fragment) = &self.fragment {
            parts.push(Arc::new(fragment.build()?));
        }
        if parts.is_empty() {
            return Ok(Arc::new(classifier_fn(
                |url: &UrlValue, _: &mut dyn DiagnosticReceiver| {
                    if url.is_parsed() {
                        Classification::Match
                    } else {
                        Classification::Invalid
                    }
                },
            )));
        }
        Ok(Arc::new(all(parts)))
    }
}

impl QueryConfig {
    pub fn builder(&self) -> Result<QueryClassifierBuilder, Error> {
        let mut builder = QueryClassifier::builder()
            .may_have_keys(self.may_have_keys.iter().cloned())
            .may_not_repeat_keys(self.may_not_repeat_keys.iter().cloned())
            .must_have_keys(self.must_have_keys.iter().cloned());
        for (key, pattern) in &self.values {
            let regex = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| Error::invalid_pattern(pattern.as_str(), e))?;
            builder = builder.value_must_match(
                key.as_str(),
                OptionalTextPredicate::present_and(TextPredicate::matches(regex)),
            );
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<QueryClassifier, Error> {
        Ok(self.builder()?.build())
    }
}

impl FragmentConfig {
    pub fn builder(&self) -> Result<FragmentClassifierBuilder, Error> {
        let mut builder = FragmentClassifier::builder();
        if self.allow_absent {
            builder = builder.match_fragment(OptionalTextPredicate::absent());
        }
        for fragment in &self.allow {
            builder = builder.match_fragment(OptionalTextPredicate::equals(fragment.as_str()));
        }
        if let Some(as_url) = &self.as_url {
            builder = builder.match_as_shared_url(as_url.build()?);
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<FragmentClassifier, Error> {
        Ok(self.builder()?.build())
    }
}

impl AuthorityConfig {
    pub fn builder(&self) -> Result<AuthorityClassifierBuilder, Error> {
        let mut builder = AuthorityClassifier::builder()
            .match_hosts(&self.hosts)
            .match_placeholder(self.allow_placeholder)
            .address_policy(self.address_policy);
        for cidr in &self.cidrs {
            builder = builder.match_cidr(cidr)?;
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<AuthorityClassifier, Error> {
        Ok(self.builder()?.build())
    }
}
