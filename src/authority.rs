//! Authority classification.
//!
//! Decides whether the host a URL points at is one the caller is willing to
//! talk to. Hostnames are matched against patterns, IP literals against
//! CIDR ranges and an address [`Policy`].
//!
//! ## Precedence
//!
//! 1. An unparseable URL, or an IPv4 host written in a non-canonical form
//!    (octal, hex, a single decimal number, short forms like `127.1`), is
//!    `Invalid`. The `url` crate silently rewrites these, so the check is
//!    made against the raw text.
//! 2. A placeholder authority matches only if
//!    [`match_placeholder`](AuthorityClassifierBuilder::match_placeholder)
//!    was enabled.
//! 3. An IP literal inside a configured CIDR matches. Otherwise IP literals
//!    refused by the address policy do not match.
//! 4. Metadata hostnames never match.
//! 5. The host matches if any host pattern does.
//!
//! **Be careful with `match_cidr`.** It overrides the address policy, so
//! `match_cidr("127.0.0.0/8")` admits loopback.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use url::Host;

use crate::blocklist::{blocked_address, blocked_hostname};
use crate::classification::Classification;
use crate::classifier::UrlClassifier;
use crate::diagnostic::{AuthorityDiagnostic, DiagnosticReceiver};
use crate::error::Error;
use crate::policy::Policy;
use crate::url_value::UrlValue;

#[derive(Debug)]
struct AuthorityRules {
    hosts: BTreeSet<String>,
    cidrs: Vec<IpNet>,
    placeholder: bool,
    policy: Policy,
}

/// Classifies the authority (host) of a URL.
///
/// # Example
///
/// ```rust
/// use url_classifier::{AuthorityClassifier, Classification, NullReceiver, UrlClassifier, UrlContext, UrlValue};
///
/// let classifier = AuthorityClassifier::builder()
///     .match_hosts(["*.example.com"])
///     .build();
///
/// let ctx = UrlContext::default();
/// let ok = UrlValue::parse(&ctx, "https://api.example.com/v1");
/// let bad = UrlValue::parse(&ctx, "http://0177.0.0.1/");
/// assert_eq!(classifier.classify(&ok, &mut NullReceiver), Classification::Match);
/// assert_eq!(classifier.classify(&bad, &mut NullReceiver), Classification::Invalid);
/// ```
#[derive(Debug, Clone)]
pub struct AuthorityClassifier {
    rules: Arc<AuthorityRules>,
}

impl AuthorityClassifier {
    pub fn builder() -> AuthorityClassifierBuilder {
        AuthorityClassifierBuilder::default()
    }
}

impl UrlClassifier for AuthorityClassifier {
    fn classify(&self, url: &UrlValue, receiver: &mut dyn DiagnosticReceiver) -> Classification {
        if !url.is_parsed() {
            return Classification::Invalid;
        }
        if has_non_canonical_ipv4(url) {
            tracing::trace!(url = %url.original_text(), "non-canonical IPv4 host");
            return Classification::Invalid;
        }

        let rules = &*self.rules;
        if url.inherits_placeholder_authority() {
            if rules.placeholder {
                return Classification::Match;
            }
            receiver.note(AuthorityDiagnostic::PlaceholderAuthority.into(), url);
            return Classification::NotAMatch;
        }

        let Some(host) = url.host() else {
            receiver.note(AuthorityDiagnostic::MissingAuthority.into(), url);
            return Classification::NotAMatch;
        };

        let ip = match host {
            Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
            Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
            Host::Domain(_) => None,
        };
        let host_text = normalize_host(url.host_str().unwrap_or_default());

        if let Some(ip) = ip {
            if rules.cidrs.iter().any(|net| net.contains(&ip)) {
                return Classification::Match;
            }
            if let Some(block) = blocked_address(ip, rules.policy) {
                tracing::debug!(url = url.url_text(), reason = %block, "blocked address");
                receiver.note(AuthorityDiagnostic::BlockedAddress.into(), url);
                return Classification::NotAMatch;
            }
        } else if let Some(entry) = blocked_hostname(&host_text) {
            tracing::debug!(url = url.url_text(), entry, "blocked hostname");
            receiver.note(AuthorityDiagnostic::BlockedHost.into(), url);
            return Classification::NotAMatch;
        }

        if rules
            .hosts
            .iter()
            .any(|pattern| matches_hostname_pattern(&host_text, pattern))
        {
            Classification::Match
        } else {
            receiver.note(AuthorityDiagnostic::DisallowedHost.into(), url);
            Classification::NotAMatch
        }
    }
}

/// Builder for [`AuthorityClassifier`].
///
/// With no rules, every URL with a real host is rejected as a disallowed
/// host.
#[derive(Debug, Clone, Default)]
pub struct AuthorityClassifierBuilder {
    hosts: BTreeSet<String>,
    cidrs: Vec<IpNet>,
    placeholder: bool,
    policy: Policy,
}

impl AuthorityClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hostnames or patterns to match, case-insensitively.
    ///
    /// `*.example.com` matches `example.com` and any subdomain of it.
    pub fn match_hosts<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.hosts
            .extend(patterns.into_iter().map(|p| normalize_host(p.as_ref())));
        self
    }

    /// Match IP-literal hosts inside `cidr`. A bare address is taken as a
    /// single-host range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCidr`] if `cidr` is neither a CIDR range nor
    /// an IP address.
    pub fn match_cidr(mut self, cidr: &str) -> Result<Self, Error> {
        let net = match cidr.parse::<IpNet>() {
            Ok(net) => net,
            Err(e) => match cidr.parse::<IpAddr>() {
                Ok(ip) => IpNet::from(ip),
                Err(_) => return Err(Error::invalid_cidr(cidr, e.to_string())),
            },
        };
        self.cidrs.push(net);
        Ok(self)
    }

    /// Whether an inherited placeholder authority matches. Off by default.
    pub fn match_placeholder(mut self, allow: bool) -> Self {
        self.placeholder = allow;
        self
    }

    /// Address policy for IP literals outside every configured CIDR.
    pub fn address_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(&self) -> AuthorityClassifier {
        tracing::trace!(
            hosts = self.hosts.len(),
            cidrs = self.cidrs.len(),
            placeholder = self.placeholder,
            "built authority classifier"
        );
        AuthorityClassifier {
            rules: Arc::new(AuthorityRules {
                hosts: self.hosts.clone(),
                cidrs: self.cidrs.clone(),
                placeholder: self.placeholder,
                policy: self.policy,
            }),
        }
    }
}

/// Lowercase and drop one trailing dot (FQDN notation).
fn normalize_host(host: &str) -> String {
    let mut normalized = host.to_lowercase();
    if normalized.ends_with('.') {
        normalized.pop();
    }
    normalized
}

/// Match a normalized hostname against a pattern (supports `*.` wildcard).
fn matches_hostname_pattern(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.strip_suffix(base).is_some_and(|p| p.ends_with('.')),
        None => host == pattern,
    }
}

/// Whether the URL resolved to an IPv4 host that its text spelled some other
/// way than dotted-quad decimal.
fn has_non_canonical_ipv4(url: &UrlValue) -> bool {
    let Some(Host::Ipv4(ip)) = url.host() else {
        return false;
    };
    match raw_host(url.original_text()) {
        Some(raw) => normalize_host(raw) != ip.to_string(),
        None => false,
    }
}

/// The host as written in `scheme://[userinfo@]host[:port]...`, if the text
/// contains an authority at all.
fn raw_host(text: &str) -> Option<&str> {
    let text = text.trim_start_matches(|c: char| c <= ' ');
    let after_scheme = match text.find(':') {
        Some(i)
            if text[..i].starts_with(|c: char| c.is_ascii_alphabetic())
                && text[..i]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            &text[i + 1..]
        }
        _ => text,
    };
    let after_slashes = after_scheme.trim_start_matches(|c: char| c == '/' || c == '\\');
    if after_scheme.len() - after_slashes.len() < 2 {
        return None;
    }

    let end = after_slashes
        .find(|c: char| matches!(c, '/' | '\\' | '?' | '#'))
        .unwrap_or(after_slashes.len());
    let authority = &after_slashes[..end];
    let host_port = authority
        .rfind('@')
        .map(|i| &authority[i + 1..])
        .unwrap_or(authority);

    if host_port.starts_with('[') {
        return None;
    }
    Some(
        host_port
            .rfind(':')
            .map(|i| &host_port[..i])
            .unwrap_or(host_port),
    )
}
