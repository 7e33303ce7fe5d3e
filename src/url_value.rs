//! URL decomposition and relative resolution.
//!
//! A [`UrlValue`] is what every classifier receives. It is produced by
//! resolving some text against a [`UrlContext`] and never changes after
//! that.

use std::sync::OnceLock;

use url::Url;

use crate::Error;

/// Root of the placeholder authority.
///
/// The trailing dot makes the host fully qualified, and `example.org` is
/// reserved, so the placeholder can never be mistaken for a real host.
pub const PLACEHOLDER_ROOT: &str = "http://example.org./";

fn placeholder_root() -> &'static Url {
    static ROOT: OnceLock<Url> = OnceLock::new();
    ROOT.get_or_init(|| Url::parse(PLACEHOLDER_ROOT).expect("placeholder root is a valid URL"))
}

/// The base against which URL text is resolved.
#[derive(Debug, Clone)]
pub struct UrlContext {
    base: Url,
    placeholder: bool,
}

impl UrlContext {
    /// The placeholder context. Relative text resolved against it inherits
    /// the placeholder authority.
    pub fn placeholder() -> Self {
        Self {
            base: placeholder_root().clone(),
            placeholder: true,
        }
    }

    /// A context rooted at a real absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContext`] if `base` is not an absolute,
    /// hierarchical URL.
    pub fn new(base: &str) -> Result<Self, Error> {
        let url = Url::parse(base).map_err(|e| Error::invalid_context(base, e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_context(
                base,
                "base URL must be hierarchical",
            ));
        }
        Ok(Self {
            base: url,
            placeholder: false,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

impl Default for UrlContext {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// A URL resolved against a context, ready for classification.
///
/// Resolution follows the WHATWG URL standard via the `url` crate, so dot
/// segments are removed and the path is normalized. Query and fragment text
/// are kept in their raw, percent-encoded form.
#[derive(Debug, Clone)]
pub struct UrlValue {
    original: String,
    url: Option<Url>,
    inherits_placeholder_authority: bool,
}

impl UrlValue {
    /// Resolve `text` against `context`.
    ///
    /// This never fails. Text that cannot be resolved produces a value for
    /// which [`is_parsed`](Self::is_parsed) is false, and which every
    /// classifier in this crate treats as invalid.
    pub fn parse(context: &UrlContext, text: &str) -> Self {
        let url = match context.base.join(text) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::trace!(url = text, error = %e, "unparseable url");
                None
            }
        };

        let inherits_placeholder_authority = context.placeholder
            && !specifies_authority(text)
            && url.as_ref().is_some_and(|url| same_authority(url, &context.base));

        Self {
            original: text.to_string(),
            url,
            inherits_placeholder_authority,
        }
    }

    /// Resolve `reference` as a URL of its own, for instance the text of a
    /// fragment after its `#`.
    ///
    /// When this value has an authority of its own, the reference is
    /// resolved against `scheme://authority/`. Otherwise it is resolved
    /// against the placeholder root, and unless it names its own authority
    /// the result inherits the placeholder authority.
    pub fn resolve_fragment_reference(&self, reference: &str) -> UrlValue {
        let context = match &self.url {
            Some(url) if url.has_host() && !self.inherits_placeholder_authority => {
                let mut root = url.clone();
                root.set_path("/");
                root.set_query(None);
                root.set_fragment(None);
                // Userinfo is not part of the authority a reference inherits.
                let _ = root.set_username("");
                let _ = root.set_password(None);
                UrlContext {
                    base: root,
                    placeholder: false,
                }
            }
            _ => UrlContext::placeholder(),
        };
        UrlValue::parse(&context, reference)
    }

    /// The text this value was resolved from.
    pub fn original_text(&self) -> &str {
        &self.original
    }

    /// The resolved URL text, or the original text if resolution failed.
    pub fn url_text(&self) -> &str {
        match &self.url {
            Some(url) => url.as_str(),
            None => &self.original,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.url.is_some()
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// True when the authority was not written in the text but inherited
    /// from the placeholder context.
    pub fn inherits_placeholder_authority(&self) -> bool {
        self.inherits_placeholder_authority
    }

    pub fn scheme(&self) -> Option<&str> {
        self.url.as_ref().map(Url::scheme)
    }

    pub fn host_str(&self) -> Option<&str> {
        self.url.as_ref().and_then(Url::host_str)
    }

    pub fn host(&self) -> Option<url::Host<&str>> {
        self.url.as_ref().and_then(Url::host)
    }

    /// The port, defaulting to the scheme's well-known port.
    pub fn port(&self) -> Option<u16> {
        self.url.as_ref().and_then(Url::port_or_known_default)
    }

    /// `host[:port]`, with the port only when it was given explicitly.
    pub fn authority(&self) -> Option<String> {
        let url = self.url.as_ref()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    pub fn raw_path(&self) -> Option<&str> {
        self.url.as_ref().map(Url::path)
    }

    /// The query without its leading `?`, or `None` if there is no `?`.
    ///
    /// This is the query of the resolved URL, so it may be inherited from
    /// the context, and characters such as spaces are percent-encoded.
    /// Existing escapes are left alone, so decoding gives back the text as
    /// written.
    pub fn raw_query(&self) -> Option<&str> {
        self.url.as_ref().and_then(Url::query)
    }

    /// The fragment including its leading `#`, exactly as written, or
    /// `None` if there is no `#`.
    ///
    /// `"#"` (an empty fragment) and `None` are distinct.
    pub fn raw_fragment(&self) -> Option<&str> {
        self.url.as_ref()?.fragment()?;
        // Resolution never carries the base's fragment over, so a fragment
        // always starts at the first `#` of the text.
        let text = self.original.trim_matches(|c: char| c <= ' ');
        text.find('#').map(|i| &text[i..])
    }
}

fn same_authority(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host() == b.host() && a.port() == b.port()
}

/// Whether the text, after an optional scheme, starts with `//`.
///
/// Backslashes count as slashes since the `url` crate treats them that way
/// for special schemes.
fn specifies_authority(text: &str) -> bool {
    let text = text.trim_start_matches(|c: char| c <= ' ');
    let rest = match scheme_len(text) {
        Some(n) => &text[n + 1..],
        None => text,
    };
    let mut chars = rest.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('/' | '\\'), Some('/' | '\\'))
    )
}

/// Length of a leading `scheme` in `scheme:...`, if any.
fn scheme_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    for (i, c) in chars {
        match c {
            ':' => return Some(i),
            c if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') => {}
            _ => return None,
        }
    }
    None
}
