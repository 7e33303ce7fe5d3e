//! Strict percent decoding.
//!
//! `percent_encoding::percent_decode_str` passes malformed escapes such as
//! `%zz` through unchanged. Classifiers must fail closed on those, so every
//! `%` is checked before decoding.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode `text`, returning `None` if it contains a `%` that is not followed
/// by two hex digits, or if the decoded octets are not valid UTF-8.
///
/// With `plus_is_literal` set, `+` is kept as is. Otherwise it decodes to a
/// space, as in `application/x-www-form-urlencoded`.
///
/// ```rust
/// use url_classifier::percent::decode;
///
/// assert_eq!(decode("a%20b+c", true).as_deref(), Some("a b+c"));
/// assert_eq!(decode("a%20b+c", false).as_deref(), Some("a b c"));
/// assert_eq!(decode("%zz", true), None);
/// ```
pub fn decode(text: &str, plus_is_literal: bool) -> Option<Cow<'_, str>> {
    if !has_well_formed_escapes(text) {
        return None;
    }

    if !plus_is_literal && text.contains('+') {
        let spaced = text.replace('+', " ");
        let decoded = percent_decode_str(&spaced).decode_utf8().ok()?;
        return Some(Cow::Owned(decoded.into_owned()));
    }

    percent_decode_str(text).decode_utf8().ok()
}

fn has_well_formed_escapes(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}
