//! The three-valued verdict shared by every classifier.

use std::fmt;

/// The result of classifying a URL or one of its components.
///
/// `Invalid` means the input itself was malformed, for example a query
/// containing `%zz`. It is not a policy decision, and no rule is consulted
/// once it is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The input satisfies the policy.
    Match,
    /// The input is well formed but the policy rejects it.
    NotAMatch,
    /// The input is structurally malformed.
    Invalid,
}

impl Classification {
    /// Conjunction: `Invalid` dominates, then `NotAMatch`, then `Match`.
    ///
    /// ```rust
    /// use url_classifier::Classification::*;
    ///
    /// assert_eq!(Match.combine(Match), Match);
    /// assert_eq!(Match.combine(NotAMatch), NotAMatch);
    /// assert_eq!(NotAMatch.combine(Invalid), Invalid);
    /// ```
    pub fn combine(self, other: Classification) -> Classification {
        match (self, other) {
            (Classification::Invalid, _) | (_, Classification::Invalid) => Classification::Invalid,
            (Classification::NotAMatch, _) | (_, Classification::NotAMatch) => {
                Classification::NotAMatch
            }
            (Classification::Match, Classification::Match) => Classification::Match,
        }
    }

    /// Left-to-right disjunction.
    ///
    /// A `Match` on the left wins outright. Otherwise `Invalid` dominates
    /// `NotAMatch`, and a `Match` on the right wins over a `NotAMatch`.
    pub fn or(self, other: Classification) -> Classification {
        match (self, other) {
            (Classification::Match, _) => Classification::Match,
            (Classification::Invalid, _) => Classification::Invalid,
            (Classification::NotAMatch, other) => other,
        }
    }

    /// Swaps `Match` and `NotAMatch`. `Invalid` stays invalid.
    pub fn invert(self) -> Classification {
        match self {
            Classification::Match => Classification::NotAMatch,
            Classification::NotAMatch => Classification::Match,
            Classification::Invalid => Classification::Invalid,
        }
    }

    pub fn is_match(self) -> bool {
        self == Classification::Match
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Match => "MATCH",
            Classification::NotAMatch => "NOT_A_MATCH",
            Classification::Invalid => "INVALID",
        })
    }
}
