//! Address policy applied to IP-literal hosts.

use serde::Deserialize;

/// Which IP-literal hosts the authority classifier refuses outright.
///
/// Loopback, link-local, unspecified and cloud metadata addresses are
/// refused under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Also refuse private ranges (RFC 1918, fc00::/7).
    #[default]
    PublicOnly,
    /// Permit private ranges.
    AllowPrivate,
}
