//! Authorizer result codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw `SQLITE_OK`.
pub const RAW_ALLOW: i32 = 0;
/// Raw `SQLITE_DENY`.
pub const RAW_DENY: i32 = 1;
/// Raw `SQLITE_IGNORE`.
pub const RAW_IGNORE: i32 = 2;

/// Outcome of one authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Compilation proceeds normally.
    Allow,
    /// Compilation fails with an authorization error.
    Deny,
    /// The action is suppressed; a column read yields NULL.
    Ignore,
}

/// A raw result outside the three recognized codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authorizer returned unrecognized result code {0}")]
pub struct ProtocolViolation(pub i32);

impl Decision {
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Allow => RAW_ALLOW,
            Self::Deny => RAW_DENY,
            Self::Ignore => RAW_IGNORE,
        }
    }

    pub fn from_raw(code: i32) -> Result<Self, ProtocolViolation> {
        match code {
            RAW_ALLOW => Ok(Self::Allow),
            RAW_DENY => Ok(Self::Deny),
            RAW_IGNORE => Ok(Self::Ignore),
            other => Err(ProtocolViolation(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a decision name other than allow, deny or ignore.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown decision '{0}' (expected allow, deny or ignore)")]
pub struct UnknownDecision(pub String);

impl FromStr for Decision {
    type Err = UnknownDecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            "ignore" => Ok(Self::Ignore),
            _ => Err(UnknownDecision(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes_match_sqlite() {
        assert_eq!(Decision::Allow.as_raw(), rusqlite::ffi::SQLITE_OK);
        assert_eq!(Decision::Deny.as_raw(), rusqlite::ffi::SQLITE_DENY);
        assert_eq!(Decision::Ignore.as_raw(), rusqlite::ffi::SQLITE_IGNORE);
    }

    #[test]
    fn test_from_raw_flags_protocol_violation() {
        assert_eq!(Decision::from_raw(2), Ok(Decision::Ignore));
        assert_eq!(Decision::from_raw(3), Err(ProtocolViolation(3)));
        assert_eq!(Decision::from_raw(-1), Err(ProtocolViolation(-1)));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("DENY".parse::<Decision>(), Ok(Decision::Deny));
        assert_eq!(" Ignore ".parse::<Decision>(), Ok(Decision::Ignore));
    }

    #[test]
    fn test_parse_unknown_is_typed_error() {
        let err = "block".parse::<Decision>().unwrap_err();
        assert_eq!(err, UnknownDecision("block".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown decision 'block' (expected allow, deny or ignore)"
        );
    }
}
