//! Fatal session errors.
//!
//! When the server reports one of these the owning session is torn down and
//! then the application's [`FatalErrorHandler`] is told why. The history store
//! itself never raises them; the types live here so the session layer and the
//! UI agree on the vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why the session was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalErrorKind {
    /// The account has been disabled (e.g. for non-payment). Unrelated to the
    /// visitor's actions.
    AccountBlocked,

    /// Visitor authorization expired. Reauthorize and recreate the session.
    VisitorExpired,

    /// An operator banned the visitor.
    VisitorBanned,

    /// The visitor fields signature supplied by the application is invalid.
    InvalidSignature,

    Unknown,
}

impl FatalErrorKind {
    /// Error code as sent by the server.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::AccountBlocked => "account-blocked",
            Self::VisitorExpired => "provided-visitor-expired",
            Self::VisitorBanned => "visitor-banned",
            Self::InvalidSignature => "wrong-provided-visitor-hash",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FatalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Unrecognised server codes map to [`FatalErrorKind::Unknown`].
impl FromStr for FatalErrorKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "account-blocked" => Self::AccountBlocked,
            "provided-visitor-expired" => Self::VisitorExpired,
            "visitor-banned" => Self::VisitorBanned,
            "wrong-provided-visitor-hash" => Self::InvalidSignature,
            _ => Self::Unknown,
        })
    }
}

/// A fatal error together with the raw server string it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatalError {
    pub kind: FatalErrorKind,
    pub message: String,
}

impl FatalError {
    /// Classify a server error string.
    pub fn from_server(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = message.parse().unwrap_or(FatalErrorKind::Unknown);
        Self { kind, message }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal session error ({}): {}", self.kind, self.message)
    }
}

/// One-way notification that the session died.
///
/// Called after the session has already been destroyed.
pub trait FatalErrorHandler {
    fn on_error(&self, error: &FatalError);
}

impl<F> FatalErrorHandler for F
where
    F: Fn(&FatalError),
{
    fn on_error(&self, error: &FatalError) {
        self(error)
    }
}
