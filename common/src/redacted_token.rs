//! Credential tokens with redacted Debug output.

use crate::RedactError;

use std::fmt;

use serde::ser::Error;
use zeroize::Zeroize;

/// An access or refresh token that never exposes its value in logs.
///
/// The only way to read the value is [`RedactedToken::expose`], which call
/// sites use when building the wire payload for the webview.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Reveal the token for transmission.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Token length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken([REDACTED; {} chars])", self.inner.len())
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl serde::Serialize for RedactedToken {
    #[track_caller]
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::serialization(
            "RedactedToken cannot be serialized - use expose() explicitly",
        )))
    }
}
