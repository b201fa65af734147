//! Provider credential handling
//!
//! The credential is an opaque secret supplied by the user. It is kept out of
//! `Debug` output and log lines.

use std::fmt;

/// API key for the language model provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret, returning `None` for blank input
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::credential::Credential;
    ///
    /// assert!(Credential::new("sk-test").is_some());
    /// assert!(Credential::new("   ").is_none());
    /// ```
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into().trim().to_string();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    /// The raw secret, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(****)")
    }
}
