//! Categorized agent failures
//!
//! Every failure of an answering agent reaches the presenter as an
//! [`AgentFault`], so a failed turn is rendered and the session continues.

use crate::error::TabletalkError;
use std::fmt;

/// Cause of a failed answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFaultKind {
    /// Provider rejected the credential
    Authentication,
    /// Provider throttled the request
    RateLimited,
    /// A query could not be executed against the store
    QueryExecution,
    /// Tool loop ran out of iterations
    IterationLimit,
    /// Time budget exhausted
    Timeout,
    /// No credential configured
    MissingCredential,
    /// Any other provider or transport failure
    Provider,
    /// Anything else
    Other,
}

impl fmt::Display for AgentFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authentication => "authentication failed",
            Self::RateLimited => "rate limited",
            Self::QueryExecution => "query failed",
            Self::IterationLimit => "iteration limit reached",
            Self::Timeout => "timed out",
            Self::MissingCredential => "missing API key",
            Self::Provider => "provider error",
            Self::Other => "error",
        };
        f.write_str(label)
    }
}

/// A failed answer with its categorized cause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFault {
    /// Category of the failure
    pub kind: AgentFaultKind,
    /// Human-readable detail
    pub message: String,
}

impl AgentFault {
    /// Create a fault
    pub fn new(kind: AgentFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Categorize an error raised while answering
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::agent::{AgentFault, AgentFaultKind};
    /// use tabletalk::error::TabletalkError;
    ///
    /// let err: anyhow::Error = TabletalkError::RateLimited("slow down".to_string()).into();
    /// assert_eq!(AgentFault::from_error(&err).kind, AgentFaultKind::RateLimited);
    /// ```
    pub fn from_error(err: &anyhow::Error) -> Self {
        let kind = match err.downcast_ref::<TabletalkError>() {
            Some(TabletalkError::Authentication(_)) => AgentFaultKind::Authentication,
            Some(TabletalkError::RateLimited(_)) => AgentFaultKind::RateLimited,
            Some(TabletalkError::Query(_)) | Some(TabletalkError::Sqlite(_)) => {
                AgentFaultKind::QueryExecution
            }
            Some(TabletalkError::MaxIterationsExceeded { .. }) => AgentFaultKind::IterationLimit,
            Some(TabletalkError::Timeout(_)) => AgentFaultKind::Timeout,
            Some(TabletalkError::MissingCredentials(_)) => AgentFaultKind::MissingCredential,
            Some(TabletalkError::Provider(_)) => AgentFaultKind::Provider,
            _ => AgentFaultKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for AgentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AgentFault {}
