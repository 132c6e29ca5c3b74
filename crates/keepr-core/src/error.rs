// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Keepr gating engine.

use std::time::Duration;

use strum::{Display, EnumString};
use thiserror::Error;

/// Structured failure kind reported by messaging-network adapters.
///
/// The action executor classifies failures into retry / terminal /
/// needs-user-setup buckets from this kind alone, so adapters must map
/// their SDK's errors here instead of leaking version-specific shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessagingErrorKind {
    /// The wallet has no registered messaging identity yet.
    IdentityNotRegistered,
    /// The target conversation does not exist (or is not yet visible).
    ConversationNotFound,
    /// The network asked us to slow down.
    RateLimited,
    /// The call did not complete within its deadline.
    Timeout,
    /// Transport or protocol failure (connect errors, 5xx, malformed frames).
    Transport,
    /// The request itself was rejected as malformed.
    InvalidRequest,
    /// The bot lacks the admin rights required for the mutation.
    PermissionDenied,
    /// Anything the adapter could not classify further.
    Other,
}

/// The primary error type used across all Keepr crates.
#[derive(Debug, Error)]
pub enum KeeprError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Blockchain read errors (RPC transport failure, malformed response).
    #[error("chain read error: {message}")]
    Chain {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging-network errors, tagged with a classification kind.
    #[error("messaging error ({kind}): {message}")]
    Messaging {
        kind: MessagingErrorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeeprError {
    /// Shortcut for a messaging error without an underlying source.
    pub fn messaging(kind: MessagingErrorKind, message: impl Into<String>) -> Self {
        KeeprError::Messaging {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Returns the messaging classification kind, if this is a messaging error.
    pub fn messaging_kind(&self) -> Option<MessagingErrorKind> {
        match self {
            KeeprError::Messaging { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messaging_kind_round_trips_snake_case() {
        use std::str::FromStr;

        let kinds = [
            MessagingErrorKind::IdentityNotRegistered,
            MessagingErrorKind::ConversationNotFound,
            MessagingErrorKind::RateLimited,
            MessagingErrorKind::Timeout,
            MessagingErrorKind::Transport,
            MessagingErrorKind::InvalidRequest,
            MessagingErrorKind::PermissionDenied,
            MessagingErrorKind::Other,
        ];
        for kind in kinds {
            let s = kind.to_string();
            assert_eq!(s, s.to_lowercase(), "kind must serialize snake_case: {s}");
            assert_eq!(MessagingErrorKind::from_str(&s).unwrap(), kind);
        }
    }

    #[test]
    fn messaging_kind_accessor() {
        let err = KeeprError::messaging(MessagingErrorKind::RateLimited, "slow down");
        assert_eq!(err.messaging_kind(), Some(MessagingErrorKind::RateLimited));

        let err = KeeprError::Internal("boom".into());
        assert_eq!(err.messaging_kind(), None);
    }

    #[test]
    fn error_display_includes_kind() {
        let err = KeeprError::messaging(
            MessagingErrorKind::ConversationNotFound,
            "group g1 not found",
        );
        let rendered = err.to_string();
        assert!(rendered.contains("conversation_not_found"), "{rendered}");
        assert!(rendered.contains("group g1 not found"), "{rendered}");
    }
}
