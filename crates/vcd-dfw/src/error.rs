// ── Core error types ──
//
// The protocol taxonomy callers see: not-found, validation, permission and
// opaque transport failures. The `From<vcd_api::Error>` impl translates
// HTTP-layer errors into these variants; nothing here is retried.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The group, a referenced entity, or a profile is absent.
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Exclusivity or capability violation, malformed enum value, or a
    /// request body the authority rejected.
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// The calling principal lacks rights on the group.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Opaque network or authority failure.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vcd_api::Error> for CoreError {
    fn from(err: vcd_api::Error) -> Self {
        if err.is_permission() {
            return CoreError::PermissionDenied {
                message: err.to_string(),
            };
        }
        if err.is_not_found() {
            let identifier = match &err {
                vcd_api::Error::OpenApi { message, .. } => message.clone(),
                other => other.to_string(),
            };
            return CoreError::not_found("resource", identifier);
        }
        if err.is_validation() {
            return CoreError::validation(match err {
                vcd_api::Error::OpenApi { message, .. } => message,
                other => other.to_string(),
            });
        }

        match err {
            vcd_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vcd_api::Error::MalformedVersion(v) => CoreError::Config {
                message: format!("Malformed API version: {v}"),
            },
            vcd_api::Error::OpenApi {
                message, status, ..
            } => CoreError::Transport {
                message,
                status: Some(status),
            },
            vcd_api::Error::Transport(e) => CoreError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            other => CoreError::Transport {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
