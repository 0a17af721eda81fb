use thiserror::Error;

/// Top-level error type for the `vcd-api` crate.
///
/// Covers every failure mode of the OpenAPI surface: authentication,
/// transport, structured API errors, asynchronous tasks and version
/// negotiation. `vcd-dfw` maps these into its protocol taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed or the bearer token was rejected (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The principal is authenticated but lacks rights (HTTP 403).
    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A header the protocol requires was absent from the response.
    #[error("Response is missing the {0} header")]
    MissingHeader(&'static str),

    // ── OpenAPI ─────────────────────────────────────────────────────
    /// Structured error from the OpenAPI (`{minorErrorCode, message}`).
    #[error("OpenAPI error (HTTP {status}): {message}")]
    OpenApi {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Tasks ───────────────────────────────────────────────────────
    /// An asynchronous task finished in a non-success state.
    #[error("Task {task} finished with status '{status}': {message}")]
    Task {
        task: String,
        status: String,
        message: String,
    },

    /// An asynchronous task did not settle within the polling budget.
    #[error("Task {task} still running after {attempts} polls")]
    TaskTimeout { task: String, attempts: u32 },

    // ── Versions ────────────────────────────────────────────────────
    /// The server offers no usable version at or below the ceiling.
    #[error("No supported API version at or below {ceiling}")]
    NoCompatibleVersion { ceiling: String },

    /// A version string did not parse as `major.minor`.
    #[error("Malformed API version: {0}")]
    MalformedVersion(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the principal was rejected or lacks rights.
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Forbidden { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::OpenApi { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the server rejected the request body.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::OpenApi { status: 400 | 422, .. })
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::OpenApi { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        let not_found = Error::OpenApi {
            message: "missing".into(),
            code: None,
            status: 404,
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_validation());

        let invalid = Error::OpenApi {
            message: "bad".into(),
            code: Some("BAD_REQUEST".into()),
            status: 400,
        };
        assert!(invalid.is_validation());
        assert_eq!(invalid.api_error_code(), Some("BAD_REQUEST"));

        assert!(
            Error::Forbidden {
                message: "nope".into()
            }
            .is_permission()
        );
    }
}
