//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vcd_dfw::CoreError;
use vcd_dfw_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    /// The workflow ran but the group did not end up as submitted.
    pub const VERIFICATION: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Request to Cloud Director failed: {message}")]
    #[diagnostic(
        code(vcd_dfw::transport),
        help(
            "Check that the server is reachable and the URL is correct.\n\
             Self-signed certificates need --insecure (-k) or ca_cert in the profile."
        )
    )]
    Transport { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(vcd_dfw::no_credentials),
        help(
            "Set token_env or password_env in the profile, or store a secret in the\n\
             keyring under service 'vcd-dfw' as '{profile}/password'."
        )
    )]
    NoCredentials { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(vcd_dfw::permission_denied),
        help("The principal needs rights to manage the VDC group's distributed firewall.")
    )]
    PermissionDenied { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(vcd_dfw::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vcd_dfw::validation))]
    Validation { field: String, reason: String },

    #[error("No VDC group selected")]
    #[diagnostic(
        code(vcd_dfw::no_group),
        help("Pass --group <urn> or set vdc_group in profile '{profile}'.")
    )]
    NoGroup { profile: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vcd_dfw::profile_not_found),
        help("Expected a [profiles.{name}] table in {path}")
    )]
    ProfileNotFound { name: String, path: String },

    #[error(transparent)]
    #[diagnostic(code(vcd_dfw::config))]
    Config(ConfigError),

    // ── Workflow ─────────────────────────────────────────────────────

    #[error("{failed} of {total} principal run(s) did not finish clean")]
    #[diagnostic(
        code(vcd_dfw::verification_failed),
        help("Re-run with -v to log each discrepancy and cleanup failure.")
    )]
    Unclean { failed: usize, total: usize },

    #[error("{count} scratch resource(s) could not be deleted")]
    #[diagnostic(
        code(vcd_dfw::scratch_leak),
        help("Delete the listed VDC group and user by hand before the next run.")
    )]
    ScratchLeak { count: usize },

    #[error("Internal error: {0}")]
    #[diagnostic(code(vcd_dfw::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Transport { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoGroup { .. } | Self::ProfileNotFound { .. } => {
                exit_code::USAGE
            }
            Self::Unclean { .. } | Self::ScratchLeak { .. } => exit_code::VERIFICATION,
            Self::Config(_) | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "rules".into(),
                reason: message,
            },
            CoreError::PermissionDenied { message } => CliError::PermissionDenied { message },
            CoreError::Transport { message, .. } => CliError::Transport { message },
            CoreError::Config { message } => CliError::Validation {
                field: "connection".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                path: vcd_dfw_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other @ ConfigError::Figment(_) => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_get_distinct_exit_codes() {
        let cases = [
            (
                CoreError::PermissionDenied {
                    message: "no".into(),
                },
                exit_code::PERMISSION,
            ),
            (
                CoreError::NotFound {
                    entity_type: "VDC group".into(),
                    identifier: "x".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ValidationFailed {
                    message: "bad".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Transport {
                    message: "down".into(),
                    status: None,
                },
                exit_code::CONNECTION,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(CliError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn unclean_run_is_verification_failure() {
        let err = CliError::Unclean {
            failed: 1,
            total: 2,
        };
        assert_eq!(err.exit_code(), exit_code::VERIFICATION);
        assert_eq!(err.to_string(), "1 of 2 principal run(s) did not finish clean");
    }
}
