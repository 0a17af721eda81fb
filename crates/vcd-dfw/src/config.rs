// ── Runtime connection configuration ──
//
// These types describe how to reach Cloud Director and who to act as. They
// carry credential data and connection tuning but never touch disk: the
// config crate or the caller builds them and hands them to `VcdBackend`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;
use vcd_api::{ApiVersion, Credentials, SessionScope, TlsMode, TransportConfig};

/// Organization name of provider-level (system) principals.
pub const SYSTEM_ORG: &str = "System";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed lab installations).
    DangerAcceptInvalid,
}

/// Which kind of principal an identity authenticates as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalKind {
    /// Provider administrator in the `System` organization.
    System,
    /// Organization administrator with rights delegated on the group.
    OrgAdmin { org: String },
}

#[derive(Debug, Clone)]
pub enum IdentityCredentials {
    /// Pre-issued bearer token.
    Token(SecretString),
    Password {
        username: String,
        password: SecretString,
    },
}

/// One principal the workflow can act as.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Human-readable label used in logs and reports.
    pub label: String,
    pub kind: PrincipalKind,
    pub credentials: IdentityCredentials,
}

impl Identity {
    pub fn session_scope(&self) -> SessionScope {
        match self.kind {
            PrincipalKind::System => SessionScope::Provider,
            PrincipalKind::OrgAdmin { .. } => SessionScope::Tenant,
        }
    }

    pub fn org(&self) -> &str {
        match &self.kind {
            PrincipalKind::System => SYSTEM_ORG,
            PrincipalKind::OrgAdmin { org } => org,
        }
    }

    pub fn to_api_credentials(&self) -> Credentials {
        match &self.credentials {
            IdentityCredentials::Token(token) => Credentials::Token {
                token: token.clone(),
            },
            IdentityCredentials::Password { username, password } => Credentials::Password {
                username: username.clone(),
                org: self.org().to_owned(),
                password: password.clone(),
            },
        }
    }
}

/// Where Cloud Director lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server root, e.g. `https://vcd.example.com`.
    pub url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub task_poll_interval: Duration,
    pub task_max_polls: u32,
    /// Highest API version to negotiate; `None` takes the newest offered.
    pub api_version_ceiling: Option<ApiVersion>,
}

impl ConnectionConfig {
    pub fn new(url: Url) -> Self {
        let transport = TransportConfig::default();
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: transport.timeout,
            task_poll_interval: transport.task_poll_interval,
            task_max_polls: transport.task_max_polls,
            api_version_ceiling: None,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            task_poll_interval: self.task_poll_interval,
            task_max_polls: self.task_max_polls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_identity(kind: PrincipalKind) -> Identity {
        Identity {
            label: "test".into(),
            kind,
            credentials: IdentityCredentials::Password {
                username: "admin".into(),
                password: SecretString::from("pw".to_owned()),
            },
        }
    }

    #[test]
    fn system_identity_logs_in_to_provider_session() {
        let id = password_identity(PrincipalKind::System);
        assert_eq!(id.session_scope(), SessionScope::Provider);
        assert_eq!(
            id.to_api_credentials().login_name().as_deref(),
            Some("admin@System")
        );
    }

    #[test]
    fn org_admin_logs_in_to_tenant_session() {
        let id = password_identity(PrincipalKind::OrgAdmin { org: "acme".into() });
        assert_eq!(id.session_scope(), SessionScope::Tenant);
        assert_eq!(
            id.to_api_credentials().login_name().as_deref(),
            Some("admin@acme")
        );
    }
}
