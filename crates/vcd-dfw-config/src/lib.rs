//! Configuration for the vcd-dfw tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation into `vcd_dfw::ConnectionConfig` and `vcd_dfw::Identity`.
//! A profile describes one principal on one Cloud Director; the system
//! profile may name a delegated org-admin profile to run alongside it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vcd_dfw::{
    ApiVersion, ConnectionConfig, GroupId, Identity, IdentityCredentials, PrincipalKind,
    TlsVerification,
};

/// Keyring service name; entries are `<profile>/password` and `<profile>/token`.
pub const KEYRING_SERVICE: &str = "vcd-dfw";

const SYSTEM_ORG: &str = "System";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::ProfileNotFound { name })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Rules generated by `run` and `plan`.
    #[serde(default = "default_rule_count")]
    pub rule_count: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            rule_count: default_rule_count(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_rule_count() -> usize {
    40
}

/// A named Cloud Director profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server root URL (e.g., "https://vcd.example.com").
    pub url: String,

    /// Organization to log in to; `System` means a provider session.
    #[serde(default = "default_org")]
    pub org: String,

    /// Pre-issued bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Highest API version to negotiate (e.g. "36.2").
    pub api_version: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Delay between task polls, in milliseconds.
    pub task_poll_interval_ms: Option<u64>,

    pub task_max_polls: Option<u32>,

    /// VDC group the DFW commands operate on.
    pub vdc_group: Option<String>,

    /// Profile of the delegated org admin that `run` exercises after this one.
    pub delegate_profile: Option<String>,
}

fn default_org() -> String {
    SYSTEM_ORG.into()
}

impl Profile {
    pub fn principal_kind(&self) -> PrincipalKind {
        if self.org.eq_ignore_ascii_case(SYSTEM_ORG) {
            PrincipalKind::System
        } else {
            PrincipalKind::OrgAdmin {
                org: self.org.clone(),
            }
        }
    }

    pub fn group_id(&self, profile_name: &str) -> Result<GroupId, ConfigError> {
        self.vdc_group
            .as_deref()
            .map(GroupId::from)
            .ok_or_else(|| ConfigError::Validation {
                field: "vdc_group".into(),
                reason: format!("profile '{profile_name}' names no VDC group"),
            })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "vcd-dfw", "vcd-dfw").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vcd-dfw");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest on `__`, e.g. `VCD_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VCD_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Env var named by the profile, then keyring, then plaintext.
fn resolve_secret(
    env_name: Option<&str>,
    keyring_key: &str,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    // 1. Env var
    if let Some(name) = env_name {
        if let Ok(val) = std::env::var(name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, keyring_key) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    plaintext.map(|s| SecretString::from(s.to_owned()))
}

/// Resolve the credentials of a profile: a bearer token if one is
/// configured anywhere in the chain, else username + password.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<IdentityCredentials, ConfigError> {
    if let Some(token) = resolve_secret(
        profile.token_env.as_deref(),
        &format!("{profile_name}/token"),
        profile.token.as_deref(),
    ) {
        return Ok(IdentityCredentials::Token(token));
    }

    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };
    let username = profile.username.clone().ok_or_else(no_credentials)?;
    let password = resolve_secret(
        profile.password_env.as_deref(),
        &format!("{profile_name}/password"),
        profile.password.as_deref(),
    )
    .ok_or_else(no_credentials)?;

    Ok(IdentityCredentials::Password { username, password })
}

pub fn resolve_identity(profile: &Profile, profile_name: &str) -> Result<Identity, ConfigError> {
    Ok(Identity {
        label: profile_name.to_owned(),
        kind: profile.principal_kind(),
        credentials: resolve_credentials(profile, profile_name)?,
    })
}

/// Build a `ConnectionConfig` from a profile and the global defaults.
pub fn profile_to_connection_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConnectionConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let api_version_ceiling = profile
        .api_version
        .as_deref()
        .map(|raw| {
            raw.parse::<ApiVersion>()
                .map_err(|e| ConfigError::Validation {
                    field: "api_version".into(),
                    reason: e.to_string(),
                })
        })
        .transpose()?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ConnectionConfig::new(url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(ms) = profile.task_poll_interval_ms {
        config.task_poll_interval = Duration::from_millis(ms);
    }
    if let Some(polls) = profile.task_max_polls {
        config.task_max_polls = polls;
    }
    config.api_version_ceiling = api_version_ceiling;
    Ok(config)
}
