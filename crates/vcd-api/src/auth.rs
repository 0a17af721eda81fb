use secrecy::SecretString;

/// Which session endpoint a principal logs in through.
///
/// System administrators authenticate against the provider endpoint;
/// organization users (including delegated org admins) use the tenant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// `System` organization, provider session.
    Provider,
    /// Any tenant organization.
    Tenant,
}

impl SessionScope {
    /// Login path relative to the server root.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Provider => "cloudapi/1.0.0/sessions/provider",
            Self::Tenant => "cloudapi/1.0.0/sessions",
        }
    }
}

/// Credentials for authenticating with Cloud Director.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued bearer (access) token.
    Token { token: SecretString },

    /// Basic-auth login as `username@org`; the access token is read from
    /// the `X-VMWARE-VCLOUD-ACCESS-TOKEN` response header.
    Password {
        username: String,
        org: String,
        password: SecretString,
    },
}

impl Credentials {
    /// The login name sent during basic auth, if any.
    pub fn login_name(&self) -> Option<String> {
        match self {
            Self::Token { .. } => None,
            Self::Password { username, org, .. } => Some(format!("{username}@{org}")),
        }
    }
}

/// Header carrying the access token after a successful session login.
pub const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";
