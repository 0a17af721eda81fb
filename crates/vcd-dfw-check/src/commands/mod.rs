//! Command handlers and the connection plumbing they share.

pub mod plan;
pub mod run;
pub mod show;

use std::time::Duration;

use tracing::debug;
use vcd_dfw::{ConnectionConfig, GroupId, TlsVerification, VcdBackend};
use vcd_dfw_config::{Config, Profile};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let config = load(global)?;
    match cmd {
        Command::Run(args) => run::handle(args, &config, global).await,
        Command::Plan(args) => plan::handle(args, &config, global).await,
        Command::Show => show::handle(&config, global).await,
    }
}

fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match global.config {
        Some(ref path) => vcd_dfw_config::load_config_from(path)?,
        None => vcd_dfw_config::load_config()?,
    };
    Ok(config)
}

/// Profile connection settings with CLI flag overrides applied.
fn connection_config(
    profile: &Profile,
    config: &Config,
    global: &GlobalOpts,
) -> Result<ConnectionConfig, CliError> {
    let mut conn = vcd_dfw_config::profile_to_connection_config(profile, &config.defaults)?;
    if global.insecure {
        conn.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        conn.timeout = Duration::from_secs(secs);
    }
    Ok(conn)
}

/// Authenticate as the principal a profile describes.
async fn connect(
    name: &str,
    profile: &Profile,
    config: &Config,
    global: &GlobalOpts,
) -> Result<VcdBackend, CliError> {
    let conn = connection_config(profile, config, global)?;
    let identity = vcd_dfw_config::resolve_identity(profile, name)?;
    debug!(profile = name, url = %conn.url, "connecting");
    Ok(VcdBackend::connect(&conn, &identity).await?)
}

/// `--group` wins over the profile's `vdc_group`.
fn target_group(global: &GlobalOpts, profile: &Profile, name: &str) -> Result<GroupId, CliError> {
    if let Some(ref group) = global.group {
        return Ok(GroupId::from(group.as_str()));
    }
    profile.group_id(name).map_err(|_| CliError::NoGroup {
        profile: name.to_owned(),
    })
}
