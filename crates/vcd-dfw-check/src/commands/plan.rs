//! `plan`: print the rule fixture without touching the group.

use vcd_dfw::resolver::resolve_all;
use vcd_dfw::{
    ApiVersion, Capabilities, FirewallGroupRef, ProfileCatalog, ReferencePool,
    RuleDefinitionBuilder, VersionNegotiation,
};
use vcd_dfw_config::Config;

use crate::cli::{GlobalOpts, PlanArgs};
use crate::error::CliError;
use crate::output;

use super::connect;

pub async fn handle(args: PlanArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (name, profile) = config.profile(global.profile.as_deref())?;
    let backend = connect(&name, profile, config, global).await?;

    let version = match args.api_version {
        Some(ref raw) => raw
            .parse::<ApiVersion>()
            .map_err(|e| CliError::Validation {
                field: "api-version".into(),
                reason: e.to_string(),
            })?,
        None => backend.negotiated_version(),
    };

    // The firewall groups only exist during `run`; stand in for them here.
    let pool = ReferencePool {
        firewall_groups: vec![
            FirewallGroupRef::new("<ip-set>", format!("{}ip-set", args.prefix)),
            FirewallGroupRef::new("<security-group>", format!("{}security-group", args.prefix)),
        ],
        application_port_profiles: resolve_all(&backend.list_application_port_profiles().await?),
        network_context_profiles: resolve_all(&backend.list_network_context_profiles().await?),
    };

    let rules = RuleDefinitionBuilder::new(pool, Capabilities::for_version(version))
        .name_prefix(args.prefix)
        .build(args.rules.unwrap_or(config.defaults.rule_count));

    output::print_output(&output::render_rules(&global.output, &rules), global.quiet);
    Ok(())
}
