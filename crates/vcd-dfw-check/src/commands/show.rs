//! `show`: activation state and current rule list of the group.

use vcd_dfw::DfwController;
use vcd_dfw_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{connect, target_group};

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let (name, profile) = config.profile(global.profile.as_deref())?;
    let group = target_group(global, profile, &name)?;
    let backend = connect(&name, profile, config, global).await?;

    let controller = DfwController::new(&backend);
    let state = controller.activation_state(&group).await?;
    let rules = controller.get_rule_set(&group).await?;

    output::print_output(
        &output::render_group(&global.output, group.as_str(), state, rules.rules()),
        global.quiet,
    );
    Ok(())
}
