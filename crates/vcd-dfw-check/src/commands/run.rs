//! `run`: the full workflow for the system principal and its delegate,
//! against the configured group or a scratch group provisioned for the run.

use secrecy::SecretString;
use tracing::{info, warn};
use uuid::Uuid;
use vcd_dfw::authority::ORG_ADMIN_ROLE;
use vcd_dfw::{
    CleanupFailure, DelegatedIdentitySpec, EntityId, ParticipatingVdc, Principal, ScratchEnvironment,
    VcdBackend, VdcGroupSpec, WorkflowError, WorkflowOptions, WorkflowReport,
    run_for_each_principal,
};
use vcd_dfw_config::Config;

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::{connect, connection_config, target_group};

pub async fn handle(args: RunArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    if args.scratch_group.is_some() && global.group.is_some() {
        return Err(CliError::Validation {
            field: "scratch-group".into(),
            reason: "cannot be combined with --group".into(),
        });
    }

    let (name, profile) = config.profile(global.profile.as_deref())?;
    let system = connect(&name, profile, config, global).await?;

    let options = WorkflowOptions {
        rule_count: args.rules.unwrap_or(config.defaults.rule_count),
        name_prefix: args.prefix.clone(),
        ..WorkflowOptions::default()
    };

    let Some(scratch_spec) = scratch_group_spec(&args)? else {
        let group = target_group(global, profile, &name)?;
        let mut principals = vec![Principal {
            label: name.clone(),
            authority: system,
        }];
        let delegate = if args.system_only {
            None
        } else {
            args.delegate.or_else(|| profile.delegate_profile.clone())
        };
        if let Some(ref delegate) = delegate {
            let (delegate_name, delegate_profile) = config.profile(Some(delegate.as_str()))?;
            principals.push(Principal {
                authority: connect(&delegate_name, delegate_profile, config, global).await?,
                label: delegate_name,
            });
        }
        info!(%group, principals = principals.len(), rules = options.rule_count, "starting rule-sync run");
        let results = run_for_each_principal(&principals, &group, &options).await;
        return report(&results, global, &[]);
    };

    let delegate_spec = delegated_identity_spec(&args);
    let mut principals = vec![Principal {
        label: name.clone(),
        authority: system,
    }];
    let scratch = ScratchEnvironment::provision(
        &principals[0].authority,
        &scratch_spec,
        delegate_spec.as_ref(),
    )
    .await?;
    let group = scratch.group().clone();

    if let Some(identity) = scratch.delegate() {
        let connected = match connection_config(profile, config, global) {
            Ok(conn) => VcdBackend::connect(&conn, identity)
                .await
                .map_err(CliError::from),
            Err(e) => Err(e),
        };
        match connected {
            Ok(authority) => principals.push(Principal {
                label: identity.label.clone(),
                authority,
            }),
            Err(e) => {
                release_scratch(scratch, &principals[0].authority).await;
                return Err(e);
            }
        }
    }

    info!(%group, principals = principals.len(), rules = options.rule_count, "starting rule-sync run on scratch group");
    let results = run_for_each_principal(&principals, &group, &options).await;
    let cleanup = release_scratch(scratch, &principals[0].authority).await;
    report(&results, global, &cleanup)
}

/// The scratch group is deleted on every path once it exists.
async fn release_scratch(scratch: ScratchEnvironment, admin: &VcdBackend) -> Vec<CleanupFailure> {
    let cleanup = scratch.release(admin).await;
    for failure in &cleanup {
        warn!(resource = %failure.resource, error = %failure.error, "scratch resource left behind");
    }
    cleanup
}

fn report(
    results: &[Result<WorkflowReport, WorkflowError>],
    global: &GlobalOpts,
    cleanup: &[CleanupFailure],
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    output::print_output(
        &output::render_runs(&global.output, results, color),
        global.quiet,
    );

    let failed = results
        .iter()
        .filter(|r| !r.as_ref().is_ok_and(WorkflowReport::is_clean))
        .count();
    if failed > 0 {
        return Err(CliError::Unclean {
            failed,
            total: results.len(),
        });
    }
    if !cleanup.is_empty() {
        return Err(CliError::ScratchLeak {
            count: cleanup.len(),
        });
    }
    Ok(())
}

fn scratch_group_spec(args: &RunArgs) -> Result<Option<VdcGroupSpec>, CliError> {
    let Some(ref name) = args.scratch_group else {
        return Ok(None);
    };
    let (Some(org_id), Some(vdc_id)) = (&args.org_id, &args.vdc_id) else {
        return Err(CliError::Validation {
            field: "scratch-group".into(),
            reason: "requires --org-id and --vdc-id".into(),
        });
    };
    Ok(Some(VdcGroupSpec {
        org_id: EntityId::from(org_id.as_str()),
        name: name.clone(),
        description: Some("Scratch group for vcd-dfw-check".into()),
        participating: vec![ParticipatingVdc {
            vdc: EntityId::from(vdc_id.as_str()),
            org: EntityId::from(org_id.as_str()),
        }],
    }))
}

/// The delegated user gets a one-off password; it never leaves the process.
fn delegated_identity_spec(args: &RunArgs) -> Option<DelegatedIdentitySpec> {
    let username = args.create_delegate.as_ref()?;
    Some(DelegatedIdentitySpec {
        org_id: EntityId::from(args.org_id.as_deref()?),
        org_name: args.org_name.clone()?,
        username: username.clone(),
        password: SecretString::from(format!("Dfw-{}", Uuid::new_v4().simple())),
        role: ORG_ADMIN_ROLE.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn scratch_args() -> RunArgs {
        RunArgs {
            delegate: None,
            system_only: false,
            rules: None,
            prefix: "dfw-sync-".into(),
            scratch_group: Some("dfw-scratch".into()),
            org_id: Some("urn:vcloud:org:acme".into()),
            vdc_id: Some("urn:vcloud:vdc:one".into()),
            create_delegate: Some("dfw-delegate".into()),
            org_name: Some("acme".into()),
        }
    }

    #[test]
    fn scratch_group_spans_the_given_vdc() {
        let spec = scratch_group_spec(&scratch_args()).unwrap().unwrap();
        assert_eq!(spec.name, "dfw-scratch");
        assert_eq!(spec.participating.len(), 1);
        assert_eq!(spec.participating[0].vdc, EntityId::from("urn:vcloud:vdc:one"));
        assert_eq!(spec.participating[0].org, spec.org_id);
    }

    #[test]
    fn no_scratch_group_without_flag() {
        let args = RunArgs {
            scratch_group: None,
            create_delegate: None,
            ..scratch_args()
        };
        assert!(scratch_group_spec(&args).unwrap().is_none());
        assert!(delegated_identity_spec(&args).is_none());
    }

    #[test]
    fn delegated_user_gets_org_admin_role_and_fresh_password() {
        let first = delegated_identity_spec(&scratch_args()).unwrap();
        let second = delegated_identity_spec(&scratch_args()).unwrap();
        assert_eq!(first.role, ORG_ADMIN_ROLE);
        assert_eq!(first.org_name, "acme");
        assert_ne!(first.password.expose_secret(), second.password.expose_secret());
    }
}
