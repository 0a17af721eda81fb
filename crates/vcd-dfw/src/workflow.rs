// ── Rule-sync workflow ──
//
// The end-to-end exercise of one principal against one VDC group:
// activate, create prerequisites, build and replace a rule list, verify the
// round trip, empty the list, then put the group back to its inactive state.
// Prerequisites are released whether or not any step failed.

use std::fmt;

use tracing::{info, warn};

use crate::authority::{
    Authority, DelegatedIdentity, DelegatedIdentitySpec, DfwTransport, FirewallGroupCatalog,
    FirewallGroupSpec, GroupAdministration, VdcGroupSpec,
};
use crate::config::Identity;
use crate::builder::{ReferencePool, RuleDefinitionBuilder};
use crate::controller::DfwController;
use crate::error::CoreError;
use crate::model::{DfwActivationState, FirewallGroupKind, FirewallGroupRef, GroupId};
use crate::resolver::resolve_all;
use crate::verifier::{Discrepancy, verify};

// ── Scoped resources ────────────────────────────────────────────────

/// A prerequisite that could not be released.
#[derive(Debug)]
pub struct CleanupFailure {
    pub resource: String,
    pub error: CoreError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to release {}: {}", self.resource, self.error)
    }
}

/// Ledger of what a run has put on the authority: firewall groups, released
/// in reverse creation order, and the rule list that may still reference
/// them.
#[derive(Debug, Default)]
pub struct ScopedResources {
    firewall_groups: Vec<FirewallGroupRef>,
    populated_rules: Option<GroupId>,
}

impl ScopedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a firewall group and record it for release.
    pub async fn create_firewall_group<C: FirewallGroupCatalog>(
        &mut self,
        catalog: &C,
        spec: &FirewallGroupSpec,
    ) -> Result<FirewallGroupRef, CoreError> {
        let created = catalog.create_firewall_group(spec).await?;
        info!(kind = %spec.kind, id = %created.id, "acquired firewall group");
        self.firewall_groups.push(created.clone());
        Ok(created)
    }

    /// Record that `group` now holds rules referencing the recorded
    /// firewall groups.
    pub fn rules_stored(&mut self, group: &GroupId) {
        self.populated_rules = Some(group.clone());
    }

    /// The rule list was emptied; nothing references the firewall groups.
    pub fn rules_cleared(&mut self) {
        self.populated_rules = None;
    }

    pub fn len(&self) -> usize {
        self.firewall_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.firewall_groups.is_empty() && self.populated_rules.is_none()
    }

    /// Best-effort release of everything recorded. A populated rule list is
    /// emptied first so the authority lets go of the groups it references.
    /// Every entry is attempted; failures are collected, not raised.
    pub async fn release<A>(self, authority: &A) -> Vec<CleanupFailure>
    where
        A: DfwTransport + FirewallGroupCatalog,
    {
        let mut failures = Vec::new();

        if let Some(group) = self.populated_rules {
            match authority.store_rules(&group, &[]).await {
                Ok(_) => info!(%group, "emptied rule list"),
                Err(error) => {
                    warn!(%group, error = %error, "could not empty rule list");
                    failures.push(CleanupFailure {
                        resource: format!("rule list of group {group}"),
                        error,
                    });
                }
            }
        }

        for group in self.firewall_groups.into_iter().rev() {
            match authority.delete_firewall_group(&group).await {
                Ok(()) => info!(id = %group.id, "released firewall group"),
                Err(error) => {
                    warn!(id = %group.id, error = %error, "could not release firewall group");
                    failures.push(CleanupFailure {
                        resource: format!("firewall group {} ({})", group.name, group.id),
                        error,
                    });
                }
            }
        }
        failures
    }
}

// ── Workflow ────────────────────────────────────────────────────────

/// Knobs for one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub rule_count: usize,
    /// Prefix for generated rule and firewall group names.
    pub name_prefix: String,
    /// Members of the IP set prerequisite.
    pub ip_set_members: Vec<String>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            rule_count: 40,
            name_prefix: "dfw-sync-".into(),
            ip_set_members: [
                "12.12.12.1",
                "10.10.10.0/24",
                "11.11.11.1-11.11.11.2",
                "2001:db8::/48",
                "2001:db6:0:0:0:0:0:0-2001:db6:0:ffff:ffff:ffff:ffff:ffff",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Outcome of a run that reached the end of its steps.
#[derive(Debug)]
pub struct WorkflowReport {
    pub principal: String,
    pub submitted: usize,
    /// Differences between submitted and stored rules after the replace.
    pub discrepancies: Vec<Discrepancy>,
    pub final_state: DfwActivationState,
    pub final_rule_count: usize,
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl WorkflowReport {
    /// Full fidelity, group inactive and empty, nothing leaked.
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
            && !self.final_state.dfw_enabled
            && self.final_rule_count == 0
            && self.cleanup_failures.is_empty()
    }
}

/// A run that stopped at a failing step.
#[derive(Debug, thiserror::Error)]
#[error("workflow for {principal} failed: {source}")]
pub struct WorkflowError {
    pub principal: String,
    #[source]
    pub source: CoreError,
    /// Release failures that happened after the primary error.
    pub cleanup_failures: Vec<CleanupFailure>,
}

/// Run activate -> replace -> verify -> delete all -> deactivate as one
/// principal. Firewall groups created along the way are always released.
pub async fn run_rule_sync_workflow<A: Authority>(
    authority: &A,
    principal: &str,
    group: &GroupId,
    options: &WorkflowOptions,
) -> Result<WorkflowReport, WorkflowError> {
    let mut resources = ScopedResources::new();
    let outcome = sync_steps(authority, &mut resources, principal, group, options).await;
    let cleanup_failures = resources.release(authority).await;

    match outcome {
        Ok(mut report) => {
            report.cleanup_failures = cleanup_failures;
            info!(principal, clean = report.is_clean(), "workflow finished");
            Ok(report)
        }
        Err(source) => Err(WorkflowError {
            principal: principal.to_owned(),
            source,
            cleanup_failures,
        }),
    }
}

async fn sync_steps<A: Authority>(
    authority: &A,
    resources: &mut ScopedResources,
    principal: &str,
    group: &GroupId,
    options: &WorkflowOptions,
) -> Result<WorkflowReport, CoreError> {
    let controller = DfwController::new(authority);

    info!(principal, %group, "activating DFW");
    controller.activate(group).await?;

    let ip_set = resources
        .create_firewall_group(
            authority,
            &FirewallGroupSpec {
                kind: FirewallGroupKind::IpSet,
                owner: group.clone(),
                name: format!("{}ip-set", options.name_prefix),
                description: Some("IP set referenced by DFW rules".into()),
                members: options.ip_set_members.clone(),
            },
        )
        .await?;
    let security_group = resources
        .create_firewall_group(
            authority,
            &FirewallGroupSpec {
                kind: FirewallGroupKind::SecurityGroup,
                owner: group.clone(),
                name: format!("{}security-group", options.name_prefix),
                description: Some("Security group referenced by DFW rules".into()),
                members: Vec::new(),
            },
        )
        .await?;

    let pool = ReferencePool {
        firewall_groups: vec![ip_set, security_group],
        application_port_profiles: resolve_all(&authority.list_application_port_profiles().await?),
        network_context_profiles: resolve_all(&authority.list_network_context_profiles().await?),
    };

    let rules = RuleDefinitionBuilder::new(pool, controller.capabilities())
        .name_prefix(options.name_prefix.clone())
        .build(options.rule_count);

    info!(principal, %group, rules = rules.len(), "replacing rule set");
    let stored = controller.replace_rule_set(group, &rules).await?;
    resources.rules_stored(group);
    let discrepancies = verify(&rules, stored.rules());
    for d in &discrepancies {
        warn!(principal, %group, "{d}");
    }

    info!(principal, %group, "deleting all rules");
    controller.delete_all_rules(group).await?;
    resources.rules_cleared();
    let remaining = controller.get_rule_set(group).await?;
    if !remaining.is_empty() {
        return Err(CoreError::Internal(format!(
            "{} rules remain in group {group} after delete all",
            remaining.len()
        )));
    }

    controller.disable_default_policy(group).await?;
    info!(principal, %group, "deactivating DFW");
    controller.deactivate(group).await?;

    let final_state = controller.activation_state(group).await?;
    let final_rule_count = controller.get_rule_set(group).await?.len();

    Ok(WorkflowReport {
        principal: principal.to_owned(),
        submitted: rules.len(),
        discrepancies,
        final_state,
        final_rule_count,
        cleanup_failures: Vec::new(),
    })
}

/// One principal's authenticated authority.
pub struct Principal<A> {
    pub label: String,
    pub authority: A,
}

/// Run the workflow for each principal in turn against the same group.
pub async fn run_for_each_principal<A: Authority>(
    principals: &[Principal<A>],
    group: &GroupId,
    options: &WorkflowOptions,
) -> Vec<Result<WorkflowReport, WorkflowError>> {
    let mut results = Vec::with_capacity(principals.len());
    for principal in principals {
        results.push(
            run_rule_sync_workflow(&principal.authority, &principal.label, group, options).await,
        );
    }
    results
}

// ── Scratch environment ─────────────────────────────────────────────

/// A throwaway VDC group, and optionally a delegated org-admin user,
/// provisioned for one check and torn down afterwards.
#[derive(Debug)]
pub struct ScratchEnvironment {
    group: GroupId,
    delegate: Option<DelegatedIdentity>,
}

impl ScratchEnvironment {
    /// Create the group, then the delegated user. If the user cannot be
    /// created the group is deleted again before the error is returned.
    pub async fn provision<G: GroupAdministration>(
        admin: &G,
        group: &VdcGroupSpec,
        delegate: Option<&DelegatedIdentitySpec>,
    ) -> Result<Self, CoreError> {
        let id = admin.create_vdc_group(group).await?;
        info!(group = %id, name = %group.name, "provisioned scratch VDC group");

        let delegate = match delegate {
            Some(spec) => match admin.create_delegated_identity(spec).await {
                Ok(created) => Some(created),
                Err(error) => {
                    if let Err(cleanup) = admin.delete_vdc_group(&id).await {
                        warn!(group = %id, error = %cleanup, "could not delete scratch VDC group");
                    }
                    return Err(error);
                }
            },
            None => None,
        };

        Ok(Self {
            group: id,
            delegate,
        })
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn delegate(&self) -> Option<&Identity> {
        self.delegate.as_ref().map(|d| &d.identity)
    }

    /// Delete the delegated user and the group. Both are attempted.
    pub async fn release<G: GroupAdministration>(self, admin: &G) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();
        if let Some(delegate) = self.delegate {
            if let Err(error) = admin.delete_delegated_identity(&delegate).await {
                warn!(user = %delegate.user_id, error = %error, "could not delete delegated user");
                failures.push(CleanupFailure {
                    resource: format!("user {} ({})", delegate.identity.label, delegate.user_id),
                    error,
                });
            }
        }
        match admin.delete_vdc_group(&self.group).await {
            Ok(()) => info!(group = %self.group, "released scratch VDC group"),
            Err(error) => {
                warn!(group = %self.group, error = %error, "could not delete scratch VDC group");
                failures.push(CleanupFailure {
                    resource: format!("VDC group {}", self.group),
                    error,
                });
            }
        }
        failures
    }
}
