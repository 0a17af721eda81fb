// ── DFW lifecycle controller ──
//
// Owns the group state machine (`Inactive <-> Active`, plus the orthogonal
// default-policy flag) and the full-replace protocol for the rule list.
// Every operation is a single awaited exchange with the authority; a failure
// is terminal for that call and nothing is retried.

use tracing::{debug, info};

use crate::authority::{DfwTransport, VersionNegotiation};
use crate::capability::Capabilities;
use crate::error::CoreError;
use crate::model::{
    DfwActivationState, DistributedFirewallRule, DistributedFirewallRuleSet, GroupId,
};

/// Drives the DFW of VDC groups through one authenticated authority.
pub struct DfwController<A> {
    authority: A,
    capabilities: Capabilities,
}

impl<A> DfwController<A>
where
    A: DfwTransport + VersionNegotiation + Sync,
{
    /// Capabilities are fixed at construction from the negotiated version.
    pub fn new(authority: A) -> Self {
        let version = authority.negotiated_version();
        let capabilities = Capabilities::for_version(version);
        debug!(%version, ?capabilities, "DFW controller ready");
        Self {
            authority,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Check exclusivity and the capability gate for every rule.
    pub fn validate_rules(&self, rules: &[DistributedFirewallRule]) -> Result<(), CoreError> {
        for (index, rule) in rules.iter().enumerate() {
            if rule.violates_profile_exclusivity() {
                return Err(CoreError::validation(format!(
                    "rule {index} ('{}') sets both application port profiles and network context profiles",
                    rule.name
                )));
            }
            self.capabilities.check_rule(rule)?;
        }
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn activation_state(&self, group: &GroupId) -> Result<DfwActivationState, CoreError> {
        self.authority.activation_state(group).await
    }

    /// Enable the DFW. No write is issued when it is already active.
    pub async fn activate(&self, group: &GroupId) -> Result<(), CoreError> {
        let state = self.authority.activation_state(group).await?;
        if state.dfw_enabled {
            debug!(%group, "DFW already active");
            return Ok(());
        }
        self.authority.set_dfw_enabled(group, true).await?;
        info!(%group, "DFW activated");
        Ok(())
    }

    /// Disable the DFW. The rule list is retained by the authority.
    pub async fn deactivate(&self, group: &GroupId) -> Result<(), CoreError> {
        let state = self.authority.activation_state(group).await?;
        if !state.dfw_enabled {
            debug!(%group, "DFW already inactive");
            return Ok(());
        }
        self.authority.set_dfw_enabled(group, false).await?;
        info!(%group, "DFW deactivated");
        Ok(())
    }

    pub async fn enable_default_policy(&self, group: &GroupId) -> Result<(), CoreError> {
        self.set_default_policy(group, true).await
    }

    pub async fn disable_default_policy(&self, group: &GroupId) -> Result<(), CoreError> {
        self.set_default_policy(group, false).await
    }

    async fn set_default_policy(&self, group: &GroupId, enabled: bool) -> Result<(), CoreError> {
        let state = self.authority.activation_state(group).await?;
        if !state.dfw_enabled {
            return Err(CoreError::validation(format!(
                "default policy of group {group} cannot change while the DFW is inactive"
            )));
        }
        if state.default_policy_enabled == enabled {
            debug!(%group, enabled, "default policy already in requested state");
            return Ok(());
        }
        self.authority
            .set_default_policy_enabled(group, enabled)
            .await?;
        info!(%group, enabled, "default policy updated");
        Ok(())
    }

    // ── Rules ────────────────────────────────────────────────────────

    pub async fn get_rule_set(&self, group: &GroupId) -> Result<DistributedFirewallRuleSet, CoreError> {
        let rules = self.authority.fetch_rules(group).await?;
        debug!(%group, rules = rules.len(), "fetched DFW rules");
        Ok(rules)
    }

    /// Atomically replace the group's rule list.
    ///
    /// Rules are validated locally first; on a violation nothing is sent.
    /// Returns the authoritative post-write rule set.
    pub async fn replace_rule_set(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> Result<DistributedFirewallRuleSet, CoreError> {
        self.validate_rules(rules)?;
        let stored = self.authority.store_rules(group, rules).await?;
        info!(%group, submitted = rules.len(), stored = stored.len(), "DFW rule set replaced");
        Ok(stored)
    }

    pub async fn delete_all_rules(&self, group: &GroupId) -> Result<(), CoreError> {
        self.replace_rule_set(group, &[]).await.map(|_| ())
    }
}
