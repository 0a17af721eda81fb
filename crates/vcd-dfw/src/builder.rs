// ── Rule definition builder ──
//
// Produces N rules that are valid under a capability set and, for large
// enough N, cover every direction, protocol, action and source/destination
// shape. Generation is index-driven cycling, so the same inputs always yield
// the same rule list.

use crate::capability::Capabilities;
use crate::model::{
    Direction, DistributedFirewallRule, FirewallGroupRef, IpProtocol, ProfileRef,
};

const DEFAULT_NAME_PREFIX: &str = "dfw-rule-";
const DEFAULT_COMMENT: &str = "Comment Rule";

/// Every fifth rule (`index % 5 == 1`) matches on network-context profiles.
const NETWORK_CONTEXT_EVERY: usize = 5;
const NETWORK_CONTEXT_OFFSET: usize = 1;
/// Lower bound of network-context profiles placed on such a rule.
const NETWORK_CONTEXT_MIN: usize = 2;

/// Already-resolved references the builder draws from.
#[derive(Debug, Clone, Default)]
pub struct ReferencePool {
    pub firewall_groups: Vec<FirewallGroupRef>,
    pub application_port_profiles: Vec<ProfileRef>,
    pub network_context_profiles: Vec<ProfileRef>,
}

#[derive(Debug, Clone)]
pub struct RuleDefinitionBuilder {
    pool: ReferencePool,
    capabilities: Capabilities,
    name_prefix: String,
    comment: String,
}

impl RuleDefinitionBuilder {
    pub fn new(pool: ReferencePool, capabilities: Capabilities) -> Self {
        Self {
            pool,
            capabilities,
            name_prefix: DEFAULT_NAME_PREFIX.to_owned(),
            comment: DEFAULT_COMMENT.to_owned(),
        }
    }

    /// Rules are named `<prefix><index>`.
    #[must_use]
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Comment text attached when the capability set supports comments.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn build(&self, count: usize) -> Vec<DistributedFirewallRule> {
        let actions = self.capabilities.allowed_actions();
        let group_slots = self.pool.firewall_groups.len() + 1;

        (0..count)
            .map(|index| {
                let action = actions[(index / 2) % actions.len()];
                let mut rule = DistributedFirewallRule::new(
                    format!("{}{index}", self.name_prefix),
                    Direction::ALL[index % Direction::ALL.len()],
                    IpProtocol::ALL[(index / Direction::ALL.len()) % IpProtocol::ALL.len()],
                    action,
                );
                rule.enabled = index % 2 == 0;
                rule.logging = index % 2 == 1;

                rule.source_firewall_groups = self.group_slot(index % group_slots);
                rule.destination_firewall_groups =
                    self.group_slot((index / group_slots) % group_slots);

                if index % NETWORK_CONTEXT_EVERY == NETWORK_CONTEXT_OFFSET {
                    rule.network_context_profiles = self
                        .pool
                        .network_context_profiles
                        .iter()
                        .take(index.max(NETWORK_CONTEXT_MIN))
                        .cloned()
                        .collect();
                } else {
                    rule.application_port_profiles = self
                        .pool
                        .application_port_profiles
                        .iter()
                        .take(index)
                        .cloned()
                        .collect();
                }

                if self.capabilities.supports_comments {
                    rule.comments = Some(self.comment.clone());
                }

                rule
            })
            .collect()
    }

    /// Slot 0 is "Any"; slot `n` is the n-th pool group.
    fn group_slot(&self, slot: usize) -> Vec<FirewallGroupRef> {
        slot.checked_sub(1)
            .and_then(|i| self.pool.firewall_groups.get(i))
            .cloned()
            .into_iter()
            .collect()
    }
}
