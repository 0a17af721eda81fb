// ── Distributed firewall rule types ──

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::reference::{EntityId, FirewallGroupRef, ProfileRef};

// ── Enumerations ────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum Direction {
    #[serde(rename = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[serde(rename = "OUT")]
    #[strum(serialize = "OUT")]
    Out,
    #[serde(rename = "IN_OUT")]
    #[strum(serialize = "IN_OUT")]
    InOut,
}

impl Direction {
    pub const ALL: [Self; 3] = [Self::In, Self::Out, Self::InOut];
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum IpProtocol {
    #[serde(rename = "IPV4")]
    #[strum(serialize = "IPV4")]
    Ipv4,
    #[serde(rename = "IPV6")]
    #[strum(serialize = "IPV6")]
    Ipv6,
    #[serde(rename = "IPV4_IPV6")]
    #[strum(serialize = "IPV4_IPV6")]
    Ipv4Ipv6,
}

impl IpProtocol {
    pub const ALL: [Self; 3] = [Self::Ipv4, Self::Ipv6, Self::Ipv4Ipv6];
}

/// Action field of API versions before 35.2.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum LegacyAction {
    #[serde(rename = "ALLOW")]
    #[strum(serialize = "ALLOW")]
    Allow,
    #[serde(rename = "DROP")]
    #[strum(serialize = "DROP")]
    Drop,
}

impl LegacyAction {
    pub const ALL: [Self; 2] = [Self::Allow, Self::Drop];
}

/// `actionValue` field, API 35.2 and later.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum ActionValue {
    #[serde(rename = "ALLOW")]
    #[strum(serialize = "ALLOW")]
    Allow,
    #[serde(rename = "DROP")]
    #[strum(serialize = "DROP")]
    Drop,
    #[serde(rename = "REJECT")]
    #[strum(serialize = "REJECT")]
    Reject,
}

impl ActionValue {
    pub const ALL: [Self; 3] = [Self::Allow, Self::Drop, Self::Reject];
}

/// A rule's action in exactly one of the two wire encodings.
///
/// Which constructor is legal is decided by
/// [`Capabilities`](crate::capability::Capabilities).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum RuleAction {
    Legacy(LegacyAction),
    Modern(ActionValue),
}

impl RuleAction {
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy(a) => a.into(),
            Self::Modern(a) => a.into(),
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Rule ────────────────────────────────────────────────────────────

/// One entry of a VDC group's ordered DFW rule list.
///
/// Position in the list is priority. Empty source/destination collections
/// mean "Any". At most one of `application_port_profiles` and
/// `network_context_profiles` may be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributedFirewallRule {
    /// Assigned by the authority; never set on rules built locally.
    pub id: Option<EntityId>,
    pub name: String,
    pub direction: Direction,
    pub ip_protocol: IpProtocol,
    pub enabled: bool,
    pub logging: bool,
    pub comments: Option<String>,
    pub action: RuleAction,
    pub source_firewall_groups: Vec<FirewallGroupRef>,
    pub destination_firewall_groups: Vec<FirewallGroupRef>,
    pub application_port_profiles: Vec<ProfileRef>,
    pub network_context_profiles: Vec<ProfileRef>,

    /// Wire fields this model does not interpret, written back untouched.
    #[serde(skip)]
    pub(crate) passthrough: Map<String, Value>,
}

impl DistributedFirewallRule {
    /// A rule matching any source, destination and service.
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        ip_protocol: IpProtocol,
        action: RuleAction,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            direction,
            ip_protocol,
            enabled: true,
            logging: false,
            comments: None,
            action,
            source_firewall_groups: Vec::new(),
            destination_firewall_groups: Vec::new(),
            application_port_profiles: Vec::new(),
            network_context_profiles: Vec::new(),
            passthrough: Map::new(),
        }
    }

    /// True when both service-matching collections are populated.
    pub fn violates_profile_exclusivity(&self) -> bool {
        !self.application_port_profiles.is_empty() && !self.network_context_profiles.is_empty()
    }

    /// Opaque wire fields carried from a read.
    pub fn passthrough(&self) -> &Map<String, Value> {
        &self.passthrough
    }
}

// ── Rule set ────────────────────────────────────────────────────────

/// Ordered snapshot of a group's rules as read from the authority.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistributedFirewallRuleSet(Vec<DistributedFirewallRule>);

impl DistributedFirewallRuleSet {
    pub fn rules(&self) -> &[DistributedFirewallRule] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_rules(self) -> Vec<DistributedFirewallRule> {
        self.0
    }
}

impl From<Vec<DistributedFirewallRule>> for DistributedFirewallRuleSet {
    fn from(rules: Vec<DistributedFirewallRule>) -> Self {
        Self(rules)
    }
}
