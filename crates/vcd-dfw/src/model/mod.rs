// ── Domain model ──
//
// Canonical types for one VDC group's distributed firewall. Wire shapes live
// in `vcd_api::openapi_types`; `crate::convert` maps between the two.

pub mod reference;
pub mod rule;
pub mod state;

pub use reference::{EntityId, FirewallGroupKind, FirewallGroupRef, GroupId, ProfileRef};
pub use rule::{
    ActionValue, Direction, DistributedFirewallRule, DistributedFirewallRuleSet, IpProtocol,
    LegacyAction, RuleAction,
};
pub use state::DfwActivationState;
