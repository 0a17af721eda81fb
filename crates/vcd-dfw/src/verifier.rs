// ── Sync verifier ──
//
// Compares the rules submitted in a replace against what the authority
// returned. Order is significant for the rule list itself; reference
// collections are compared as sets of IDs because the authority may reorder
// them.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{DistributedFirewallRule, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RuleField {
    #[strum(serialize = "rule count")]
    Count,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "direction")]
    Direction,
    #[strum(serialize = "ip protocol")]
    IpProtocol,
    #[strum(serialize = "enabled")]
    Enabled,
    #[strum(serialize = "logging")]
    Logging,
    #[strum(serialize = "comments")]
    Comments,
    #[strum(serialize = "action")]
    Action,
    #[strum(serialize = "source firewall groups")]
    SourceFirewallGroups,
    #[strum(serialize = "destination firewall groups")]
    DestinationFirewallGroups,
    #[strum(serialize = "application port profiles")]
    ApplicationPortProfiles,
    #[strum(serialize = "network context profiles")]
    NetworkContextProfiles,
}

/// One difference between a submitted and a returned rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    /// Rule position; `None` for the length mismatch.
    pub index: Option<usize>,
    pub field: RuleField,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(
                f,
                "rule {i}: {} expected {}, got {}",
                self.field, self.expected, self.actual
            ),
            None => write!(
                f,
                "{} expected {}, got {}",
                self.field, self.expected, self.actual
            ),
        }
    }
}

/// Every difference between `submitted` and `returned`; empty means the
/// replace was applied with full fidelity.
pub fn verify(
    submitted: &[DistributedFirewallRule],
    returned: &[DistributedFirewallRule],
) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    if submitted.len() != returned.len() {
        found.push(Discrepancy {
            index: None,
            field: RuleField::Count,
            expected: submitted.len().to_string(),
            actual: returned.len().to_string(),
        });
    }

    for (index, (want, got)) in submitted.iter().zip(returned).enumerate() {
        let mut check = |field: RuleField, expected: String, actual: String| {
            if expected != actual {
                found.push(Discrepancy {
                    index: Some(index),
                    field,
                    expected,
                    actual,
                });
            }
        };

        check(RuleField::Name, want.name.clone(), got.name.clone());
        check(
            RuleField::Direction,
            want.direction.to_string(),
            got.direction.to_string(),
        );
        check(
            RuleField::IpProtocol,
            want.ip_protocol.to_string(),
            got.ip_protocol.to_string(),
        );
        check(
            RuleField::Enabled,
            want.enabled.to_string(),
            got.enabled.to_string(),
        );
        check(
            RuleField::Logging,
            want.logging.to_string(),
            got.logging.to_string(),
        );
        check(
            RuleField::Comments,
            render_optional(want.comments.as_deref()),
            render_optional(got.comments.as_deref()),
        );
        check(
            RuleField::Action,
            render_action(want),
            render_action(got),
        );
        check(
            RuleField::SourceFirewallGroups,
            render_ids(want.source_firewall_groups.iter().map(|r| &r.id)),
            render_ids(got.source_firewall_groups.iter().map(|r| &r.id)),
        );
        check(
            RuleField::DestinationFirewallGroups,
            render_ids(want.destination_firewall_groups.iter().map(|r| &r.id)),
            render_ids(got.destination_firewall_groups.iter().map(|r| &r.id)),
        );
        check(
            RuleField::ApplicationPortProfiles,
            render_ids(want.application_port_profiles.iter().map(|r| &r.id)),
            render_ids(got.application_port_profiles.iter().map(|r| &r.id)),
        );
        check(
            RuleField::NetworkContextProfiles,
            render_ids(want.network_context_profiles.iter().map(|r| &r.id)),
            render_ids(got.network_context_profiles.iter().map(|r| &r.id)),
        );
    }

    found
}

fn render_optional(value: Option<&str>) -> String {
    value.map_or_else(|| "<none>".to_owned(), |v| format!("'{v}'"))
}

fn render_action(rule: &DistributedFirewallRule) -> String {
    if rule.action.is_legacy() {
        format!("action={}", rule.action)
    } else {
        format!("actionValue={}", rule.action)
    }
}

/// Sorted, de-duplicated ID list so ordering differences compare equal.
fn render_ids<'a>(ids: impl Iterator<Item = &'a EntityId>) -> String {
    let set: BTreeSet<&str> = ids.map(EntityId::as_str).collect();
    let joined: Vec<&str> = set.into_iter().collect();
    format!("[{}]", joined.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActionValue, Direction, FirewallGroupRef, IpProtocol, LegacyAction, ProfileRef, RuleAction,
    };
    use pretty_assertions::assert_eq;

    fn rule(name: &str) -> DistributedFirewallRule {
        let mut r = DistributedFirewallRule::new(
            name,
            Direction::InOut,
            IpProtocol::Ipv4Ipv6,
            RuleAction::Modern(ActionValue::Allow),
        );
        r.application_port_profiles = vec![
            ProfileRef::new("app-1", "HTTP"),
            ProfileRef::new("app-2", "HTTPS"),
        ];
        r.source_firewall_groups = vec![FirewallGroupRef::new("g1", "ipset")];
        r
    }

    #[test]
    fn identical_lists_have_no_discrepancies() {
        let rules = vec![rule("a"), rule("b")];
        assert!(verify(&rules, &rules).is_empty());
    }

    #[test]
    fn reference_order_and_server_ids_are_ignored() {
        let submitted = vec![rule("a")];
        let mut returned = submitted.clone();
        returned[0].application_port_profiles.reverse();
        returned[0].id = Some("urn:vcloud:rule:1".into());
        returned[0].application_port_profiles[0].name = String::new();
        assert!(verify(&submitted, &returned).is_empty());
    }

    #[test]
    fn length_mismatch_is_reported_once_and_prefix_compared() {
        let submitted = vec![rule("a"), rule("b")];
        let mut returned = vec![rule("a")];
        returned[0].logging = true;

        let found = verify(&submitted, &returned);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].field, RuleField::Count);
        assert_eq!(found[0].index, None);
        assert_eq!(found[1].field, RuleField::Logging);
        assert_eq!(found[1].index, Some(0));
    }

    #[test]
    fn action_encoding_difference_is_reported() {
        let submitted = vec![rule("a")];
        let mut returned = submitted.clone();
        returned[0].action = RuleAction::Legacy(LegacyAction::Allow);

        let found = verify(&submitted, &returned);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, RuleField::Action);
        assert_eq!(
            found[0].to_string(),
            "rule 0: action expected actionValue=ALLOW, got action=ALLOW"
        );
    }

    #[test]
    fn missing_reference_is_reported() {
        let submitted = vec![rule("a")];
        let mut returned = submitted.clone();
        returned[0].source_firewall_groups.clear();
        returned[0].comments = Some("x".into());

        let fields: Vec<RuleField> = verify(&submitted, &returned)
            .into_iter()
            .map(|d| d.field)
            .collect();
        assert_eq!(
            fields,
            vec![RuleField::Comments, RuleField::SourceFirewallGroups]
        );
    }
}
