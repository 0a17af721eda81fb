// ── Wire <-> domain conversion ──
//
// Translates `vcd_api` OpenAPI bodies into the canonical rule model and
// back. Enumerations arrive as strings; an unknown value is reported as
// `ValidationFailed` rather than coerced.

use std::str::FromStr;

use serde_json::Value;
use vcd_api::openapi_types as wire;

use crate::capability::Capabilities;
use crate::error::CoreError;
use crate::model::{
    ActionValue, DistributedFirewallRule, EntityId, FirewallGroupRef, LegacyAction, ProfileRef,
    RuleAction,
};
use crate::resolver::{ApplicationPortProfileEntry, NetworkContextProfileEntry};

const COMMENTS_FIELD: &str = "comments";

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_enum<T: FromStr>(field: &str, raw: &str) -> Result<T, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::validation(format!("unrecognized {field} value '{raw}'")))
}

fn refs_to_wire<'a>(
    refs: impl Iterator<Item = (&'a EntityId, &'a str)>,
) -> Option<Vec<wire::OpenApiReference>> {
    let refs: Vec<wire::OpenApiReference> = refs
        .map(|(id, name)| wire::OpenApiReference {
            id: id.to_string(),
            name: (!name.is_empty()).then(|| name.to_owned()),
        })
        .collect();
    (!refs.is_empty()).then_some(refs)
}

fn group_refs(refs: Option<Vec<wire::OpenApiReference>>) -> Vec<FirewallGroupRef> {
    refs.unwrap_or_default()
        .into_iter()
        .map(|r| FirewallGroupRef::new(r.id, r.name.unwrap_or_default()))
        .collect()
}

fn profile_refs(refs: Option<Vec<wire::OpenApiReference>>) -> Vec<ProfileRef> {
    refs.unwrap_or_default()
        .into_iter()
        .map(|r| ProfileRef::new(r.id, r.name.unwrap_or_default()))
        .collect()
}

// ── Rules ───────────────────────────────────────────────────────────

/// Domain rule -> wire rule. The action lands in `action` or `actionValue`
/// according to its variant; empty collections are omitted.
pub fn rule_to_wire(rule: &DistributedFirewallRule) -> wire::DistributedFirewallRule {
    let (action, action_value) = match rule.action {
        RuleAction::Legacy(a) => (Some(a.to_string()), None),
        RuleAction::Modern(a) => (None, Some(a.to_string())),
    };

    let mut extra = rule.passthrough.clone();
    let comments = match &rule.comments {
        Some(c) => {
            extra.remove(COMMENTS_FIELD);
            Some(c.clone())
        }
        None => None,
    };

    wire::DistributedFirewallRule {
        id: rule.id.as_ref().map(ToString::to_string),
        name: rule.name.clone(),
        action,
        action_value,
        enabled: rule.enabled,
        source_firewall_groups: refs_to_wire(
            rule.source_firewall_groups
                .iter()
                .map(|r| (&r.id, r.name.as_str())),
        ),
        destination_firewall_groups: refs_to_wire(
            rule.destination_firewall_groups
                .iter()
                .map(|r| (&r.id, r.name.as_str())),
        ),
        application_port_profiles: refs_to_wire(
            rule.application_port_profiles
                .iter()
                .map(|r| (&r.id, r.name.as_str())),
        ),
        network_context_profiles: refs_to_wire(
            rule.network_context_profiles
                .iter()
                .map(|r| (&r.id, r.name.as_str())),
        ),
        ip_protocol: rule.ip_protocol.to_string(),
        logging: rule.logging,
        direction: rule.direction.to_string(),
        comments,
        extra,
    }
}

/// Wire rule -> domain rule, reading the action field the capability set
/// selects and falling back to the other one.
///
/// When comments are unsupported a returned `comments` value is kept opaque
/// rather than surfaced.
pub fn rule_from_wire(
    wire: wire::DistributedFirewallRule,
    capabilities: Capabilities,
) -> Result<DistributedFirewallRule, CoreError> {
    let action = parse_action(&wire, capabilities)?;
    let direction = parse_enum("direction", &wire.direction)?;
    let ip_protocol = parse_enum("ipProtocol", &wire.ip_protocol)?;

    let mut passthrough = wire.extra;
    let comments = if capabilities.supports_comments {
        wire.comments.filter(|c| !c.is_empty())
    } else {
        if let Some(c) = wire.comments {
            passthrough.insert(COMMENTS_FIELD.into(), Value::String(c));
        }
        None
    };

    let mut rule = DistributedFirewallRule::new(wire.name, direction, ip_protocol, action);
    rule.id = wire.id.map(EntityId::from);
    rule.enabled = wire.enabled;
    rule.logging = wire.logging;
    rule.comments = comments;
    rule.source_firewall_groups = group_refs(wire.source_firewall_groups);
    rule.destination_firewall_groups = group_refs(wire.destination_firewall_groups);
    rule.application_port_profiles = profile_refs(wire.application_port_profiles);
    rule.network_context_profiles = profile_refs(wire.network_context_profiles);
    rule.passthrough = passthrough;
    Ok(rule)
}

fn parse_action(
    wire: &wire::DistributedFirewallRule,
    capabilities: Capabilities,
) -> Result<RuleAction, CoreError> {
    let modern = wire.action_value.as_deref().filter(|v| !v.is_empty());
    let legacy = wire.action.as_deref().filter(|v| !v.is_empty());

    let parse_modern = |raw: &str| parse_enum::<ActionValue>("actionValue", raw).map(RuleAction::Modern);
    let parse_legacy = |raw: &str| parse_enum::<LegacyAction>("action", raw).map(RuleAction::Legacy);

    match (capabilities.uses_action_value, modern, legacy) {
        (true, Some(raw), _) => parse_modern(raw),
        // Servers that speak actionValue still echo the deprecated field.
        (true, None, Some(raw)) => parse_enum::<ActionValue>("action", raw).map(RuleAction::Modern),
        (false, _, Some(raw)) => parse_legacy(raw),
        (false, Some(raw), None) => parse_modern(raw),
        (_, None, None) => Err(CoreError::validation(format!(
            "rule '{}' carries neither action nor actionValue",
            wire.name
        ))),
    }
}

// ── Profiles ────────────────────────────────────────────────────────

pub fn app_port_profile_from_wire(p: wire::ApplicationPortProfile) -> ApplicationPortProfileEntry {
    ApplicationPortProfileEntry {
        reference: ProfileRef::new(p.id, p.name),
        description: p.description,
    }
}

pub fn network_context_profile_from_wire(
    p: wire::NetworkContextProfile,
) -> NetworkContextProfileEntry {
    NetworkContextProfileEntry {
        reference: ProfileRef::new(p.id, p.name),
        description: p.description,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Direction, IpProtocol};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vcd_api::ApiVersion;

    fn modern() -> Capabilities {
        Capabilities::for_version(ApiVersion::new(36, 2))
    }

    #[test]
    fn modern_rule_uses_action_value_and_omits_empty_refs() {
        let mut rule = DistributedFirewallRule::new(
            "web",
            Direction::InOut,
            IpProtocol::Ipv4Ipv6,
            RuleAction::Modern(ActionValue::Reject),
        );
        rule.network_context_profiles = vec![ProfileRef::new("ncp-1", "SSL")];
        rule.comments = Some("Comment Rule".into());

        let body = serde_json::to_value(rule_to_wire(&rule)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "web",
                "actionValue": "REJECT",
                "enabled": true,
                "networkContextProfiles": [{ "id": "ncp-1", "name": "SSL" }],
                "ipProtocol": "IPV4_IPV6",
                "logging": false,
                "direction": "IN_OUT",
                "comments": "Comment Rule"
            })
        );
    }

    #[test]
    fn legacy_rule_uses_action_field() {
        let rule = DistributedFirewallRule::new(
            "old",
            Direction::In,
            IpProtocol::Ipv4,
            RuleAction::Legacy(LegacyAction::Drop),
        );
        let wire = rule_to_wire(&rule);
        assert_eq!(wire.action.as_deref(), Some("DROP"));
        assert!(wire.action_value.is_none());
    }

    #[test]
    fn reads_action_value_with_deprecated_echo() {
        let wire: wire::DistributedFirewallRule = serde_json::from_value(json!({
            "id": "rule-1",
            "name": "r",
            "action": "DROP",
            "actionValue": "REJECT",
            "enabled": false,
            "ipProtocol": "IPV6",
            "logging": true,
            "direction": "OUT",
            "version": { "version": 2 }
        }))
        .unwrap();

        let rule = rule_from_wire(wire.clone(), modern()).unwrap();
        assert_eq!(rule.action, RuleAction::Modern(ActionValue::Reject));
        assert_eq!(rule.id, Some(EntityId::from("rule-1")));
        assert!(rule.logging);

        let legacy = rule_from_wire(wire, Capabilities::LEGACY).unwrap();
        assert_eq!(legacy.action, RuleAction::Legacy(LegacyAction::Drop));

        // Unknown fields survive a write-back.
        let back = serde_json::to_value(rule_to_wire(&rule)).unwrap();
        assert_eq!(back["version"], json!({ "version": 2 }));
    }

    #[test]
    fn comments_kept_opaque_when_unsupported() {
        let wire: wire::DistributedFirewallRule = serde_json::from_value(json!({
            "name": "r",
            "action": "ALLOW",
            "enabled": true,
            "ipProtocol": "IPV4",
            "logging": false,
            "direction": "IN",
            "comments": "from the UI"
        }))
        .unwrap();

        let rule = rule_from_wire(wire, Capabilities::LEGACY).unwrap();
        assert!(rule.comments.is_none());
        assert!(Capabilities::LEGACY.check_rule(&rule).is_ok());

        let back = serde_json::to_value(rule_to_wire(&rule)).unwrap();
        assert_eq!(back["comments"], json!("from the UI"));
    }

    #[test]
    fn malformed_enum_is_validation_failure() {
        let wire: wire::DistributedFirewallRule = serde_json::from_value(json!({
            "name": "r",
            "actionValue": "ALLOW",
            "enabled": true,
            "ipProtocol": "IPV5",
            "logging": false,
            "direction": "IN"
        }))
        .unwrap();

        let err = rule_from_wire(wire, modern()).unwrap_err();
        match err {
            CoreError::ValidationFailed { message } => assert!(message.contains("IPV5")),
            other => panic!("expected ValidationFailed, got: {other:?}"),
        }
    }
}
