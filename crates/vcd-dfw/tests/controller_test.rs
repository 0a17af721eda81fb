#![allow(clippy::unwrap_used)]
// Lifecycle controller tests against the in-memory authority.

mod common;

use pretty_assertions::assert_eq;

use common::{GROUP, GroupState, InMemoryAuthority};
use vcd_dfw::{
    ActionValue, ApiVersion, Capabilities, CoreError, DfwController, Direction,
    DistributedFirewallRule, FirewallGroupCatalog, FirewallGroupKind, FirewallGroupSpec, GroupId,
    IpProtocol, LegacyAction, ProfileRef, ReferencePool, RuleAction, RuleDefinitionBuilder,
    verifier,
};

const MODERN: ApiVersion = ApiVersion::new(36, 2);

fn group() -> GroupId {
    GroupId::from(GROUP)
}

fn rule(name: &str) -> DistributedFirewallRule {
    DistributedFirewallRule::new(
        name,
        Direction::In,
        IpProtocol::Ipv4,
        RuleAction::Modern(ActionValue::Allow),
    )
}

async fn ip_set(authority: &InMemoryAuthority) -> vcd_dfw::FirewallGroupRef {
    authority
        .create_firewall_group(&FirewallGroupSpec {
            kind: FirewallGroupKind::IpSet,
            owner: group(),
            name: "ipset".into(),
            description: None,
            members: vec!["10.0.0.0/24".into()],
        })
        .await
        .unwrap()
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_activate_is_idempotent() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);

    controller.activate(&group()).await.unwrap();
    assert_eq!(authority.writes(), vec![format!("set_dfw_enabled {GROUP} true")]);

    authority.clear_writes();
    controller.activate(&group()).await.unwrap();
    assert!(authority.writes().is_empty());
    assert!(controller.activation_state(&group()).await.unwrap().dfw_enabled);
}

#[tokio::test]
async fn test_deactivate_keeps_rules() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);

    controller.activate(&group()).await.unwrap();
    controller
        .replace_rule_set(&group(), &[rule("keep")])
        .await
        .unwrap();
    controller.deactivate(&group()).await.unwrap();

    let state = authority.group_state(GROUP);
    assert!(!state.dfw_enabled);
    assert_eq!(state.rules.len(), 1);

    authority.clear_writes();
    controller.deactivate(&group()).await.unwrap();
    assert!(authority.writes().is_empty());
}

#[tokio::test]
async fn test_default_policy_toggle_requires_active_dfw() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);

    let err = controller.disable_default_policy(&group()).await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    controller.activate(&group()).await.unwrap();
    controller.disable_default_policy(&group()).await.unwrap();
    let state = controller.activation_state(&group()).await.unwrap();
    assert!(state.dfw_enabled);
    assert!(!state.default_policy_enabled);

    controller.enable_default_policy(&group()).await.unwrap();
    assert!(
        controller
            .activation_state(&group())
            .await
            .unwrap()
            .default_policy_enabled
    );
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);

    let err = controller
        .activate(&GroupId::from("urn:vcloud:vdcGroup:missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_denied_principal_gets_permission_denied() {
    let authority = InMemoryAuthority::new(MODERN).deny(GROUP);
    let controller = DfwController::new(&authority);

    let err = controller.get_rule_set(&group()).await.unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied { .. }));
}

// ── Replace ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_replace_round_trips_with_full_fidelity() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);
    controller.activate(&group()).await.unwrap();

    let pool = ReferencePool {
        firewall_groups: vec![ip_set(&authority).await],
        application_port_profiles: (1..6)
            .map(|i| ProfileRef::new(format!("app-{i}"), format!("APP{i}")))
            .collect(),
        network_context_profiles: (1..6)
            .map(|i| ProfileRef::new(format!("ncp-{i}"), format!("NCP{i}")))
            .collect(),
    };
    let rules = RuleDefinitionBuilder::new(pool, controller.capabilities()).build(12);

    let stored = controller.replace_rule_set(&group(), &rules).await.unwrap();
    assert_eq!(stored.len(), rules.len());
    assert!(stored.rules().iter().all(|r| r.id.is_some()));
    assert!(verifier::verify(&rules, stored.rules()).is_empty());

    let read = controller.get_rule_set(&group()).await.unwrap();
    assert!(verifier::verify(&rules, read.rules()).is_empty());
}

#[tokio::test]
async fn test_replace_is_total() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);
    controller.activate(&group()).await.unwrap();

    controller
        .replace_rule_set(&group(), &[rule("a"), rule("b"), rule("c")])
        .await
        .unwrap();
    controller
        .replace_rule_set(&group(), &[rule("z")])
        .await
        .unwrap();

    let names: Vec<String> = controller
        .get_rule_set(&group())
        .await
        .unwrap()
        .into_rules()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["z".to_owned()]);

    controller.delete_all_rules(&group()).await.unwrap();
    assert!(controller.get_rule_set(&group()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exclusivity_violation_sends_nothing() {
    let authority = InMemoryAuthority::new(MODERN);
    authority.set_group_state(
        GROUP,
        GroupState {
            dfw_enabled: true,
            default_policy_enabled: true,
            rules: vec![rule("existing")],
        },
    );
    let controller = DfwController::new(&authority);

    let mut bad = rule("bad");
    bad.application_port_profiles = vec![ProfileRef::new("app-1", "APP1")];
    bad.network_context_profiles = vec![ProfileRef::new("ncp-1", "NCP1")];

    let err = controller
        .replace_rule_set(&group(), &[rule("ok"), bad])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(authority.writes().is_empty());
    assert_eq!(authority.group_state(GROUP).rules[0].name, "existing");
}

#[tokio::test]
async fn test_capability_gating_rejects_wrong_encoding() {
    // 35.0: legacy action only.
    let legacy = InMemoryAuthority::new(ApiVersion::new(35, 0));
    let controller = DfwController::new(&legacy);
    assert_eq!(controller.capabilities(), Capabilities::LEGACY);

    let err = controller
        .replace_rule_set(&group(), &[rule("modern")])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    // 35.2: actionValue but no comments.
    let mid = InMemoryAuthority::new(ApiVersion::new(35, 2));
    let controller = DfwController::new(&mid);
    let mut commented = rule("commented");
    commented.comments = Some("Comment Rule".into());
    let err = controller
        .replace_rule_set(&group(), &[commented])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    let old_style = DistributedFirewallRule::new(
        "legacy",
        Direction::Out,
        IpProtocol::Ipv6,
        RuleAction::Legacy(LegacyAction::Drop),
    );
    let err = controller
        .replace_rule_set(&group(), &[old_style])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(mid.writes().is_empty());
}

#[tokio::test]
async fn test_unknown_reference_is_rejected_by_authority() {
    let authority = InMemoryAuthority::new(MODERN);
    let controller = DfwController::new(&authority);
    controller.activate(&group()).await.unwrap();

    let mut dangling = rule("dangling");
    dangling.source_firewall_groups =
        vec![vcd_dfw::FirewallGroupRef::new("urn:vcloud:firewallGroup:gone", "gone")];

    let err = controller
        .replace_rule_set(&group(), &[dangling])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
}
