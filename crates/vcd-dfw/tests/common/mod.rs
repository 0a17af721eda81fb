// In-memory Cloud Director double shared by the integration tests.
//
// State lives behind `Arc<Mutex<_>>` so several principals (clones made with
// `as_principal`) see the same groups. Writes are recorded so tests can
// assert that idempotent operations issue no calls.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use vcd_dfw::{
    ApiVersion, ApplicationPortProfileEntry, CoreError, DelegatedIdentity, DelegatedIdentitySpec,
    DfwActivationState, DfwTransport, DistributedFirewallRule, DistributedFirewallRuleSet,
    EntityId, FirewallGroupCatalog, FirewallGroupRef, FirewallGroupSpec, GroupAdministration,
    GroupId, Identity, IdentityCredentials, NetworkContextProfileEntry, PrincipalKind,
    ProfileCatalog, ProfileRef, VdcGroupSpec, VersionNegotiation,
};

pub const GROUP: &str = "urn:vcloud:vdcGroup:test";

#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub dfw_enabled: bool,
    pub default_policy_enabled: bool,
    pub rules: Vec<DistributedFirewallRule>,
}

#[derive(Debug, Default)]
struct Shared {
    groups: HashMap<GroupId, GroupState>,
    firewall_groups: Vec<FirewallGroupRef>,
    app_profiles: Vec<ApplicationPortProfileEntry>,
    network_context_profiles: Vec<NetworkContextProfileEntry>,
    next_id: u32,
    writes: Vec<String>,
    users: Vec<(EntityId, String)>,
    fail_firewall_group_deletes: bool,
    fail_rule_writes: bool,
    rule_writes: usize,
    failing_rule_write: Option<usize>,
    failing_rule_writes_from: Option<usize>,
    fail_user_creation: bool,
}

impl Shared {
    fn allocate(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("urn:vcloud:{kind}:{}", self.next_id)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryAuthority {
    shared: Arc<Mutex<Shared>>,
    version: ApiVersion,
    denied: HashSet<GroupId>,
}

impl InMemoryAuthority {
    /// One group, 50 application port profiles, 50 network context
    /// profiles of which every tenth is an ALG profile.
    pub fn new(version: ApiVersion) -> Self {
        let mut shared = Shared::default();
        shared
            .groups
            .insert(GroupId::from(GROUP), GroupState::default());
        shared.app_profiles = (0..50)
            .map(|i| ApplicationPortProfileEntry {
                reference: ProfileRef::new(format!("app-{i}"), format!("APP{i}")),
                description: None,
            })
            .collect();
        shared.network_context_profiles = (0..50)
            .map(|i| NetworkContextProfileEntry {
                reference: ProfileRef::new(format!("ncp-{i}"), format!("NCP{i}")),
                description: Some(if i % 10 == 0 {
                    format!("NCP{i} ALG")
                } else {
                    format!("NCP{i}")
                }),
            })
            .collect();

        Self {
            shared: Arc::new(Mutex::new(shared)),
            version,
            denied: HashSet::new(),
        }
    }

    /// Another principal over the same state.
    pub fn as_principal(&self, version: ApiVersion) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            version,
            denied: HashSet::new(),
        }
    }

    pub fn deny(mut self, group: &str) -> Self {
        self.denied.insert(GroupId::from(group));
        self
    }

    pub fn fail_firewall_group_deletes(&self) {
        self.shared.lock().unwrap().fail_firewall_group_deletes = true;
    }

    pub fn fail_rule_writes(&self) {
        self.shared.lock().unwrap().fail_rule_writes = true;
    }

    /// Refuse only the `n`th rule write (zero-based) from now on.
    pub fn fail_rule_write_at(&self, n: usize) {
        let mut shared = self.shared.lock().unwrap();
        let at = shared.rule_writes + n;
        shared.failing_rule_write = Some(at);
    }

    /// Refuse every rule write from the `n`th (zero-based) on.
    pub fn fail_rule_writes_from(&self, n: usize) {
        let mut shared = self.shared.lock().unwrap();
        let at = shared.rule_writes + n;
        shared.failing_rule_writes_from = Some(at);
    }

    pub fn fail_user_creation(&self) {
        self.shared.lock().unwrap().fail_user_creation = true;
    }

    pub fn has_group(&self, group: &GroupId) -> bool {
        self.shared.lock().unwrap().groups.contains_key(group)
    }

    pub fn users(&self) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .users
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn group_state(&self, group: &str) -> GroupState {
        self.shared.lock().unwrap().groups[&GroupId::from(group)].clone()
    }

    pub fn set_group_state(&self, group: &str, state: GroupState) {
        self.shared
            .lock()
            .unwrap()
            .groups
            .insert(GroupId::from(group), state);
    }

    pub fn firewall_groups(&self) -> Vec<FirewallGroupRef> {
        self.shared.lock().unwrap().firewall_groups.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.shared.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.shared.lock().unwrap().writes.clear();
    }

    fn with_group<T>(
        &self,
        group: &GroupId,
        f: impl FnOnce(&mut GroupState, &mut Vec<String>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        if self.denied.contains(group) {
            return Err(CoreError::PermissionDenied {
                message: format!("no rights on {group}"),
            });
        }
        let mut shared = self.shared.lock().unwrap();
        let Shared { groups, writes, .. } = &mut *shared;
        let state = groups.get_mut(group).ok_or_else(|| CoreError::NotFound {
            entity_type: "VDC group".into(),
            identifier: group.to_string(),
        })?;
        f(state, writes)
    }

    fn store(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> Result<DistributedFirewallRuleSet, CoreError> {
        let (known_groups, known_profiles) = {
            let mut shared = self.shared.lock().unwrap();
            let attempt = shared.rule_writes;
            shared.rule_writes += 1;
            if shared.fail_rule_writes
                || shared.failing_rule_write == Some(attempt)
                || shared.failing_rule_writes_from.is_some_and(|from| attempt >= from)
            {
                return Err(CoreError::Transport {
                    message: "rule write refused".into(),
                    status: Some(503),
                });
            }
            let groups: HashSet<EntityId> =
                shared.firewall_groups.iter().map(|g| g.id.clone()).collect();
            let profiles: HashSet<EntityId> = shared
                .app_profiles
                .iter()
                .map(|p| p.reference.id.clone())
                .chain(
                    shared
                        .network_context_profiles
                        .iter()
                        .map(|p| p.reference.id.clone()),
                )
                .collect();
            (groups, profiles)
        };

        for rule in rules {
            if rule.violates_profile_exclusivity() {
                return Err(CoreError::ValidationFailed {
                    message: format!("rule {} mixes profile kinds", rule.name),
                });
            }
            let unknown = rule
                .source_firewall_groups
                .iter()
                .chain(&rule.destination_firewall_groups)
                .map(|g| &g.id)
                .find(|id| !known_groups.contains(*id))
                .or_else(|| {
                    rule.application_port_profiles
                        .iter()
                        .chain(&rule.network_context_profiles)
                        .map(|p| &p.id)
                        .find(|id| !known_profiles.contains(*id))
                });
            if let Some(id) = unknown {
                return Err(CoreError::ValidationFailed {
                    message: format!("unknown reference {id}"),
                });
            }
        }

        let mut next_id = self.shared.lock().unwrap().next_id;
        let stored: Vec<DistributedFirewallRule> = rules
            .iter()
            .cloned()
            .map(|mut rule| {
                next_id += 1;
                rule.id = Some(EntityId::from(format!("urn:vcloud:rule:{next_id}")));
                // The server does not promise reference order.
                rule.application_port_profiles.reverse();
                rule.network_context_profiles.reverse();
                rule
            })
            .collect();
        self.shared.lock().unwrap().next_id = next_id;

        self.with_group(group, |state, writes| {
            writes.push(format!("store_rules {group} {}", stored.len()));
            state.rules.clone_from(&stored);
            Ok(DistributedFirewallRuleSet::from(stored))
        })
    }
}

impl DfwTransport for InMemoryAuthority {
    async fn activation_state(&self, group: &GroupId) -> Result<DfwActivationState, CoreError> {
        self.with_group(group, |state, _| {
            Ok(DfwActivationState {
                dfw_enabled: state.dfw_enabled,
                default_policy_enabled: state.default_policy_enabled,
            })
        })
    }

    async fn set_dfw_enabled(&self, group: &GroupId, enabled: bool) -> Result<(), CoreError> {
        self.with_group(group, |state, writes| {
            writes.push(format!("set_dfw_enabled {group} {enabled}"));
            state.dfw_enabled = enabled;
            // Activation brings up the default policy enabled.
            state.default_policy_enabled = enabled;
            Ok(())
        })
    }

    async fn set_default_policy_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> Result<(), CoreError> {
        self.with_group(group, |state, writes| {
            if !state.dfw_enabled {
                return Err(CoreError::ValidationFailed {
                    message: "DFW is not active".into(),
                });
            }
            writes.push(format!("set_default_policy_enabled {group} {enabled}"));
            state.default_policy_enabled = enabled;
            Ok(())
        })
    }

    async fn fetch_rules(&self, group: &GroupId) -> Result<DistributedFirewallRuleSet, CoreError> {
        self.with_group(group, |state, _| {
            Ok(DistributedFirewallRuleSet::from(state.rules.clone()))
        })
    }

    async fn store_rules(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> Result<DistributedFirewallRuleSet, CoreError> {
        self.store(group, rules)
    }
}

impl VersionNegotiation for InMemoryAuthority {
    fn negotiated_version(&self) -> ApiVersion {
        self.version
    }
}

impl FirewallGroupCatalog for InMemoryAuthority {
    async fn create_firewall_group(
        &self,
        spec: &FirewallGroupSpec,
    ) -> Result<FirewallGroupRef, CoreError> {
        self.with_group(&spec.owner, |_, _| Ok(()))?;
        let mut shared = self.shared.lock().unwrap();
        let id = shared.allocate("firewallGroup");
        let created = FirewallGroupRef::new(id, spec.name.clone());
        shared.firewall_groups.push(created.clone());
        shared
            .writes
            .push(format!("create_firewall_group {}", spec.kind));
        Ok(created)
    }

    async fn delete_firewall_group(&self, group: &FirewallGroupRef) -> Result<(), CoreError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.fail_firewall_group_deletes {
            return Err(CoreError::Transport {
                message: "delete refused".into(),
                status: Some(500),
            });
        }
        let in_use = shared.groups.values().flat_map(|g| &g.rules).any(|rule| {
            rule.source_firewall_groups
                .iter()
                .chain(&rule.destination_firewall_groups)
                .any(|r| r.id == group.id)
        });
        if in_use {
            return Err(CoreError::ValidationFailed {
                message: format!("firewall group {} is in use", group.id),
            });
        }
        shared.firewall_groups.retain(|g| g.id != group.id);
        shared
            .writes
            .push(format!("delete_firewall_group {}", group.name));
        Ok(())
    }
}

impl ProfileCatalog for InMemoryAuthority {
    async fn list_application_port_profiles(
        &self,
    ) -> Result<Vec<ApplicationPortProfileEntry>, CoreError> {
        Ok(self.shared.lock().unwrap().app_profiles.clone())
    }

    async fn list_network_context_profiles(
        &self,
    ) -> Result<Vec<NetworkContextProfileEntry>, CoreError> {
        Ok(self.shared.lock().unwrap().network_context_profiles.clone())
    }
}

impl GroupAdministration for InMemoryAuthority {
    async fn create_vdc_group(&self, spec: &VdcGroupSpec) -> Result<GroupId, CoreError> {
        let mut shared = self.shared.lock().unwrap();
        let id = GroupId::from(shared.allocate("vdcGroup"));
        shared.groups.insert(id.clone(), GroupState::default());
        shared.writes.push(format!("create_vdc_group {}", spec.name));
        Ok(id)
    }

    async fn delete_vdc_group(&self, group: &GroupId) -> Result<(), CoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.groups.remove(group).ok_or_else(|| CoreError::NotFound {
            entity_type: "VDC group".into(),
            identifier: group.to_string(),
        })?;
        shared.writes.push(format!("delete_vdc_group {group}"));
        Ok(())
    }

    async fn create_delegated_identity(
        &self,
        spec: &DelegatedIdentitySpec,
    ) -> Result<DelegatedIdentity, CoreError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.fail_user_creation {
            return Err(CoreError::ValidationFailed {
                message: format!("user {} rejected", spec.username),
            });
        }
        let id = EntityId::from(shared.allocate("user"));
        shared.users.push((id.clone(), spec.username.clone()));
        shared
            .writes
            .push(format!("create_delegated_identity {}", spec.username));
        Ok(DelegatedIdentity {
            user_id: id,
            identity: Identity {
                label: format!("{}@{}", spec.username, spec.org_name),
                kind: PrincipalKind::OrgAdmin {
                    org: spec.org_name.clone(),
                },
                credentials: IdentityCredentials::Password {
                    username: spec.username.clone(),
                    password: spec.password.clone(),
                },
            },
        })
    }

    async fn delete_delegated_identity(&self, identity: &DelegatedIdentity) -> Result<(), CoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.users.retain(|(id, _)| *id != identity.user_id);
        shared
            .writes
            .push(format!("delete_delegated_identity {}", identity.identity.label));
        Ok(())
    }
}
