// ── Cloud Director backend ──
//
// Implements the authority traits over `vcd_api::OpenApiClient`. One
// backend is one authenticated principal; the workflow connects one per
// identity.

use secrecy::ExposeSecret;
use tracing::{debug, info};
use vcd_api::openapi_types as wire;
use vcd_api::{ApiVersion, OpenApiClient};

use crate::authority::{
    DelegatedIdentity, DelegatedIdentitySpec, DfwTransport, FirewallGroupCatalog,
    FirewallGroupSpec, GroupAdministration, ProfileCatalog, VdcGroupSpec, VersionNegotiation,
};
use crate::capability::Capabilities;
use crate::config::{ConnectionConfig, Identity, IdentityCredentials, PrincipalKind};
use crate::convert::{
    app_port_profile_from_wire, network_context_profile_from_wire, rule_from_wire, rule_to_wire,
};
use crate::error::CoreError;
use crate::model::{
    DfwActivationState, DistributedFirewallRule, DistributedFirewallRuleSet, EntityId,
    FirewallGroupKind, FirewallGroupRef, GroupId,
};
use crate::resolver::{ApplicationPortProfileEntry, NetworkContextProfileEntry};

const PROFILE_PAGE_SIZE: i32 = 128;

/// VDC groups created here never span sites or egress locally.
const VDC_GROUP_TYPE: &str = "LOCAL";

/// Delegated users live in Cloud Director's own directory.
const USER_PROVIDER_TYPE: &str = "LOCAL";

pub struct VcdBackend {
    client: OpenApiClient,
    capabilities: Capabilities,
}

impl VcdBackend {
    /// Negotiate, authenticate as `identity`, and wrap the session.
    pub async fn connect(config: &ConnectionConfig, identity: &Identity) -> Result<Self, CoreError> {
        let client = OpenApiClient::connect(
            config.url.as_str(),
            &identity.to_api_credentials(),
            identity.session_scope(),
            &config.transport(),
            config.api_version_ceiling,
        )
        .await?;
        info!(principal = %identity.label, version = %client.version(), "connected to Cloud Director");
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: OpenApiClient) -> Self {
        let capabilities = Capabilities::for_version(client.version());
        Self {
            client,
            capabilities,
        }
    }

    pub fn client(&self) -> &OpenApiClient {
        &self.client
    }

    fn rule_set_from_wire(
        &self,
        rules: wire::DistributedFirewallRules,
    ) -> Result<DistributedFirewallRuleSet, CoreError> {
        rules
            .values
            .into_iter()
            .map(|r| rule_from_wire(r, self.capabilities))
            .collect::<Result<Vec<_>, _>>()
            .map(DistributedFirewallRuleSet::from)
    }
}

// ── DFW ──────────────────────────────────────────────────────────────

impl DfwTransport for VcdBackend {
    async fn activation_state(&self, group: &GroupId) -> Result<DfwActivationState, CoreError> {
        let policies = self.client.get_dfw_policies(group.as_str()).await?;
        Ok(DfwActivationState {
            dfw_enabled: policies.enabled,
            default_policy_enabled: policies.enabled
                && policies
                    .default_policy
                    .and_then(|p| p.enabled)
                    .unwrap_or(false),
        })
    }

    async fn set_dfw_enabled(&self, group: &GroupId, enabled: bool) -> Result<(), CoreError> {
        let mut policies = self.client.get_dfw_policies(group.as_str()).await?;
        policies.enabled = enabled;
        self.client
            .update_dfw_policies(group.as_str(), &policies)
            .await?;
        Ok(())
    }

    async fn set_default_policy_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> Result<(), CoreError> {
        let policies = self.client.get_dfw_policies(group.as_str()).await?;
        let mut policy = policies
            .default_policy
            .ok_or_else(|| CoreError::not_found("default DFW policy", group.as_str()))?;
        policy.enabled = Some(enabled);
        self.client
            .update_default_dfw_policy(group.as_str(), &policy)
            .await?;
        Ok(())
    }

    async fn fetch_rules(&self, group: &GroupId) -> Result<DistributedFirewallRuleSet, CoreError> {
        let rules = self.client.get_dfw_rules(group.as_str()).await?;
        self.rule_set_from_wire(rules)
    }

    async fn store_rules(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> Result<DistributedFirewallRuleSet, CoreError> {
        let body = wire::DistributedFirewallRules {
            values: rules.iter().map(rule_to_wire).collect(),
        };
        debug!(%group, rules = body.values.len(), "writing DFW rule list");
        self.client.put_dfw_rules(group.as_str(), &body).await?;

        let stored = self.client.get_dfw_rules(group.as_str()).await?;
        self.rule_set_from_wire(stored)
    }
}

impl VersionNegotiation for VcdBackend {
    fn negotiated_version(&self) -> ApiVersion {
        self.client.version()
    }
}

// ── Catalogs ─────────────────────────────────────────────────────────

impl FirewallGroupCatalog for VcdBackend {
    async fn create_firewall_group(
        &self,
        spec: &FirewallGroupSpec,
    ) -> Result<FirewallGroupRef, CoreError> {
        let ip_addresses = match spec.kind {
            FirewallGroupKind::IpSet => spec.members.clone(),
            FirewallGroupKind::SecurityGroup => Vec::new(),
        };
        let body = wire::FirewallGroupCreate {
            name: spec.name.clone(),
            description: spec.description.clone(),
            group_type: spec.kind.to_string(),
            owner_ref: wire::OpenApiReference::id(spec.owner.as_str()),
            ip_addresses,
        };
        let id = self.client.create_firewall_group(&body).await?;
        debug!(kind = %spec.kind, %id, "created firewall group");
        Ok(FirewallGroupRef::new(id, spec.name.clone()))
    }

    async fn delete_firewall_group(&self, group: &FirewallGroupRef) -> Result<(), CoreError> {
        self.client
            .delete_firewall_group(group.id.as_str())
            .await?;
        Ok(())
    }
}

impl ProfileCatalog for VcdBackend {
    async fn list_application_port_profiles(
        &self,
    ) -> Result<Vec<ApplicationPortProfileEntry>, CoreError> {
        let profiles = self
            .client
            .paginate_all(PROFILE_PAGE_SIZE, |page, size| {
                self.client.list_application_port_profiles(page, size)
            })
            .await?;
        Ok(profiles
            .into_iter()
            .map(app_port_profile_from_wire)
            .collect())
    }

    async fn list_network_context_profiles(
        &self,
    ) -> Result<Vec<NetworkContextProfileEntry>, CoreError> {
        let profiles = self
            .client
            .paginate_all(PROFILE_PAGE_SIZE, |page, size| {
                self.client.list_network_context_profiles(page, size)
            })
            .await?;
        Ok(profiles
            .into_iter()
            .map(network_context_profile_from_wire)
            .collect())
    }
}

impl GroupAdministration for VcdBackend {
    async fn create_vdc_group(&self, spec: &VdcGroupSpec) -> Result<GroupId, CoreError> {
        let body = wire::VdcGroupCreate {
            org_id: spec.org_id.to_string(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            participating_org_vdcs: spec
                .participating
                .iter()
                .map(|p| wire::ParticipatingOrgVdc {
                    vdc_ref: wire::OpenApiReference::id(p.vdc.as_str()),
                    org_ref: wire::OpenApiReference::id(p.org.as_str()),
                })
                .collect(),
            local_egress: false,
            universal_networking_enabled: false,
            group_type: VDC_GROUP_TYPE.to_owned(),
        };
        let id = self.client.create_vdc_group(&body).await?;
        info!(%id, name = %spec.name, "created VDC group");
        Ok(GroupId::from(id))
    }

    async fn delete_vdc_group(&self, group: &GroupId) -> Result<(), CoreError> {
        self.client.delete_vdc_group(group.as_str()).await?;
        info!(%group, "deleted VDC group");
        Ok(())
    }

    async fn create_delegated_identity(
        &self,
        spec: &DelegatedIdentitySpec,
    ) -> Result<DelegatedIdentity, CoreError> {
        let role = self
            .client
            .find_role(spec.org_id.as_str(), &spec.role)
            .await?
            .ok_or_else(|| CoreError::not_found("role", spec.role.as_str()))?;

        let body = wire::UserCreate {
            username: spec.username.clone(),
            full_name: None,
            role_entity_refs: vec![wire::OpenApiReference::id(role.id)],
            org_entity_ref: wire::OpenApiReference::id(spec.org_id.as_str()),
            password: spec.password.expose_secret().to_owned(),
            enabled: true,
            provider_type: USER_PROVIDER_TYPE.to_owned(),
        };
        let id = self.client.create_user(&body).await?;
        info!(%id, user = %spec.username, org = %spec.org_name, "created delegated user");

        Ok(DelegatedIdentity {
            user_id: EntityId::from(id),
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
        self.client
            .delete_user(identity.user_id.as_str())
            .await?;
        info!(id = %identity.user_id, "deleted delegated user");
        Ok(())
    }
}
