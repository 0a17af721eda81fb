// ── Authority interfaces ──
//
// The remote network-policy authority as the core sees it. The controller,
// verifier and workflow depend only on these traits; `crate::backend`
// implements them over the Cloud Director OpenAPI and the test suite over an
// in-memory double.

use std::future::Future;

use secrecy::SecretString;
use vcd_api::ApiVersion;

use crate::config::Identity;
use crate::error::CoreError;
use crate::model::{
    DfwActivationState, DistributedFirewallRule, DistributedFirewallRuleSet, EntityId,
    FirewallGroupKind, FirewallGroupRef, GroupId,
};
use crate::resolver::{ApplicationPortProfileEntry, NetworkContextProfileEntry};

// ── Request shapes ──────────────────────────────────────────────────

/// Parameters for creating an IP set or security group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallGroupSpec {
    pub kind: FirewallGroupKind,
    /// The VDC group that will own the firewall group.
    pub owner: GroupId,
    pub name: String,
    pub description: Option<String>,
    /// IP addresses, CIDRs or ranges. Only meaningful for IP sets.
    pub members: Vec<String>,
}

/// One VDC participating in a VDC group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipatingVdc {
    pub vdc: EntityId,
    pub org: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdcGroupSpec {
    pub org_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub participating: Vec<ParticipatingVdc>,
}

/// Role granted to delegated principals.
pub const ORG_ADMIN_ROLE: &str = "Organization Administrator";

/// A local org-admin user to create for a delegated principal.
#[derive(Debug, Clone)]
pub struct DelegatedIdentitySpec {
    pub org_id: EntityId,
    /// Organization name used in the `user@org` login.
    pub org_name: String,
    pub username: String,
    pub password: SecretString,
    pub role: String,
}

/// A user created by [`GroupAdministration::create_delegated_identity`].
#[derive(Debug, Clone)]
pub struct DelegatedIdentity {
    pub user_id: EntityId,
    pub identity: Identity,
}

// ── Traits ──────────────────────────────────────────────────────────

/// Read and write the DFW state of a VDC group.
pub trait DfwTransport {
    fn activation_state(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<DfwActivationState, CoreError>> + Send;

    fn set_dfw_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn set_default_policy_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn fetch_rules(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<DistributedFirewallRuleSet, CoreError>> + Send;

    /// Replace the whole list and return the authority's post-write state.
    fn store_rules(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> impl Future<Output = Result<DistributedFirewallRuleSet, CoreError>> + Send;
}

pub trait VersionNegotiation {
    fn negotiated_version(&self) -> ApiVersion;
}

pub trait FirewallGroupCatalog {
    fn create_firewall_group(
        &self,
        spec: &FirewallGroupSpec,
    ) -> impl Future<Output = Result<FirewallGroupRef, CoreError>> + Send;

    fn delete_firewall_group(
        &self,
        group: &FirewallGroupRef,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

pub trait ProfileCatalog {
    fn list_application_port_profiles(
        &self,
    ) -> impl Future<Output = Result<Vec<ApplicationPortProfileEntry>, CoreError>> + Send;

    fn list_network_context_profiles(
        &self,
    ) -> impl Future<Output = Result<Vec<NetworkContextProfileEntry>, CoreError>> + Send;
}

/// Provisioning of the scratch environment a check runs in.
pub trait GroupAdministration {
    fn create_vdc_group(
        &self,
        spec: &VdcGroupSpec,
    ) -> impl Future<Output = Result<GroupId, CoreError>> + Send;

    fn delete_vdc_group(&self, group: &GroupId)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Create a user holding `spec.role` in the organization and return an
    /// identity that logs in as it.
    fn create_delegated_identity(
        &self,
        spec: &DelegatedIdentitySpec,
    ) -> impl Future<Output = Result<DelegatedIdentity, CoreError>> + Send;

    fn delete_delegated_identity(
        &self,
        identity: &DelegatedIdentity,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Everything the rule-sync workflow needs from one authenticated principal.
pub trait Authority:
    DfwTransport + VersionNegotiation + FirewallGroupCatalog + ProfileCatalog + Sync
{
}

impl<T> Authority for T where
    T: DfwTransport + VersionNegotiation + FirewallGroupCatalog + ProfileCatalog + Sync
{
}

// ── Borrowed authorities ────────────────────────────────────────────

impl<T: DfwTransport + Sync> DfwTransport for &T {
    fn activation_state(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<DfwActivationState, CoreError>> + Send {
        (**self).activation_state(group)
    }

    fn set_dfw_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).set_dfw_enabled(group, enabled)
    }

    fn set_default_policy_enabled(
        &self,
        group: &GroupId,
        enabled: bool,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).set_default_policy_enabled(group, enabled)
    }

    fn fetch_rules(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<DistributedFirewallRuleSet, CoreError>> + Send {
        (**self).fetch_rules(group)
    }

    fn store_rules(
        &self,
        group: &GroupId,
        rules: &[DistributedFirewallRule],
    ) -> impl Future<Output = Result<DistributedFirewallRuleSet, CoreError>> + Send {
        (**self).store_rules(group, rules)
    }
}

impl<T: VersionNegotiation> VersionNegotiation for &T {
    fn negotiated_version(&self) -> ApiVersion {
        (**self).negotiated_version()
    }
}
