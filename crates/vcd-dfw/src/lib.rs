//! Distributed firewall (DFW) rule-set synchronization for Cloud Director
//! VDC groups.
//!
//! This crate owns the state-and-protocol layer between `vcd-api` and the
//! `vcd-dfw-check` binary:
//!
//! - **[`DfwController`]**: group lifecycle (`activate` / `deactivate`,
//!   default-policy toggle) and atomic full replacement of the ordered rule
//!   list, with local validation before anything is sent.
//!
//! - **[`Capabilities`]**: maps the negotiated API version to the rule
//!   fields the server accepts (`actionValue` from 35.2, `comments` from
//!   36.2).
//!
//! - **[`resolver`]** and **[`RuleDefinitionBuilder`]**: validate candidate
//!   references against catalogs and generate deterministic rule fixtures
//!   that respect profile exclusivity.
//!
//! - **[`verifier::verify`]**: compares a submitted rule list against what
//!   the authority stored.
//!
//! - **[`authority`]**: the traits every collaborator is reached through;
//!   [`VcdBackend`] implements them over the OpenAPI client.
//!
//! - **[`workflow`]**: the end-to-end run per principal with guaranteed
//!   release of the prerequisites it creates.

pub mod authority;
pub mod backend;
pub mod builder;
pub mod capability;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod resolver;
pub mod verifier;
pub mod workflow;

// ── Primary re-exports ──────────────────────────────────────────────
pub use authority::{
    Authority, DelegatedIdentity, DelegatedIdentitySpec, DfwTransport, FirewallGroupCatalog,
    FirewallGroupSpec, GroupAdministration, ParticipatingVdc, ProfileCatalog, VdcGroupSpec,
    VersionNegotiation,
};
pub use backend::VcdBackend;
pub use builder::{ReferencePool, RuleDefinitionBuilder};
pub use capability::Capabilities;
pub use config::{ConnectionConfig, Identity, IdentityCredentials, PrincipalKind, TlsVerification};
pub use controller::DfwController;
pub use error::CoreError;
pub use resolver::{ApplicationPortProfileEntry, CatalogItem, NetworkContextProfileEntry};
pub use verifier::{Discrepancy, RuleField};
pub use workflow::{
    CleanupFailure, Principal, ScopedResources, ScratchEnvironment, WorkflowError, WorkflowOptions, WorkflowReport,
    run_for_each_principal, run_rule_sync_workflow,
};

pub use model::{
    ActionValue, DfwActivationState, Direction, DistributedFirewallRule,
    DistributedFirewallRuleSet, EntityId, FirewallGroupKind, FirewallGroupRef, GroupId, IpProtocol,
    LegacyAction, ProfileRef, RuleAction,
};

pub use vcd_api::ApiVersion;
