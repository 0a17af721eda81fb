//! OpenAPI wire types for the Cloud Director `/cloudapi/1.0.0/` endpoints
//! touched by distributed firewall management.
//!
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.
//! Rule and group bodies keep unknown fields in a flattened `extra` map so a
//! read-modify-write cycle never drops attributes this client does not model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Shared ───────────────────────────────────────────────────────────

/// `{id, name}` pointer used throughout the OpenAPI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OpenApiReference {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Generic pagination wrapper returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPage<T> {
    pub result_total: i64,
    pub page_count: i32,
    pub page: i32,
    pub page_size: i32,
    pub values: Vec<T>,
}

/// Minimal body of a synchronous create response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedEntity {
    pub id: String,
}

// ── Versions ─────────────────────────────────────────────────────────

/// `GET /api/versions` (JSON rendition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedVersions {
    #[serde(default)]
    pub version_info: Vec<VersionInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub deprecated: bool,
}

// ── Tasks ────────────────────────────────────────────────────────────

/// Asynchronous task, polled through the `Location` header of a 202 reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    /// One of: `queued`, `preRunning`, `running`, `success`, `error`,
    /// `aborted`, `canceled`.
    pub status: String,
    #[serde(default)]
    pub operation: Option<String>,
    /// The entity the task created or modified.
    #[serde(default)]
    pub owner: Option<OpenApiReference>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    #[serde(default)]
    pub minor_error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── VDC Groups ───────────────────────────────────────────────────────

/// VDC group from `GET /vdcGroups/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VdcGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub dfw_enabled: bool,
    /// Catch-all for additional fields not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Create a VDC group: `POST /vdcGroups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VdcGroupCreate {
    pub org_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub participating_org_vdcs: Vec<ParticipatingOrgVdc>,
    pub local_egress: bool,
    pub universal_networking_enabled: bool,
    /// `LOCAL` or `UNIVERSAL`.
    #[serde(rename = "type")]
    pub group_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipatingOrgVdc {
    pub vdc_ref: OpenApiReference,
    pub org_ref: OpenApiReference,
}

// ── DFW Policies ─────────────────────────────────────────────────────

/// `GET/PUT /vdcGroups/{id}/dfwPolicies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DfwPolicies {
    pub enabled: bool,
    /// Present only while the DFW is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<DfwPolicy>,
}

/// The default policy, owner of the ordered rule list and of the implicit
/// catch-all rule toggled through `enabled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DfwPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── DFW Rules ────────────────────────────────────────────────────────

/// `GET/PUT /vdcGroups/{id}/dfwPolicies/{policyId}/rules`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedFirewallRules {
    #[serde(default)]
    pub values: Vec<DistributedFirewallRule>,
}

/// One rule as it travels on the wire.
///
/// Enumerations are kept as strings here; `vcd-dfw` parses them into typed
/// values and reports malformed ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedFirewallRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Legacy action (`ALLOW`/`DROP`), deprecated from API 35.2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Action (`ALLOW`/`DROP`/`REJECT`) from API 35.2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_value: Option<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_firewall_groups: Option<Vec<OpenApiReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_firewall_groups: Option<Vec<OpenApiReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_port_profiles: Option<Vec<OpenApiReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_context_profiles: Option<Vec<OpenApiReference>>,
    pub ip_protocol: String,
    pub logging: bool,
    pub direction: String,
    /// Free-text comment, from API 36.2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Firewall Groups ──────────────────────────────────────────────────

/// Create an IP set or security group: `POST /firewallGroups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallGroupCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `IP_SET` or `SECURITY_GROUP`.
    #[serde(rename = "type")]
    pub group_type: String,
    pub owner_ref: OpenApiReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
}

// ── Users and roles ──────────────────────────────────────────────────

/// Role record from `GET /roles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// Create a local user: `POST /users`.
///
/// No `Debug`: the body carries a plaintext password.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role_entity_refs: Vec<OpenApiReference>,
    pub org_entity_ref: OpenApiReference,
    pub password: String,
    pub enabled: bool,
    /// `LOCAL` for users stored in Cloud Director itself.
    pub provider_type: String,
}

// ── Profiles ─────────────────────────────────────────────────────────

/// Application port profile from `GET /applicationPortProfiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPortProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `SYSTEM`, `PROVIDER` or `TENANT`.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Network context profile from `GET /networkContextProfiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContextProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn rule_keeps_unknown_fields() {
        let raw = json!({
            "id": "rule-1",
            "name": "web",
            "actionValue": "REJECT",
            "enabled": true,
            "ipProtocol": "IPV4",
            "logging": false,
            "direction": "IN",
            "version": { "version": 3 },
            "sourceFirewallGroups": null
        });

        let rule: DistributedFirewallRule = serde_json::from_value(raw).unwrap();
        assert_eq!(rule.action_value.as_deref(), Some("REJECT"));
        assert!(rule.source_firewall_groups.is_none());
        assert_eq!(rule.extra.get("version"), Some(&json!({ "version": 3 })));

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["version"], json!({ "version": 3 }));
        assert!(back.get("action").is_none());
        assert!(back.get("sourceFirewallGroups").is_none());
    }

    #[test]
    fn dfw_policies_omit_absent_default_policy() {
        let body = serde_json::to_value(DfwPolicies {
            enabled: true,
            default_policy: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "enabled": true }));
    }
}
