// ── Identity and reference types ──
//
// Rules point at firewall groups and profiles by ID only. The referenced
// objects are owned elsewhere; `crate::resolver` validates IDs against a
// catalog before they are placed into rules.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── EntityId ────────────────────────────────────────────────────────

/// Opaque identifier of any Cloud Director entity (usually a URN such as
/// `urn:vcloud:firewallGroup:<uuid>`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── GroupId ─────────────────────────────────────────────────────────

/// Identifier of a VDC group, the unit a DFW rule set belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Firewall groups ─────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum FirewallGroupKind {
    #[serde(rename = "IP_SET")]
    #[strum(serialize = "IP_SET")]
    IpSet,
    #[serde(rename = "SECURITY_GROUP")]
    #[strum(serialize = "SECURITY_GROUP")]
    SecurityGroup,
}

/// Pointer at an IP set or security group owned by one VDC group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallGroupRef {
    pub id: EntityId,
    pub name: String,
}

impl FirewallGroupRef {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ── Profiles ────────────────────────────────────────────────────────

/// Pointer at an application-port profile or a network-context profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: EntityId,
    pub name: String,
}

impl ProfileRef {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
