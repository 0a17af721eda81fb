use serde::{Deserialize, Serialize};

/// Lifecycle flags of one VDC group's distributed firewall.
///
/// `Inactive <-> Active` is governed by `dfw_enabled`; the default-policy
/// flag is orthogonal and only writable while the DFW is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DfwActivationState {
    pub dfw_enabled: bool,
    pub default_policy_enabled: bool,
}

impl DfwActivationState {
    pub const INACTIVE: Self = Self {
        dfw_enabled: false,
        default_policy_enabled: false,
    };
}
