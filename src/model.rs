//! Typed records produced from controller output.
//!
//! All records serialize with camelCase field names, so a harvest renders as
//! a plain JSON array of objects.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::WlcError;

/// One access point known to the controller.
///
/// `mac_address` is stable across renames; `name` is the key most commands
/// take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    pub name: String,
    pub mac_address: String,
    pub model: String,
    pub serial: String,
    pub group: String,
}

impl AccessPoint {
    /// A record that only carries the AP name, used when its detail could
    /// not be fetched.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True when nothing beyond the name is known.
    pub fn is_detail_empty(&self) -> bool {
        self.mac_address.is_empty()
            && self.model.is_empty()
            && self.serial.is_empty()
            && self.group.is_empty()
    }
}

/// Wired neighbor reported by CDP for one AP.
///
/// All fields are empty when the AP has no neighbor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CdpNeighbor {
    pub local_interface: String,
    pub remote_device_name: String,
    pub remote_interface: String,
    #[serde(rename = "remoteDeviceIPAddress")]
    pub remote_device_ip_address: String,
}

impl CdpNeighbor {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Uplink counters of one AP at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EthernetInterfaceStat {
    pub name: String,
    pub status: String,
    pub speed_and_duplex: String,
    /// `tx/rx`, empty unless both counters were reported.
    pub tx_rx_byte_counts: String,
    pub drops: String,
}

/// Administrative state of an AP LAN port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LanPortState {
    Enable,
    Disable,
}

impl LanPortState {
    /// The token the controller CLI expects in commands.
    pub fn as_str(&self) -> &'static str {
        match self {
            LanPortState::Enable => "enable",
            LanPortState::Disable => "disable",
        }
    }

    /// Maps the summary table's `enabled`/`disabled` column. Anything else is
    /// not a state.
    pub fn from_summary_token(token: &str) -> Option<Self> {
        match token {
            "enabled" => Some(LanPortState::Enable),
            "disabled" => Some(LanPortState::Disable),
            _ => None,
        }
    }
}

impl fmt::Display for LanPortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One LAN pass-through port on an AP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LanPort {
    pub port_id: u8,
    /// `None` when the summary line carried no recognisable state.
    pub state: Option<LanPortState>,
    pub vlan_id: u16,
}

/// Renders a harvest as a JSON array of objects.
pub fn inventory_to_json(access_points: &[AccessPoint]) -> Result<String, WlcError> {
    serde_json::to_string(access_points)
        .map_err(|e| WlcError::Internal(format!("encode inventory json: {e}")))
}
