//! Edge facts gathered from devices, one stream per layer.
//!
//! Combined JSON shape:
//! {
//!   "devices": ["npccosr01", { "name": "npccosr02" }],
//!   "physical": [
//!     { "source": "npccosr01", "target": "npcdisw01",
//!       "source_interface": "Eth1/1", "target_interface": "Eth1/49" }
//!   ],
//!   "redundancy": [
//!     { "source": "npccosr01", "target": "npccosr02", "group": 10,
//!       "virtual_ip": "10.0.0.1", "active_priority": 110, "standby_priority": 100 }
//!   ],
//!   "peering": [
//!     { "source": "npccosr01", "target": "wpccosr01", "peering_type": "eBGP",
//!       "local_as": 65001, "remote_as": 65002, "neighbor_ip": "10.255.0.2" }
//!   ]
//! }
//!
//! The collectors also write one document per layer, `{ "nodes": [...],
//! "edges": [...] }`; see [`load`]. Content is taken as reported: nothing
//! here checks it against the real network.

pub mod load;

pub use load::{load_combined, load_sources};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// A device named on its own, either `"name"` or `{ "name": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceRef {
    Name(String),
    // Collector node rows carry extra keys (e.g. "type"); they are ignored.
    Entry { name: String },
}

impl DeviceRef {
    pub fn name(&self) -> &str {
        match self {
            DeviceRef::Name(name) | DeviceRef::Entry { name } => name,
        }
    }
}

/// Physical adjacency between two device ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalFact {
    pub source: String,
    pub target: String,

    #[serde(default)]
    pub source_interface: Option<String>,

    #[serde(default)]
    pub target_interface: Option<String>,
}

/// Two devices sharing a first-hop-redundancy group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyFact {
    pub source: String,
    pub target: String,

    #[serde(default, deserialize_with = "deserialize_label")]
    pub group: Option<String>,

    #[serde(default)]
    pub virtual_ip: Option<String>,

    #[serde(default)]
    pub active_priority: Option<u32>,

    #[serde(default)]
    pub standby_priority: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeeringKind {
    #[serde(alias = "iBGP", alias = "ibgp")]
    Internal,
    #[serde(alias = "eBGP", alias = "ebgp")]
    External,
}

/// A routing peering between two devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringFact {
    pub source: String,
    pub target: String,

    #[serde(default)]
    pub peering_type: Option<PeeringKind>,

    #[serde(default)]
    pub local_as: Option<u32>,

    #[serde(default)]
    pub remote_as: Option<u32>,

    #[serde(default)]
    pub neighbor_ip: Option<String>,
}

impl PeeringFact {
    /// Declared peering kind, else derived from the AS numbers when both are
    /// known (same AS = internal).
    pub fn kind(&self) -> Option<PeeringKind> {
        self.peering_type.or(match (self.local_as, self.remote_as) {
            (Some(local), Some(remote)) if local == remote => Some(PeeringKind::Internal),
            (Some(_), Some(_)) => Some(PeeringKind::External),
            _ => None,
        })
    }
}

/// Everything the composer consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyFacts {
    #[serde(default)]
    pub devices: Vec<DeviceRef>,

    #[serde(default)]
    pub physical: Vec<PhysicalFact>,

    #[serde(default)]
    pub redundancy: Vec<RedundancyFact>,

    #[serde(default)]
    pub peering: Vec<PeeringFact>,
}

impl TopologyFacts {
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(DeviceRef::name)
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
            && self.physical.is_empty()
            && self.redundancy.is_empty()
            && self.peering.is_empty()
    }
}

fn deserialize_label<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // Group ids show up as numbers or strings depending on the platform.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Label>::deserialize(deserializer)?.map(|label| match label {
        Label::Text(s) => s.trim().to_string(),
        Label::Number(n) => n.to_string(),
    }))
}
