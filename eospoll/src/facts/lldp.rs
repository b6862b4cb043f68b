//! LLDP neighbor parsing for `show lldp neighbors detail | json`.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Neighbor seen on one local interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LldpNeighbor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_port_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_system_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_chassis_id: Option<String>,
    pub local_port_id: String,
}

impl LldpNeighbor {
    fn has_remote(&self) -> bool {
        self.remote_port_id.is_some()
            || self.remote_system_name.is_some()
            || self.remote_chassis_id.is_some()
    }
}

type PortIdStrategy = fn(&Map<String, Value>) -> Option<String>;

/// Ways to find the remote port id in `neighborInterfaceInfo`, in priority order.
const PORT_ID_STRATEGIES: [PortIdStrategy; 3] = [
    versioned_interface_id,
    local_interface_id,
    mac_addressed_description,
];

fn versioned_interface_id(info: &Map<String, Value>) -> Option<String> {
    non_empty(info.get("interfaceId_v2")).map(str::to_string)
}

fn local_interface_id(info: &Map<String, Value>) -> Option<String> {
    if non_empty(info.get("interfaceIdType")) != Some("local") {
        return None;
    }
    non_empty(info.get("interfaceId")).map(strip_quotes)
}

// servers announce themselves by MAC and put the port name in the description
fn mac_addressed_description(info: &Map<String, Value>) -> Option<String> {
    if non_empty(info.get("interfaceIdType")) != Some("macAddress") {
        return None;
    }
    non_empty(info.get("interfaceDescription")).map(strip_quotes)
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn strip_quotes(s: &str) -> String {
    s.replace('"', "")
}

/// Turn a dotted chassis id into colon-separated octets.
///
/// `"001a.2b3c.4d5e"` becomes `"00:1a:2b:3c:4d:5e"`.
pub fn reformat_chassis_id(dotted: &str) -> String {
    let digits: Vec<char> = dotted.chars().filter(|c| *c != '.').collect();
    digits
        .chunks(2)
        .map(|octet| octet.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// Parse the `lldpNeighbors` mapping, keyed by local interface.
///
/// Interfaces whose entries carry no remote information are left out.
pub fn parse_neighbors(data: &Value) -> IndexMap<String, LldpNeighbor> {
    let mut neighbors = IndexMap::new();
    let Some(by_interface) = data.get("lldpNeighbors").and_then(Value::as_object) else {
        return neighbors;
    };

    for (local, entry) in by_interface {
        let mut neighbor = LldpNeighbor {
            local_port_id: local.clone(),
            ..Default::default()
        };
        let infos = entry
            .get("lldpNeighborInfo")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for info in infos {
            if let Some(port) = info
                .get("neighborInterfaceInfo")
                .and_then(Value::as_object)
                .and_then(|i| PORT_ID_STRATEGIES.iter().find_map(|strategy| strategy(i)))
            {
                neighbor.remote_port_id = Some(port);
            }
            if let Some(name) = non_empty(info.get("systemName")) {
                neighbor.remote_system_name = Some(name.to_string());
            }
            if let Some(chassis) = non_empty(info.get("chassisId")) {
                neighbor.remote_chassis_id = Some(reformat_chassis_id(chassis));
            }
        }

        if neighbor.has_remote() {
            neighbors.insert(local.clone(), neighbor);
        }
    }
    neighbors
}
