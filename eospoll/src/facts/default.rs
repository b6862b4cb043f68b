//! Default facts: system identity, running config, interfaces, LLDP, VLAN tagging.

use serde_json::{Map, Value, json};

use super::context::ParseContext;
use super::lldp::parse_neighbors;
use super::{DeviceFacts, FactCollector, reply_text};
use crate::driver::Response;
use crate::error::{FactsError, Result};

const SHOW_VERSION: usize = 0;
const RUNNING_CONFIG: usize = 1;
const SHOW_INTERFACES: usize = 2;
const LLDP_NEIGHBORS: usize = 3;
const SHOW_VLAN: usize = 4;

const COMMANDS: [&str; 5] = [
    "show version | json",
    "show running-config",
    "show interfaces | json",
    "show lldp neighbors detail | json",
    "show vlan | json",
];

type Extractor = fn(&Map<String, Value>) -> Option<Value>;

/// Interface attributes and how each is read from `show interfaces | json`.
const EXTRACTORS: [(&str, Extractor); 8] = [
    ("bandwidth", bandwidth_mbps),
    ("duplex", duplex),
    ("lineprotocol", line_protocol),
    ("macaddress", mac_address),
    ("description", description),
    ("mtu", mtu),
    ("operstatus", oper_status),
    ("channel-member", channel_members),
];

fn duplex(raw: &Map<String, Value>) -> Option<Value> {
    raw.get("duplex").cloned()
}

fn line_protocol(raw: &Map<String, Value>) -> Option<Value> {
    raw.get("lineProtocolStatus").cloned()
}

fn description(raw: &Map<String, Value>) -> Option<Value> {
    raw.get("description").cloned()
}

fn mtu(raw: &Map<String, Value>) -> Option<Value> {
    raw.get("mtu").cloned()
}

fn oper_status(raw: &Map<String, Value>) -> Option<Value> {
    raw.get("interfaceStatus").cloned()
}

/// Bandwidth in bit/s, reported in Mbit/s truncated toward zero.
fn bandwidth_mbps(raw: &Map<String, Value>) -> Option<Value> {
    let bw = raw.get("bandwidth")?;
    if let Some(bps) = bw.as_u64() {
        Some(json!(bps / 1_000_000))
    } else if let Some(bps) = bw.as_i64() {
        Some(json!(bps / 1_000_000))
    } else {
        bw.as_f64().map(|bps| json!((bps / 1_000_000.0).trunc() as i64))
    }
}

fn mac_address(raw: &Map<String, Value>) -> Option<Value> {
    ["physicalAddress", "burnedInAddress"]
        .iter()
        .find_map(|field| raw.get(*field).cloned())
}

fn channel_members(raw: &Map<String, Value>) -> Option<Value> {
    let members = raw.get("memberInterfaces")?.as_object()?;
    if members.is_empty() {
        return None;
    }
    Some(Value::Array(members.keys().cloned().map(Value::String).collect()))
}

/// Build one interface's attribute map; absent source fields stay absent.
pub fn interface_record(raw: &Map<String, Value>) -> Map<String, Value> {
    EXTRACTORS
        .iter()
        .filter_map(|(attribute, extract)| extract(raw).map(|value| (attribute.to_string(), value)))
        .collect()
}

/// Append `mac` unless already present, keeping first-seen order.
fn push_unique(macs: &mut Vec<String>, mac: &str) {
    if !macs.iter().any(|m| m == mac) {
        macs.push(mac.to_string());
    }
}

/// Append each VLAN's known member interfaces to its `Vlan<id>` interface's `tagged` list.
///
/// Members that are not known interfaces are skipped.
pub fn apply_vlan_tagging(interfaces: &mut Map<String, Value>, vlans: &Value) {
    let Some(vlans) = vlans.get("vlans").and_then(Value::as_object) else {
        return;
    };

    for (id, vlan) in vlans {
        let vlan_interface = format!("Vlan{}", id);
        if !interfaces.contains_key(&vlan_interface) {
            continue;
        }
        let members: Vec<Value> = vlan
            .get("interfaces")
            .and_then(Value::as_object)
            .map(|members| {
                members
                    .keys()
                    .filter(|name| interfaces.contains_key(*name))
                    .cloned()
                    .map(Value::String)
                    .collect()
            })
            .unwrap_or_default();
        if members.is_empty() {
            continue;
        }

        if let Some(Value::Object(record)) = interfaces.get_mut(&vlan_interface) {
            if let Value::Array(tagged) = record
                .entry("tagged")
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                tagged.extend(members);
            }
        }
    }
}

/// Collector for the `default` category.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFacts;

impl FactCollector for DefaultFacts {
    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn parse(&self, replies: &[Response], ctx: &mut ParseContext) -> Result<DeviceFacts> {
        let mut macs = Vec::new();

        let version = ctx.parse_json(COMMANDS[SHOW_VERSION], reply_text(replies, SHOW_VERSION))?;
        if let Some(mac) = version
            .get("systemMacAddress")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
        {
            macs.push(mac.to_string());
        }

        let config = reply_text(replies, RUNNING_CONFIG).to_string();

        let mut interfaces = Map::new();
        let data = ctx.parse_json(COMMANDS[SHOW_INTERFACES], reply_text(replies, SHOW_INTERFACES))?;
        if let Some(raw_interfaces) = data.get("interfaces").and_then(Value::as_object) {
            let empty = Map::new();
            for (name, raw) in raw_interfaces {
                let record = interface_record(raw.as_object().unwrap_or(&empty));
                if let Some(mac) = record.get("macaddress").and_then(Value::as_str) {
                    push_unique(&mut macs, mac);
                }
                interfaces.insert(name.clone(), Value::Object(record));
            }
        }

        let data = ctx.parse_json(COMMANDS[LLDP_NEIGHBORS], reply_text(replies, LLDP_NEIGHBORS))?;
        let lldp = serde_json::to_value(parse_neighbors(&data)).map_err(FactsError::from)?;

        let data = ctx.parse_json(COMMANDS[SHOW_VLAN], reply_text(replies, SHOW_VLAN))?;
        apply_vlan_tagging(&mut interfaces, &data);

        let mut facts = DeviceFacts::new();
        facts.set("info", json!({ "macs": macs }));
        facts.set("config", Value::String(config));
        facts.set("interfaces", Value::Object(interfaces));
        facts.set("lldp", lldp);
        Ok(facts)
    }
}
