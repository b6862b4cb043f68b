//! Routing facts: IPv4 and IPv6 routes across all VRFs.

use serde::Serialize;
use serde_json::Value;

use super::context::ParseContext;
use super::{DeviceFacts, FactCollector, reply_text};
use crate::driver::Response;
use crate::error::{FactsError, Result};

const COMMANDS: [&str; 2] = ["show ip route vrf all | json", "show ipv6 route vrf all | json"];

/// One route, with its first next hop when it has any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub vrf: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Flatten the `vrfs` mapping of a `show ip[v6] route vrf all | json` reply.
pub fn parse_routes(data: &Value) -> Vec<RouteEntry> {
    let mut out = Vec::new();
    let Some(vrfs) = data.get("vrfs").and_then(Value::as_object) else {
        return out;
    };

    for (vrf, table) in vrfs {
        let Some(routes) = table.get("routes").and_then(Value::as_object) else {
            continue;
        };
        for (prefix, route) in routes {
            let via = route
                .get("vias")
                .and_then(Value::as_array)
                .and_then(|vias| vias.first());
            let field = |name: &str| {
                via.and_then(|v| v.get(name))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            out.push(RouteEntry {
                vrf: vrf.clone(),
                from: prefix.clone(),
                intf: field("interface"),
                to: field("nexthopAddr"),
            });
        }
    }
    out
}

/// Collector for the `routing` category.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingFacts;

impl FactCollector for RoutingFacts {
    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn parse(&self, replies: &[Response], ctx: &mut ParseContext) -> Result<DeviceFacts> {
        let mut facts = DeviceFacts::new();
        for (index, key) in ["ipv4", "ipv6"].into_iter().enumerate() {
            let data = ctx.parse_json(COMMANDS[index], reply_text(replies, index))?;
            let routes = serde_json::to_value(parse_routes(&data)).map_err(FactsError::from)?;
            facts.set(key, routes);
        }
        Ok(facts)
    }
}
