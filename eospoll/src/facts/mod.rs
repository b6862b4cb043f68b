//! Fact gathering.
//!
//! Each [`FactSubset`] is backed by a [`FactCollector`]: a fixed command
//! battery plus a parser that folds the replies into [`DeviceFacts`]. A gather
//! runs the batteries of the resolved subsets in order and merges their
//! facts. It is all-or-nothing: if any battery fails, no facts are returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use eospoll::driver::SessionBuilder;
//! use eospoll::facts::FactGatherer;
//!
//! # async fn example() -> Result<(), eospoll::Error> {
//! let mut session = SessionBuilder::new("192.168.1.1")
//!     .username("admin")
//!     .password("secret")
//!     .connect()
//!     .await?;
//!
//! let gathered = FactGatherer::new().gather(&mut session, &["all", "!routing"]).await?;
//! for warning in &gathered.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! println!("{}", serde_json::to_string_pretty(&gathered.facts).unwrap());
//! # Ok(())
//! # }
//! ```

mod context;
mod default;
mod lldp;
mod routing;
mod subset;

pub use context::ParseContext;
pub use default::{DefaultFacts, apply_vlan_tagging, interface_record};
pub use lldp::{LldpNeighbor, parse_neighbors, reformat_chassis_id};
pub use routing::{RouteEntry, RoutingFacts, parse_routes};
pub use subset::{FactSubset, resolve_subsets};

use std::collections::BTreeSet;
use std::future::Future;

use indexmap::IndexMap;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::{Driver, Response};
use crate::error::{FactsError, Result};

/// Facts from one gather, keyed by top-level category.
///
/// Built fresh on every gather and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFacts {
    data: IndexMap<String, Value>,
}

impl DeviceFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fact
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a fact
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Merge `other` into `self`; `other` wins on key collisions.
    pub fn merge(&mut self, other: DeviceFacts) {
        self.data.extend(other.data);
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.data
    }
}

/// Text of reply `index`, or empty when the battery came back short.
pub(crate) fn reply_text(replies: &[Response], index: usize) -> &str {
    replies
        .get(index)
        .map(|r| r.result.as_str())
        .unwrap_or_default()
}

/// A command battery and the parser for its replies.
pub trait FactCollector: Sync {
    /// The commands to run, in order.
    fn commands(&self) -> &'static [&'static str];

    /// Fold the replies (one per command, in order) into facts.
    fn parse(&self, replies: &[Response], ctx: &mut ParseContext) -> Result<DeviceFacts>;

    /// Run the battery through `driver` and parse the replies.
    fn populate<D: Driver>(
        &self,
        driver: &mut D,
        ctx: &mut ParseContext,
    ) -> impl Future<Output = Result<DeviceFacts>> + Send {
        async move {
            let replies = driver.send_commands(self.commands()).await?;
            self.parse(&replies, ctx)
        }
    }
}

impl FactSubset {
    /// The battery backing this category.
    pub fn commands(&self) -> &'static [&'static str] {
        match self {
            FactSubset::Default => DefaultFacts.commands(),
            FactSubset::Routing => RoutingFacts.commands(),
        }
    }

    async fn populate<D: Driver>(&self, driver: &mut D, ctx: &mut ParseContext) -> Result<DeviceFacts> {
        match self {
            FactSubset::Default => DefaultFacts.populate(driver, ctx).await,
            FactSubset::Routing => RoutingFacts.populate(driver, ctx).await,
        }
    }
}

/// The result of a successful gather.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatheredFacts {
    pub facts: DeviceFacts,
    /// The categories that were gathered.
    pub subsets: Vec<FactSubset>,
    /// Replies that could not be parsed and were treated as empty.
    pub warnings: Vec<String>,
}

impl GatheredFacts {
    /// Flatten into `ansible_net_<key>` names, including `ansible_net_gather_subset`.
    pub fn into_ansible_facts(self) -> IndexMap<String, Value> {
        let mut out = IndexMap::with_capacity(self.facts.len() + 1);
        out.insert(
            "ansible_net_gather_subset".to_string(),
            Value::from(self.subsets.iter().map(FactSubset::name).collect::<Vec<_>>()),
        );
        for (key, value) in self.facts.into_inner() {
            out.insert(format!("ansible_net_{}", key), value);
        }
        out
    }
}

/// Runs fact batteries against a session.
#[derive(Debug, Clone, Default)]
pub struct FactGatherer {
    strict: bool,
}

impl FactGatherer {
    /// A gatherer that tolerates unparsable replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat unparsable JSON replies as fatal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolve `spec` and gather the selected categories.
    ///
    /// An unknown category fails with [`FactsError::InvalidSubset`] before
    /// any command is sent.
    pub async fn gather<D: Driver, S: AsRef<str>>(&self, driver: &mut D, spec: &[S]) -> Result<GatheredFacts> {
        let subsets = resolve_subsets(spec)?;
        self.gather_subsets(driver, &subsets).await
    }

    /// Gather already resolved categories.
    pub async fn gather_subsets<D: Driver>(
        &self,
        driver: &mut D,
        subsets: &BTreeSet<FactSubset>,
    ) -> Result<GatheredFacts> {
        let mut ctx = ParseContext::new(self.strict);
        let mut facts = DeviceFacts::new();

        for subset in subsets {
            debug!("gathering {} facts", subset);
            match subset.populate(driver, &mut ctx).await {
                Ok(partial) => facts.merge(partial),
                Err(e) => {
                    error!("failed to gather {} facts: {}", subset, e);
                    return Err(FactsError::GatherFailed {
                        category: subset.name().to_string(),
                        source: Box::new(e),
                    }
                    .into());
                }
            }
        }

        Ok(GatheredFacts {
            facts,
            subsets: subsets.iter().copied().collect(),
            warnings: ctx.into_warnings(),
        })
    }
}

/// Gather facts leniently. See [`FactGatherer::gather`].
pub async fn gather_facts<D: Driver, S: AsRef<str>>(driver: &mut D, spec: &[S]) -> Result<GatheredFacts> {
    FactGatherer::new().gather(driver, spec).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Session;
    use crate::error::Error;
    use crate::platform::vendors::arista_eos;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    const VERSION: &str = r#"{"modelName": "DCS-7050SX3-48YC8", "version": "4.30.1F", "systemMacAddress": "00:1c:73:00:00:99"}"#;
    const RUNNING_CONFIG: &str = "! Command: show running-config\nhostname leaf1\n!\nend";
    const INTERFACES: &str = r#"{"interfaces": {
  "Ethernet1": {"bandwidth": 25000000000, "duplex": "duplexFull", "physicalAddress": "00:1c:73:00:00:01", "mtu": 9214, "interfaceStatus": "connected", "lineProtocolStatus": "up", "description": "to spine1"},
  "Port-Channel10": {"bandwidth": 50000000000, "memberInterfaces": {"Ethernet47": {}, "Ethernet48": {}}},
  "Vlan100": {"physicalAddress": "00:1c:73:00:00:99", "mtu": 1500}
}}"#;
    const LLDP: &str = r#"{"lldpNeighbors": {"Ethernet1": {"lldpNeighborInfo": [{
  "systemName": "spine1", "chassisId": "001c.7300.1001",
  "neighborInterfaceInfo": {"interfaceId_v2": "Ethernet3/1", "interfaceId": "\"Ethernet3/1\"", "interfaceIdType": "local"}
}]}}}"#;
    const VLANS: &str = r#"{"vlans": {"100": {"name": "servers", "interfaces": {"Ethernet1": {}, "Ethernet5": {}}}}}"#;
    const IPV4_ROUTES: &str = r#"{"vrfs": {"default": {"routes": {"0.0.0.0/0": {"vias": [{"interface": "Ethernet1", "nexthopAddr": "10.0.0.1"}]}}}}}"#;
    const IPV6_ROUTES: &str = r#"{"vrfs": {"default": {"routes": {"::/0": {"vias": [{"interface": "Ethernet1", "nexthopAddr": "fe80::1"}]}}}}}"#;

    fn leaf() -> MockTransport {
        MockTransport::eos("leaf1", true)
            .reply("show version | json", VERSION)
            .reply("show running-config", RUNNING_CONFIG)
            .reply("show interfaces | json", INTERFACES)
            .reply("show lldp neighbors detail | json", LLDP)
            .reply("show vlan | json", VLANS)
            .reply("show ip route vrf all | json", IPV4_ROUTES)
            .reply("show ipv6 route vrf all | json", IPV6_ROUTES)
    }

    async fn opened(mock: MockTransport) -> Session<MockTransport> {
        let mut session = Session::new(mock, arista_eos::platform().unwrap());
        session.open().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_gather_default_only() {
        let mut session = opened(leaf()).await;

        let gathered = gather_facts(&mut session, &["!all"]).await.unwrap();
        assert_eq!(gathered.subsets, vec![FactSubset::Default]);
        assert!(gathered.warnings.is_empty());

        let facts = &gathered.facts;
        assert_eq!(
            facts.get("info").unwrap()["macs"],
            json!(["00:1c:73:00:00:99", "00:1c:73:00:00:01"])
        );
        assert_eq!(facts.get("config").unwrap(), RUNNING_CONFIG);

        let interfaces = facts.get("interfaces").unwrap();
        assert_eq!(interfaces["Ethernet1"]["bandwidth"], 25000);
        assert_eq!(interfaces["Ethernet1"]["operstatus"], "connected");
        assert_eq!(
            interfaces["Port-Channel10"]["channel-member"],
            json!(["Ethernet47", "Ethernet48"])
        );
        assert_eq!(interfaces["Vlan100"]["tagged"], json!(["Ethernet1"]));

        let lldp = facts.get("lldp").unwrap();
        assert_eq!(lldp["Ethernet1"]["remote_port_id"], "Ethernet3/1");
        assert_eq!(lldp["Ethernet1"]["remote_chassis_id"], "00:1c:73:00:10:01");
        assert!(facts.get("ipv4").is_none());
    }

    #[tokio::test]
    async fn test_gather_all_includes_routing() {
        let mut session = opened(leaf()).await;

        let gathered = gather_facts::<_, &str>(&mut session, &[]).await.unwrap();
        assert_eq!(gathered.subsets, vec![FactSubset::Default, FactSubset::Routing]);
        assert_eq!(gathered.facts.get("ipv4").unwrap()[0]["to"], "10.0.0.1");
        assert_eq!(gathered.facts.get("ipv6").unwrap()[0]["from"], "::/0");
    }

    #[tokio::test]
    async fn test_invalid_subset_sends_nothing() {
        let mock = leaf();
        let writes = mock.writes();
        let mut session = opened(mock).await;
        let before = writes.lock().unwrap().len();

        let err = gather_facts(&mut session, &["bogus"]).await.unwrap_err();
        assert!(matches!(err, Error::Facts(FactsError::InvalidSubset { .. })));
        assert_eq!(writes.lock().unwrap().len(), before);
    }

    #[tokio::test]
    async fn test_lenient_parse_warns() {
        let mock = leaf().reply("show vlan | json", "% Unavailable command (not supported on this hardware platform)");
        let mut session = opened(mock).await;

        let gathered = gather_facts(&mut session, &["default"]).await.unwrap();
        assert_eq!(gathered.warnings.len(), 1);
        assert!(gathered.warnings[0].contains("show vlan | json"));
        assert!(gathered.facts.get("interfaces").unwrap()["Vlan100"].get("tagged").is_none());
    }

    #[tokio::test]
    async fn test_strict_parse_fails_gather() {
        let mock = leaf().reply("show vlan | json", "{");
        let mut session = opened(mock).await;

        let err = FactGatherer::new()
            .strict(true)
            .gather(&mut session, &["default"])
            .await
            .unwrap_err();
        match err {
            Error::Facts(FactsError::GatherFailed { category, source }) => {
                assert_eq!(category, "default");
                assert!(matches!(*source, Error::Facts(FactsError::Parse { .. })));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_command_error_fails_gather() {
        let mock = leaf().reply("show ip route vrf all | json", "% Invalid input (privileged mode required)");
        let mut session = opened(mock).await;

        let err = gather_facts(&mut session, &["routing"]).await.unwrap_err();
        match err {
            Error::Facts(FactsError::GatherFailed { category, source }) => {
                assert_eq!(category, "routing");
                assert!(source.is_command_error());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ansible_facts_prefix() {
        let mut facts = DeviceFacts::new();
        facts.set("config", json!("hostname leaf1"));
        let gathered = GatheredFacts {
            facts,
            subsets: vec![FactSubset::Default],
            warnings: vec![],
        };

        let ansible = gathered.into_ansible_facts();
        assert_eq!(ansible["ansible_net_gather_subset"], json!(["default"]));
        assert_eq!(ansible["ansible_net_config"], "hostname leaf1");
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut a = DeviceFacts::new();
        a.set("ipv4", json!([]));
        let mut b = DeviceFacts::new();
        b.set("ipv4", json!([1]));
        a.merge(b);
        assert_eq!(a.get("ipv4"), Some(&json!([1])));
        assert_eq!(a.len(), 1);
    }
}
