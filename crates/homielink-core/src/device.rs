//! Device capability trait and the in-memory container.

use crate::node::Node;
use crate::state::DeviceState;
use std::collections::BTreeMap;

/// The top-level entity being described and controlled.
///
/// A device owns its nodes and a free-form attribute map. Node enumeration
/// follows the underlying container's natural key order; callers must not
/// rely on insertion order.
pub trait Device {
    /// Device id, the first topic segment below the base topic.
    fn id(&self) -> &str;

    /// Attribute value, or `""` when the attribute is not set.
    fn attribute(&self, name: &str) -> String;

    /// Set an attribute.
    fn set_attribute(&mut self, name: &str, value: &str);

    /// Attribute names in natural key order.
    fn attribute_names(&self) -> Vec<String>;

    /// Node ids in natural key order.
    fn node_ids(&self) -> Vec<String>;

    /// Look up a node by id.
    fn node(&self, id: &str) -> Option<&dyn Node>;

    /// Look up a node by id for mutation.
    fn node_mut(&mut self, id: &str) -> Option<&mut (dyn Node + 'static)>;

    /// Current lifecycle state, parsed from the `state` attribute.
    ///
    /// An unset or unparseable attribute reads as [`DeviceState::Init`].
    fn state(&self) -> DeviceState {
        self.attribute("state").parse().unwrap_or(DeviceState::Init)
    }

    /// Store a new lifecycle state.
    fn set_state(&mut self, state: DeviceState) {
        self.set_attribute("state", state.as_str());
    }

    /// Human-readable name.
    fn name(&self) -> String {
        self.attribute("name")
    }

    /// Local IP address of the device.
    fn local_ip(&self) -> String {
        self.attribute("localip")
    }

    /// MAC address of the device.
    fn mac(&self) -> String {
        self.attribute("mac")
    }

    /// Firmware name.
    fn firmware_name(&self) -> String {
        self.attribute("fw/name")
    }

    /// Firmware version.
    fn firmware_version(&self) -> String {
        self.attribute("fw/version")
    }

    /// Implementation identifier.
    fn implementation(&self) -> String {
        self.attribute("implementation")
    }

    /// Interval in seconds at which stats are refreshed.
    fn stats_interval(&self) -> String {
        self.attribute("stats/interval")
    }

    /// Stat names, the comma-separated `stats` attribute split apart.
    fn stat_names(&self) -> Vec<String> {
        self.attribute("stats")
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Current value of one stat, stored under the `stats/<name>` attribute.
    fn stat(&self, name: &str) -> String {
        self.attribute(&format!("stats/{name}"))
    }
}

/// In-memory [`Device`] implementation.
///
/// New devices come up in the `ready` state with firmware metadata and a
/// single `uptime` stat seeded, so a freshly built tree publishes a valid
/// description without further configuration.
pub struct SimpleDevice {
    id: String,
    nodes: BTreeMap<String, Box<dyn Node>>,
    attributes: BTreeMap<String, String>,
}

impl SimpleDevice {
    /// Create a device with default metadata.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), id.clone());
        attributes.insert("state".to_string(), DeviceState::Ready.as_str().to_string());
        attributes.insert("fw/name".to_string(), "homielink".to_string());
        attributes.insert(
            "fw/version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        attributes.insert("implementation".to_string(), "homielink".to_string());
        attributes.insert("stats".to_string(), "uptime".to_string());
        attributes.insert("stats/interval".to_string(), "60".to_string());
        attributes.insert("stats/uptime".to_string(), "0".to_string());

        Self {
            id,
            nodes: BTreeMap::new(),
            attributes,
        }
    }

    /// Add a node, replacing any previous node with the same id.
    pub fn add_node(&mut self, node: impl Node + 'static) {
        self.nodes.insert(node.id().to_string(), Box::new(node));
    }

    /// Add a node, builder-style.
    #[must_use]
    pub fn with_node(mut self, node: impl Node + 'static) -> Self {
        self.add_node(node);
        self
    }

    /// Set an attribute, builder-style.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }
}

impl Device for SimpleDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn attribute(&self, name: &str) -> String {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    fn node(&self, id: &str) -> Option<&dyn Node> {
        self.nodes.get(id).map(|node| &**node)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(id).map(|node| &mut **node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SimpleNode;

    #[test]
    fn defaults_describe_a_publishable_device() {
        let device = SimpleDevice::new("sensor1");

        assert_eq!(device.id(), "sensor1");
        assert_eq!(device.name(), "sensor1");
        assert_eq!(device.state(), DeviceState::Ready);
        assert_eq!(device.firmware_name(), "homielink");
        assert_eq!(device.implementation(), "homielink");
        assert_eq!(device.stats_interval(), "60");
        assert_eq!(device.stat_names(), vec!["uptime"]);
        assert_eq!(device.stat("uptime"), "0");
    }

    #[test]
    fn node_ids_are_sorted() {
        let device = SimpleDevice::new("sensor1")
            .with_node(SimpleNode::new("zeta"))
            .with_node(SimpleNode::new("alpha"))
            .with_node(SimpleNode::new("mid"));

        assert_eq!(device.node_ids(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn node_lookup_returns_none_for_unknown_id() {
        let device = SimpleDevice::new("sensor1");
        assert!(device.node("nope").is_none());
    }

    #[test]
    fn state_round_trips_through_the_attribute_map() {
        let mut device = SimpleDevice::new("sensor1");
        device.set_state(DeviceState::Alert);

        assert_eq!(device.attribute("state"), "alert");
        assert_eq!(device.state(), DeviceState::Alert);
    }

    #[test]
    fn corrupt_state_attribute_falls_back_to_init() {
        let mut device = SimpleDevice::new("sensor1");
        device.set_attribute("state", "not-a-state");
        assert_eq!(device.state(), DeviceState::Init);
    }

    #[test]
    fn stat_names_ignore_empty_entries() {
        let mut device = SimpleDevice::new("sensor1");
        device.set_attribute("stats", "uptime,,signal");
        assert_eq!(device.stat_names(), vec!["uptime", "signal"]);

        device.set_attribute("stats", "");
        assert!(device.stat_names().is_empty());
    }
}
