//! Agent configuration.

use anyhow::{Context, Result};
use homielink_client::DEFAULT_MAINTENANCE_INTERVAL;
use homielink_proto::DEFAULT_BASE_TOPIC;
use std::time::Duration;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Device identifier, the first topic segment below the base topic
    pub device_id: String,

    /// Human-readable device name
    pub device_name: String,

    /// Topic prefix all device topics live under
    pub base_topic: String,

    /// MQTT broker URL
    pub mqtt_broker: String,

    /// Optional broker credentials
    pub credentials: Option<(String, String)>,

    /// Interval of the connection maintenance tick
    pub maintenance_interval: Duration,

    /// Interval at which device stats are refreshed and republished
    pub stats_interval: Duration,

    /// Nodes and properties to expose
    pub nodes: Vec<NodeSpec>,
}

/// Declarative description of one node.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NodeSpec {
    /// Node identifier
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Node type string
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,

    /// Inclusive index range making this an array node
    #[serde(default)]
    pub array: Option<(i64, i64)>,

    /// Properties of this node
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

/// Declarative description of one property.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PropertySpec {
    /// Property identifier
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Payload datatype
    #[serde(default)]
    pub datatype: Option<String>,

    /// Unit of measurement
    #[serde(default)]
    pub unit: Option<String>,

    /// Format constraint
    #[serde(default)]
    pub format: Option<String>,

    /// Whether controllers may write this property
    #[serde(default)]
    pub settable: bool,

    /// Whether published values are retained
    #[serde(default = "default_retained")]
    pub retained: bool,

    /// Initial scalar value
    #[serde(default)]
    pub value: Option<String>,
}

fn default_retained() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_id: "homielink-device".to_string(),
            device_name: "Homielink device".to_string(),
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            mqtt_broker: "tcp://localhost:1883".to_string(),
            credentials: None,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            stats_interval: Duration::from_secs(60),
            nodes: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HOMIELINK_DEVICE_ID`: Device identifier
    /// - `HOMIELINK_DEVICE_NAME`: Human-readable device name
    /// - `HOMIELINK_BASE_TOPIC`: Topic prefix (default `homie/`)
    /// - `HOMIELINK_MQTT_BROKER`: MQTT broker URL
    /// - `HOMIELINK_MQTT_USERNAME` / `HOMIELINK_MQTT_PASSWORD`: Credentials
    /// - `HOMIELINK_MAINTENANCE_INTERVAL_MS`: Maintenance tick in milliseconds
    /// - `HOMIELINK_STATS_INTERVAL_SECS`: Stats refresh interval in seconds
    /// - `HOMIELINK_NODES`: JSON array of node specs
    ///
    /// # Errors
    ///
    /// Returns an error when a variable holds an unparseable value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("HOMIELINK_DEVICE_ID") {
            config.device_id = id;
        }

        if let Ok(name) = std::env::var("HOMIELINK_DEVICE_NAME") {
            config.device_name = name;
        }

        if let Ok(base) = std::env::var("HOMIELINK_BASE_TOPIC") {
            config.base_topic = base;
        }

        if let Ok(broker) = std::env::var("HOMIELINK_MQTT_BROKER") {
            config.mqtt_broker = broker;
        }

        if let (Ok(username), Ok(password)) = (
            std::env::var("HOMIELINK_MQTT_USERNAME"),
            std::env::var("HOMIELINK_MQTT_PASSWORD"),
        ) {
            config.credentials = Some((username, password));
        }

        if let Ok(interval) = std::env::var("HOMIELINK_MAINTENANCE_INTERVAL_MS") {
            let millis = interval
                .parse()
                .context("Invalid HOMIELINK_MAINTENANCE_INTERVAL_MS")?;
            config.maintenance_interval = Duration::from_millis(millis);
        }

        if let Ok(interval) = std::env::var("HOMIELINK_STATS_INTERVAL_SECS") {
            let secs = interval
                .parse()
                .context("Invalid HOMIELINK_STATS_INTERVAL_SECS")?;
            config.stats_interval = Duration::from_secs(secs);
        }

        // Parse the node tree from a JSON env var
        if let Ok(nodes_json) = std::env::var("HOMIELINK_NODES") {
            config.nodes =
                serde_json::from_str(&nodes_json).context("Invalid HOMIELINK_NODES JSON")?;
        }

        Ok(config)
    }
}
