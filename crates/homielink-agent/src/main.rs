//! # homielink agent
//!
//! Standalone Homie device runtime: builds a device tree from environment
//! configuration, connects it to an MQTT broker and keeps it alive.
//!
//! ## Runtime loops
//!
//! The agent drives three ticks over one protocol engine:
//! 1. **Maintenance**: reconnects the transport and dispatches inbound
//!    `set` and broadcast traffic
//! 2. **Drain**: sends one queued publish per tick
//! 3. **Stats**: refreshes `stats/uptime` and republishes `$stats` entries

use anyhow::Result;
use homielink_client::{Client, EventHandler, MqttConfig, MqttTransport, QueuedTransport};
use homielink_core::{Device, Node, Property, SimpleDevice, SimpleNode, SimpleProperty};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

pub use config::AgentConfig;

/// Handler writing lifecycle events to the log.
struct LogEvents;

impl EventHandler for LogEvents {
    fn on_connected(&mut self, reconnected: bool) {
        tracing::info!(reconnected, "device online");
    }

    fn on_offline(&mut self) {
        tracing::warn!("broker unreachable, retrying");
    }

    fn on_closing(&mut self) {
        tracing::info!("device shutting down");
    }

    fn on_broadcast(&mut self, level: &str, payload: &str) {
        tracing::info!(level, payload, "broadcast received");
    }
}

fn build_device(config: &AgentConfig) -> SimpleDevice {
    let mut device = SimpleDevice::new(config.device_id.clone());
    device.set_attribute("name", &config.device_name);
    device.set_attribute(
        "stats/interval",
        &config.stats_interval.as_secs().to_string(),
    );
    device.set_attribute("fw/name", "homielink-agent");
    device.set_attribute("fw/version", env!("CARGO_PKG_VERSION"));

    for node_spec in &config.nodes {
        let mut node = match node_spec.array {
            Some((lo, hi)) => SimpleNode::array(node_spec.id.clone(), lo, hi),
            None => SimpleNode::new(node_spec.id.clone()),
        };
        if let Some(name) = &node_spec.name {
            node.set_attribute("name", name);
        }
        if let Some(node_type) = &node_spec.node_type {
            node.set_attribute("type", node_type);
        }

        for property_spec in &node_spec.properties {
            let mut property = SimpleProperty::new(property_spec.id.clone());
            if let Some(name) = &property_spec.name {
                property.set_attribute("name", name);
            }
            if let Some(datatype) = &property_spec.datatype {
                property.set_attribute("datatype", datatype);
            }
            if let Some(unit) = &property_spec.unit {
                property.set_attribute("unit", unit);
            }
            if let Some(format) = &property_spec.format {
                property.set_attribute("format", format);
            }
            property.set_attribute("settable", if property_spec.settable { "true" } else { "false" });
            property.set_attribute("retained", if property_spec.retained { "true" } else { "false" });
            if let Some(value) = &property_spec.value {
                property.set_value(value);
            }
            node.add_property(property);
        }

        device.add_node(node);
    }

    device
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting homielink agent"
    );

    let config = AgentConfig::from_env()?;
    let device = build_device(&config);

    let mut mqtt_config = MqttConfig::new(
        config.mqtt_broker.clone(),
        format!("homielink-{}", Uuid::new_v4()),
    );
    mqtt_config.credentials = config.credentials.clone();

    let transport = QueuedTransport::new(MqttTransport::new(mqtt_config));
    let mut client = Client::new(transport, device, &config.base_topic)?;
    client.set_event_handler(LogEvents);

    tracing::info!(
        device = %config.device_id,
        broker = %config.mqtt_broker,
        "Agent running, press Ctrl+C to stop"
    );

    let started = Instant::now();
    let mut maintenance = tokio::time::interval(config.maintenance_interval);
    let mut drain = tokio::time::interval(config.maintenance_interval / 2);
    let mut stats = tokio::time::interval(config.stats_interval);

    loop {
        tokio::select! {
            _ = maintenance.tick() => {
                client.maintain().await;
            }
            _ = drain.tick() => {
                if client.transport_mut().is_drain_scheduled() {
                    if let Err(err) = client.transport_mut().drain_once().await {
                        tracing::warn!(error = %err, "publish queue drain failed");
                    }
                }
            }
            _ = stats.tick() => {
                let uptime = started.elapsed().as_secs().to_string();
                client.device_mut().set_attribute("stats/uptime", &uptime);
                client.notify_stats_changed().await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    client.close().await;
    tracing::info!("Agent stopped");
    Ok(())
}
