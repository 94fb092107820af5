//! The protocol engine binding one device to one transport.

use crate::publisher;
use crate::transport::Transport;
use homielink_core::{Device, DeviceState, Node, Property};
use homielink_proto::{Inbound, Message, QoS, TopicScheme};

/// Maintenance tick interval the engine is designed around.
pub const DEFAULT_MAINTENANCE_INTERVAL: std::time::Duration =
    std::time::Duration::from_millis(100);

/// Where the engine stands with respect to its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No open connection; the next maintenance tick attempts one.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The transport is open and inbound traffic is being dispatched.
    Connected,
}

/// Callbacks surfaced to application code.
///
/// Every method has a no-op default, so handlers implement only what they
/// care about. There is no separate error channel; failures show up as
/// `on_offline` and the engine keeps retrying.
pub trait EventHandler {
    /// The transport came up. `reconnected` is `false` only for the first
    /// successful connection in the engine's lifetime.
    fn on_connected(&mut self, reconnected: bool) {
        let _ = reconnected;
    }

    /// A connection attempt failed; another follows on the next tick.
    fn on_offline(&mut self) {}

    /// The engine is shutting down and has published its farewell state.
    fn on_closing(&mut self) {}

    /// The transport has been released.
    fn on_closed(&mut self) {}

    /// A broadcast arrived at the given level.
    fn on_broadcast(&mut self, level: &str, payload: &str) {
        let _ = (level, payload);
    }
}

/// Error raised when a [`Client`] is constructed with unusable parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The device id is empty; it forms the first topic segment and an
    /// empty segment is forbidden by the grammar.
    #[error("device id must not be empty")]
    EmptyDeviceId,
    /// The base topic is empty.
    #[error("base topic must not be empty")]
    EmptyBaseTopic,
}

/// The protocol engine.
///
/// A client owns its device tree and its transport; application code reaches
/// the tree through [`Client::device_mut`] and reports changes back through
/// the notify methods. [`Client::maintain`] must be called on a fixed tick:
/// it reconnects while the transport is down and dispatches inbound traffic
/// while it is up.
pub struct Client<T: Transport, D: Device> {
    transport: T,
    device: D,
    topics: TopicScheme,
    state: ConnectionState,
    has_connected: bool,
    handler: Option<Box<dyn EventHandler>>,
}

impl<T: Transport, D: Device> Client<T, D> {
    /// Bind a device to a transport under a base topic.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the device id or base topic is empty.
    pub fn new(transport: T, device: D, base_topic: &str) -> Result<Self, ClientError> {
        if device.id().is_empty() {
            return Err(ClientError::EmptyDeviceId);
        }
        if base_topic.is_empty() {
            return Err(ClientError::EmptyBaseTopic);
        }

        let topics = TopicScheme::new(base_topic, device.id());
        Ok(Self {
            transport,
            device,
            topics,
            state: ConnectionState::Disconnected,
            has_connected: false,
            handler: None,
        })
    }

    /// Register the application event handler, replacing any previous one.
    pub fn set_event_handler(&mut self, handler: impl EventHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// The device tree.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device tree, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The transport, mutably. Queued transports are drained through this.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The topic namespace of this device.
    #[must_use]
    pub fn topics(&self) -> &TopicScheme {
        &self.topics
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// One maintenance tick.
    ///
    /// Connected: drain and dispatch inbound traffic. Disconnected: attempt
    /// to open the transport, with the `$state=lost` last will registered.
    /// A failed attempt emits `on_offline` and is retried on the next tick,
    /// without bound or backoff.
    pub async fn maintain(&mut self) {
        if self.transport.is_connected() {
            self.poll_inbound().await;
            return;
        }

        if self.state == ConnectionState::Connected {
            tracing::warn!(device = %self.topics.device_id(), "transport connection lost");
        }

        self.state = ConnectionState::Connecting;
        let will = Message::retained(self.topics.state_topic(), DeviceState::Lost.as_str());
        match self.transport.open(Some(&will)).await {
            Ok(()) => {
                let reconnected = self.has_connected;
                self.has_connected = true;
                self.state = ConnectionState::Connected;
                tracing::info!(
                    device = %self.topics.device_id(),
                    reconnected,
                    "transport connected"
                );

                if let Err(err) = self.announce(reconnected).await {
                    tracing::warn!(error = %err, "failed to announce device");
                }
                if let Some(handler) = self.handler.as_deref_mut() {
                    handler.on_connected(reconnected);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "connection attempt failed");
                self.state = ConnectionState::Disconnected;
                if let Some(handler) = self.handler.as_deref_mut() {
                    handler.on_offline();
                }
            }
        }
    }

    /// Publish the current value of one property.
    ///
    /// Scalar nodes publish `<node>/<property>`; array nodes publish the
    /// one slot named by `index`, or sweep the whole declared range when
    /// `index` is `None`. Unknown addresses and mode mismatches are silent
    /// no-ops.
    pub async fn notify_property_changed(
        &mut self,
        node_id: &str,
        property_id: &str,
        index: Option<i64>,
    ) {
        let messages =
            publisher::property_notification(&self.device, &self.topics, node_id, property_id, index);
        self.publish_all(&messages).await;
    }

    /// Republish every `$stats/<name>` entry.
    pub async fn notify_stats_changed(&mut self) {
        let messages = publisher::stats_notification(&self.device, &self.topics);
        self.publish_all(&messages).await;
    }

    /// Shut the engine down and hand the transport back.
    ///
    /// Publishes `$state=disconnected`, releases the `set` subscription,
    /// then emits `closing`, releases the transport and emits `closed`.
    /// Teardown is best-effort: a dead transport cannot stop the shutdown.
    pub async fn close(mut self) -> T {
        let farewell = Message::retained(
            self.topics.state_topic(),
            DeviceState::Disconnected.as_str(),
        );
        if let Err(err) = self.transport.publish(&farewell).await {
            tracing::warn!(error = %err, "failed to publish farewell state");
        }
        if let Err(err) = self.transport.unsubscribe(&self.topics.set_wildcard()).await {
            tracing::warn!(error = %err, "failed to release set subscription");
        }

        if let Some(handler) = self.handler.as_deref_mut() {
            handler.on_closing();
        }
        if let Err(err) = self.transport.close().await {
            tracing::warn!(error = %err, "failed to close transport");
        }
        if let Some(handler) = self.handler.as_deref_mut() {
            handler.on_closed();
        }

        self.transport
    }

    /// Fresh connections publish the full description, reconnections only
    /// the current `$state`; both re-arm the `set` wildcard subscription.
    async fn announce(&mut self, reconnected: bool) -> Result<(), T::Error> {
        let messages = if reconnected {
            vec![Message::retained(
                self.topics.state_topic(),
                self.device.state().as_str(),
            )]
        } else {
            publisher::full_description(&self.device, &self.topics)
        };

        for message in &messages {
            self.transport.publish(message).await?;
        }
        self.transport
            .subscribe(&self.topics.set_wildcard(), QoS::AtLeastOnce)
            .await
    }

    async fn poll_inbound(&mut self) {
        let inbound = match self.transport.poll().await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(error = %err, "transport poll failed");
                return;
            }
        };

        for message in inbound {
            self.handle_message(&message.topic, &message.payload);
        }
    }

    fn handle_message(&mut self, topic: &str, payload: &str) {
        match self.topics.parse(topic) {
            Some(Inbound::Broadcast { level }) => {
                if let Some(handler) = self.handler.as_deref_mut() {
                    handler.on_broadcast(level, payload);
                }
            }
            Some(Inbound::PropertySet {
                node,
                index,
                property,
            }) => self.apply_property_set(node, index, property, payload),
            None => {}
        }
    }

    /// Apply one inbound write. Unknown addresses and addressing-mode
    /// mismatches are dropped without any observable effect. Array writes
    /// are applied at the parsed index even outside the declared range; the
    /// range is advisory publishing metadata, not a write bound.
    fn apply_property_set(
        &mut self,
        node_id: &str,
        index: Option<i64>,
        property_id: &str,
        payload: &str,
    ) {
        let Some(node) = self.device.node_mut(node_id) else {
            tracing::debug!(node = node_id, "set for unknown node ignored");
            return;
        };
        if node.is_array() != index.is_some() {
            tracing::debug!(node = node_id, "set with mismatched addressing mode ignored");
            return;
        }
        let Some(property) = node.property_mut(property_id) else {
            tracing::debug!(
                node = node_id,
                property = property_id,
                "set for unknown property ignored"
            );
            return;
        };

        match index {
            Some(idx) => property.set_value_at(idx, payload),
            None => property.set_value(payload),
        }
    }

    async fn publish_all(&mut self, messages: &[Message]) {
        for message in messages {
            if let Err(err) = self.transport.publish(message).await {
                tracing::warn!(error = %err, topic = %message.topic, "publish failed");
            }
        }
    }
}
