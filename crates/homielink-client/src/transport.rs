//! Transport abstraction consumed by the protocol engine.

use homielink_proto::{Message, QoS};

/// A publish/subscribe transport.
///
/// The engine never blocks on a transport: `open` is a single connection
/// attempt, `poll` drains whatever arrived since the previous tick, and
/// `publish` hands a message over without waiting for delivery.
///
/// Implementations report connectivity through [`Transport::is_connected`];
/// a failed `poll` or lost link must flip it to `false` so the maintenance
/// tick starts reconnecting.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Transport-specific error type.
    type Error: std::error::Error;

    /// Attempt to connect, optionally registering a last-will message the
    /// broker publishes if the link dies uncleanly.
    async fn open(&mut self, will: Option<&Message>) -> Result<(), Self::Error>;

    /// Hand a message to the transport.
    async fn publish(&mut self, message: &Message) -> Result<(), Self::Error>;

    /// Subscribe to a topic filter.
    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Remove a subscription.
    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Drain inbound messages that arrived since the last poll.
    async fn poll(&mut self) -> Result<Vec<Message>, Self::Error>;

    /// Release the connection.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Whether the transport currently holds an open connection.
    fn is_connected(&self) -> bool;
}
