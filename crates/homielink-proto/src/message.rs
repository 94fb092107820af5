//! Message value objects.

/// Delivery guarantee requested for a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Delivered at least once; the level used for all convention traffic.
    AtLeastOnce,
    /// Delivered exactly once.
    ExactlyOnce,
}

/// One message exchanged with the transport.
///
/// Payloads are UTF-8 text; the convention publishes every value as a
/// string. Messages have no identity beyond their position in a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Full topic path.
    pub topic: String,
    /// UTF-8 payload.
    pub payload: String,
    /// Delivery guarantee.
    pub qos: QoS,
    /// Whether the broker should retain the payload for late subscribers.
    pub retain: bool,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<String>,
        qos: QoS,
        retain: bool,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        }
    }

    /// Create a retained message at QoS 1, the shape of every
    /// device-description publish.
    #[must_use]
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(topic, payload, QoS::AtLeastOnce, true)
    }
}
