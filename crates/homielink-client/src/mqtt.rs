//! MQTT transport over `rumqttc`.

use crate::transport::Transport;
use homielink_proto::{Message, QoS};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Packet};
use std::time::Duration;
use url::Url;

/// Configuration for [`MqttTransport`].
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker address: `tcp://host:port`, `mqtt://host:port` or `host:port`.
    pub broker: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Username and password, when the broker requires them.
    pub credentials: Option<(String, String)>,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
    /// How long one connection attempt may take before it counts as failed.
    pub connect_timeout: Duration,
    /// How long one maintenance poll waits for further inbound traffic.
    pub poll_budget: Duration,
    /// Capacity of the outgoing request channel.
    pub request_capacity: usize,
}

impl MqttConfig {
    /// Configuration with defaults suitable for a local broker.
    #[must_use]
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            poll_budget: Duration::from_millis(10),
            request_capacity: 1024,
        }
    }
}

/// Errors for MQTT transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MqttError {
    /// Invalid MQTT broker URL
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// The network connection failed
    #[error("connection error: {0}")]
    Connection(String),
    /// The broker did not answer within the connect timeout
    #[error("connection attempt timed out")]
    ConnectTimeout,
    /// The broker refused the session
    #[error("broker rejected connection: {0}")]
    Rejected(String),
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
    /// Subscription change failed
    #[error("subscribe error: {0}")]
    Subscribe(String),
    /// The transport has never been opened
    #[error("not connected")]
    NotConnected,
}

struct Connection {
    client: AsyncClient,
    eventloop: EventLoop,
}

/// [`Transport`] implementation over `rumqttc`.
///
/// The session is created lazily on the first `open`, which also registers
/// the last will; later `open` calls reuse the session and let `rumqttc`
/// re-dial. Outgoing requests never block: they go through the `try_`
/// variants and fail fast when the request channel is full, which a fronting
/// [`crate::QueuedTransport`] turns into a retry on the next drain tick.
pub struct MqttTransport {
    config: MqttConfig,
    conn: Option<Connection>,
    connected: bool,
}

impl MqttTransport {
    /// Create a transport; no connection is attempted yet.
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            conn: None,
            connected: false,
        }
    }

    fn establish(config: &MqttConfig, will: Option<&Message>) -> Result<Connection, MqttError> {
        let (host, port) = parse_broker_url(&config.broker)?;

        let mut options = MqttOptions::new(config.client_id.as_str(), host, port);
        options.set_keep_alive(config.keep_alive);
        if let Some((username, password)) = &config.credentials {
            options.set_credentials(username.as_str(), password.as_str());
        }
        if let Some(will) = will {
            options.set_last_will(LastWill::new(
                will.topic.as_str(),
                will.payload.clone(),
                to_rumqttc(will.qos),
                will.retain,
            ));
        }

        let (client, eventloop) = AsyncClient::new(options, config.request_capacity);
        Ok(Connection { client, eventloop })
    }
}

impl Transport for MqttTransport {
    type Error = MqttError;

    async fn open(&mut self, will: Option<&Message>) -> Result<(), Self::Error> {
        if self.conn.is_none() {
            self.conn = Some(Self::establish(&self.config, will)?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(MqttError::NotConnected);
        };

        tracing::debug!(broker = %self.config.broker, "connecting to broker");

        // Drive the event loop until the broker acknowledges the session.
        let attempt = tokio::time::timeout(self.config.connect_timeout, async {
            loop {
                match conn.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        return if ack.code == ConnectReturnCode::Success {
                            Ok(())
                        } else {
                            Err(MqttError::Rejected(format!("{:?}", ack.code)))
                        };
                    }
                    Ok(_) => {}
                    Err(err) => return Err(MqttError::Connection(err.to_string())),
                }
            }
        })
        .await;

        match attempt {
            Ok(Ok(())) => {
                self.connected = true;
                Ok(())
            }
            Ok(Err(err)) => {
                self.connected = false;
                Err(err)
            }
            Err(_) => {
                self.connected = false;
                Err(MqttError::ConnectTimeout)
            }
        }
    }

    async fn publish(&mut self, message: &Message) -> Result<(), Self::Error> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(MqttError::NotConnected);
        };

        conn.client
            .try_publish(
                message.topic.as_str(),
                to_rumqttc(message.qos),
                message.retain,
                message.payload.clone(),
            )
            .map_err(|err| MqttError::Publish(err.to_string()))
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(MqttError::NotConnected);
        };

        tracing::debug!(topic, "subscribing");
        conn.client
            .try_subscribe(topic, to_rumqttc(qos))
            .map_err(|err| MqttError::Subscribe(err.to_string()))
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(MqttError::NotConnected);
        };

        conn.client
            .try_unsubscribe(topic)
            .map_err(|err| MqttError::Subscribe(err.to_string()))
    }

    async fn poll(&mut self) -> Result<Vec<Message>, Self::Error> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(Vec::new());
        };

        let mut inbound = Vec::new();
        loop {
            match tokio::time::timeout(self.config.poll_budget, conn.eventloop.poll()).await {
                // Budget elapsed: nothing further is pending this tick.
                Err(_) => break,
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    match String::from_utf8(publish.payload.to_vec()) {
                        Ok(payload) => inbound.push(Message::new(
                            publish.topic,
                            payload,
                            from_rumqttc(publish.qos),
                            publish.retain,
                        )),
                        Err(_) => {
                            tracing::warn!(
                                topic = %publish.topic,
                                "dropping inbound message with non-UTF-8 payload"
                            );
                        }
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    self.connected = false;
                    return Err(MqttError::Connection(err.to_string()));
                }
            }
        }

        Ok(inbound)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.client.try_disconnect() {
                tracing::debug!(error = %err, "disconnect request failed");
            }
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn from_rumqttc(qos: rumqttc::QoS) -> QoS {
    match qos {
        rumqttc::QoS::AtMostOnce => QoS::AtMostOnce,
        rumqttc::QoS::AtLeastOnce => QoS::AtLeastOnce,
        rumqttc::QoS::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Parse a broker address into host and port.
fn parse_broker_url(input: &str) -> Result<(String, u16), MqttError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| MqttError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(MqttError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| MqttError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| MqttError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port.parse().map_err(|_| {
            MqttError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(MqttError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}
