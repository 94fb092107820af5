//! Scripted transport used by the engine tests.

use crate::transport::Transport;
use homielink_proto::{Message, QoS};
use std::collections::VecDeque;

/// One observed transport call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Open { will: Option<Message> },
    Publish(Message),
    Subscribe(String, QoS),
    Unsubscribe(String),
    Close,
}

#[derive(Debug, thiserror::Error)]
#[error("scripted transport failure")]
pub(crate) struct ScriptedError;

/// Transport double that records every call and can be scripted to fail.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub connected: bool,
    pub ops: Vec<Op>,
    /// Outcome of upcoming `open` calls; an empty queue means success.
    pub open_results: VecDeque<bool>,
    pub fail_publish: bool,
    pub inbound: VecDeque<Message>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, topic: &str, payload: &str) {
        self.inbound
            .push_back(Message::new(topic, payload, QoS::AtLeastOnce, false));
    }

    /// Published messages, in publish order.
    pub fn published(&self) -> Vec<&Message> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Publish(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Subscribe(topic, _) => Some(topic.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    type Error = ScriptedError;

    async fn open(&mut self, will: Option<&Message>) -> Result<(), Self::Error> {
        self.ops.push(Op::Open {
            will: will.cloned(),
        });
        if self.open_results.pop_front().unwrap_or(true) {
            self.connected = true;
            Ok(())
        } else {
            Err(ScriptedError)
        }
    }

    async fn publish(&mut self, message: &Message) -> Result<(), Self::Error> {
        if self.fail_publish {
            return Err(ScriptedError);
        }
        self.ops.push(Op::Publish(message.clone()));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        self.ops.push(Op::Subscribe(topic.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.ops.push(Op::Unsubscribe(topic.to_string()));
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<Message>, Self::Error> {
        Ok(self.inbound.drain(..).collect())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.ops.push(Op::Close);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
