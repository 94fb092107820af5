//! FIFO publish queue in front of a transport.

use crate::transport::Transport;
use homielink_proto::{Message, QoS};
use std::collections::VecDeque;

/// Transport wrapper that turns `publish` into an enqueue.
///
/// Messages leave the queue only through [`QueuedTransport::drain_once`],
/// which sends at most one message per invocation so a cooperative tick
/// never spends more than one publish worth of time in the queue. The drain
/// task stays scheduled while messages are pending and deschedules itself
/// on the first empty run.
///
/// The queue has no length bound; sustained publish pressure while the
/// inner transport is down grows it without limit.
pub struct QueuedTransport<T> {
    inner: T,
    queue: VecDeque<Message>,
    drain_scheduled: bool,
}

impl<T: Transport> QueuedTransport<T> {
    /// Wrap a transport.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            queue: VecDeque::new(),
            drain_scheduled: false,
        }
    }

    /// Number of queued messages.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether the drain task should run on the next tick.
    #[must_use]
    pub fn is_drain_scheduled(&self) -> bool {
        self.drain_scheduled
    }

    /// Send the message at the head of the queue, if any.
    ///
    /// Returns `true` when a message was sent and `false` when the queue was
    /// empty and the drain task descheduled itself. A failed send leaves the
    /// message at the head so the next tick retries it.
    ///
    /// # Errors
    ///
    /// Returns the inner transport's error when the send fails.
    pub async fn drain_once(&mut self) -> Result<bool, T::Error> {
        let Some(message) = self.queue.front() else {
            self.drain_scheduled = false;
            return Ok(false);
        };

        self.inner.publish(message).await?;
        self.queue.pop_front();
        Ok(true)
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The wrapped transport, mutably.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Transport> Transport for QueuedTransport<T> {
    type Error = T::Error;

    async fn open(&mut self, will: Option<&Message>) -> Result<(), Self::Error> {
        self.inner.open(will).await
    }

    async fn publish(&mut self, message: &Message) -> Result<(), Self::Error> {
        self.queue.push_back(message.clone());
        self.drain_scheduled = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        self.inner.subscribe(topic, qos).await
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.inner.unsubscribe(topic).await
    }

    async fn poll(&mut self) -> Result<Vec<Message>, Self::Error> {
        self.inner.poll().await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        // Flush whatever is still queued before releasing the link, so a
        // farewell published through the queue is not lost.
        while self.drain_once().await? {}
        self.inner.close().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Op, RecordingTransport};

    fn message(tag: &str) -> Message {
        Message::retained(format!("homie/dev/{tag}"), tag)
    }

    #[test]
    fn drain_preserves_fifo_order_and_deschedules() {
        tokio_test::block_on(async {
            let mut queued = QueuedTransport::new(RecordingTransport::new());

            queued.publish(&message("a")).await.unwrap();
            queued.publish(&message("b")).await.unwrap();
            queued.publish(&message("c")).await.unwrap();

            assert!(queued.is_drain_scheduled());
            assert!(queued.inner().published().is_empty());

            assert!(queued.drain_once().await.unwrap());
            assert!(queued.drain_once().await.unwrap());
            assert!(queued.drain_once().await.unwrap());

            let sent: Vec<&str> = queued
                .inner()
                .published()
                .iter()
                .map(|m| m.payload.as_str())
                .collect();
            assert_eq!(sent, vec!["a", "b", "c"]);

            // The queue is dry; the next run deschedules the task.
            assert!(!queued.drain_once().await.unwrap());
            assert!(!queued.is_drain_scheduled());
        });
    }

    #[test]
    fn drain_sends_at_most_one_message_per_invocation() {
        tokio_test::block_on(async {
            let mut queued = QueuedTransport::new(RecordingTransport::new());

            queued.publish(&message("a")).await.unwrap();
            queued.publish(&message("b")).await.unwrap();

            queued.drain_once().await.unwrap();
            assert_eq!(queued.inner().published().len(), 1);
            assert_eq!(queued.pending(), 1);
        });
    }

    #[test]
    fn failed_send_keeps_the_message_at_the_head() {
        tokio_test::block_on(async {
            let mut queued = QueuedTransport::new(RecordingTransport::new());
            queued.publish(&message("a")).await.unwrap();
            queued.publish(&message("b")).await.unwrap();

            queued.inner_mut().fail_publish = true;
            assert!(queued.drain_once().await.is_err());
            assert_eq!(queued.pending(), 2);

            queued.inner_mut().fail_publish = false;
            assert!(queued.drain_once().await.unwrap());
            assert_eq!(
                queued.inner().published()[0].payload,
                "a",
                "retried message must keep its queue position"
            );
        });
    }

    #[test]
    fn close_flushes_the_queue_first() {
        tokio_test::block_on(async {
            let mut queued = QueuedTransport::new(RecordingTransport::new());
            queued.publish(&message("farewell")).await.unwrap();

            queued.close().await.unwrap();

            let ops = &queued.inner().ops;
            assert!(matches!(ops[0], Op::Publish(_)));
            assert!(matches!(ops[1], Op::Close));
        });
    }

    #[test]
    fn control_calls_bypass_the_queue() {
        tokio_test::block_on(async {
            let mut queued = QueuedTransport::new(RecordingTransport::new());
            queued
                .subscribe("homie/dev/+/+/set", QoS::AtLeastOnce)
                .await
                .unwrap();

            assert_eq!(queued.inner().subscriptions(), vec!["homie/dev/+/+/set"]);
            assert_eq!(queued.pending(), 0);
        });
    }
}
