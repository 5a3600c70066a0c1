//! Message feed abstraction for the subscription loop.
//!
//! A [`MessageFeed`] hands out broker messages strictly one at a time. The
//! subscriber only calls [`recv`](MessageFeed::recv) again after the previous
//! message's display cycle has finished, so an implementation that reads
//! from the network lazily gets back-pressure for free.
//!
//! ```text
//! connect() -> subscribe(topic) -> recv() -> [cycle] -> recv() -> [cycle] ...
//! ```

use std::future::Future;

use thiserror::Error;

/// Broker connection failures. All of them end the subscription loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The broker could not be reached or refused the session.
    #[error("cannot connect to broker {broker}: {reason}")]
    Connect {
        /// `host:port` of the broker.
        broker: String,
        /// Transport message.
        reason: String,
    },
    /// The broker rejected the subscription.
    #[error("cannot subscribe to {topic}: {reason}")]
    Subscribe {
        /// Requested topic.
        topic: String,
        /// Transport message.
        reason: String,
    },
    /// An established connection dropped.
    #[error("broker connection lost: {0}")]
    Lost(String),
}

/// A message received on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Raw message body.
    pub payload: Vec<u8>,
}

impl FeedMessage {
    /// Creates a new message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Ordered, pull-based source of broker messages.
pub trait MessageFeed {
    /// Establishes the broker session.
    fn connect(&mut self) -> impl Future<Output = Result<(), ConnectionError>>;

    /// Subscribes to `topic` and waits for the broker to confirm.
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<(), ConnectionError>>;

    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` when the feed has ended cleanly.
    fn recv(&mut self) -> impl Future<Output = Result<Option<FeedMessage>, ConnectionError>>;
}
