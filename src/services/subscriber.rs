//! Subscription loop.
//!
//! Pulls messages from a [`MessageFeed`] and runs one display cycle per
//! message, strictly in arrival order. The cycle itself is blocking (it
//! sleeps for the dwell), so it runs on `spawn_blocking` with the controller
//! moved in and handed back afterwards. The next message is only requested
//! once the previous cycle has cleared the screen.
//!
//! Shutdown is only observed while waiting for a message; a cycle that has
//! started always finishes.

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use crate::controller::DisplayController;
use crate::encoder::EncodeError;
use crate::source::{Payload, PayloadOrigin};
use crate::traits::{ConnectionError, Dwell, MessageFeed, Renderer};

/// Reasons the subscription loop stopped early.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// The broker connection failed or was lost.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// A payload could not be encoded and the policy is to abort.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The blocking cycle task did not complete.
    #[error("display cycle failed: {0}")]
    Cycle(String),
}

/// Drives display cycles from a message feed.
pub struct Subscriber<F: MessageFeed> {
    feed: F,
    topic: String,
}

impl<F: MessageFeed> Subscriber<F> {
    /// Creates a subscriber that will listen on `topic`.
    pub fn new(feed: F, topic: impl Into<String>) -> Self {
        Self {
            feed,
            topic: topic.into(),
        }
    }

    /// The underlying feed.
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Subscription topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Connects, subscribes, and processes messages until `shutdown`
    /// resolves or the feed ends.
    ///
    /// Returns the controller on a clean stop so the caller can read its
    /// statistics.
    pub async fn run<R, D, S>(
        &mut self,
        mut controller: DisplayController<R, D>,
        shutdown: S,
    ) -> Result<DisplayController<R, D>, SubscriberError>
    where
        R: Renderer + Send + 'static,
        D: Dwell + Send + 'static,
        S: Future<Output = ()>,
    {
        self.feed.connect().await?;
        self.feed.subscribe(&self.topic).await?;
        info!("Waiting for messages on {}", self.topic);

        tokio::pin!(shutdown);

        loop {
            let message = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(controller);
                }
                message = self.feed.recv() => message?,
            };

            let Some(message) = message else {
                info!("Message feed ended");
                return Ok(controller);
            };

            let Some(payload) =
                Payload::new(PayloadOrigin::Topic(message.topic), message.payload)
            else {
                warn!("Ignoring empty message on {}", self.topic);
                continue;
            };

            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = controller.process(&payload);
                (controller, result)
            })
            .await
            .map_err(|e| SubscriberError::Cycle(e.to_string()))?;

            controller = returned;
            result?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, EncodeFailurePolicy};
    use crate::hal::{MockDwell, MockFeed, MockRenderer};

    fn incompressible(len: usize) -> Vec<u8> {
        let mut x: u32 = 0x9E37_79B9;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    fn controller(
        renderer: MockRenderer,
        config: &DisplayConfig,
    ) -> DisplayController<MockRenderer, MockDwell> {
        let dwell = MockDwell::sharing(&renderer);
        let mut controller = DisplayController::new(renderer, dwell, config);
        controller.init().unwrap();
        controller
    }

    #[tokio::test]
    async fn test_subscribes_to_configured_topic() {
        let renderer = MockRenderer::new();
        let mut subscriber = Subscriber::new(MockFeed::sharing(&renderer), "kiosk/mtb");

        subscriber
            .run(controller(renderer, &DisplayConfig::default()), std::future::pending())
            .await
            .unwrap();

        assert!(subscriber.feed().connected);
        assert_eq!(subscriber.feed().subscriptions, vec!["kiosk/mtb".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_message_is_ignored() {
        let renderer = MockRenderer::new();
        let mut feed = MockFeed::sharing(&renderer);
        feed.queue_message("t", Vec::new());
        feed.queue_message("t", b"real".to_vec());

        let controller = Subscriber::new(feed, "t")
            .run(controller(renderer, &DisplayConfig::default()), std::future::pending())
            .await
            .unwrap();

        assert_eq!(controller.stats().displayed, 1);
        assert_eq!(controller.stats().skipped, 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_message() {
        let renderer = MockRenderer::new();
        let mut feed = MockFeed::sharing(&renderer);
        feed.queue_message("t", b"never".to_vec());

        let controller = Subscriber::new(feed, "t")
            .run(controller(renderer, &DisplayConfig::default()), async {})
            .await
            .unwrap();

        assert_eq!(controller.renderer().show_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_encode_failure_stops_loop() {
        let renderer = MockRenderer::new();
        let mut feed = MockFeed::sharing(&renderer);
        feed.queue_message("t", incompressible(40_000));
        feed.queue_message("t", b"after".to_vec());

        let config = DisplayConfig::default().with_encode_failure(EncodeFailurePolicy::Abort);
        let result = Subscriber::new(feed, "t")
            .run(controller(renderer, &config), std::future::pending())
            .await;

        assert!(matches!(result, Err(SubscriberError::Encode(_))));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let renderer = MockRenderer::new();
        let result = Subscriber::new(MockFeed::unreachable("refused"), "t")
            .run(controller(renderer, &DisplayConfig::default()), std::future::pending())
            .await;

        assert!(matches!(
            result,
            Err(SubscriberError::Connection(ConnectionError::Connect { .. }))
        ));
    }
}
