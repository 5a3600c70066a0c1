//! MQTT message feed backed by `rumqttc`.
//!
//! Subscribes to a single topic and hands incoming publishes to the
//! subscription loop one at a time:
//!
//! **Subscribe Topics:**
//! - `service/v1/Validate/reader` (default) - raw MTB payload bytes
//!
//! The event loop is only polled from [`MessageFeed::recv`], so while a
//! display cycle runs nothing is read from the socket and acknowledgements
//! for the current message go out on the next poll. For the same reason the
//! keep-alive is stretched to cover the dwell (see
//! [`MqttRuntimeConfig::covering_dwell`]).

use std::collections::VecDeque;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use tracing::{debug, info};

use crate::config::MqttConfig as SharedMqttConfig;
use crate::traits::{ConnectionError, FeedMessage, MessageFeed};

/// Requests buffered between the client handle and the event loop.
const REQUEST_CAPACITY: usize = 10;

/// Shortest keep-alive accepted by the client.
const MIN_KEEP_ALIVE_SECS: u16 = 5;

/// Largest packet accepted in either direction.
///
/// Well above any payload the encoder can fit, so oversized tickets reach
/// the encoder and are skipped there instead of tearing down the session.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024 * 1024;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// Convert from the validated [`crate::config::MqttConfig`] with
/// [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic carrying MTB payloads
    pub topic: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Largest packet accepted, in bytes
    pub max_packet_size: usize,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self::from_config(&SharedMqttConfig::default())
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &SharedMqttConfig) -> Self {
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id.as_str().to_string(),
            topic: config.topic.as_str().to_string(),
            keep_alive_secs: config.keep_alive_secs,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the keep-alive interval
    pub fn keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Set the packet size limit
    pub fn max_packet_size(mut self, bytes: usize) -> Self {
        self.max_packet_size = bytes;
        self
    }

    /// Raises the keep-alive to at least twice `dwell`.
    ///
    /// The event loop is idle while a symbol is on screen, so no PINGREQ can
    /// go out during the dwell. Capped at the protocol maximum of 65535 s.
    pub fn covering_dwell(mut self, dwell: Duration) -> Self {
        let needed = dwell.as_secs_f64().ceil() * 2.0;
        let needed = needed.min(u16::MAX as f64) as u16;
        self.keep_alive_secs = self.keep_alive_secs.max(needed);
        self
    }

    /// `host:port`
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(
            self.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS) as u64,
        ));
        options.set_clean_session(true);
        options.set_max_packet_size(self.max_packet_size, self.max_packet_size);
        options
    }
}

// ============================================================================
// Feed
// ============================================================================

/// [`MessageFeed`] over a `rumqttc` client and event loop.
pub struct RumqttFeed {
    client: AsyncClient,
    eventloop: EventLoop,
    broker: String,
    pending: VecDeque<FeedMessage>,
}

impl RumqttFeed {
    /// Creates the client. No network activity happens until
    /// [`MessageFeed::connect`].
    pub fn new(config: &MqttRuntimeConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
        Self {
            client,
            eventloop,
            broker: config.broker(),
            pending: VecDeque::new(),
        }
    }

    /// `host:port` of the broker.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    fn queue_publish(&mut self, topic: String, payload: &[u8]) {
        debug!(topic = %topic, len = payload.len(), "publish received");
        self.pending.push_back(FeedMessage::new(topic, payload.to_vec()));
    }
}

impl MessageFeed for RumqttFeed {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        let connect_err = |reason: String| ConnectionError::Connect {
            broker: self.broker.clone(),
            reason,
        };
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(connect_err(format!("{:?}", ack.code)));
                    }
                    info!("MQTT connected to {}", self.broker);
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => return Err(connect_err(e.to_string())),
            }
        }
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectionError> {
        let subscribe_err = |reason: String| ConnectionError::Subscribe {
            topic: topic.to_string(),
            reason,
        };
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(subscribe_err("rejected by broker".to_string()));
                    }
                    info!("Subscribed to {}", topic);
                    return Ok(());
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.queue_publish(publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => return Err(subscribe_err(e.to_string())),
            }
        }
    }

    async fn recv(&mut self) -> Result<Option<FeedMessage>, ConnectionError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!(topic = %publish.topic, len = publish.payload.len(), "publish received");
                    return Ok(Some(FeedMessage::new(
                        publish.topic,
                        publish.payload.to_vec(),
                    )));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    return Err(ConnectionError::Lost("broker sent disconnect".to_string()));
                }
                Ok(_) => {}
                Err(e) => return Err(ConnectionError::Lost(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;

    // ========================================================================
    // MqttRuntimeConfig tests
    // ========================================================================

    #[test]
    fn test_mqtt_config_default() {
        let config = MqttRuntimeConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "mtb-display");
        assert_eq!(config.topic, "service/v1/Validate/reader");
        assert_eq!(config.keep_alive_secs, 60);
    }

    #[test]
    fn test_mqtt_config_new() {
        let config = MqttRuntimeConfig::new("mqtt.example.com", 8883);
        assert_eq!(config.host, "mqtt.example.com");
        assert_eq!(config.port, 8883);
        // Other fields should be defaults
        assert_eq!(config.client_id, "mtb-display");
        assert_eq!(config.topic, "service/v1/Validate/reader");
    }

    #[test]
    fn test_mqtt_config_builder_chaining() {
        let config = MqttRuntimeConfig::new("broker", 1884)
            .client_id("kiosk-7")
            .topic("station/12/reader")
            .keep_alive_secs(30);
        assert_eq!(config.client_id, "kiosk-7");
        assert_eq!(config.topic, "station/12/reader");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.broker(), "broker:1884");
    }

    #[test]
    fn test_mqtt_config_from_config() {
        let shared = MqttConfig::default()
            .with_host("192.168.1.100")
            .unwrap()
            .with_port(1999)
            .with_topic("kiosk/mtb")
            .unwrap()
            .with_client_id("gate-3")
            .unwrap();
        let config = MqttRuntimeConfig::from_config(&shared);
        assert_eq!(config.host, "192.168.1.100");
        assert_eq!(config.port, 1999);
        assert_eq!(config.topic, "kiosk/mtb");
        assert_eq!(config.client_id, "gate-3");
    }

    #[test]
    fn test_packet_limit_admits_oversized_tickets() {
        let config = MqttRuntimeConfig::default();
        assert_eq!(config.max_packet_size, DEFAULT_MAX_PACKET_SIZE);
        assert!(config.options().max_packet_size() > 50 * 1024);

        let options = config.max_packet_size(200_000).options();
        assert_eq!(options.max_packet_size(), 200_000);
    }

    #[test]
    fn test_keep_alive_covers_dwell() {
        let short = MqttRuntimeConfig::default().covering_dwell(Duration::from_secs(1));
        assert_eq!(short.keep_alive_secs, 60);

        let long = MqttRuntimeConfig::default().covering_dwell(Duration::from_secs(100));
        assert_eq!(long.keep_alive_secs, 200);

        let fractional = MqttRuntimeConfig::default().covering_dwell(Duration::from_secs_f32(45.5));
        assert_eq!(fractional.keep_alive_secs, 92);

        let huge = MqttRuntimeConfig::default().covering_dwell(Duration::from_secs(1_000_000));
        assert_eq!(huge.keep_alive_secs, u16::MAX);
    }

    #[test]
    fn test_keep_alive_is_clamped() {
        let options = MqttRuntimeConfig::default().keep_alive_secs(0).options();
        assert_eq!(options.keep_alive(), Duration::from_secs(5));
    }

    // ========================================================================
    // RumqttFeed tests
    // ========================================================================

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on port 1 on a test machine.
        let mut feed = RumqttFeed::new(&MqttRuntimeConfig::new("127.0.0.1", 1));
        assert_eq!(feed.broker(), "127.0.0.1:1");

        let err = feed.connect().await.unwrap_err();
        match err {
            ConnectionError::Connect { broker, .. } => assert_eq!(broker, "127.0.0.1:1"),
            other => panic!("expected connect error, got {other:?}"),
        }
    }
}
