//! Network services for MQTT integration.
//!
//! - [`mqtt`]: `rumqttc`-backed [`MessageFeed`](crate::traits::MessageFeed)
//! - [`subscriber`]: loop that turns each message into one display cycle
//!
//! ```ignore
//! use mtb_display::services::{MqttRuntimeConfig, RumqttFeed, Subscriber};
//!
//! let runtime = MqttRuntimeConfig::from_config(&config.mqtt);
//! let mut subscriber = Subscriber::new(RumqttFeed::new(&runtime), runtime.topic.clone());
//! let controller = subscriber.run(controller, shutdown).await?;
//! ```

pub mod mqtt;
pub mod subscriber;

// Re-exports
pub use mqtt::*;
pub use subscriber::*;
