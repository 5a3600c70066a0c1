//! Daemon configuration.
//!
//! Uses `heapless::String` for the broker strings so oversized values are
//! rejected at startup instead of surfacing as transport errors later.
//!
//! # Example
//!
//! ```rust
//! use mtb_display::config::{DisplayConfig, MqttConfig};
//!
//! // Use defaults
//! let config = DisplayConfig::default();
//! assert_eq!(config.mqtt.topic.as_str(), "service/v1/Validate/reader");
//!
//! // Or customize
//! let config = DisplayConfig::default()
//!     .with_delay_secs(2.5)
//!     .with_module_size(3)
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100").unwrap());
//! config.validate().unwrap();
//! ```

use std::path::PathBuf;
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb888;
use heapless::String as HString;
use thiserror::Error;

use crate::encoder::DEFAULT_MODULE_SIZE;
use crate::surface::{BACKGROUND, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

/// Default broker host.
pub const DEFAULT_MQTT_HOSTNAME: &str = "127.0.0.1";

/// Default broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default subscription topic.
pub const DEFAULT_MQTT_TOPIC: &str = "service/v1/Validate/reader";

/// Default dwell in seconds.
pub const DEFAULT_DELAY_SECS: f32 = 1.0;

/// Longest dwell allowed while subscribed.
///
/// The broker keep-alive is stretched to twice the dwell and cannot exceed
/// 65535 seconds.
pub const MAX_SUBSCRIBED_DELAY_SECS: f32 = (u16::MAX / 2) as f32;

/// Default framebuffer device.
pub const DEFAULT_FB_DEVICE: &str = "/dev/fb0";

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A string does not fit its fixed-capacity field.
    #[error("{field} is longer than {max} bytes")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Capacity in bytes.
        max: usize,
    },
    /// A required string is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Dwell must be a finite, non-negative number of seconds.
    #[error("invalid delay {0}")]
    InvalidDelay(f32),
    /// Module size must be at least one pixel.
    #[error("invalid module size {0}")]
    InvalidModuleSize(u32),
}

// ============================================================================
// Helpers for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, failing if it does not fit
pub fn short_string(field: &'static str, s: &str) -> Result<ShortString, ConfigError> {
    let mut hs = ShortString::new();
    hs.push_str(s).map_err(|_| ConfigError::TooLong {
        field,
        max: MAX_SHORT_STRING,
    })?;
    Ok(hs)
}

/// Create a LongString from a &str, failing if it does not fit
pub fn long_string(field: &'static str, s: &str) -> Result<LongString, ConfigError> {
    let mut hs = LongString::new();
    hs.push_str(s).map_err(|_| ConfigError::TooLong {
        field,
        max: MAX_LONG_STRING,
    })?;
    Ok(hs)
}

// Defaults are compile-time constants well under capacity.
fn const_short(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let _ = hs.push_str(s);
    hs
}

fn const_long(s: &str) -> LongString {
    let mut hs = LongString::new();
    let _ = hs.push_str(s);
    hs
}

// ============================================================================
// Policies
// ============================================================================

/// What the display cycle does when a payload cannot be encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EncodeFailurePolicy {
    /// Log the failure and wait for the next payload.
    #[default]
    Skip,
    /// Stop processing and exit with an error.
    Abort,
}

/// Which display backend the daemon drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DisplayBackend {
    /// Linux framebuffer device.
    #[default]
    Framebuffer,
    /// In-memory surface only.
    Headless,
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete daemon configuration, resolved once at startup.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    /// Seconds each symbol stays on screen
    pub delay_secs: f32,
    /// Pixel size of one Aztec module
    pub module_size: u32,
    /// Verbose logging
    pub debug: bool,
    /// Encode failure handling
    pub on_encode_failure: EncodeFailurePolicy,
    /// Display backend
    pub backend: DisplayBackend,
    /// Framebuffer device node
    pub fb_device: PathBuf,
    /// Broker settings
    pub mqtt: MqttConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_DELAY_SECS,
            module_size: DEFAULT_MODULE_SIZE,
            debug: false,
            on_encode_failure: EncodeFailurePolicy::Skip,
            backend: DisplayBackend::Framebuffer,
            fb_device: PathBuf::from(DEFAULT_FB_DEVICE),
            mqtt: MqttConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Set the dwell time in seconds
    pub fn with_delay_secs(mut self, secs: f32) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set the module size
    pub fn with_module_size(mut self, size: u32) -> Self {
        self.module_size = size;
        self
    }

    /// Enable or disable debug logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the encode failure policy
    pub fn with_encode_failure(mut self, policy: EncodeFailurePolicy) -> Self {
        self.on_encode_failure = policy;
        self
    }

    /// Set the display backend
    pub fn with_backend(mut self, backend: DisplayBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the framebuffer device
    pub fn with_fb_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.fb_device = device.into();
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Display resolution (fixed).
    pub const fn resolution(&self) -> (u32, u32) {
        (DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }

    /// Background color (fixed).
    pub const fn background(&self) -> Rgb888 {
        BACKGROUND
    }

    /// Dwell as a [`Duration`]; zero for values [`validate`](Self::validate) rejects.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Checks value ranges that the type system does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(ConfigError::InvalidDelay(self.delay_secs));
        }
        if self.mqtt.enabled && self.delay_secs > MAX_SUBSCRIBED_DELAY_SECS {
            return Err(ConfigError::InvalidDelay(self.delay_secs));
        }
        if self.module_size == 0 {
            return Err(ConfigError::InvalidModuleSize(self.module_size));
        }
        self.mqtt.validate()
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT subscription configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MqttConfig {
    /// Whether the subscription loop runs after file payloads
    pub enabled: bool,
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Topic carrying MTB payloads
    pub topic: LongString,
    /// Client ID (should be unique per kiosk)
    pub client_id: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: const_short(DEFAULT_MQTT_HOSTNAME),
            port: DEFAULT_MQTT_PORT,
            topic: const_long(DEFAULT_MQTT_TOPIC),
            client_id: const_short("mtb-display"),
            keep_alive_secs: 60,
        }
    }
}

impl MqttConfig {
    /// Enable or disable the subscription loop
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Result<Self, ConfigError> {
        self.host = short_string("hostname", host)?;
        Ok(self)
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: &str) -> Result<Self, ConfigError> {
        self.topic = long_string("topic", topic)?;
        Ok(self)
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Result<Self, ConfigError> {
        self.client_id = short_string("client_id", id)?;
        Ok(self)
    }

    /// Set the keep-alive interval
    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// `host:port` for log messages
    pub fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Empty("hostname"));
        }
        if self.topic.is_empty() {
            return Err(ConfigError::Empty("topic"));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::Empty("client_id"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DisplayConfig::default();
        assert_eq!(config.delay_secs, 1.0);
        assert_eq!(config.module_size, 2);
        assert!(!config.debug);
        assert_eq!(config.on_encode_failure, EncodeFailurePolicy::Skip);
        assert_eq!(config.backend, DisplayBackend::Framebuffer);
        assert_eq!(config.fb_device, PathBuf::from("/dev/fb0"));
        assert_eq!(config.resolution(), (480, 320));
        assert_eq!(config.background(), Rgb888::new(255, 255, 255));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_mqtt_config() {
        let mqtt = MqttConfig::default();
        assert!(!mqtt.enabled);
        assert_eq!(mqtt.host.as_str(), "127.0.0.1");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.topic.as_str(), "service/v1/Validate/reader");
        assert_eq!(mqtt.broker(), "127.0.0.1:1883");
    }

    #[test]
    fn builder_pattern() {
        let config = DisplayConfig::default()
            .with_delay_secs(0.1)
            .with_module_size(3)
            .with_debug(true)
            .with_encode_failure(EncodeFailurePolicy::Abort)
            .with_backend(DisplayBackend::Headless)
            .with_fb_device("/dev/fb1")
            .with_mqtt(
                MqttConfig::default()
                    .with_enabled(true)
                    .with_host("broker.local")
                    .unwrap()
                    .with_port(8883)
                    .with_topic("kiosk/mtb")
                    .unwrap(),
            );

        assert_eq!(config.delay(), Duration::from_secs_f32(0.1));
        assert_eq!(config.module_size, 3);
        assert!(config.debug);
        assert_eq!(config.on_encode_failure, EncodeFailurePolicy::Abort);
        assert_eq!(config.backend, DisplayBackend::Headless);
        assert_eq!(config.fb_device, PathBuf::from("/dev/fb1"));
        assert!(config.mqtt.enabled);
        assert_eq!(config.mqtt.broker(), "broker.local:8883");
        assert_eq!(config.mqtt.topic.as_str(), "kiosk/mtb");
    }

    #[test]
    fn short_string_rejects_overflow() {
        let long_input = "a".repeat(MAX_SHORT_STRING + 1);
        assert_eq!(
            short_string("hostname", &long_input),
            Err(ConfigError::TooLong {
                field: "hostname",
                max: MAX_SHORT_STRING
            })
        );
        assert!(short_string("hostname", &"a".repeat(MAX_SHORT_STRING)).is_ok());
    }

    #[test]
    fn long_topic_rejected() {
        let topic = "t/".repeat(MAX_LONG_STRING);
        assert!(MqttConfig::default().with_topic(&topic).is_err());
    }

    #[test]
    fn validate_rejects_bad_delay() {
        for delay in [-1.0, f32::NAN, f32::INFINITY] {
            let config = DisplayConfig::default().with_delay_secs(delay);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidDelay(_))));
        }
        assert!(DisplayConfig::default().with_delay_secs(0.0).validate().is_ok());
    }

    #[test]
    fn long_delay_rejected_only_when_subscribed() {
        let config = DisplayConfig::default().with_delay_secs(40_000.0);
        assert!(config.validate().is_ok());

        let subscribed = config.with_mqtt(MqttConfig::default().with_enabled(true));
        assert_eq!(subscribed.validate(), Err(ConfigError::InvalidDelay(40_000.0)));

        let config = DisplayConfig::default()
            .with_delay_secs(MAX_SUBSCRIBED_DELAY_SECS)
            .with_mqtt(MqttConfig::default().with_enabled(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_module_size() {
        let config = DisplayConfig::default().with_module_size(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidModuleSize(0)));
    }

    #[cfg(feature = "cli")]
    #[test]
    fn partial_toml_uses_defaults() {
        let config: DisplayConfig = toml::from_str(
            r#"
delay_secs = 0.5
on_encode_failure = "abort"
backend = "headless"

[mqtt]
enabled = true
host = "broker.local"
"#,
        )
        .unwrap();

        assert_eq!(config.delay_secs, 0.5);
        assert_eq!(config.module_size, 2);
        assert_eq!(config.on_encode_failure, EncodeFailurePolicy::Abort);
        assert_eq!(config.backend, DisplayBackend::Headless);
        assert!(config.mqtt.enabled);
        assert_eq!(config.mqtt.broker(), "broker.local:1883");
        assert_eq!(config.mqtt.topic.as_str(), DEFAULT_MQTT_TOPIC);
    }

    #[test]
    fn validate_rejects_empty_topic() {
        let config =
            DisplayConfig::default().with_mqtt(MqttConfig::default().with_topic("").unwrap());
        assert_eq!(config.validate(), Err(ConfigError::Empty("topic")));
    }
}
