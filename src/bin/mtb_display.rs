//! mtb-display daemon entry point.
//!
//! ```text
//! main()
//!  └─ Cli::resolve()          -- TOML file, then CLI flags / MTB_* env
//!  └─ run()
//!       ├─ read all payload files (any failure aborts before display init)
//!       ├─ init display backend
//!       ├─ one cycle per file
//!       └─ subscription loop  (--mqtt, until Ctrl-C or connection loss)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mtb_display::config::{DisplayBackend, DisplayConfig, EncodeFailurePolicy};
use mtb_display::controller::DisplayController;
use mtb_display::hal::{FramebufferRenderer, HeadlessRenderer, SleepDwell};
use mtb_display::services::{MqttRuntimeConfig, RumqttFeed, Subscriber};
use mtb_display::source::{FileSource, Payload};
use mtb_display::traits::Renderer;

type Controller = DisplayController<Box<dyn Renderer + Send>, SleepDwell>;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Framebuffer,
    Headless,
}

impl From<BackendArg> for DisplayBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Framebuffer => DisplayBackend::Framebuffer,
            BackendArg::Headless => DisplayBackend::Headless,
        }
    }
}

/// Shows MTB ticket payloads as Aztec barcodes, one at a time.
///
/// Options left unset fall back to the `--config` file, then to built-in
/// defaults.
#[derive(Debug, Parser)]
#[command(name = "mtb-display", version)]
struct Cli {
    /// MTB payload files, displayed in order before any subscription.
    mtb: Vec<PathBuf>,

    /// Seconds each symbol stays on screen.
    #[arg(long, env = "MTB_DELAY")]
    delay: Option<f32>,

    /// Follow the MQTT topic after the files are shown.
    #[arg(long, env = "MTB_MQTT")]
    mqtt: bool,

    /// MQTT broker host.
    #[arg(long, env = "MTB_HOSTNAME")]
    hostname: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "MTB_PORT")]
    port: Option<u16>,

    /// Topic carrying MTB payloads.
    #[arg(long, env = "MTB_TOPIC")]
    topic: Option<String>,

    /// Pixel size of one Aztec module.
    #[arg(long, env = "MTB_SIZE")]
    size: Option<u32>,

    /// Log at debug level.
    #[arg(long, env = "MTB_DEBUG")]
    debug: bool,

    /// Exit on the first payload that cannot be encoded.
    #[arg(long, env = "MTB_STRICT")]
    strict: bool,

    /// Display backend.
    #[arg(long, value_enum, env = "MTB_DISPLAY")]
    display: Option<BackendArg>,

    /// Framebuffer device node.
    #[arg(long, env = "MTB_FB_DEVICE")]
    fb_device: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, env = "MTB_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file (if any) and applies command-line overrides.
    fn resolve(self) -> anyhow::Result<(DisplayConfig, Vec<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config file {}", path.display()))?;
                toml::from_str::<DisplayConfig>(&text)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => DisplayConfig::default(),
        };

        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(size) = self.size {
            config.module_size = size;
        }
        if self.debug {
            config.debug = true;
        }
        if self.strict {
            config.on_encode_failure = EncodeFailurePolicy::Abort;
        }
        if let Some(display) = self.display {
            config.backend = display.into();
        }
        if let Some(device) = self.fb_device {
            config.fb_device = device;
        }

        let mut mqtt = config.mqtt.clone();
        if self.mqtt {
            mqtt = mqtt.with_enabled(true);
        }
        if let Some(host) = &self.hostname {
            mqtt = mqtt.with_host(host)?;
        }
        if let Some(port) = self.port {
            mqtt = mqtt.with_port(port);
        }
        if let Some(topic) = &self.topic {
            mqtt = mqtt.with_topic(topic)?;
        }
        config.mqtt = mqtt;

        config.validate().context("invalid configuration")?;
        Ok((config, self.mtb))
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn open_renderer(config: &DisplayConfig) -> Box<dyn Renderer + Send> {
    match config.backend {
        DisplayBackend::Framebuffer => Box::new(FramebufferRenderer::new(config.fb_device.clone())),
        DisplayBackend::Headless => Box::new(HeadlessRenderer::new()),
    }
}

fn subscribe(controller: Controller, config: &DisplayConfig) -> anyhow::Result<Controller> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let mqtt = MqttRuntimeConfig::from_config(&config.mqtt).covering_dwell(config.delay());

    runtime.block_on(async move {
        let shutdown = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => {
                    warn!("cannot listen for Ctrl-C: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        info!("Connecting to MQTT broker {}", mqtt.broker());
        let mut subscriber = Subscriber::new(RumqttFeed::new(&mqtt), mqtt.topic.clone());
        subscriber
            .run(controller, shutdown)
            .await
            .context("subscription loop stopped")
    })
}

fn run(config: DisplayConfig, files: Vec<PathBuf>) -> anyhow::Result<()> {
    info!(
        "mtb-display starting: {} file(s), delay {:.1}s, module size {}",
        files.len(),
        config.delay_secs,
        config.module_size
    );

    let payloads = FileSource::new(files)
        .collect::<Result<Vec<Payload>, _>>()
        .context("cannot load payload files")?;

    let mut controller = DisplayController::new(open_renderer(&config), SleepDwell, &config);
    controller.init().context("cannot initialize display")?;

    controller
        .process_all(&payloads)
        .context("cannot display payload file")?;

    if config.mqtt.enabled {
        controller = subscribe(controller, &config)?;
    }

    let stats = controller.stats();
    info!(
        displayed = stats.displayed,
        skipped = stats.skipped,
        "mtb-display stopped"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cli_debug = cli.debug;

    let resolved = cli.resolve();
    init_tracing(match &resolved {
        Ok((config, _)) => config.debug,
        Err(_) => cli_debug,
    });

    match resolved.and_then(|(config, files)| run(config, files)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
