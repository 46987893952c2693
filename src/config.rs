use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::network::layout::{LayoutAlgorithm, LayoutConfig};
use crate::core::network::relationship::{Workflow, DEFAULT_CONFIDENCE, MAX_CONFIDENCE};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub tui: TuiConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

/// Relationship network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub workflow: Workflow,
    pub default_layout: LayoutAlgorithm,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub layer_height: f64,
    pub node_spacing: f64,
    pub force_iterations: usize,
    pub force_damping: f64,
    pub force_step: f64,
    /// Fixed seed for reproducible force layouts.
    pub force_seed: Option<u64>,
    pub convergence_threshold: Option<f64>,
    /// Confidence given to relationships created without one.
    pub default_confidence: u8,
}

/// TUI-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
    /// Enable mouse support in the terminal.
    pub mouse_enabled: bool,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
    /// JSON dataset served by the in-memory gateway.
    pub dataset_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Override `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    pub compress_old_logs: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            workflow: Workflow::default(),
            default_layout: LayoutAlgorithm::default(),
            canvas_width: layout.canvas_width,
            canvas_height: layout.canvas_height,
            layer_height: layout.layer_height,
            node_spacing: layout.node_spacing,
            force_iterations: layout.force_iterations,
            force_damping: layout.damping,
            force_step: layout.step,
            force_seed: None,
            convergence_threshold: None,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl NetworkConfig {
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            layer_height: self.layer_height,
            node_spacing: self.node_spacing,
            force_iterations: self.force_iterations,
            damping: self.force_damping,
            step: self.force_step,
            seed: self.force_seed,
            convergence_threshold: self.convergence_threshold,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            mouse_enabled: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            compress_old_logs: true,
        }
    }
}

/// Something worth logging about how the configuration was resolved.
///
/// Configuration is read before logging exists, so these are collected and
/// emitted once the subscriber is installed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNotice {
    pub level: log::Level,
    pub message: String,
}

impl ConfigNotice {
    fn new(level: log::Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn emit(&self) {
        log::log!(self.level, "{}", self.message);
    }
}

impl NetworkConfig {
    /// Reset invalid values to their defaults. Returns the reset keys.
    pub fn validate(&mut self) -> Vec<&'static str> {
        let mut layout = self.layout_config();
        let mut reset: Vec<&'static str> = layout
            .sanitize()
            .into_iter()
            .map(|field| match field {
                "damping" => "force_damping",
                "step" => "force_step",
                other => other,
            })
            .collect();
        self.canvas_width = layout.canvas_width;
        self.canvas_height = layout.canvas_height;
        self.layer_height = layout.layer_height;
        self.node_spacing = layout.node_spacing;
        self.force_damping = layout.damping;
        self.force_step = layout.step;
        self.convergence_threshold = layout.convergence_threshold;

        if self.default_confidence > MAX_CONFIDENCE {
            self.default_confidence = DEFAULT_CONFIDENCE;
            reset.push("default_confidence");
        }
        reset
    }
}

impl TuiConfig {
    /// Reset invalid values to their defaults. Returns the reset keys.
    pub fn validate(&mut self) -> Vec<&'static str> {
        let mut reset = Vec::new();
        if self.tick_rate_ms == 0 {
            self.tick_rate_ms = Self::default().tick_rate_ms;
            reset.push("tick_rate_ms");
        }
        reset
    }
}

impl AppConfig {
    /// Load configuration from `<config_dir>/case-graph/config.toml`.
    ///
    /// Never fails: a missing or unparseable file yields defaults and
    /// invalid values are reset. The notices describe what happened.
    pub fn load() -> (Self, Vec<ConfigNotice>) {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &std::path::Path) -> (Self, Vec<ConfigNotice>) {
        let mut notices = Vec::new();
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    notices.push(ConfigNotice::new(
                        log::Level::Info,
                        format!("Loaded config from {}", config_path.display()),
                    ));
                    config
                }
                Err(e) => {
                    notices.push(ConfigNotice::new(
                        log::Level::Warn,
                        format!(
                            "Failed to parse config at {}: {e}; using defaults",
                            config_path.display()
                        ),
                    ));
                    Self::default()
                }
            },
            Err(_) => {
                notices.push(ConfigNotice::new(
                    log::Level::Debug,
                    format!("No config file at {}; using defaults", config_path.display()),
                ));
                Self::default()
            }
        };

        for (section, reset) in [
            ("network", config.network.validate()),
            ("tui", config.tui.validate()),
        ] {
            for key in reset {
                notices.push(ConfigNotice::new(
                    log::Level::Warn,
                    format!("Invalid {section}.{key} in config; using the default"),
                ));
            }
        }

        (config, notices)
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("case-graph"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("case-graph").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
