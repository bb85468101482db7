//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub annotate: AnnotateConfig,
    pub quiz: QuizConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the annotation service
    pub base_url: String,
    /// Request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,
}

/// A slider's value domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// Valence slider
    pub v_range: SliderRange,
    /// Arousal slider
    pub a_range: SliderRange,
    /// Discrete emotion keys offered when the clip is non-neutral
    pub discrete_emotions: Vec<String>,
    /// Command used to play audio; the clip URL is appended
    pub player_command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Minimum accuracy (percent) to pass the qualification test
    pub pass_threshold: u32,
    /// Allowed distance between a slider answer and the reference value
    pub tolerance: f64,
    /// Labels of the discrete choice grid, as prefixed on the server's test clips
    pub discrete_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long a result banner stays visible
    pub banner_secs: u64,
    /// Where reports and exports are written (default: current directory)
    pub export_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SliderRange {
    pub const VALENCE: SliderRange = SliderRange {
        min: -2.0,
        max: 2.0,
        step: 0.5,
    };

    pub const AROUSAL: SliderRange = SliderRange {
        min: 1.0,
        max: 5.0,
        step: 0.5,
    };

    /// Snap to the nearest step and clamp into range
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            v_range: SliderRange::VALENCE,
            a_range: SliderRange::AROUSAL,
            discrete_emotions: [
                "anger", "joy", "sadness", "fear", "surprise", "disgust", "anxiety", "other",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            player_command: vec![
                "ffplay".to_string(),
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 90,
            tolerance: 0.5,
            discrete_options: ["愤怒", "高兴", "悲伤", "恐惧", "惊讶", "厌恶", "中性"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            banner_secs: 5,
            export_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(server) = std::env::var("EMOLABEL_SERVER") {
            if !server.trim().is_empty() {
                config.server.base_url = server;
            }
        }
        Ok(config)
    }

    /// Load configuration from an explicit file, defaults when missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        Self::ensure_home()?;
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, range) in [("v_range", &self.annotate.v_range), ("a_range", &self.annotate.a_range)] {
            if range.min >= range.max || range.step <= 0.0 {
                return Err(Error::ConfigError {
                    message: format!(
                        "annotate.{} must have min < max and a positive step",
                        name
                    ),
                });
            }
        }
        if self.annotate.player_command.is_empty() {
            return Err(Error::ConfigError {
                message: "annotate.player_command must name a program".to_string(),
            });
        }
        Ok(())
    }

    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        match self.server.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn banner_ttl(&self) -> Duration {
        Duration::from_secs(self.ui.banner_secs)
    }

    /// Directory for reports and exports
    pub fn export_dir(&self) -> PathBuf {
        self.ui
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::emolabel_home()?.join("config.toml"))
    }

    /// Get the local session file path
    pub fn session_path() -> Result<PathBuf> {
        Ok(Self::emolabel_home()?.join("session.json"))
    }

    /// Get the emolabel home directory
    pub fn emolabel_home() -> Result<PathBuf> {
        // Check EMOLABEL_HOME env var first
        if let Ok(home) = std::env::var("EMOLABEL_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("org", "emolabel", "emolabel")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine emolabel home directory".to_string(),
            })
    }

    /// Ensure home directory exists
    pub fn ensure_home() -> Result<()> {
        let home = Self::emolabel_home()?;
        if !home.exists() {
            std::fs::create_dir_all(&home)?;
        }
        Ok(())
    }
}
