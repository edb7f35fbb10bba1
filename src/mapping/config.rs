//! Configuration loader and validator
//!
//! Loads bridge configuration from TOML files in the configs/ directory and
//! resolves it into the immutable [`BridgeConfig`] the bridge runs with.

use crate::backend::DeviceKind;
use crate::mapping::mapper::AxisScale;
use crate::mapping::tables::{ButtonLayout, MappingTable};
use crate::spacecontrol::constants::DEFAULT_LIBRARY_PATH;
use crate::spacecontrol::types::AXIS_COUNT;
use log::{debug, info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Button layout per device kind
    #[serde(default)]
    pub layouts: Layouts,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Create the spacenavd-compatible 3D mouse
    #[serde(default = "default_true")]
    pub enable_3d_mouse: bool,

    /// Create the virtual gamepad
    #[serde(default)]
    pub enable_gamepad: bool,

    /// Scale factor per axis (tx, ty, tz, rx, ry, rz)
    #[serde(default = "default_axis_scale")]
    pub axis_scale: Vec<f32>,

    /// Path to the SpaceControl client library
    #[serde(default = "default_library_path")]
    pub library_path: String,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum wait for one daemon event
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_3d_mouse: true,
            enable_gamepad: false,
            axis_scale: default_axis_scale(),
            library_path: default_library_path(),
            log_level: default_log_level(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

fn default_true() -> bool { true }
fn default_axis_scale() -> Vec<f32> { vec![20.0; AXIS_COUNT] }
fn default_library_path() -> String { DEFAULT_LIBRARY_PATH.to_string() }
fn default_log_level() -> String { "warn".to_string() }
fn default_poll_timeout_ms() -> u64 { 500 }

/// Layout selection per device kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layouts {
    #[serde(default)]
    pub mouse_3d: ButtonLayout,

    #[serde(default)]
    pub gamepad: ButtonLayout,
}

impl Layouts {
    pub fn for_kind(&self, kind: DeviceKind) -> ButtonLayout {
        match kind {
            DeviceKind::Mouse3d => self.mouse_3d,
            DeviceKind::Gamepad => self.gamepad,
        }
    }
}

/// Validated, immutable configuration the bridge runs with
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub enable_3d_mouse: bool,
    pub enable_gamepad: bool,
    pub axis_scale: AxisScale,
    pub library_path: PathBuf,
    pub log_level: LevelFilter,
    pub poll_timeout: Duration,
    pub mouse_table: MappingTable,
    pub gamepad_table: MappingTable,
}

impl BridgeConfig {
    /// Device kinds enabled by this configuration, 3D mouse first
    pub fn enabled_kinds(&self) -> Vec<DeviceKind> {
        DeviceKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn is_enabled(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::Mouse3d => self.enable_3d_mouse,
            DeviceKind::Gamepad => self.enable_gamepad,
        }
    }

    pub fn table(&self, kind: DeviceKind) -> &MappingTable {
        match kind {
            DeviceKind::Mouse3d => &self.mouse_table,
            DeviceKind::Gamepad => &self.gamepad_table,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        // Defaults are valid by construction
        Config::default().build()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        debug!("  - 3D mouse: {}", config.settings.enable_3d_mouse);
        debug!("  - Gamepad: {}", config.settings.enable_gamepad);
        debug!("  - Axis scale: {:?}", config.settings.axis_scale);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = &self.settings.axis_scale;
        if scale.len() != AXIS_COUNT {
            return Err(ConfigError::Invalid(format!(
                "axis_scale must have exactly {} values, got {}",
                AXIS_COUNT,
                scale.len()
            )));
        }

        if let Some(bad) = scale.iter().find(|f| !f.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "axis_scale values must be finite, got {}",
                bad
            )));
        }

        if self.settings.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_timeout_ms must be greater than 0".into()
            ));
        }

        if self.settings.library_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "library_path must not be empty".into()
            ));
        }

        if self.settings.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Unknown log_level '{}'",
                self.settings.log_level
            )));
        }

        Ok(())
    }

    /// Validate and resolve into the runtime configuration
    pub fn resolve(&self) -> Result<BridgeConfig, ConfigError> {
        self.validate()?;
        Ok(self.build())
    }

    /// Build the runtime configuration, assuming `self` is valid
    fn build(&self) -> BridgeConfig {
        let mut axis_scale = [1.0; AXIS_COUNT];
        for (slot, factor) in axis_scale.iter_mut().zip(&self.settings.axis_scale) {
            *slot = *factor;
        }

        BridgeConfig {
            enable_3d_mouse: self.settings.enable_3d_mouse,
            enable_gamepad: self.settings.enable_gamepad,
            axis_scale,
            library_path: PathBuf::from(&self.settings.library_path),
            log_level: self.settings.log_level.parse().unwrap_or(LevelFilter::Warn),
            poll_timeout: Duration::from_millis(self.settings.poll_timeout_ms),
            mouse_table: MappingTable::for_kind(DeviceKind::Mouse3d, self.layouts.mouse_3d),
            gamepad_table: MappingTable::for_kind(DeviceKind::Gamepad, self.layouts.gamepad),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.enable_3d_mouse);
        assert!(!settings.enable_gamepad);
        assert_eq!(settings.axis_scale, vec![20.0; 6]);
        assert_eq!(settings.library_path, "/opt/SpaceControl/lib/libspc_ctrl.so");
        assert_eq!(settings.poll_timeout_ms, 500);
    }

    #[test]
    fn test_valid_config_minimal() {
        let config = Config::from_toml("").unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.enabled_kinds(), vec![DeviceKind::Mouse3d]);
        assert_eq!(resolved.poll_timeout, Duration::from_millis(500));
        assert_eq!(resolved.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [settings]
            enable_3d_mouse = false
            enable_gamepad = true
            axis_scale = [2.0, 1.0, 1.0, 1.0, 1.0, -1.0]
            library_path = "/tmp/libspc_ctrl.so"
            log_level = "debug"
            poll_timeout_ms = 50

            [layouts]
            gamepad = "primary"
            "#,
        )
        .unwrap();

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.enabled_kinds(), vec![DeviceKind::Gamepad]);
        assert_eq!(resolved.axis_scale, [2.0, 1.0, 1.0, 1.0, 1.0, -1.0]);
        assert_eq!(resolved.library_path, PathBuf::from("/tmp/libspc_ctrl.so"));
        assert_eq!(resolved.log_level, LevelFilter::Debug);
        assert_eq!(resolved.poll_timeout, Duration::from_millis(50));
        assert_eq!(resolved.gamepad_table.button(17), None);
        assert_eq!(resolved.mouse_table.button(17), Some(0x111));
    }

    #[test]
    fn test_invalid_axis_scale_length() {
        let mut config = Config::default();
        config.settings.axis_scale = vec![1.0; 5];
        assert!(config.validate().is_err());

        config.settings.axis_scale = vec![1.0; 7];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_axis_scale() {
        let mut config = Config::default();
        config.settings.axis_scale = vec![1.0, f32::NAN, 1.0, 1.0, 1.0, 1.0];
        assert!(config.validate().is_err());

        config.settings.axis_scale = vec![f32::INFINITY; 6];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_timeout() {
        let mut config = Config::default();
        config.settings.poll_timeout_ms = 0;
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_library_path() {
        let mut config = Config::default();
        config.settings.library_path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = Config::default();
        config.settings.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_layout_rejected() {
        let result = Config::from_toml("[layouts]\nmouse_3d = \"fancy\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_no_kinds_enabled_is_valid() {
        let config = Config::from_toml("[settings]\nenable_3d_mouse = false\n").unwrap();
        assert!(config.resolve().unwrap().enabled_kinds().is_empty());
    }

    #[test]
    fn test_load_default_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/default.toml");
        let config = Config::load(path).unwrap();
        assert!(config.resolve().is_ok());
    }
}
