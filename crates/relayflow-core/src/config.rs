/*!
 * Persisted device configuration for RelayFlow.
 *
 * This module defines the configuration record the firmware keeps across
 * reboots and provides functionality to load it from defaults, a TOML file
 * and environment overrides.
 *
 * Selector fields (device mode, input modes, service types) are kept as the
 * raw integers that are persisted; decoding them into typed variants is the
 * job of the topology builder.
 */
use std::path::Path;
use std::sync::Arc;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Persisted configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device-wide settings
    #[serde(default)]
    pub device: DeviceSettings,

    /// Switch channel 1
    #[serde(default = "default_sw1")]
    pub sw1: SwitchConfig,

    /// Switch channel 2
    #[serde(default = "default_sw2")]
    pub sw2: SwitchConfig,

    /// Input channel 1 (used when the input is exposed on its own)
    #[serde(default = "default_in1")]
    pub in1: InputConfig,

    /// Input channel 2 (used when the input is exposed on its own)
    #[serde(default = "default_in2")]
    pub in2: InputConfig,

    /// Window covering (roller-shutter mode)
    #[serde(default)]
    pub wc1: CoveringConfig,

    /// Garage door opener (garage-door-opener mode)
    #[serde(default)]
    pub gdo1: GarageDoorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Name of the primary accessory
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Device mode selector: 0 dual switch, 1 roller shutter, 2 garage door opener
    #[serde(default)]
    pub mode: u8,

    /// Set on devices upgraded from the pre-2.1 firmware generation
    #[serde(default)]
    pub legacy_hap_layout: bool,
}

/// Switch channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Service name
    pub name: String,

    /// Service type: -1 disabled, 0 switch, 1 outlet, 2 lock, 3 valve
    #[serde(default)]
    pub svc_type: i32,

    /// Input mode: 0 momentary, 1 toggle, 2 edge, 3 detached, 4 activation
    #[serde(default)]
    pub in_mode: i32,
}

/// Standalone input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Service name
    pub name: String,

    /// Service type: 0 stateless switch, 1 motion, 2 occupancy, 3 contact, 4 doorbell
    #[serde(default)]
    pub svc_type: i32,

    /// Invert the reported state
    #[serde(default)]
    pub inverted: bool,
}

/// Window covering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveringConfig {
    /// Service name
    #[serde(default = "default_covering_name")]
    pub name: String,

    /// Input mode: 0 separate momentary, 1 separate toggle, 2 single, 3 detached
    #[serde(default)]
    pub in_mode: i32,

    /// Swap the roles of the two inputs
    #[serde(default)]
    pub swap_inputs: bool,

    /// Swap the roles of the two outputs
    #[serde(default)]
    pub swap_outputs: bool,

    /// Full travel time in milliseconds (0 until calibrated)
    #[serde(default)]
    pub move_time_ms: u32,
}

/// Garage door opener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarageDoorConfig {
    /// Service name
    #[serde(default = "default_garage_door_name")]
    pub name: String,

    /// Open sensor on input 2: 0 normally closed, 1 normally open, 2 not fitted
    #[serde(default)]
    pub open_sensor_mode: i32,

    /// Travel time in milliseconds
    #[serde(default = "default_garage_move_time_ms")]
    pub move_time_ms: u32,

    /// Relay pulse length in milliseconds
    #[serde(default = "default_garage_pulse_time_ms")]
    pub pulse_time_ms: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to include the event target
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

impl Config {
    /// Configuration of switch channel `id` (1 or 2)
    pub fn switch(&self, id: u8) -> Option<&SwitchConfig> {
        match id {
            1 => Some(&self.sw1),
            2 => Some(&self.sw2),
            _ => None,
        }
    }

    /// Configuration of input channel `id` (1 or 2)
    pub fn input(&self, id: u8) -> Option<&InputConfig> {
        match id {
            1 => Some(&self.in1),
            2 => Some(&self.in2),
            _ => None,
        }
    }

    /// Serialize the record as TOML, the format it is persisted in
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            sw1: default_sw1(),
            sw2: default_sw2(),
            in1: default_in1(),
            in2: default_in2(),
            wc1: CoveringConfig::default(),
            gdo1: GarageDoorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            mode: 0,
            legacy_hap_layout: false,
        }
    }
}

impl Default for CoveringConfig {
    fn default() -> Self {
        Self {
            name: default_covering_name(),
            in_mode: 0,
            swap_inputs: false,
            swap_outputs: false,
            move_time_ms: 0,
        }
    }
}

impl Default for GarageDoorConfig {
    fn default() -> Self {
        Self {
            name: default_garage_door_name(),
            open_sensor_mode: 0,
            move_time_ms: default_garage_move_time_ms(),
            pulse_time_ms: default_garage_pulse_time_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: default_with_target(),
        }
    }
}

fn default_device_name() -> String {
    "RelayFlow 2PM".to_string()
}

fn switch_config(name: &str) -> SwitchConfig {
    SwitchConfig {
        name: name.to_string(),
        svc_type: 0,
        in_mode: 0,
    }
}

fn default_sw1() -> SwitchConfig {
    switch_config("Switch 1")
}

fn default_sw2() -> SwitchConfig {
    switch_config("Switch 2")
}

fn input_config(name: &str) -> InputConfig {
    InputConfig {
        name: name.to_string(),
        svc_type: 0,
        inverted: false,
    }
}

fn default_in1() -> InputConfig {
    input_config("Input 1")
}

fn default_in2() -> InputConfig {
    input_config("Input 2")
}

fn default_covering_name() -> String {
    "Window Covering".to_string()
}

fn default_garage_door_name() -> String {
    "Garage Door".to_string()
}

fn default_garage_move_time_ms() -> u32 {
    20_000
}

fn default_garage_pulse_time_ms() -> u32 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

/// A builder for loading the configuration record
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<String>,
    environment_prefix: Option<String>,
    override_with: Option<Config>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Set the environment variable prefix for configuration
    pub fn with_environment_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.as_ref().to_string());
        self
    }

    /// Override with an existing config
    pub fn override_with(mut self, config: Config) -> Self {
        self.override_with = Some(config);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        if let Some(config) = self.override_with {
            debug!("Using provided configuration record");
            return Ok(config);
        }

        let defaults = ConfigLib::try_from(&Config::default())
            .map_err(|e| Error::config(format!("Failed to create default config: {}", e)))?;
        let mut builder = ConfigLib::builder().add_source(defaults);

        if let Some(config_file) = self.config_file {
            let path = Path::new(&config_file);
            if path.exists() {
                debug!("Loading configuration from {}", config_file);
                builder = builder.add_source(File::with_name(&config_file));
            } else {
                debug!("Configuration file {} does not exist, using defaults", config_file);
            }
        }

        if let Some(prefix) = self.environment_prefix {
            debug!("Loading configuration from environment variables with prefix {}", prefix);
            builder = builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let merged = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build configuration: {}", e)))?;

        let config: Config = merged
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize configuration: {}", e)))?;

        info!(mode = config.device.mode, "Configuration loaded");
        Ok(config)
    }
}

/// A thread-safe, read-only reference to the configuration record
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<Config>);

impl SharedConfig {
    /// Create a new SharedConfig
    pub fn new(config: Config) -> Self {
        Self(Arc::new(config))
    }

    /// Get a reference to the config
    pub fn get(&self) -> &Config {
        &self.0
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

impl AsRef<Config> for SharedConfig {
    fn as_ref(&self) -> &Config {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.mode, 0);
        assert!(!config.device.legacy_hap_layout);
        assert_eq!(config.sw1.name, "Switch 1");
        assert_eq!(config.sw2.name, "Switch 2");
        assert_eq!(config.in2.name, "Input 2");
        assert_eq!(config.gdo1.move_time_ms, 20_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_switch_and_input_lookup() {
        let config = Config::default();
        assert_eq!(config.switch(1).map(|s| s.name.as_str()), Some("Switch 1"));
        assert_eq!(config.input(2).map(|i| i.name.as_str()), Some("Input 2"));
        assert!(config.switch(3).is_none());
        assert!(config.input(0).is_none());
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test_log::test]
    fn test_config_builder_with_file() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::other(e.to_string()))?;
        let file_path = dir.path().join("device.toml");

        fs::write(
            &file_path,
            br#"
                [device]
                mode = 1

                [wc1]
                name = "Bedroom Blinds"
                in_mode = 2
                swap_inputs = true
            "#,
        )
        .map_err(|e| Error::other(e.to_string()))?;

        let config = ConfigBuilder::new().with_config_file(&file_path).build()?;

        assert_eq!(config.device.mode, 1);
        assert_eq!(config.wc1.name, "Bedroom Blinds");
        assert_eq!(config.wc1.in_mode, 2);
        assert!(config.wc1.swap_inputs);
        // Untouched sections keep their defaults
        assert_eq!(config.sw1, Config::default().sw1);

        Ok(())
    }

    #[test]
    fn test_config_builder_missing_file_uses_defaults() -> Result<()> {
        let config = ConfigBuilder::new()
            .with_config_file("/nonexistent/relayflow/device.toml")
            .build()?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_config_builder_with_env() -> Result<()> {
        env::set_var("RFTESTENV__DEVICE__MODE", "2");
        env::set_var("RFTESTENV__DEVICE__LEGACY_HAP_LAYOUT", "true");

        let config = ConfigBuilder::new()
            .with_environment_prefix("rftestenv")
            .build()?;

        assert_eq!(config.device.mode, 2);
        assert!(config.device.legacy_hap_layout);

        env::remove_var("RFTESTENV__DEVICE__MODE");
        env::remove_var("RFTESTENV__DEVICE__LEGACY_HAP_LAYOUT");

        Ok(())
    }

    #[test]
    fn test_persisted_toml_loads_back() -> Result<()> {
        let mut original = Config::default();
        original.device.mode = 2;
        original.gdo1.name = "Barn".to_string();
        original.sw2.in_mode = 3;

        let dir = tempdir().map_err(|e| Error::other(e.to_string()))?;
        let file_path = dir.path().join("persisted.toml");
        fs::write(&file_path, original.to_toml_string()?)
            .map_err(|e| Error::other(e.to_string()))?;

        let loaded = ConfigBuilder::new().with_config_file(&file_path).build()?;
        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn test_override_wins() -> Result<()> {
        let mut record = Config::default();
        record.device.legacy_hap_layout = true;
        let config = ConfigBuilder::new().override_with(record.clone()).build()?;
        assert_eq!(config, record);
        Ok(())
    }

    #[test]
    fn test_shared_config() {
        let shared = SharedConfig::new(Config::default());
        let shared2 = shared.clone();
        assert_eq!(shared2.get().device.name, shared.as_ref().device.name);
    }
}
