/*!
 * Typed views of the persisted selectors.
 *
 * The configuration record stores device mode, input modes and service types
 * as raw integers. They are decoded here exactly once per boot; unknown values
 * fall back to a safe variant and are logged.
 */
use serde::Serialize;
use tracing::warn;

use relayflow_core::config::{Config, CoveringConfig, GarageDoorConfig, InputConfig, SwitchConfig};

/// Device mode, with the configuration sections the mode reads
#[derive(Debug, Clone, Copy)]
pub enum DeviceMode<'c> {
    /// Two independent switches (mode 0)
    DualSwitch(DualSwitchConfig<'c>),
    /// One window covering driving both relays (mode 1)
    RollerShutter(&'c CoveringConfig),
    /// One garage door opener (mode 2)
    GarageDoorOpener(&'c GarageDoorConfig),
}

/// Configuration sections used by the dual-switch branch
#[derive(Debug, Clone, Copy)]
pub struct DualSwitchConfig<'c> {
    /// Device was upgraded from the legacy accessory layout
    pub legacy_layout: bool,
    /// Switch 1 and switch 2
    pub switches: [&'c SwitchConfig; 2],
    /// Input 1 and input 2
    pub inputs: [&'c InputConfig; 2],
}

impl<'c> DualSwitchConfig<'c> {
    /// Decoded input modes of switch 1 and switch 2
    pub fn in_modes(&self) -> [SwitchInMode; 2] {
        [
            SwitchInMode::decode(self.switches[0].in_mode),
            SwitchInMode::decode(self.switches[1].in_mode),
        ]
    }
}

impl<'c> DeviceMode<'c> {
    /// Decode the device mode selector of `config`
    pub fn decode(config: &'c Config) -> Self {
        match config.device.mode {
            0 => Self::dual_switch(config),
            1 => DeviceMode::RollerShutter(&config.wc1),
            2 => DeviceMode::GarageDoorOpener(&config.gdo1),
            other => {
                warn!(mode = other, "Unknown device mode, using dual switch");
                Self::dual_switch(config)
            }
        }
    }

    fn dual_switch(config: &'c Config) -> Self {
        DeviceMode::DualSwitch(DualSwitchConfig {
            legacy_layout: config.device.legacy_hap_layout,
            switches: [&config.sw1, &config.sw2],
            inputs: [&config.in1, &config.in2],
        })
    }

    /// Mode tag, without the configuration
    pub fn tag(&self) -> ModeTag {
        match self {
            DeviceMode::DualSwitch(_) => ModeTag::DualSwitch,
            DeviceMode::RollerShutter(_) => ModeTag::RollerShutter,
            DeviceMode::GarageDoorOpener(_) => ModeTag::GarageDoorOpener,
        }
    }
}

/// Device mode without its configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeTag {
    /// Mode 0
    DualSwitch,
    /// Mode 1
    RollerShutter,
    /// Mode 2
    GarageDoorOpener,
}

impl ModeTag {
    /// Name used in logs and events
    pub fn as_str(self) -> &'static str {
        match self {
            ModeTag::DualSwitch => "dual_switch",
            ModeTag::RollerShutter => "roller_shutter",
            ModeTag::GarageDoorOpener => "garage_door_opener",
        }
    }
}

/// How a switch reacts to its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchInMode {
    /// Press toggles the output
    Momentary,
    /// Input level is the output level
    Toggle,
    /// Every edge toggles the output
    Edge,
    /// Input is not tied to the output and is exposed on its own
    Detached,
    /// Input turns the output on only
    Activation,
}

impl SwitchInMode {
    /// Decode a persisted value; unknown values mean momentary
    pub fn decode(raw: i32) -> Self {
        match raw {
            0 => SwitchInMode::Momentary,
            1 => SwitchInMode::Toggle,
            2 => SwitchInMode::Edge,
            3 => SwitchInMode::Detached,
            4 => SwitchInMode::Activation,
            other => {
                warn!(in_mode = other, "Unknown switch input mode, using momentary");
                SwitchInMode::Momentary
            }
        }
    }

    /// Whether the input is exposed independently of the switch
    pub fn is_detached(self) -> bool {
        self == SwitchInMode::Detached
    }
}

/// How a window covering reads its two inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveringInMode {
    /// One momentary button per direction
    SeparateMomentary,
    /// One toggle switch per direction
    SeparateToggle,
    /// A single button cycles open/stop/close; the other input is free
    Single,
    /// Neither input is used by the covering
    Detached,
}

impl CoveringInMode {
    /// Decode a persisted value; unknown values mean separate momentary
    pub fn decode(raw: i32) -> Self {
        match raw {
            0 => CoveringInMode::SeparateMomentary,
            1 => CoveringInMode::SeparateToggle,
            2 => CoveringInMode::Single,
            3 => CoveringInMode::Detached,
            other => {
                warn!(
                    in_mode = other,
                    "Unknown window covering input mode, using separate momentary"
                );
                CoveringInMode::SeparateMomentary
            }
        }
    }
}

/// Service type of a switch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchServiceType {
    /// Channel is present but exposes no service
    Disabled,
    /// Switch
    Switch,
    /// Outlet
    Outlet,
    /// Lock
    Lock,
    /// Valve
    Valve,
}

impl SwitchServiceType {
    /// Decode a persisted value; unknown values mean disabled
    pub fn decode(raw: i32) -> Self {
        match raw {
            -1 => SwitchServiceType::Disabled,
            0 => SwitchServiceType::Switch,
            1 => SwitchServiceType::Outlet,
            2 => SwitchServiceType::Lock,
            3 => SwitchServiceType::Valve,
            other => {
                warn!(svc_type = other, "Unknown switch service type, disabling");
                SwitchServiceType::Disabled
            }
        }
    }
}

/// Service type of a standalone input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputServiceType {
    /// Stateless programmable switch
    StatelessSwitch,
    /// Motion sensor
    MotionSensor,
    /// Occupancy sensor
    OccupancySensor,
    /// Contact sensor
    ContactSensor,
    /// Doorbell
    Doorbell,
    /// Input exposes nothing
    Disabled,
}

impl InputServiceType {
    /// Decode a persisted value; anything else is disabled
    pub fn decode(raw: i32) -> Self {
        match raw {
            0 => InputServiceType::StatelessSwitch,
            1 => InputServiceType::MotionSensor,
            2 => InputServiceType::OccupancySensor,
            3 => InputServiceType::ContactSensor,
            4 => InputServiceType::Doorbell,
            _ => InputServiceType::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_device_mode() {
        let mut config = Config::default();
        assert_eq!(DeviceMode::decode(&config).tag(), ModeTag::DualSwitch);

        config.device.mode = 1;
        assert_eq!(DeviceMode::decode(&config).tag(), ModeTag::RollerShutter);

        config.device.mode = 2;
        assert_eq!(DeviceMode::decode(&config).tag(), ModeTag::GarageDoorOpener);
    }

    #[test_log::test]
    fn test_unknown_mode_is_dual_switch() {
        let mut config = Config::default();
        config.device.mode = 7;
        config.device.legacy_hap_layout = true;
        match DeviceMode::decode(&config) {
            DeviceMode::DualSwitch(dual) => {
                assert!(dual.legacy_layout);
                assert_eq!(dual.switches[1].name, "Switch 2");
            }
            other => panic!("unexpected mode {:?}", other.tag()),
        }
    }

    #[test]
    fn test_switch_in_mode() {
        assert!(SwitchInMode::decode(3).is_detached());
        assert_eq!(SwitchInMode::decode(4), SwitchInMode::Activation);
        assert_eq!(SwitchInMode::decode(42), SwitchInMode::Momentary);
        assert!(!SwitchInMode::decode(42).is_detached());
    }

    #[test]
    fn test_covering_in_mode() {
        assert_eq!(CoveringInMode::decode(2), CoveringInMode::Single);
        assert_eq!(CoveringInMode::decode(3), CoveringInMode::Detached);
        assert_eq!(CoveringInMode::decode(-5), CoveringInMode::SeparateMomentary);
    }

    #[test]
    fn test_service_types() {
        assert_eq!(SwitchServiceType::decode(-1), SwitchServiceType::Disabled);
        assert_eq!(SwitchServiceType::decode(3), SwitchServiceType::Valve);
        assert_eq!(SwitchServiceType::decode(9), SwitchServiceType::Disabled);
        assert_eq!(InputServiceType::decode(4), InputServiceType::Doorbell);
        assert_eq!(InputServiceType::decode(5), InputServiceType::Disabled);
    }
}
