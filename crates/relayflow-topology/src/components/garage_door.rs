/*!
 * Garage door opener component.
 *
 * Output 1 pulses the door motor, input 1 is the closed sensor and input 2
 * the optional open sensor.
 */
use tracing::debug;

use relayflow_core::config::GarageDoorConfig;
use relayflow_core::types::ChannelId;

use crate::component::{Component, ComponentKind};
use crate::components::PairBindings;
use crate::error::{Error, Result};

const KIND: ComponentKind = ComponentKind::GarageDoorOpener;

/// Open sensor wiring on input 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSensorMode {
    /// Normally closed contact
    NormallyClosed,
    /// Normally open contact
    NormallyOpen,
    /// No open sensor; input 2 is unused
    NotFitted,
}

impl OpenSensorMode {
    /// Decode a persisted value; unknown values mean not fitted
    pub fn decode(raw: i32) -> Self {
        match raw {
            0 => OpenSensorMode::NormallyClosed,
            1 => OpenSensorMode::NormallyOpen,
            _ => OpenSensorMode::NotFitted,
        }
    }
}

/// Garage door opener
#[derive(Debug)]
pub struct GarageDoorOpener<'r> {
    id: ChannelId,
    name: String,
    open_sensor: OpenSensorMode,
    move_time_ms: u32,
    pulse_time_ms: u32,
    bindings: PairBindings<'r>,
    primary: bool,
}

impl<'r> GarageDoorOpener<'r> {
    /// Create opener `id`
    pub fn new(id: ChannelId, config: &GarageDoorConfig, bindings: PairBindings<'r>) -> Self {
        Self {
            id,
            name: config.name.clone(),
            open_sensor: OpenSensorMode::decode(config.open_sensor_mode),
            move_time_ms: config.move_time_ms,
            pulse_time_ms: config.pulse_time_ms,
            bindings,
            primary: false,
        }
    }

    /// Open sensor wiring
    pub fn open_sensor(&self) -> OpenSensorMode {
        self.open_sensor
    }
}

impl Component for GarageDoorOpener<'_> {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ComponentKind {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<()> {
        if self.bindings.outputs[0].is_none() {
            return Err(Error::missing_channel(KIND.as_str(), "output", ChannelId::new(1)));
        }
        if self.bindings.inputs[0].is_none() {
            return Err(Error::missing_channel(KIND.as_str(), "input", ChannelId::new(1)));
        }
        if self.pulse_time_ms == 0 || self.pulse_time_ms >= self.move_time_ms {
            return Err(Error::init(
                KIND.as_str(),
                self.id,
                format!(
                    "pulse time {} ms must be non-zero and shorter than move time {} ms",
                    self.pulse_time_ms, self.move_time_ms
                ),
            ));
        }
        debug!(id = %self.id, open_sensor = ?self.open_sensor, "Garage door opener initialized");
        Ok(())
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    fn consumed_inputs(&self) -> Vec<ChannelId> {
        let mut inputs: Vec<ChannelId> = self.bindings.inputs[0].iter().map(|i| i.id()).collect();
        if self.open_sensor != OpenSensorMode::NotFitted {
            inputs.extend(self.bindings.inputs[1].map(|i| i.id()));
        }
        inputs
    }

    fn bound_outputs(&self) -> Vec<ChannelId> {
        self.bindings.output_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use relayflow_devices::create_peripherals;
    use relayflow_devices::sim::SimBoard;

    #[test]
    fn test_opener_bindings() {
        let registry = create_peripherals(Arc::new(SimBoard::new())).unwrap();
        let mut gdo = GarageDoorOpener::new(
            ChannelId::new(1),
            &GarageDoorConfig::default(),
            PairBindings::lookup(&registry),
        );
        gdo.init().unwrap();
        assert_eq!(gdo.consumed_inputs(), vec![ChannelId::new(1), ChannelId::new(2)]);
        assert_eq!(gdo.bound_outputs(), vec![ChannelId::new(1), ChannelId::new(2)]);
    }

    #[test]
    fn test_no_open_sensor_leaves_input_2() {
        let registry = create_peripherals(Arc::new(SimBoard::new())).unwrap();
        let config = GarageDoorConfig {
            open_sensor_mode: 2,
            ..GarageDoorConfig::default()
        };
        let gdo = GarageDoorOpener::new(ChannelId::new(1), &config, PairBindings::lookup(&registry));
        assert_eq!(gdo.open_sensor(), OpenSensorMode::NotFitted);
        assert_eq!(gdo.consumed_inputs(), vec![ChannelId::new(1)]);
    }

    #[test]
    fn test_bad_timing_fails_init() {
        let registry = create_peripherals(Arc::new(SimBoard::new())).unwrap();
        let config = GarageDoorConfig {
            pulse_time_ms: 0,
            ..GarageDoorConfig::default()
        };
        let mut gdo =
            GarageDoorOpener::new(ChannelId::new(1), &config, PairBindings::lookup(&registry));
        assert!(matches!(gdo.init(), Err(Error::Init { .. })));
    }

    #[test]
    fn test_missing_channels_fail_init() {
        let mut gdo = GarageDoorOpener::new(
            ChannelId::new(1),
            &GarageDoorConfig::default(),
            PairBindings::default(),
        );
        assert!(matches!(
            gdo.init(),
            Err(Error::MissingChannel { channel: "output", .. })
        ));
    }
}
