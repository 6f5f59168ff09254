/*!
 * Channel registry for RelayFlow.
 *
 * The registry owns every peripheral created at bring-up and hands out
 * borrowed references by channel id. A missing channel is an ordinary
 * `None`: components decide for themselves whether they can live without it.
 */
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use relayflow_core::types::ChannelId;

use crate::metering::{MeteringChip, MeteringSetup};
use crate::peripheral::{Input, Output, PeripheralError, PowerMeter, Result, TempSensor};

/// Owner of all constructed peripherals, indexed by channel id
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    inputs: Vec<Box<dyn Input>>,
    outputs: Vec<Box<dyn Output>>,
    power_meters: Vec<Box<dyn PowerMeter>>,
    temp_sensor: Option<Box<dyn TempSensor>>,
    metering_chip: Option<Arc<dyn MeteringChip>>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input
    pub fn add_input(&mut self, input: Box<dyn Input>) -> Result<()> {
        let id = input.id();
        if self.find_input(id).is_some() {
            return Err(PeripheralError::DuplicateChannel { kind: "input", id });
        }
        self.inputs.push(input);
        debug!(%id, "Registered input");
        Ok(())
    }

    /// Register an output
    pub fn add_output(&mut self, output: Box<dyn Output>) -> Result<()> {
        let id = output.id();
        if self.find_output(id).is_some() {
            return Err(PeripheralError::DuplicateChannel { kind: "output", id });
        }
        self.outputs.push(output);
        debug!(%id, "Registered output");
        Ok(())
    }

    /// Register a power meter
    pub fn add_power_meter(&mut self, meter: Box<dyn PowerMeter>) -> Result<()> {
        let id = meter.id();
        if self.find_power_meter(id).is_some() {
            return Err(PeripheralError::DuplicateChannel {
                kind: "power meter",
                id,
            });
        }
        self.power_meters.push(meter);
        debug!(%id, "Registered power meter");
        Ok(())
    }

    /// Take ownership of the metering chip and its power meters
    pub fn attach_metering(&mut self, setup: MeteringSetup) -> Result<()> {
        for meter in setup.meters {
            self.add_power_meter(Box::new(meter))?;
        }
        self.metering_chip = Some(setup.chip);
        Ok(())
    }

    /// Install the system temperature sensor, replacing any previous one
    pub fn set_temp_sensor(&mut self, sensor: Box<dyn TempSensor>) {
        self.temp_sensor = Some(sensor);
    }

    /// Look up an input by id
    pub fn find_input(&self, id: ChannelId) -> Option<&dyn Input> {
        self.inputs.iter().find(|i| i.id() == id).map(|i| i.as_ref())
    }

    /// Look up an output by id
    pub fn find_output(&self, id: ChannelId) -> Option<&dyn Output> {
        self.outputs.iter().find(|o| o.id() == id).map(|o| o.as_ref())
    }

    /// Look up a power meter by id
    pub fn find_power_meter(&self, id: ChannelId) -> Option<&dyn PowerMeter> {
        self.power_meters
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.as_ref())
    }

    /// Inputs in registration order
    pub fn inputs(&self) -> impl Iterator<Item = &dyn Input> {
        self.inputs.iter().map(|i| i.as_ref())
    }

    /// Outputs in registration order
    pub fn outputs(&self) -> impl Iterator<Item = &dyn Output> {
        self.outputs.iter().map(|o| o.as_ref())
    }

    /// Power meters in registration order
    pub fn power_meters(&self) -> impl Iterator<Item = &dyn PowerMeter> {
        self.power_meters.iter().map(|m| m.as_ref())
    }

    /// The system temperature sensor
    pub fn temp_sensor(&self) -> Option<&dyn TempSensor> {
        self.temp_sensor.as_deref()
    }

    /// The metering chip, if it came up
    pub fn metering_chip(&self) -> Option<&Arc<dyn MeteringChip>> {
        self.metering_chip.as_ref()
    }

    /// Whether power readings are available this boot
    pub fn has_metering(&self) -> bool {
        self.metering_chip.is_some() && !self.power_meters.is_empty()
    }

    /// Summary of what was registered
    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            inputs: self.inputs().map(|i| i.id()).collect(),
            outputs: self.outputs().map(|o| o.id()).collect(),
            power_meters: self.power_meters().map(|m| m.id()).collect(),
            temp_sensor: self.temp_sensor.is_some(),
        }
    }
}

/// Channel ids present in a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    /// Input ids
    pub inputs: Vec<ChannelId>,
    /// Output ids
    pub outputs: Vec<ChannelId>,
    /// Power meter ids
    pub power_meters: Vec<ChannelId>,
    /// Whether a temperature sensor is present
    pub temp_sensor: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{INPUT_1, INPUT_2, OUTPUT_1};
    use crate::gpio::{InputPin, OutputPin};
    use crate::metering::init_power_meters;
    use crate::sim::{SimBoard, SimGpio};

    #[test]
    fn test_lookup_by_id() {
        let gpio = Arc::new(SimGpio::new());
        let mut registry = ChannelRegistry::new();
        registry
            .add_input(Box::new(InputPin::new(INPUT_2, gpio.clone())))
            .unwrap();
        registry
            .add_input(Box::new(InputPin::new(INPUT_1, gpio.clone())))
            .unwrap();
        registry
            .add_output(Box::new(OutputPin::new(OUTPUT_1, gpio)))
            .unwrap();

        assert_eq!(registry.find_input(ChannelId::new(1)).map(|i| i.id()), Some(ChannelId::new(1)));
        assert_eq!(registry.find_input(ChannelId::new(2)).map(|i| i.id()), Some(ChannelId::new(2)));
        assert!(registry.find_output(ChannelId::new(2)).is_none());
        assert!(registry.find_power_meter(ChannelId::new(1)).is_none());
        assert!(registry.temp_sensor().is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let gpio = Arc::new(SimGpio::new());
        let mut registry = ChannelRegistry::new();
        registry
            .add_output(Box::new(OutputPin::new(OUTPUT_1, gpio.clone())))
            .unwrap();
        let err = registry
            .add_output(Box::new(OutputPin::new(OUTPUT_1, gpio)))
            .unwrap_err();
        assert!(matches!(err, PeripheralError::DuplicateChannel { kind: "output", .. }));
        assert_eq!(registry.outputs().count(), 1);
    }

    #[test]
    fn test_attach_metering() {
        let board = SimBoard::new();
        let mut registry = ChannelRegistry::new();
        assert!(!registry.has_metering());

        registry.attach_metering(init_power_meters(&board).unwrap()).unwrap();

        assert!(registry.has_metering());
        assert!(registry.metering_chip().is_some());
        let ids: Vec<u8> = registry.power_meters().map(|m| m.id().get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_summary() {
        let gpio = Arc::new(SimGpio::new());
        let mut registry = ChannelRegistry::new();
        registry
            .add_output(Box::new(OutputPin::new(OUTPUT_1, gpio)))
            .unwrap();
        let summary = registry.summary();
        assert_eq!(summary.outputs, vec![ChannelId::new(1)]);
        assert!(summary.inputs.is_empty());
        assert!(!summary.temp_sensor);
    }
}
