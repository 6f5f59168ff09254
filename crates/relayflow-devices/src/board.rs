/*!
 * Board support interface and the physical layout of the dual-relay board.
 */
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;

use relayflow_core::types::ChannelId;

use crate::gpio::{Edge, Gpio, GpioPin, InputSpec, InputWiring, OutputSpec, Pull};
use crate::metering::{MeteringCalibration, MeteringChip};
use crate::peripheral::{PeripheralError, Result, TempSensor};

/// Drivers the board support package hands to bring-up
pub trait Board: Send + Sync {
    /// The pin driver
    fn gpio(&self) -> Arc<dyn Gpio>;

    /// Open the metering chip with the given calibration
    fn open_metering_chip(&self, calibration: &MeteringCalibration)
        -> Result<Arc<dyn MeteringChip>>;

    /// Create the system temperature sensor
    fn temp_sensor(&self, params: &NtcParams) -> Box<dyn TempSensor>;

    /// Wipe persisted state and reboot
    fn factory_reset(&self);
}

/// Parameters of an NTC thermistor in a voltage divider on an ADC input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NtcParams {
    /// ADC channel
    pub adc_channel: u8,
    /// ADC reference voltage
    pub vref: f32,
    /// Fixed divider resistor in ohms
    pub divider_ohms: f32,
    /// Thermistor resistance at 25 degrees Celsius
    pub r25_ohms: f32,
    /// Thermistor B constant
    pub beta: f32,
}

/// SDNT1608X103F3950 on ADC 0
pub const SYS_TEMP_SENSOR: NtcParams = NtcParams {
    adc_channel: 0,
    vref: 3.3,
    divider_ohms: 33_000.0,
    r25_ohms: 10_000.0,
    beta: 3950.0,
};

/// Relay 1, also the reset feedback output
pub const OUTPUT_1: OutputSpec = OutputSpec {
    id: ChannelId::new(1),
    pin: GpioPin::new(4),
    active_high: true,
    initial_state: false,
};

/// Relay 2
pub const OUTPUT_2: OutputSpec = OutputSpec {
    id: ChannelId::new(2),
    pin: GpioPin::new(15),
    active_high: true,
    initial_state: false,
};

/// SW1 terminal
pub const INPUT_1: InputSpec = InputSpec {
    id: ChannelId::new(1),
    pin: GpioPin::new(13),
    active_high: true,
    pull: Pull::None,
    edge: Edge::Both,
    enable_reset: true,
    wiring: InputWiring::FactoryReset {
        feedback: ChannelId::new(1),
    },
};

/// SW2 terminal
pub const INPUT_2: InputSpec = InputSpec {
    id: ChannelId::new(2),
    pin: GpioPin::new(5),
    active_high: true,
    pull: Pull::None,
    edge: Edge::Both,
    enable_reset: false,
    wiring: InputWiring::None,
};

/// One step of GPIO bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BringUpStep {
    /// Construct and initialize an output
    Output(OutputSpec),
    /// Construct and initialize an input
    Input(InputSpec),
}

/// GPIO bring-up order.
///
/// Output 2 (GPIO 15) must be set up before input 1 (GPIO 13): the other way
/// round switches relay 2 on.
pub const BRING_UP_SEQUENCE: [BringUpStep; 4] = [
    BringUpStep::Output(OUTPUT_1),
    BringUpStep::Output(OUTPUT_2),
    BringUpStep::Input(INPUT_1),
    BringUpStep::Input(INPUT_2),
];

/// Pin of the output channel `id` in the board layout
pub fn output_pin(id: ChannelId) -> Result<GpioPin> {
    BRING_UP_SEQUENCE
        .iter()
        .find_map(|step| match step {
            BringUpStep::Output(spec) if spec.id == id => Some(spec.pin),
            _ => None,
        })
        .ok_or(PeripheralError::UnknownChannel { kind: "output", id })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(pred: impl Fn(&BringUpStep) -> bool) -> usize {
        BRING_UP_SEQUENCE.iter().position(pred).unwrap()
    }

    #[test]
    fn test_output_2_precedes_input_1() {
        let out2 = position(|s| matches!(s, BringUpStep::Output(o) if o.id == ChannelId::new(2)));
        let in1 = position(|s| matches!(s, BringUpStep::Input(i) if i.id == ChannelId::new(1)));
        assert!(out2 < in1);
    }

    #[test]
    fn test_only_input_1_has_reset_wiring() {
        assert!(INPUT_1.enable_reset);
        assert_eq!(
            INPUT_1.wiring,
            InputWiring::FactoryReset { feedback: ChannelId::new(1) }
        );
        assert!(!INPUT_2.enable_reset);
        assert_eq!(INPUT_2.wiring, InputWiring::None);
    }

    #[test]
    fn test_output_pin_lookup() {
        assert_eq!(output_pin(ChannelId::new(1)).unwrap(), GpioPin::new(4));
        assert_eq!(output_pin(ChannelId::new(2)).unwrap(), GpioPin::new(15));
        assert!(matches!(
            output_pin(ChannelId::new(3)),
            Err(PeripheralError::UnknownChannel { kind: "output", .. })
        ));
    }
}
