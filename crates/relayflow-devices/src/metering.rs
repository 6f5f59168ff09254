/*!
 * Power metering.
 *
 * One metering chip measures both relay channels. The chip handle is opened
 * once from fixed calibration constants and shared, read-only, by the two
 * [`ChipPowerMeter`]s built on top of it.
 */
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use relayflow_core::types::ChannelId;

use crate::board::Board;
use crate::peripheral::{PeripheralError, PowerMeter, Result};

/// Scale and offset factors for the metering chip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeteringCalibration {
    /// Volts per voltage LSB
    pub voltage_scale: f64,
    /// Voltage offset in volts
    pub voltage_offset: f64,
    /// Amps per current LSB, per sub-channel
    pub current_scale: [f64; 2],
    /// Current offset in amps, per sub-channel
    pub current_offset: [f64; 2],
    /// Watts per active power LSB, per sub-channel
    pub apower_scale: [f64; 2],
    /// Watt-hours per active energy LSB, per sub-channel
    pub aenergy_scale: [f64; 2],
}

/// Factory calibration of the metering front end
pub const METERING_CALIBRATION: MeteringCalibration = MeteringCalibration {
    voltage_scale: 0.0000382602,
    voltage_offset: -0.068,
    current_scale: [0.00000949523, 0.00000949523],
    current_offset: [-0.017, -0.017],
    apower_scale: [1.0 / 164.0, 1.0 / 164.0],
    aenergy_scale: [1.0 / 25240.0, 1.0 / 25240.0],
};

/// Power meter ids and the chip sub-channel each one reads.
///
/// Channel 1 is wired to chip sub-channel 1 and channel 2 to sub-channel 0.
pub const POWER_METER_CHANNELS: [(ChannelId, usize); 2] =
    [(ChannelId::new(1), 1), (ChannelId::new(2), 0)];

/// A scaled reading of one chip sub-channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeterReading {
    /// Line voltage in volts
    pub voltage_v: f32,
    /// Current in amps
    pub current_a: f32,
    /// Active power in watts
    pub active_power_w: f32,
    /// Accumulated active energy in watt-hours
    pub energy_wh: f32,
}

/// Handle to an initialized metering chip
pub trait MeteringChip: Debug + Send + Sync {
    /// Number of measurement sub-channels
    fn channel_count(&self) -> usize;

    /// Read one sub-channel
    fn read(&self, channel: usize) -> Result<MeterReading>;
}

/// Power meter backed by one sub-channel of a shared metering chip
#[derive(Debug)]
pub struct ChipPowerMeter {
    id: ChannelId,
    chip: Arc<dyn MeteringChip>,
    channel: usize,
}

impl ChipPowerMeter {
    /// Create a power meter on `channel` of `chip`
    pub fn new(id: ChannelId, chip: Arc<dyn MeteringChip>, channel: usize) -> Self {
        Self { id, chip, channel }
    }

    /// Check the sub-channel exists and answers
    pub fn init(&self) -> Result<()> {
        let available = self.chip.channel_count();
        if self.channel >= available {
            return Err(PeripheralError::ChannelOutOfRange {
                kind: "metering",
                index: self.channel,
                available,
            });
        }
        self.chip.read(self.channel)?;
        debug!(id = %self.id, channel = self.channel, "Power meter initialized");
        Ok(())
    }

    /// Chip sub-channel this meter reads
    pub fn chip_channel(&self) -> usize {
        self.channel
    }
}

impl PowerMeter for ChipPowerMeter {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn active_power_w(&self) -> Result<f32> {
        Ok(self.chip.read(self.channel)?.active_power_w)
    }

    fn energy_wh(&self) -> Result<f32> {
        Ok(self.chip.read(self.channel)?.energy_wh)
    }
}

/// A metering chip together with the power meters built on it
#[derive(Debug)]
pub struct MeteringSetup {
    /// The shared chip handle
    pub chip: Arc<dyn MeteringChip>,
    /// Power meters in channel id order
    pub meters: Vec<ChipPowerMeter>,
}

/// Open the metering chip and initialize both power meters.
///
/// All or nothing: if any meter fails to initialize, none are returned.
pub fn init_power_meters(board: &dyn Board) -> Result<MeteringSetup> {
    let chip = board.open_metering_chip(&METERING_CALIBRATION)?;

    let mut meters = Vec::with_capacity(POWER_METER_CHANNELS.len());
    for (id, channel) in POWER_METER_CHANNELS {
        let meter = ChipPowerMeter::new(id, Arc::clone(&chip), channel);
        meter.init()?;
        meters.push(meter);
    }

    Ok(MeteringSetup { chip, meters })
}
