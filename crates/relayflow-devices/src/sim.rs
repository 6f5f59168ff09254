/*!
 * Simulated board.
 *
 * A [`Board`] implementation that records every GPIO operation, lets tests
 * script the metering chip's behaviour, and counts factory reset requests.
 * Used for host-side testing and for the boot simulation example.
 */
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::board::{Board, NtcParams};
use crate::gpio::{Edge, Gpio, GpioPin, Pull};
use crate::metering::{MeterReading, MeteringCalibration, MeteringChip};
use crate::peripheral::{PeripheralError, Result, TempSensor};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A recorded GPIO operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioOp {
    /// `setup_output`
    SetupOutput {
        /// Pin
        pin: GpioPin,
        /// Initial level
        level: bool,
    },
    /// `setup_input`
    SetupInput {
        /// Pin
        pin: GpioPin,
        /// Pull resistor
        pull: Pull,
        /// Interrupt edges
        edge: Edge,
    },
    /// `write`
    Write {
        /// Pin
        pin: GpioPin,
        /// Level driven
        level: bool,
    },
}

/// Recording pin driver
#[derive(Debug, Default)]
pub struct SimGpio {
    ops: Mutex<Vec<GpioOp>>,
    levels: Mutex<HashMap<GpioPin, bool>>,
    failing: Mutex<HashSet<GpioPin>>,
}

impl SimGpio {
    /// Create a driver with all pins low
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations recorded so far, oldest first
    pub fn ops(&self) -> Vec<GpioOp> {
        lock(&self.ops).clone()
    }

    /// Current level of a pin, if it was ever driven or set
    pub fn level(&self, pin: GpioPin) -> Option<bool> {
        lock(&self.levels).get(&pin).copied()
    }

    /// Set the level an input pin will read as
    pub fn set_level(&self, pin: GpioPin, level: bool) {
        lock(&self.levels).insert(pin, level);
    }

    /// Make every operation on `pin` fail
    pub fn fail_pin(&self, pin: GpioPin) {
        lock(&self.failing).insert(pin);
    }

    fn check(&self, pin: GpioPin) -> Result<()> {
        if lock(&self.failing).contains(&pin) {
            return Err(PeripheralError::gpio(pin, "simulated failure"));
        }
        Ok(())
    }

    fn record(&self, op: GpioOp) {
        lock(&self.ops).push(op);
    }
}

impl Gpio for SimGpio {
    fn setup_output(&self, pin: GpioPin, level: bool) -> Result<()> {
        self.check(pin)?;
        self.record(GpioOp::SetupOutput { pin, level });
        lock(&self.levels).insert(pin, level);
        Ok(())
    }

    fn setup_input(&self, pin: GpioPin, pull: Pull, edge: Edge) -> Result<()> {
        self.check(pin)?;
        self.record(GpioOp::SetupInput { pin, pull, edge });
        Ok(())
    }

    fn write(&self, pin: GpioPin, level: bool) -> Result<()> {
        self.check(pin)?;
        self.record(GpioOp::Write { pin, level });
        lock(&self.levels).insert(pin, level);
        Ok(())
    }

    fn read(&self, pin: GpioPin) -> Result<bool> {
        self.check(pin)?;
        Ok(self.level(pin).unwrap_or(false))
    }
}

/// How the simulated metering chip behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeteringScript {
    /// Opens and answers on both sub-channels
    #[default]
    Healthy,
    /// Fails to open
    Absent,
    /// Opens, but reads of the given sub-channel fail
    FailingChannel(usize),
}

/// Simulated two-channel metering chip
#[derive(Debug)]
pub struct SimMeteringChip {
    calibration: MeteringCalibration,
    failing_channel: Option<usize>,
}

impl SimMeteringChip {
    /// Calibration the chip was opened with
    pub fn calibration(&self) -> &MeteringCalibration {
        &self.calibration
    }
}

impl MeteringChip for SimMeteringChip {
    fn channel_count(&self) -> usize {
        2
    }

    fn read(&self, channel: usize) -> Result<MeterReading> {
        if channel >= self.channel_count() {
            return Err(PeripheralError::ChannelOutOfRange {
                kind: "metering",
                index: channel,
                available: self.channel_count(),
            });
        }
        if self.failing_channel == Some(channel) {
            return Err(PeripheralError::metering(format!(
                "sub-channel {} not responding",
                channel
            )));
        }
        // Distinct per sub-channel so tests can tell them apart
        let load = (channel as f32 + 1.0) * 10.0;
        Ok(MeterReading {
            voltage_v: 230.0,
            current_a: load / 230.0,
            active_power_w: load,
            energy_wh: load * 2.0,
        })
    }
}

/// Temperature sensor returning a fixed value
#[derive(Debug)]
pub struct SimTempSensor {
    params: NtcParams,
    temperature_c: f32,
}

impl SimTempSensor {
    /// Parameters the sensor was created with
    pub fn params(&self) -> &NtcParams {
        &self.params
    }
}

impl TempSensor for SimTempSensor {
    fn temperature_c(&self) -> Result<f32> {
        Ok(self.temperature_c)
    }
}

/// Simulated board
#[derive(Debug)]
pub struct SimBoard {
    gpio: Arc<SimGpio>,
    metering: MeteringScript,
    temperature_c: f32,
    factory_resets: AtomicUsize,
}

impl SimBoard {
    /// Create a healthy board
    pub fn new() -> Self {
        Self {
            gpio: Arc::new(SimGpio::new()),
            metering: MeteringScript::Healthy,
            temperature_c: 35.0,
            factory_resets: AtomicUsize::new(0),
        }
    }

    /// Script the metering chip
    pub fn with_metering(mut self, script: MeteringScript) -> Self {
        self.metering = script;
        self
    }

    /// Set the temperature the sensor reports
    pub fn with_temperature(mut self, celsius: f32) -> Self {
        self.temperature_c = celsius;
        self
    }

    /// The recording pin driver
    pub fn sim_gpio(&self) -> &Arc<SimGpio> {
        &self.gpio
    }

    /// Number of factory resets requested
    pub fn factory_resets(&self) -> usize {
        self.factory_resets.load(Ordering::SeqCst)
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for SimBoard {
    fn gpio(&self) -> Arc<dyn Gpio> {
        self.gpio.clone()
    }

    fn open_metering_chip(
        &self,
        calibration: &MeteringCalibration,
    ) -> Result<Arc<dyn MeteringChip>> {
        match self.metering {
            MeteringScript::Absent => Err(PeripheralError::MeteringUnavailable(
                "no response on I2C bus".to_string(),
            )),
            MeteringScript::Healthy => Ok(Arc::new(SimMeteringChip {
                calibration: *calibration,
                failing_channel: None,
            })),
            MeteringScript::FailingChannel(channel) => Ok(Arc::new(SimMeteringChip {
                calibration: *calibration,
                failing_channel: Some(channel),
            })),
        }
    }

    fn temp_sensor(&self, params: &NtcParams) -> Box<dyn TempSensor> {
        debug!(adc = params.adc_channel, "Creating simulated temperature sensor");
        Box::new(SimTempSensor {
            params: *params,
            temperature_c: self.temperature_c,
        })
    }

    fn factory_reset(&self) {
        info!("Simulated factory reset");
        self.factory_resets.fetch_add(1, Ordering::SeqCst);
    }
}
