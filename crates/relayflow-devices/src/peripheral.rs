/*!
 * Peripheral traits and core peripheral abstractions.
 *
 * This module defines the interfaces through which components talk to the
 * physical channels of the device. Concrete implementations (GPIO pins,
 * metering chip channels, the board temperature sensor) are created once by
 * the bring-up stage and then only ever borrowed.
 */
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use relayflow_core::error::Error as CoreError;
use relayflow_core::types::ChannelId;

use crate::gpio::GpioPin;

/// Error type for peripheral operations
#[derive(Error, Debug)]
pub enum PeripheralError {
    /// GPIO setup or access failed
    #[error("GPIO {pin} error: {reason}")]
    Gpio {
        /// The pin involved
        pin: GpioPin,
        /// Failure description
        reason: String,
    },

    /// The metering chip could not be brought up
    #[error("Metering chip unavailable: {0}")]
    MeteringUnavailable(String),

    /// A metering chip channel failed
    #[error("Metering error: {0}")]
    Metering(String),

    /// Two peripherals of the same kind share an id
    #[error("Duplicate {kind} channel {id}")]
    DuplicateChannel {
        /// Channel kind
        kind: &'static str,
        /// Channel id
        id: ChannelId,
    },

    /// A channel index does not exist on the backing hardware
    #[error("{kind} channel {index} out of range (have {available})")]
    ChannelOutOfRange {
        /// Channel kind
        kind: &'static str,
        /// Requested index
        index: usize,
        /// Number of channels available
        available: usize,
    },

    /// The board layout does not describe the requested channel
    #[error("No {kind} channel {id} in board layout")]
    UnknownChannel {
        /// Channel kind
        kind: &'static str,
        /// Channel id
        id: ChannelId,
    },

    /// Temperature sensor error
    #[error("Temperature sensor error: {0}")]
    TempSensor(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl PeripheralError {
    /// Create a new GPIO error
    pub fn gpio<S: AsRef<str>>(pin: GpioPin, reason: S) -> Self {
        PeripheralError::Gpio {
            pin,
            reason: reason.as_ref().to_string(),
        }
    }

    /// Create a new metering error
    pub fn metering<S: AsRef<str>>(msg: S) -> Self {
        PeripheralError::Metering(msg.as_ref().to_string())
    }
}

/// Result type for peripheral operations
pub type Result<T> = std::result::Result<T, PeripheralError>;

/// Event reported by an input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// The logical state changed
    Change,
    /// The input became active
    ButtonDown,
    /// The input became inactive
    ButtonUp,
    /// The reset sequence was completed on this input
    Reset,
}

/// Handler invoked with the event and the logical state after it
pub type InputHandler = Arc<dyn Fn(InputEvent, bool) + Send + Sync>;

/// Token returned by [`Input::add_handler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u32);

/// A physical digital input channel
pub trait Input: Debug + Send + Sync {
    /// Channel id
    fn id(&self) -> ChannelId;

    /// Current logical state (true = active)
    fn state(&self) -> bool;

    /// Register an event handler
    fn add_handler(&self, handler: InputHandler) -> HandlerId;

    /// Remove a previously registered handler; returns whether it was present
    fn remove_handler(&self, id: HandlerId) -> bool;

    /// Number of registered handlers
    fn handler_count(&self) -> usize;

    /// Re-sample the pin after an edge interrupt.
    ///
    /// Called by the interrupt dispatcher with the current uptime.
    fn handle_edge(&self, uptime: Duration) -> Result<()>;
}

/// A physical digital output (relay) channel
pub trait Output: Debug + Send + Sync {
    /// Channel id
    fn id(&self) -> ChannelId;

    /// Current logical state (true = on)
    fn state(&self) -> bool;

    /// Drive the output; `source` is recorded in the log
    fn set_state(&self, on: bool, source: &str) -> Result<()>;
}

/// A per-channel power and energy reading source
pub trait PowerMeter: Debug + Send + Sync {
    /// Channel id
    fn id(&self) -> ChannelId;

    /// Active power in watts
    fn active_power_w(&self) -> Result<f32>;

    /// Accumulated active energy in watt-hours
    fn energy_wh(&self) -> Result<f32>;
}

/// The system temperature sensor
pub trait TempSensor: Debug + Send + Sync {
    /// Temperature in degrees Celsius
    fn temperature_c(&self) -> Result<f32>;
}
