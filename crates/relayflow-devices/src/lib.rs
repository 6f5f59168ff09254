/*!
 * RelayFlow Devices
 *
 * This crate provides the peripheral abstractions of the dual-relay board,
 * the channel registry that owns them, and the boot-time bring-up that
 * creates them in the order the hardware requires.
 */

#![warn(missing_docs)]

// Re-export core types
pub use relayflow_core::prelude;

pub mod board;
pub mod bringup;
pub mod gpio;
pub mod metering;
pub mod peripheral;
pub mod registry;
pub mod reset;
pub mod sim;

// Re-export peripheral traits and the registry
pub use board::Board;
pub use bringup::{create_peripherals, BringUp};
pub use peripheral::{
    HandlerId, Input, InputEvent, InputHandler, Output, PeripheralError, PowerMeter, Result,
    TempSensor,
};
pub use registry::{ChannelRegistry, RegistrySummary};

/// RelayFlow devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
