/*!
 * Factory reset by input sequence.
 *
 * Toggling the reset-enabled input [`RESET_SEQUENCE_CHANGES`] times shortly
 * after power-up wipes the device. This is the recovery path for a device
 * that can no longer be reached over the network.
 */
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::board::Board;
use crate::gpio::GpioPin;
use crate::peripheral::{InputEvent, InputHandler};

/// Only changes seen before this uptime count toward the sequence
pub const RESET_SEQUENCE_WINDOW: Duration = Duration::from_secs(10);

/// Number of changes that completes the sequence
pub const RESET_SEQUENCE_CHANGES: u32 = 10;

/// Change counter for one input
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetSequence {
    changes: u32,
}

impl ResetSequence {
    /// Record a state change at `uptime`; returns true when the sequence completes
    pub fn record_change(&mut self, uptime: Duration) -> bool {
        if uptime >= RESET_SEQUENCE_WINDOW {
            self.changes = 0;
            return false;
        }
        self.changes += 1;
        if self.changes >= RESET_SEQUENCE_CHANGES {
            self.changes = 0;
            return true;
        }
        false
    }

    /// Changes counted so far
    pub fn changes(&self) -> u32 {
        self.changes
    }
}

/// Build the handler that performs the factory reset.
///
/// `feedback_pin` is driven on before the board is asked to wipe itself, so
/// the user sees the relay click as confirmation.
pub fn reset_sequence_handler(board: Arc<dyn Board>, feedback_pin: GpioPin) -> InputHandler {
    Arc::new(move |event, _active| {
        if event != InputEvent::Reset {
            return;
        }
        info!(pin = %feedback_pin, "Reset sequence detected, performing factory reset");
        if let Err(e) = board.gpio().write(feedback_pin, true) {
            warn!("Reset feedback failed: {}", e);
        }
        board.factory_reset();
    })
}
