/*!
 * GPIO-backed input and output channels.
 *
 * The [`Gpio`] trait is the low-level pin driver supplied by the board
 * support package. [`InputPin`] and [`OutputPin`] turn raw pin levels into
 * the logical channel states the rest of the firmware works with.
 */
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use relayflow_core::types::ChannelId;

use crate::peripheral::{HandlerId, Input, InputEvent, InputHandler, Output, Result};
use crate::reset::ResetSequence;

/// A GPIO pin number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GpioPin(u8);

impl GpioPin {
    /// Create a pin number
    pub const fn new(pin: u8) -> Self {
        Self(pin)
    }

    /// Raw pin number
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pull resistor configuration of an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pull {
    /// Floating
    None,
    /// Pull-up
    Up,
    /// Pull-down
    Down,
}

/// Edge(s) that raise an interrupt on an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Rising edge only
    Rising,
    /// Falling edge only
    Falling,
    /// Both edges
    Both,
}

/// Low-level pin driver
pub trait Gpio: fmt::Debug + Send + Sync {
    /// Configure `pin` as an output driven to `level`
    fn setup_output(&self, pin: GpioPin, level: bool) -> Result<()>;

    /// Configure `pin` as an input with interrupts on `edge`
    fn setup_input(&self, pin: GpioPin, pull: Pull, edge: Edge) -> Result<()>;

    /// Drive an output pin
    fn write(&self, pin: GpioPin, level: bool) -> Result<()>;

    /// Sample a pin
    fn read(&self, pin: GpioPin) -> Result<bool>;
}

/// Static description of an output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputSpec {
    /// Channel id
    pub id: ChannelId,
    /// Pin driving the relay
    pub pin: GpioPin,
    /// Level that switches the relay on
    pub active_high: bool,
    /// Logical state applied at init
    pub initial_state: bool,
}

/// Handler wiring applied to an input at bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputWiring {
    /// No handler
    None,
    /// Reset-sequence handler giving feedback on the given output channel
    FactoryReset {
        /// Output channel used for feedback
        feedback: ChannelId,
    },
}

/// Static description of an input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    /// Channel id
    pub id: ChannelId,
    /// Pin sampled
    pub pin: GpioPin,
    /// Level that counts as active
    pub active_high: bool,
    /// Pull resistor
    pub pull: Pull,
    /// Interrupt edges
    pub edge: Edge,
    /// Count changes toward the reset sequence
    pub enable_reset: bool,
    /// Handler wiring
    pub wiring: InputWiring,
}

/// Output channel driven by a GPIO pin
#[derive(Debug)]
pub struct OutputPin {
    spec: OutputSpec,
    gpio: Arc<dyn Gpio>,
    state: AtomicBool,
}

impl OutputPin {
    /// Create an output channel; nothing touches the pin until [`OutputPin::init`]
    pub fn new(spec: OutputSpec, gpio: Arc<dyn Gpio>) -> Self {
        Self {
            spec,
            gpio,
            state: AtomicBool::new(spec.initial_state),
        }
    }

    /// Configure the pin and drive it to the initial state
    pub fn init(&self) -> Result<()> {
        let level = self.level_for(self.spec.initial_state);
        self.gpio.setup_output(self.spec.pin, level)?;
        debug!(
            id = %self.spec.id,
            pin = %self.spec.pin,
            on = self.spec.initial_state,
            "Output initialized"
        );
        Ok(())
    }

    /// Pin driving this output
    pub fn pin(&self) -> GpioPin {
        self.spec.pin
    }

    fn level_for(&self, on: bool) -> bool {
        on == self.spec.active_high
    }
}

impl Output for OutputPin {
    fn id(&self) -> ChannelId {
        self.spec.id
    }

    fn state(&self) -> bool {
        self.state.load(Ordering::Acquire)
    }

    fn set_state(&self, on: bool, source: &str) -> Result<()> {
        self.gpio.write(self.spec.pin, self.level_for(on))?;
        self.state.store(on, Ordering::Release);
        debug!(id = %self.spec.id, on, source, "Output set");
        Ok(())
    }
}

#[derive(Debug)]
struct InputState {
    active: bool,
    reset: ResetSequence,
}

/// Input channel sampled from a GPIO pin
pub struct InputPin {
    spec: InputSpec,
    gpio: Arc<dyn Gpio>,
    state: Mutex<InputState>,
    handlers: Mutex<Vec<(HandlerId, InputHandler)>>,
    next_handler: AtomicU32,
}

impl fmt::Debug for InputPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputPin")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl InputPin {
    /// Create an input channel; nothing touches the pin until [`InputPin::init`]
    pub fn new(spec: InputSpec, gpio: Arc<dyn Gpio>) -> Self {
        Self {
            spec,
            gpio,
            state: Mutex::new(InputState {
                active: false,
                reset: ResetSequence::default(),
            }),
            handlers: Mutex::new(Vec::new()),
            next_handler: AtomicU32::new(0),
        }
    }

    /// Configure the pin and sample the initial state
    pub fn init(&self) -> Result<()> {
        self.gpio
            .setup_input(self.spec.pin, self.spec.pull, self.spec.edge)?;
        let active = self.sample()?;
        self.lock_state().active = active;
        debug!(id = %self.spec.id, pin = %self.spec.pin, active, "Input initialized");
        Ok(())
    }

    /// Pin sampled by this input
    pub fn pin(&self) -> GpioPin {
        self.spec.pin
    }

    fn sample(&self) -> Result<bool> {
        Ok(self.gpio.read(self.spec.pin)? == self.spec.active_high)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, InputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: InputEvent, active: bool) {
        // Handlers may register further handlers; call them unlocked.
        let handlers: Vec<InputHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        trace!(id = %self.spec.id, ?event, active, "Input event");
        for handler in handlers {
            handler(event, active);
        }
    }
}

impl Input for InputPin {
    fn id(&self) -> ChannelId {
        self.spec.id
    }

    fn state(&self) -> bool {
        self.lock_state().active
    }

    fn add_handler(&self, handler: InputHandler) -> HandlerId {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    fn handler_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn handle_edge(&self, uptime: Duration) -> Result<()> {
        let active = self.sample()?;
        let reset = {
            let mut state = self.lock_state();
            if state.active == active {
                return Ok(());
            }
            state.active = active;
            self.spec.enable_reset && state.reset.record_change(uptime)
        };

        self.dispatch(InputEvent::Change, active);
        let press = if active {
            InputEvent::ButtonDown
        } else {
            InputEvent::ButtonUp
        };
        self.dispatch(press, active);
        if reset {
            self.dispatch(InputEvent::Reset, active);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{GpioOp, SimGpio};
    use std::sync::Mutex as StdMutex;

    fn output_spec(active_high: bool) -> OutputSpec {
        OutputSpec {
            id: ChannelId::new(1),
            pin: GpioPin::new(4),
            active_high,
            initial_state: false,
        }
    }

    fn input_spec(enable_reset: bool) -> InputSpec {
        InputSpec {
            id: ChannelId::new(1),
            pin: GpioPin::new(13),
            active_high: true,
            pull: Pull::None,
            edge: Edge::Both,
            enable_reset,
            wiring: InputWiring::None,
        }
    }

    #[test]
    fn test_output_init_and_set() {
        let gpio = Arc::new(SimGpio::new());
        let out = OutputPin::new(output_spec(true), gpio.clone());
        out.init().unwrap();
        out.set_state(true, "test").unwrap();

        assert!(out.state());
        assert_eq!(
            gpio.ops(),
            vec![
                GpioOp::SetupOutput { pin: GpioPin::new(4), level: false },
                GpioOp::Write { pin: GpioPin::new(4), level: true },
            ]
        );
    }

    #[test]
    fn test_output_active_low_inverts_level() {
        let gpio = Arc::new(SimGpio::new());
        let out = OutputPin::new(output_spec(false), gpio.clone());
        out.init().unwrap();
        assert_eq!(gpio.level(GpioPin::new(4)), Some(true));
        out.set_state(true, "test").unwrap();
        assert_eq!(gpio.level(GpioPin::new(4)), Some(false));
    }

    #[test]
    fn test_input_dispatches_change_and_press() {
        let gpio = Arc::new(SimGpio::new());
        let input = InputPin::new(input_spec(false), gpio.clone());
        input.init().unwrap();
        assert!(!input.state());

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        input.add_handler(Arc::new(move |ev, st| sink.lock().unwrap().push((ev, st))));

        gpio.set_level(GpioPin::new(13), true);
        input.handle_edge(Duration::from_secs(1)).unwrap();
        // Same level again: no events
        input.handle_edge(Duration::from_secs(1)).unwrap();
        gpio.set_level(GpioPin::new(13), false);
        input.handle_edge(Duration::from_secs(2)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (InputEvent::Change, true),
                (InputEvent::ButtonDown, true),
                (InputEvent::Change, false),
                (InputEvent::ButtonUp, false),
            ]
        );
    }

    #[test]
    fn test_input_remove_handler() {
        let input = InputPin::new(input_spec(false), Arc::new(SimGpio::new()));
        let id = input.add_handler(Arc::new(|_, _| {}));
        assert_eq!(input.handler_count(), 1);
        assert!(input.remove_handler(id));
        assert!(!input.remove_handler(id));
        assert_eq!(input.handler_count(), 0);
    }

    #[test]
    fn test_reset_event_after_ten_changes() {
        let gpio = Arc::new(SimGpio::new());
        let input = InputPin::new(input_spec(true), gpio.clone());
        input.init().unwrap();

        let resets = Arc::new(StdMutex::new(0));
        let sink = resets.clone();
        input.add_handler(Arc::new(move |ev, _| {
            if ev == InputEvent::Reset {
                *sink.lock().unwrap() += 1;
            }
        }));

        for i in 0..10u64 {
            gpio.set_level(GpioPin::new(13), i % 2 == 0);
            input.handle_edge(Duration::from_millis(500 * i)).unwrap();
        }
        assert_eq!(*resets.lock().unwrap(), 1);
    }

    #[test]
    fn test_reset_disabled_input_never_resets() {
        let gpio = Arc::new(SimGpio::new());
        let input = InputPin::new(input_spec(false), gpio.clone());
        input.init().unwrap();

        let resets = Arc::new(StdMutex::new(0));
        let sink = resets.clone();
        input.add_handler(Arc::new(move |ev, _| {
            if ev == InputEvent::Reset {
                *sink.lock().unwrap() += 1;
            }
        }));

        for i in 0..20u64 {
            gpio.set_level(GpioPin::new(13), i % 2 == 0);
            input.handle_edge(Duration::from_millis(100 * i)).unwrap();
        }
        assert_eq!(*resets.lock().unwrap(), 0);
    }
}
