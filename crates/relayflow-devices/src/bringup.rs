/*!
 * Peripheral bring-up.
 *
 * Runs once at boot and produces the [`ChannelRegistry`]. GPIO channels are
 * created in [`BRING_UP_SEQUENCE`] order; metering is brought up next and is
 * allowed to fail without affecting anything else; the temperature sensor is
 * created last.
 */
use std::sync::Arc;

use tracing::{error, info};

use relayflow_core::event::{emit_to, BootEventKind, SharedEventBus, Stage};
use relayflow_core::logging::{channel_span, stage_span};

use crate::board::{output_pin, Board, BringUpStep, BRING_UP_SEQUENCE, SYS_TEMP_SENSOR};
use crate::gpio::{InputPin, InputSpec, InputWiring, OutputPin, OutputSpec};
use crate::metering::init_power_meters;
use crate::peripheral::{Input, PowerMeter, Result};
use crate::registry::ChannelRegistry;
use crate::reset::reset_sequence_handler;

/// Peripheral bring-up runner
pub struct BringUp {
    board: Arc<dyn Board>,
    events: Option<SharedEventBus>,
}

impl BringUp {
    /// Create a runner for `board`
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self {
            board,
            events: None,
        }
    }

    /// Report progress on `bus`
    pub fn with_event_bus(mut self, bus: SharedEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Create every peripheral.
    ///
    /// GPIO failures abort bring-up. Metering failures are logged and leave
    /// the registry without power meters.
    pub fn run(self) -> Result<ChannelRegistry> {
        let span = stage_span("bring-up");
        let _entered = span.enter();

        let mut registry = ChannelRegistry::new();

        for step in BRING_UP_SEQUENCE {
            match step {
                BringUpStep::Output(spec) => self.create_output(spec, &mut registry)?,
                BringUpStep::Input(spec) => self.create_input(spec, &mut registry)?,
            }
        }

        match init_power_meters(self.board.as_ref()) {
            Ok(setup) => {
                let ids: Vec<u8> = setup.meters.iter().map(|m| m.id().get()).collect();
                registry.attach_metering(setup)?;
                for id in ids {
                    self.emit(BootEventKind::PowerMeterReady { id });
                }
            }
            Err(e) => {
                error!("Failed to init metering chip: {}", e);
                self.emit(BootEventKind::MeteringUnavailable {
                    reason: e.to_string(),
                });
            }
        }

        registry.set_temp_sensor(self.board.temp_sensor(&SYS_TEMP_SENSOR));
        self.emit(BootEventKind::TempSensorReady);

        let summary = registry.summary();
        info!(
            inputs = summary.inputs.len(),
            outputs = summary.outputs.len(),
            power_meters = summary.power_meters.len(),
            "Peripherals ready"
        );
        Ok(registry)
    }

    fn create_output(&self, spec: OutputSpec, registry: &mut ChannelRegistry) -> Result<()> {
        let span = channel_span("output", spec.id.get());
        let _entered = span.enter();

        let output = OutputPin::new(spec, self.board.gpio());
        output.init()?;
        registry.add_output(Box::new(output))?;
        self.emit(BootEventKind::OutputReady { id: spec.id.get() });
        Ok(())
    }

    fn create_input(&self, spec: InputSpec, registry: &mut ChannelRegistry) -> Result<()> {
        let span = channel_span("input", spec.id.get());
        let _entered = span.enter();

        let input = InputPin::new(spec, self.board.gpio());
        match spec.wiring {
            InputWiring::FactoryReset { feedback } => {
                let pin = output_pin(feedback)?;
                input.add_handler(reset_sequence_handler(Arc::clone(&self.board), pin));
            }
            InputWiring::None => {}
        }
        input.init()?;
        registry.add_input(Box::new(input))?;
        self.emit(BootEventKind::InputReady { id: spec.id.get() });
        Ok(())
    }

    fn emit(&self, kind: BootEventKind) {
        emit_to(self.events.as_ref(), Stage::BringUp, kind);
    }
}

/// Bring up all peripherals of `board` without event reporting
pub fn create_peripherals(board: Arc<dyn Board>) -> Result<ChannelRegistry> {
    BringUp::new(board).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use relayflow_core::types::ChannelId;

    use crate::gpio::GpioPin;
    use crate::sim::{GpioOp, MeteringScript, SimBoard};

    fn setup_position(board: &SimBoard, pred: impl Fn(&GpioOp) -> bool) -> usize {
        board
            .sim_gpio()
            .ops()
            .iter()
            .position(pred)
            .expect("operation not recorded")
    }

    #[test_log::test]
    fn test_output_2_initialized_before_input_1() {
        let board = Arc::new(SimBoard::new());
        create_peripherals(board.clone()).unwrap();

        let out2 = setup_position(&board, |op| {
            matches!(op, GpioOp::SetupOutput { pin, .. } if *pin == GpioPin::new(15))
        });
        let in1 = setup_position(&board, |op| {
            matches!(op, GpioOp::SetupInput { pin, .. } if *pin == GpioPin::new(13))
        });
        assert!(out2 < in1);
    }

    #[test]
    fn test_full_bring_up() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board).unwrap();

        let summary = registry.summary();
        assert_eq!(summary.outputs, vec![ChannelId::new(1), ChannelId::new(2)]);
        assert_eq!(summary.inputs, vec![ChannelId::new(1), ChannelId::new(2)]);
        assert_eq!(summary.power_meters, vec![ChannelId::new(1), ChannelId::new(2)]);
        assert!(summary.temp_sensor);
        assert!(registry.has_metering());
    }

    #[test]
    fn test_outputs_start_off() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board.clone()).unwrap();
        assert!(registry.outputs().all(|o| !o.state()));
        assert_eq!(board.sim_gpio().level(GpioPin::new(4)), Some(false));
        assert_eq!(board.sim_gpio().level(GpioPin::new(15)), Some(false));
    }

    #[test_log::test]
    fn test_metering_failure_is_isolated() {
        let board = Arc::new(SimBoard::new().with_metering(MeteringScript::Absent));
        let registry = create_peripherals(board).unwrap();

        assert_eq!(registry.power_meters().count(), 0);
        assert!(!registry.has_metering());
        assert_eq!(registry.inputs().count(), 2);
        assert_eq!(registry.outputs().count(), 2);
        assert!(registry.temp_sensor().is_some());
    }

    #[test]
    fn test_power_meter_init_failure_registers_none() {
        let board = Arc::new(SimBoard::new().with_metering(MeteringScript::FailingChannel(0)));
        let registry = create_peripherals(board).unwrap();
        assert_eq!(registry.power_meters().count(), 0);
        assert!(registry.metering_chip().is_none());
        assert_eq!(registry.inputs().count(), 2);
    }

    #[test]
    fn test_input_handlers() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board).unwrap();
        let in1 = registry.find_input(ChannelId::new(1)).unwrap();
        let in2 = registry.find_input(ChannelId::new(2)).unwrap();
        assert_eq!(in1.handler_count(), 1);
        assert_eq!(in2.handler_count(), 0);
    }

    #[test]
    fn test_reset_sequence_on_input_1() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board.clone()).unwrap();
        let in1 = registry.find_input(ChannelId::new(1)).unwrap();

        for i in 0..10u64 {
            board.sim_gpio().set_level(GpioPin::new(13), i % 2 == 0);
            in1.handle_edge(Duration::from_millis(300 * i)).unwrap();
        }

        assert_eq!(board.factory_resets(), 1);
        assert_eq!(board.sim_gpio().level(GpioPin::new(4)), Some(true));
    }

    #[test]
    fn test_input_2_toggles_never_reset() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board.clone()).unwrap();
        let in2 = registry.find_input(ChannelId::new(2)).unwrap();

        for i in 0..12u64 {
            board.sim_gpio().set_level(GpioPin::new(5), i % 2 == 0);
            in2.handle_edge(Duration::from_millis(100 * i)).unwrap();
        }
        assert_eq!(board.factory_resets(), 0);
    }

    #[test]
    fn test_gpio_failure_aborts() {
        let board = Arc::new(SimBoard::new());
        board.sim_gpio().fail_pin(GpioPin::new(5));
        assert!(create_peripherals(board).is_err());
    }

    #[test]
    fn test_events_reported_in_order() {
        let board = Arc::new(SimBoard::new().with_metering(MeteringScript::Absent));
        let bus = SharedEventBus::new();
        let mut rx = bus.subscribe();
        BringUp::new(board).with_event_bus(bus).run().unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.stage, Stage::BringUp);
            kinds.push(event.kind);
        }
        assert_eq!(kinds.len(), 6);
        assert_eq!(kinds[0], BootEventKind::OutputReady { id: 1 });
        assert_eq!(kinds[1], BootEventKind::OutputReady { id: 2 });
        assert_eq!(kinds[2], BootEventKind::InputReady { id: 1 });
        assert_eq!(kinds[3], BootEventKind::InputReady { id: 2 });
        assert!(matches!(kinds[4], BootEventKind::MeteringUnavailable { .. }));
        assert_eq!(kinds[5], BootEventKind::TempSensorReady);
    }

    #[test]
    fn test_power_meters_reported_by_id() {
        let board = Arc::new(SimBoard::new());
        let bus = SharedEventBus::new();
        let mut rx = bus.subscribe();
        BringUp::new(board).with_event_bus(bus).run().unwrap();

        let mut meters = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BootEventKind::PowerMeterReady { id } = event.kind {
                meters.push(id);
            }
        }
        assert_eq!(meters, vec![1, 2]);
    }
}
