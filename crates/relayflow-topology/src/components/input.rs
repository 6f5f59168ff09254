/*!
 * Standalone input services.
 *
 * An input not tied to a relay can be exposed as a programmable switch or as
 * one of the binary sensors.
 */
use tracing::debug;

use relayflow_core::config::InputConfig;
use relayflow_core::types::ChannelId;
use relayflow_devices::Input;

use crate::component::{Component, ComponentKind};
use crate::error::{Error, Result};
use crate::mode::InputServiceType;

/// An input exposed as its own service
#[derive(Debug)]
pub struct InputService<'r> {
    id: ChannelId,
    kind: ComponentKind,
    name: String,
    inverted: bool,
    input: Option<&'r dyn Input>,
    primary: bool,
}

impl<'r> InputService<'r> {
    /// Create input service `id`
    pub fn new(
        id: ChannelId,
        service: InputServiceType,
        config: &InputConfig,
        input: Option<&'r dyn Input>,
    ) -> Self {
        let kind = match service {
            InputServiceType::StatelessSwitch => ComponentKind::StatelessSwitch,
            InputServiceType::MotionSensor => ComponentKind::MotionSensor,
            InputServiceType::OccupancySensor => ComponentKind::OccupancySensor,
            InputServiceType::ContactSensor => ComponentKind::ContactSensor,
            InputServiceType::Doorbell => ComponentKind::Doorbell,
            InputServiceType::Disabled => ComponentKind::DisabledInput,
        };
        Self {
            id,
            kind,
            name: config.name.clone(),
            inverted: config.inverted,
            input,
            primary: false,
        }
    }

    /// Reported state, after inversion
    pub fn state(&self) -> Option<bool> {
        self.input.map(|i| i.state() != self.inverted)
    }
}

impl Component for InputService<'_> {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<()> {
        if self.kind != ComponentKind::DisabledInput && self.input.is_none() {
            return Err(Error::missing_channel(self.kind.as_str(), "input", self.id));
        }
        debug!(id = %self.id, kind = self.kind.as_str(), "Input service initialized");
        Ok(())
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    fn consumed_inputs(&self) -> Vec<ChannelId> {
        match self.kind {
            ComponentKind::DisabledInput => Vec::new(),
            _ => self.input.map(|i| i.id()).into_iter().collect(),
        }
    }

    fn bound_outputs(&self) -> Vec<ChannelId> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use relayflow_devices::create_peripherals;
    use relayflow_devices::gpio::GpioPin;
    use relayflow_devices::sim::SimBoard;

    fn config(inverted: bool) -> InputConfig {
        InputConfig {
            name: "Door".to_string(),
            svc_type: 3,
            inverted,
        }
    }

    #[test]
    fn test_contact_sensor_state() {
        let board = Arc::new(SimBoard::new());
        let registry = create_peripherals(board.clone()).unwrap();
        let id = ChannelId::new(2);
        board.sim_gpio().set_level(GpioPin::new(5), true);
        registry
            .find_input(id)
            .unwrap()
            .handle_edge(std::time::Duration::from_secs(60))
            .unwrap();

        let mut svc = InputService::new(
            id,
            InputServiceType::ContactSensor,
            &config(true),
            registry.find_input(id),
        );
        svc.init().unwrap();
        assert_eq!(svc.kind(), ComponentKind::ContactSensor);
        assert_eq!(svc.consumed_inputs(), vec![id]);
        assert_eq!(svc.state(), Some(false));
    }

    #[test]
    fn test_disabled_input() {
        let mut svc = InputService::new(
            ChannelId::new(1),
            InputServiceType::Disabled,
            &config(false),
            None,
        );
        svc.init().unwrap();
        assert!(svc.service().is_none());
        assert!(svc.consumed_inputs().is_empty());
    }

    #[test]
    fn test_missing_input_fails() {
        let mut svc = InputService::new(
            ChannelId::new(1),
            InputServiceType::MotionSensor,
            &config(false),
            None,
        );
        assert!(svc.init().is_err());
    }
}
