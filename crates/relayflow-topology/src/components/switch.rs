/*!
 * Switch component.
 *
 * Covers every service a single relay channel can expose (switch, outlet,
 * lock, valve) and the disabled case, where the channel is kept but exposes
 * nothing.
 */
use tracing::debug;

use relayflow_core::config::SwitchConfig;
use relayflow_core::types::ChannelId;

use crate::component::{Component, ComponentKind};
use crate::components::SwitchBindings;
use crate::error::{Error, Result};
use crate::mode::{SwitchInMode, SwitchServiceType};

/// One relay channel with its input and power meter
#[derive(Debug)]
pub struct Switch<'r> {
    id: ChannelId,
    kind: ComponentKind,
    name: String,
    in_mode: SwitchInMode,
    bindings: SwitchBindings<'r>,
    primary: bool,
}

impl<'r> Switch<'r> {
    /// Create switch `id` exposing `service`
    pub fn new(
        id: ChannelId,
        service: SwitchServiceType,
        config: &SwitchConfig,
        bindings: SwitchBindings<'r>,
    ) -> Self {
        let kind = match service {
            SwitchServiceType::Disabled => ComponentKind::DisabledSwitch,
            SwitchServiceType::Switch => ComponentKind::Switch,
            SwitchServiceType::Outlet => ComponentKind::Outlet,
            SwitchServiceType::Lock => ComponentKind::Lock,
            SwitchServiceType::Valve => ComponentKind::Valve,
        };
        Self {
            id,
            kind,
            name: config.name.clone(),
            in_mode: SwitchInMode::decode(config.in_mode),
            bindings,
            primary: false,
        }
    }

    /// Input mode
    pub fn in_mode(&self) -> SwitchInMode {
        self.in_mode
    }
}

impl Component for Switch<'_> {
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
        let output = self
            .bindings
            .output
            .ok_or_else(|| Error::missing_channel(self.kind.as_str(), "output", self.id))?;
        if self.in_mode.is_detached() && self.bindings.input.is_some() {
            return Err(Error::init(
                self.kind.as_str(),
                self.id,
                "detached switch must not be bound to its input",
            ));
        }
        debug!(
            id = %self.id,
            kind = self.kind.as_str(),
            on = output.state(),
            metering = self.bindings.power_meter.is_some(),
            "Switch initialized"
        );
        Ok(())
    }

    fn is_primary(&self) -> bool {
        self.primary
    }

    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    fn consumed_inputs(&self) -> Vec<ChannelId> {
        self.bindings.input.map(|i| i.id()).into_iter().collect()
    }

    fn bound_outputs(&self) -> Vec<ChannelId> {
        self.bindings.output.map(|o| o.id()).into_iter().collect()
    }

    fn has_metering(&self) -> bool {
        self.bindings.power_meter.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use relayflow_devices::create_peripherals;
    use relayflow_devices::sim::{MeteringScript, SimBoard};

    use crate::accessory::ServiceKind;

    fn config(in_mode: i32) -> SwitchConfig {
        SwitchConfig {
            name: "Lamp".to_string(),
            svc_type: 0,
            in_mode,
        }
    }

    #[test]
    fn test_switch_bindings() {
        let registry = create_peripherals(Arc::new(SimBoard::new())).unwrap();
        let id = ChannelId::new(2);
        let bindings = SwitchBindings::lookup(&registry, id, true);
        let mut sw = Switch::new(id, SwitchServiceType::Outlet, &config(0), bindings);

        sw.init().unwrap();
        assert_eq!(sw.kind(), ComponentKind::Outlet);
        assert_eq!(sw.consumed_inputs(), vec![id]);
        assert_eq!(sw.bound_outputs(), vec![id]);
        assert!(sw.has_metering());
        assert_eq!(sw.service().map(|s| s.kind), Some(ServiceKind::Outlet));
    }

    #[test]
    fn test_detached_switch_skips_input() {
        let board = SimBoard::new().with_metering(MeteringScript::Absent);
        let registry = create_peripherals(Arc::new(board)).unwrap();
        let id = ChannelId::new(1);
        let bindings = SwitchBindings::lookup(&registry, id, false);
        let mut sw = Switch::new(id, SwitchServiceType::Switch, &config(3), bindings);

        sw.init().unwrap();
        assert!(sw.consumed_inputs().is_empty());
        assert!(!sw.has_metering());
    }

    #[test]
    fn test_missing_output_fails_init() {
        let mut sw = Switch::new(
            ChannelId::new(1),
            SwitchServiceType::Switch,
            &config(0),
            SwitchBindings::default(),
        );
        assert!(matches!(sw.init(), Err(Error::MissingChannel { .. })));
    }

    #[test]
    fn test_disabled_switch_has_no_service() {
        let sw = Switch::new(
            ChannelId::new(1),
            SwitchServiceType::Disabled,
            &config(0),
            SwitchBindings::default(),
        );
        assert_eq!(sw.kind(), ComponentKind::DisabledSwitch);
        assert!(sw.service().is_none());
    }
}
