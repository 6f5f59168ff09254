/*!
 * Window covering component.
 *
 * Drives both relays (one per direction) and reads power from both meters to
 * detect end stops. Which inputs it listens to depends on the input mode.
 */
use tracing::{debug, warn};

use relayflow_core::config::CoveringConfig;
use relayflow_core::types::ChannelId;

use crate::component::{Component, ComponentKind};
use crate::components::PairBindings;
use crate::error::{Error, Result};
use crate::mode::CoveringInMode;

const KIND: ComponentKind = ComponentKind::WindowCovering;

/// Roller shutter on both relay channels
#[derive(Debug)]
pub struct WindowCovering<'r> {
    id: ChannelId,
    name: String,
    in_mode: CoveringInMode,
    swap_inputs: bool,
    swap_outputs: bool,
    move_time_ms: u32,
    bindings: PairBindings<'r>,
    primary: bool,
}

impl<'r> WindowCovering<'r> {
    /// Create covering `id`; `in_mode` is the decoded `config.in_mode`
    pub fn new(
        id: ChannelId,
        config: &CoveringConfig,
        in_mode: CoveringInMode,
        bindings: PairBindings<'r>,
    ) -> Self {
        Self {
            id,
            name: config.name.clone(),
            in_mode,
            swap_inputs: config.swap_inputs,
            swap_outputs: config.swap_outputs,
            move_time_ms: config.move_time_ms,
            bindings,
            primary: false,
        }
    }

    /// Input mode
    pub fn in_mode(&self) -> CoveringInMode {
        self.in_mode
    }

    /// Input left free for a standalone input service in single mode.
    ///
    /// With swapped inputs the covering listens on input 2 and input 1 is
    /// free; otherwise the other way round.
    pub fn free_input(in_mode: CoveringInMode, swap_inputs: bool) -> Vec<ChannelId> {
        match in_mode {
            CoveringInMode::SeparateMomentary | CoveringInMode::SeparateToggle => Vec::new(),
            CoveringInMode::Single if swap_inputs => vec![ChannelId::new(1)],
            CoveringInMode::Single => vec![ChannelId::new(2)],
            CoveringInMode::Detached => vec![ChannelId::new(1), ChannelId::new(2)],
        }
    }

    fn input_index(&self, index: usize) -> usize {
        if self.swap_inputs {
            1 - index
        } else {
            index
        }
    }

    fn output_index(&self, index: usize) -> usize {
        if self.swap_outputs {
            1 - index
        } else {
            index
        }
    }
}

impl Component for WindowCovering<'_> {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn kind(&self) -> ComponentKind {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<()> {
        for (index, output) in self.bindings.outputs.iter().enumerate() {
            if output.is_none() {
                return Err(Error::missing_channel(
                    KIND.as_str(),
                    "output",
                    ChannelId::new(index as u8 + 1),
                ));
            }
        }
        if !self.bindings.has_metering() {
            warn!(id = %self.id, "No power meters, end stops cannot be detected");
        }
        if self.move_time_ms == 0 {
            debug!(id = %self.id, "Window covering not calibrated");
        }
        debug!(
            id = %self.id,
            in_mode = ?self.in_mode,
            inputs = ?self.consumed_inputs(),
            "Window covering initialized"
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
        let indices: &[usize] = match self.in_mode {
            CoveringInMode::SeparateMomentary | CoveringInMode::SeparateToggle => &[0, 1],
            CoveringInMode::Single => &[0],
            CoveringInMode::Detached => &[],
        };
        indices
            .iter()
            .filter_map(|&i| self.bindings.inputs[self.input_index(i)])
            .map(|input| input.id())
            .collect()
    }

    /// Open output first, then close output
    fn bound_outputs(&self) -> Vec<ChannelId> {
        [0, 1]
            .iter()
            .filter_map(|&i| self.bindings.outputs[self.output_index(i)])
            .map(|output| output.id())
            .collect()
    }

    fn has_metering(&self) -> bool {
        self.bindings.has_metering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use relayflow_devices::create_peripherals;
    use relayflow_devices::sim::{MeteringScript, SimBoard};
    use relayflow_devices::ChannelRegistry;

    fn registry(metering: MeteringScript) -> ChannelRegistry {
        create_peripherals(Arc::new(SimBoard::new().with_metering(metering))).unwrap()
    }

    fn config(in_mode: i32, swap_inputs: bool, swap_outputs: bool) -> CoveringConfig {
        CoveringConfig {
            in_mode,
            swap_inputs,
            swap_outputs,
            ..CoveringConfig::default()
        }
    }

    fn covering<'r>(config: &CoveringConfig, bindings: PairBindings<'r>) -> WindowCovering<'r> {
        let in_mode = CoveringInMode::decode(config.in_mode);
        WindowCovering::new(ChannelId::new(1), config, in_mode, bindings)
    }

    fn ids(raw: &[u8]) -> Vec<ChannelId> {
        raw.iter().copied().map(ChannelId::new).collect()
    }

    #[test]
    fn test_separate_modes_consume_both_inputs() {
        let registry = registry(MeteringScript::Healthy);
        for in_mode in [0, 1] {
            let wc = covering(&config(in_mode, false, false), PairBindings::lookup(&registry));
            assert_eq!(wc.consumed_inputs(), ids(&[1, 2]));
        }
    }

    #[test]
    fn test_single_mode_consumes_one_input() {
        let registry = registry(MeteringScript::Healthy);
        let wc = covering(&config(2, false, false), PairBindings::lookup(&registry));
        assert_eq!(wc.consumed_inputs(), ids(&[1]));
        assert_eq!(WindowCovering::free_input(CoveringInMode::Single, false), ids(&[2]));

        let wc = covering(&config(2, true, false), PairBindings::lookup(&registry));
        assert_eq!(wc.consumed_inputs(), ids(&[2]));
        assert_eq!(WindowCovering::free_input(CoveringInMode::Single, true), ids(&[1]));
    }

    #[test]
    fn test_detached_consumes_nothing() {
        let registry = registry(MeteringScript::Healthy);
        let wc = covering(&config(3, false, false), PairBindings::lookup(&registry));
        assert!(wc.consumed_inputs().is_empty());
        assert_eq!(WindowCovering::free_input(CoveringInMode::Detached, false), ids(&[1, 2]));
    }

    #[test]
    fn test_swap_outputs() {
        let registry = registry(MeteringScript::Healthy);
        let wc = covering(&config(0, false, true), PairBindings::lookup(&registry));
        assert_eq!(wc.bound_outputs(), ids(&[2, 1]));
    }

    #[test_log::test]
    fn test_init_without_metering() {
        let registry = registry(MeteringScript::Absent);
        let mut wc = covering(&config(0, false, false), PairBindings::lookup(&registry));
        wc.init().unwrap();
        assert!(!wc.has_metering());
    }

    #[test]
    fn test_init_requires_both_outputs() {
        let registry = registry(MeteringScript::Healthy);
        let mut bindings = PairBindings::lookup(&registry);
        bindings.outputs[1] = None;
        let mut wc = covering(&config(0, false, false), bindings);
        assert!(matches!(
            wc.init(),
            Err(Error::MissingChannel { channel: "output", .. })
        ));
    }
}
