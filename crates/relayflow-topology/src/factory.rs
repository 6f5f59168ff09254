/*!
 * Component construction.
 *
 * The topology builder never names concrete component types; it asks a
 * [`ComponentFactory`] for them. [`StandardComponents`] builds the ones in
 * [`crate::components`].
 */
use relayflow_core::config::{CoveringConfig, GarageDoorConfig, InputConfig, SwitchConfig};
use relayflow_core::types::ChannelId;
use relayflow_devices::Input;

use crate::component::Component;
use crate::components::{
    GarageDoorOpener, InputService, PairBindings, Switch, SwitchBindings, WindowCovering,
};
use crate::error::Result;
use crate::mode::{CoveringInMode, InputServiceType, SwitchServiceType};

/// Boxed component borrowing channels for `'r`
pub type BoxedComponent<'r> = Box<dyn Component + 'r>;

/// Constructs components for the topology builder
pub trait ComponentFactory {
    /// Switch channel `id`
    fn switch<'r>(
        &self,
        id: ChannelId,
        service: SwitchServiceType,
        config: &SwitchConfig,
        bindings: SwitchBindings<'r>,
    ) -> Result<BoxedComponent<'r>>;

    /// Window covering over both channels
    fn window_covering<'r>(
        &self,
        id: ChannelId,
        config: &CoveringConfig,
        in_mode: CoveringInMode,
        bindings: PairBindings<'r>,
    ) -> Result<BoxedComponent<'r>>;

    /// Garage door opener over both channels
    fn garage_door_opener<'r>(
        &self,
        id: ChannelId,
        config: &GarageDoorConfig,
        bindings: PairBindings<'r>,
    ) -> Result<BoxedComponent<'r>>;

    /// Standalone input service
    fn input_service<'r>(
        &self,
        id: ChannelId,
        service: InputServiceType,
        config: &InputConfig,
        input: Option<&'r dyn Input>,
    ) -> Result<BoxedComponent<'r>>;
}

/// Factory for the standard components
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardComponents;

impl ComponentFactory for StandardComponents {
    fn switch<'r>(
        &self,
        id: ChannelId,
        service: SwitchServiceType,
        config: &SwitchConfig,
        bindings: SwitchBindings<'r>,
    ) -> Result<BoxedComponent<'r>> {
        Ok(Box::new(Switch::new(id, service, config, bindings)))
    }

    fn window_covering<'r>(
        &self,
        id: ChannelId,
        config: &CoveringConfig,
        in_mode: CoveringInMode,
        bindings: PairBindings<'r>,
    ) -> Result<BoxedComponent<'r>> {
        Ok(Box::new(WindowCovering::new(id, config, in_mode, bindings)))
    }

    fn garage_door_opener<'r>(
        &self,
        id: ChannelId,
        config: &GarageDoorConfig,
        bindings: PairBindings<'r>,
    ) -> Result<BoxedComponent<'r>> {
        Ok(Box::new(GarageDoorOpener::new(id, config, bindings)))
    }

    fn input_service<'r>(
        &self,
        id: ChannelId,
        service: InputServiceType,
        config: &InputConfig,
        input: Option<&'r dyn Input>,
    ) -> Result<BoxedComponent<'r>> {
        Ok(Box::new(InputService::new(id, service, config, input)))
    }
}
