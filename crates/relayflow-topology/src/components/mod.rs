/*!
 * Standard component implementations.
 *
 * Each component only records which channels it is wired to and checks the
 * wiring on `init`; motion control, door state machines and sensor handling
 * are driven by the accessory runtime after boot.
 */
use relayflow_core::types::ChannelId;
use relayflow_devices::{ChannelRegistry, Input, Output, PowerMeter};

pub mod garage_door;
pub mod input;
pub mod switch;
pub mod window_covering;

pub use garage_door::GarageDoorOpener;
pub use input::InputService;
pub use switch::Switch;
pub use window_covering::WindowCovering;

const FIRST: ChannelId = ChannelId::new(1);
const SECOND: ChannelId = ChannelId::new(2);

/// Channels of a single switch
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchBindings<'r> {
    /// Input, unless detached
    pub input: Option<&'r dyn Input>,
    /// Relay output
    pub output: Option<&'r dyn Output>,
    /// Power meter, if metering came up
    pub power_meter: Option<&'r dyn PowerMeter>,
}

impl<'r> SwitchBindings<'r> {
    /// Look up the channels of switch `id`; the input is skipped when
    /// `bind_input` is false
    pub fn lookup(registry: &'r ChannelRegistry, id: ChannelId, bind_input: bool) -> Self {
        Self {
            input: if bind_input {
                registry.find_input(id)
            } else {
                None
            },
            output: registry.find_output(id),
            power_meter: registry.find_power_meter(id),
        }
    }
}

/// Both channels of each kind, index 0 being channel 1
#[derive(Debug, Clone, Copy, Default)]
pub struct PairBindings<'r> {
    /// Input 1 and input 2
    pub inputs: [Option<&'r dyn Input>; 2],
    /// Output 1 and output 2
    pub outputs: [Option<&'r dyn Output>; 2],
    /// Power meter 1 and power meter 2
    pub power_meters: [Option<&'r dyn PowerMeter>; 2],
}

impl<'r> PairBindings<'r> {
    /// Look up channels 1 and 2; missing channels stay `None`
    pub fn lookup(registry: &'r ChannelRegistry) -> Self {
        Self {
            inputs: [registry.find_input(FIRST), registry.find_input(SECOND)],
            outputs: [registry.find_output(FIRST), registry.find_output(SECOND)],
            power_meters: [
                registry.find_power_meter(FIRST),
                registry.find_power_meter(SECOND),
            ],
        }
    }

    /// Ids of the outputs that are present
    pub fn output_ids(&self) -> Vec<ChannelId> {
        self.outputs.iter().flatten().map(|o| o.id()).collect()
    }

    /// Whether both power meters are present
    pub fn has_metering(&self) -> bool {
        self.power_meters.iter().all(Option::is_some)
    }
}
