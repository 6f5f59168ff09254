/*!
 * The built component/accessory graph.
 */
use serde::Serialize;

use relayflow_core::types::ChannelId;

use crate::accessory::{Accessory, AccessorySet};
use crate::component::{Component, ComponentKind};
use crate::error::Result;
use crate::factory::BoxedComponent;
use crate::legacy::SwitchLayout;
use crate::mode::ModeTag;

/// Components and accessories of one boot, handed to the accessory runtime
#[derive(Debug)]
pub struct Topology<'r> {
    mode: ModeTag,
    components: Vec<BoxedComponent<'r>>,
    accessories: AccessorySet,
    switch_layout: Option<SwitchLayout>,
}

impl<'r> Topology<'r> {
    pub(crate) fn new(mode: ModeTag, accessories: AccessorySet) -> Self {
        Self {
            mode,
            components: Vec::new(),
            accessories,
            switch_layout: None,
        }
    }

    /// Mode the topology was built for
    pub fn mode(&self) -> ModeTag {
        self.mode
    }

    /// Components, in collection order
    pub fn components(&self) -> &[BoxedComponent<'r>] {
        &self.components
    }

    /// Find a component by kind and id
    pub fn component(&self, kind: ComponentKind, id: ChannelId) -> Option<&(dyn Component + 'r)> {
        self.components
            .iter()
            .find(|c| c.kind() == kind && c.id() == id)
            .map(|c| &**c)
    }

    /// Components marked primary
    pub fn primary_components(&self) -> impl Iterator<Item = &(dyn Component + 'r)> + '_ {
        self.components
            .iter()
            .filter(|c| c.is_primary())
            .map(|c| &**c)
    }

    /// Ids of inputs exposed through their own service
    pub fn standalone_inputs(&self) -> Vec<ChannelId> {
        self.components
            .iter()
            .filter(|c| is_input_service(c.kind()))
            .map(|c| c.id())
            .collect()
    }

    /// Accessories, primary first
    pub fn accessories(&self) -> &AccessorySet {
        &self.accessories
    }

    /// Layout used by the dual-switch branch
    pub fn switch_layout(&self) -> Option<SwitchLayout> {
        self.switch_layout
    }

    /// Hand over components and accessories
    pub fn into_parts(self) -> (Vec<BoxedComponent<'r>>, AccessorySet) {
        (self.components, self.accessories)
    }

    /// Serializable summary
    pub fn report(&self) -> TopologyReport {
        TopologyReport {
            mode: self.mode,
            legacy_layout: self.switch_layout.map_or(false, |l| l.is_legacy()),
            components: self
                .components
                .iter()
                .map(|c| ComponentReport {
                    kind: c.kind(),
                    id: c.id(),
                    name: c.name().to_string(),
                    primary: c.is_primary(),
                    inputs: c.consumed_inputs(),
                    outputs: c.bound_outputs(),
                    metering: c.has_metering(),
                })
                .collect(),
            accessories: self.accessories.iter().cloned().collect(),
        }
    }

    pub(crate) fn push_component(&mut self, component: BoxedComponent<'r>) {
        self.components.push(component);
    }

    pub(crate) fn accessories_mut(&mut self) -> &mut AccessorySet {
        &mut self.accessories
    }

    pub(crate) fn reverse_components(&mut self) {
        self.components.reverse();
    }

    pub(crate) fn set_switch_layout(&mut self, layout: SwitchLayout) {
        self.switch_layout = Some(layout);
    }
}

fn is_input_service(kind: ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::StatelessSwitch
            | ComponentKind::MotionSensor
            | ComponentKind::OccupancySensor
            | ComponentKind::ContactSensor
            | ComponentKind::Doorbell
    )
}

/// Summary of a [`Topology`]
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    /// Device mode
    pub mode: ModeTag,
    /// Whether the legacy switch layout was used
    pub legacy_layout: bool,
    /// Components, in collection order
    pub components: Vec<ComponentReport>,
    /// Accessories, primary first
    pub accessories: Vec<Accessory>,
}

/// Summary of one component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    /// Kind
    pub kind: ComponentKind,
    /// Id
    pub id: ChannelId,
    /// Service name
    pub name: String,
    /// Marked primary
    pub primary: bool,
    /// Consumed inputs
    pub inputs: Vec<ChannelId>,
    /// Driven outputs
    pub outputs: Vec<ChannelId>,
    /// Power readings available
    pub metering: bool,
}

impl TopologyReport {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
