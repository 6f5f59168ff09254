/*!
 * Mode-exclusive topology construction.
 *
 * The device mode is decoded once and exactly one branch runs:
 *
 * - dual switch: two switches laid out by [`SwitchLayout::reconcile`], each
 *   failing switch skipped on its own;
 * - roller shutter: one window covering over both channels, plus standalone
 *   input services for the inputs it leaves free;
 * - garage door opener: one opener owning the primary accessory.
 *
 * The roller-shutter and garage-door branches are all or nothing: if their
 * component cannot be constructed or initialized, nothing is registered.
 */
use tracing::{debug, error, info, warn};

use relayflow_core::config::{Config, CoveringConfig, GarageDoorConfig, InputConfig, SwitchConfig};
use relayflow_core::event::{emit_to, BootEventKind, SharedEventBus, Stage};
use relayflow_core::logging::stage_span;
use relayflow_core::types::{AccessoryId, ChannelId};
use relayflow_devices::ChannelRegistry;

use crate::accessory::{
    Accessory, AccessorySet, Category, ServerHandle, WINDOW_COVERING_AID_BASE,
};
use crate::component::ComponentKind;
use crate::components::{PairBindings, SwitchBindings, WindowCovering};
use crate::error::{Error, Result};
use crate::factory::{BoxedComponent, ComponentFactory, StandardComponents};
use crate::legacy::SwitchLayout;
use crate::mode::{
    CoveringInMode, DeviceMode, DualSwitchConfig, InputServiceType, ModeTag, SwitchInMode,
    SwitchServiceType,
};
use crate::topology::Topology;

static STANDARD_COMPONENTS: StandardComponents = StandardComponents;

/// Builds the [`Topology`] for the configured device mode
pub struct TopologyBuilder<'a, 'r> {
    config: &'a Config,
    registry: &'r ChannelRegistry,
    server: ServerHandle,
    factory: &'a dyn ComponentFactory,
    events: Option<SharedEventBus>,
}

impl<'a, 'r> TopologyBuilder<'a, 'r> {
    /// Create a builder over a populated registry
    pub fn new(config: &'a Config, registry: &'r ChannelRegistry, server: ServerHandle) -> Self {
        Self {
            config,
            registry,
            server,
            factory: &STANDARD_COMPONENTS,
            events: None,
        }
    }

    /// Use `factory` instead of the standard components
    pub fn with_factory(mut self, factory: &'a dyn ComponentFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Report progress on `bus`
    pub fn with_event_bus(mut self, bus: SharedEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Build the topology around a fresh primary accessory named after the
    /// device
    pub fn build(&self) -> Topology<'r> {
        let primary = Accessory::primary(self.config.device.name.clone(), self.server.clone());
        self.build_with(AccessorySet::new(primary))
    }

    /// Build the topology around an existing accessory collection
    pub fn build_with(&self, accessories: AccessorySet) -> Topology<'r> {
        let span = stage_span("topology");
        let _entered = span.enter();

        let mode = DeviceMode::decode(self.config);
        let tag = mode.tag();
        info!(mode = tag.as_str(), "Building accessory topology");

        let mut topology = Topology::new(tag, accessories);
        let result = match mode {
            DeviceMode::DualSwitch(dual) => {
                self.build_dual_switch(dual, &mut topology);
                Ok(())
            }
            DeviceMode::RollerShutter(config) => self.build_roller_shutter(config, &mut topology),
            DeviceMode::GarageDoorOpener(config) => {
                self.build_garage_door_opener(config, &mut topology)
            }
        };

        if let Err(e) = result {
            error!(mode = tag.as_str(), "Topology branch aborted: {}", e);
            self.emit(BootEventKind::BranchAborted {
                mode: tag.as_str(),
                reason: e.to_string(),
            });
        }

        info!(
            mode = tag.as_str(),
            components = topology.components().len(),
            accessories = topology.accessories().len(),
            category = %topology.accessories().primary().category(),
            "Topology complete"
        );
        self.emit(BootEventKind::TopologyComplete {
            mode: tag.as_str(),
            components: topology.components().len(),
            accessories: topology.accessories().len(),
        });
        topology
    }

    fn build_roller_shutter(
        &self,
        config: &CoveringConfig,
        topology: &mut Topology<'r>,
    ) -> Result<()> {
        let id = ChannelId::new(1);
        let in_mode = CoveringInMode::decode(config.in_mode);
        let bindings = PairBindings::lookup(self.registry);

        let mut wc = self
            .factory
            .window_covering(id, config, in_mode, bindings)?;
        wc.init()?;
        let service = wc
            .service()
            .ok_or_else(|| Error::construction("window covering exposes no service"))?;
        wc.set_primary(true);

        match in_mode {
            CoveringInMode::SeparateMomentary | CoveringInMode::SeparateToggle => {
                let mut slot = topology.accessories_mut().primary_slot();
                slot.claim(wc.kind(), id);
                slot.set_category(Category::WindowCoverings);
                slot.add_service(service);
            }
            CoveringInMode::Single | CoveringInMode::Detached => {
                let aid = AccessoryId::from_base(WINDOW_COVERING_AID_BASE, id);
                let mut acc = Accessory::bridged(aid, config.name.clone(), self.server.clone());
                acc.add_service(service);
                self.add_accessory(topology, acc);
                for input_id in WindowCovering::free_input(in_mode, config.swap_inputs) {
                    self.expose_input(input_id, topology);
                }
            }
        }

        self.register(topology, wc);
        Ok(())
    }

    fn build_garage_door_opener(
        &self,
        config: &GarageDoorConfig,
        topology: &mut Topology<'r>,
    ) -> Result<()> {
        let id = ChannelId::new(1);
        let bindings = PairBindings::lookup(self.registry);

        let mut gdo = self.factory.garage_door_opener(id, config, bindings)?;
        gdo.init()?;
        let service = gdo
            .service()
            .ok_or_else(|| Error::construction("garage door opener exposes no service"))?;
        gdo.set_primary(true);

        let mut slot = topology.accessories_mut().primary_slot();
        slot.claim(gdo.kind(), id);
        slot.set_category(Category::GarageDoorOpeners);
        slot.add_service(service);

        self.register(topology, gdo);
        Ok(())
    }

    fn build_dual_switch(&self, dual: DualSwitchConfig<'_>, topology: &mut Topology<'r>) {
        let layout = SwitchLayout::reconcile(dual.legacy_layout, dual.in_modes());
        if layout.is_legacy() {
            info!("Using legacy accessory layout");
        }

        for plan in layout.order {
            let index = usize::from(plan.id.get() - 1);
            let (sw_cfg, in_cfg) = (dual.switches[index], dual.inputs[index]);
            if let Err(e) = self.create_switch(plan.id, sw_cfg, in_cfg, plan.to_primary, topology) {
                error!(id = %plan.id, "Failed to create switch: {}", e);
            }
        }

        if layout.reverse_components {
            topology.reverse_components();
        }
        topology.set_switch_layout(layout);
    }

    /// Create switch `id` and attach its service.
    ///
    /// With `to_primary` the service goes on the primary accessory and the
    /// first switch to get there claims it; otherwise it gets a bridged
    /// accessory, and a detached input is exposed as its own service. On
    /// error nothing is registered.
    pub fn create_switch(
        &self,
        id: ChannelId,
        sw_cfg: &SwitchConfig,
        in_cfg: &InputConfig,
        to_primary: bool,
        topology: &mut Topology<'r>,
    ) -> Result<()> {
        let service_type = SwitchServiceType::decode(sw_cfg.svc_type);
        let in_mode = SwitchInMode::decode(sw_cfg.in_mode);
        let bindings = SwitchBindings::lookup(self.registry, id, !in_mode.is_detached());

        let mut sw = self.factory.switch(id, service_type, sw_cfg, bindings)?;
        sw.init()?;
        let kind = sw.kind();

        let service = match sw.service() {
            Some(service) => service,
            None => {
                debug!(id = %id, "Switch disabled, no service");
                self.register(topology, sw);
                return Ok(());
            }
        };

        if to_primary {
            let mut slot = topology.accessories_mut().primary_slot();
            if slot.claim(kind, id) {
                sw.set_primary(true);
                slot.set_category(kind.category());
            }
            slot.add_service(service);
            self.register(topology, sw);
            return Ok(());
        }

        let aid = bridged_aid(kind, id)?;
        let mut acc = Accessory::bridged(aid, sw_cfg.name.clone(), self.server.clone());
        acc.add_service(service);
        self.register(topology, sw);
        self.add_accessory(topology, acc);

        if in_mode.is_detached() {
            if let Err(e) = self.create_input_service(id, in_cfg, topology) {
                error!(id = %id, "Failed to create input service: {}", e);
            }
        }
        Ok(())
    }

    /// Expose input `id` as a standalone service.
    ///
    /// Unknown service types produce a disabled input component and no
    /// accessory. On error nothing is registered.
    pub fn create_input_service(
        &self,
        id: ChannelId,
        in_cfg: &InputConfig,
        topology: &mut Topology<'r>,
    ) -> Result<()> {
        let service_type = InputServiceType::decode(in_cfg.svc_type);
        let input = self.registry.find_input(id);

        let mut component = self
            .factory
            .input_service(id, service_type, in_cfg, input)?;
        component.init()?;
        let kind = component.kind();
        let service = component.service();
        self.register(topology, component);

        match service {
            Some(service) => {
                let aid = bridged_aid(kind, id)?;
                let mut acc = Accessory::bridged(aid, in_cfg.name.clone(), self.server.clone());
                acc.add_service(service);
                self.add_accessory(topology, acc);
            }
            None => debug!(id = %id, "Input disabled, no accessory"),
        }
        Ok(())
    }

    fn expose_input(&self, id: ChannelId, topology: &mut Topology<'r>) {
        let in_cfg = match self.config.input(id.get()) {
            Some(in_cfg) => in_cfg,
            None => {
                warn!(id = %id, "No configuration for input");
                return;
            }
        };
        if let Err(e) = self.create_input_service(id, in_cfg, topology) {
            error!(id = %id, "Failed to create input service: {}", e);
        }
    }

    fn register(&self, topology: &mut Topology<'r>, component: BoxedComponent<'r>) {
        let (kind, id) = (component.kind(), component.id());
        debug!(
            kind = kind.as_str(),
            id = %id,
            primary = component.is_primary(),
            "Component registered"
        );
        topology.push_component(component);
        self.emit(BootEventKind::ComponentRegistered {
            kind: kind.as_str(),
            id: id.get(),
        });
    }

    fn add_accessory(&self, topology: &mut Topology<'r>, accessory: Accessory) {
        let aid = accessory.aid();
        debug!(aid = %aid, name = accessory.name(), "Bridged accessory added");
        topology.accessories_mut().push_bridged(accessory);
        self.emit(BootEventKind::AccessoryAdded { aid: aid.get() });
    }

    fn emit(&self, kind: BootEventKind) {
        emit_to(self.events.as_ref(), Stage::Topology, kind);
    }
}

fn bridged_aid(kind: ComponentKind, id: ChannelId) -> Result<AccessoryId> {
    kind.aid_base()
        .map(|base| AccessoryId::from_base(base, id))
        .ok_or_else(|| Error::construction(format!("{} has no accessory", kind.as_str())))
}

/// Build the topology for `config` with the standard components
pub fn build_topology<'r>(
    config: &Config,
    registry: &'r ChannelRegistry,
    server: ServerHandle,
) -> Topology<'r> {
    TopologyBuilder::new(config, registry, server).build()
}

/// Mode the builder will select for `config`
pub fn selected_mode(config: &Config) -> ModeTag {
    DeviceMode::decode(config).tag()
}
