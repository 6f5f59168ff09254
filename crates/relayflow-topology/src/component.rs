/*!
 * Component abstraction.
 *
 * A component is the unit of business logic behind a service: a switch, a
 * window covering, a garage door opener or a standalone input. Components
 * borrow their channels from the [`ChannelRegistry`](relayflow_devices::ChannelRegistry)
 * for the lifetime `'r` and never own them.
 */
use std::fmt::Debug;

use serde::Serialize;

use relayflow_core::types::ChannelId;

use crate::accessory::{self, Category, Service, ServiceKind};
use crate::error::Result;

/// Concrete kind of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Switch
    Switch,
    /// Outlet
    Outlet,
    /// Lock
    Lock,
    /// Valve
    Valve,
    /// Switch channel with no service
    DisabledSwitch,
    /// Window covering
    WindowCovering,
    /// Garage door opener
    GarageDoorOpener,
    /// Stateless programmable switch
    StatelessSwitch,
    /// Motion sensor
    MotionSensor,
    /// Occupancy sensor
    OccupancySensor,
    /// Contact sensor
    ContactSensor,
    /// Doorbell
    Doorbell,
    /// Input channel with no service
    DisabledInput,
}

impl ComponentKind {
    /// Name used in logs and events
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Switch => "switch",
            ComponentKind::Outlet => "outlet",
            ComponentKind::Lock => "lock",
            ComponentKind::Valve => "valve",
            ComponentKind::DisabledSwitch => "disabled_switch",
            ComponentKind::WindowCovering => "window_covering",
            ComponentKind::GarageDoorOpener => "garage_door_opener",
            ComponentKind::StatelessSwitch => "stateless_switch",
            ComponentKind::MotionSensor => "motion_sensor",
            ComponentKind::OccupancySensor => "occupancy_sensor",
            ComponentKind::ContactSensor => "contact_sensor",
            ComponentKind::Doorbell => "doorbell",
            ComponentKind::DisabledInput => "disabled_input",
        }
    }

    /// Service the component exposes; disabled components expose none
    pub fn service_kind(self) -> Option<ServiceKind> {
        match self {
            ComponentKind::Switch => Some(ServiceKind::Switch),
            ComponentKind::Outlet => Some(ServiceKind::Outlet),
            ComponentKind::Lock => Some(ServiceKind::LockMechanism),
            ComponentKind::Valve => Some(ServiceKind::Valve),
            ComponentKind::WindowCovering => Some(ServiceKind::WindowCovering),
            ComponentKind::GarageDoorOpener => Some(ServiceKind::GarageDoorOpener),
            ComponentKind::StatelessSwitch => Some(ServiceKind::StatelessProgrammableSwitch),
            ComponentKind::MotionSensor => Some(ServiceKind::MotionSensor),
            ComponentKind::OccupancySensor => Some(ServiceKind::OccupancySensor),
            ComponentKind::ContactSensor => Some(ServiceKind::ContactSensor),
            ComponentKind::Doorbell => Some(ServiceKind::Doorbell),
            ComponentKind::DisabledSwitch | ComponentKind::DisabledInput => None,
        }
    }

    /// Category the primary accessory takes when this component owns it
    pub fn category(self) -> Category {
        match self {
            ComponentKind::Switch => Category::Switches,
            ComponentKind::Outlet => Category::Outlets,
            ComponentKind::Lock => Category::Locks,
            ComponentKind::Valve => Category::Faucets,
            ComponentKind::WindowCovering => Category::WindowCoverings,
            ComponentKind::GarageDoorOpener => Category::GarageDoorOpeners,
            ComponentKind::StatelessSwitch => Category::ProgrammableSwitches,
            ComponentKind::MotionSensor
            | ComponentKind::OccupancySensor
            | ComponentKind::ContactSensor => Category::Sensors,
            ComponentKind::Doorbell => Category::VideoDoorbells,
            ComponentKind::DisabledSwitch | ComponentKind::DisabledInput => Category::Other,
        }
    }

    /// Base of the aid of the bridged accessory for this kind
    pub fn aid_base(self) -> Option<u64> {
        match self {
            ComponentKind::Switch => Some(accessory::SWITCH_AID_BASE),
            ComponentKind::Outlet => Some(accessory::OUTLET_AID_BASE),
            ComponentKind::Lock => Some(accessory::LOCK_AID_BASE),
            ComponentKind::Valve => Some(accessory::VALVE_AID_BASE),
            ComponentKind::WindowCovering => Some(accessory::WINDOW_COVERING_AID_BASE),
            ComponentKind::GarageDoorOpener => Some(accessory::GARAGE_DOOR_OPENER_AID_BASE),
            ComponentKind::StatelessSwitch => Some(accessory::STATELESS_SWITCH_AID_BASE),
            ComponentKind::MotionSensor => Some(accessory::MOTION_SENSOR_AID_BASE),
            ComponentKind::OccupancySensor => Some(accessory::OCCUPANCY_SENSOR_AID_BASE),
            ComponentKind::ContactSensor => Some(accessory::CONTACT_SENSOR_AID_BASE),
            ComponentKind::Doorbell => Some(accessory::DOORBELL_AID_BASE),
            ComponentKind::DisabledSwitch | ComponentKind::DisabledInput => None,
        }
    }
}

/// A unit of business logic bound to physical channels
pub trait Component: Debug + Send {
    /// Component id; equal to the id of the channel it is named after
    fn id(&self) -> ChannelId;

    /// Concrete kind
    fn kind(&self) -> ComponentKind;

    /// Service name
    fn name(&self) -> &str;

    /// Verify bindings and bring the component to its initial state
    fn init(&mut self) -> Result<()>;

    /// Whether the component owns the primary accessory
    fn is_primary(&self) -> bool;

    /// Mark the component as owning the primary accessory
    fn set_primary(&mut self, primary: bool);

    /// Inputs whose events this component handles
    fn consumed_inputs(&self) -> Vec<ChannelId>;

    /// Outputs this component drives
    fn bound_outputs(&self) -> Vec<ChannelId>;

    /// Whether power readings are available to the component
    fn has_metering(&self) -> bool {
        false
    }

    /// Service the component exposes, if any
    fn service(&self) -> Option<Service> {
        self.kind()
            .service_kind()
            .map(|kind| Service::backed_by(kind, self.kind(), self.id()))
    }
}
