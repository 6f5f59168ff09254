/*!
 * Accessories and services.
 *
 * An accessory is a named, categorized group of services announced by the
 * accessory server. The pre-existing primary accessory (aid 1) decides how
 * the whole device is classified; every other accessory is bridged behind it.
 *
 * The server itself lives outside this crate. Accessories only keep a
 * [`ServerHandle`] so their identify callback can be routed to it.
 */
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use relayflow_core::types::{AccessoryId, ChannelId};

use crate::component::ComponentKind;

/// Accessory id base for bridged switches
pub const SWITCH_AID_BASE: u64 = 0x100;
/// Accessory id base for bridged outlets
pub const OUTLET_AID_BASE: u64 = 0x200;
/// Accessory id base for bridged locks
pub const LOCK_AID_BASE: u64 = 0x300;
/// Accessory id base for stateless programmable switches
pub const STATELESS_SWITCH_AID_BASE: u64 = 0x400;
/// Accessory id base for bridged window coverings
pub const WINDOW_COVERING_AID_BASE: u64 = 0x500;
/// Accessory id base for bridged garage door openers
pub const GARAGE_DOOR_OPENER_AID_BASE: u64 = 0x600;
/// Accessory id base for motion sensors
pub const MOTION_SENSOR_AID_BASE: u64 = 0x800;
/// Accessory id base for occupancy sensors
pub const OCCUPANCY_SENSOR_AID_BASE: u64 = 0x900;
/// Accessory id base for contact sensors
pub const CONTACT_SENSOR_AID_BASE: u64 = 0xa00;
/// Accessory id base for bridged valves
pub const VALVE_AID_BASE: u64 = 0xb00;
/// Accessory id base for doorbells
pub const DOORBELL_AID_BASE: u64 = 0xc00;

/// Accessory category, numbered as the accessory protocol announces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Accessory behind a bridge
    BridgedAccessory = 0,
    /// Anything without a better category
    Other = 1,
    /// Bridge
    Bridges = 2,
    /// Garage door opener
    GarageDoorOpeners = 4,
    /// Lock
    Locks = 6,
    /// Outlet
    Outlets = 7,
    /// Switch
    Switches = 8,
    /// Sensor
    Sensors = 10,
    /// Window covering
    WindowCoverings = 14,
    /// Programmable switch
    ProgrammableSwitches = 15,
    /// Video doorbell
    VideoDoorbells = 18,
    /// Faucet (valves)
    Faucets = 29,
}

impl Category {
    /// Protocol code of the category
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Kind of service an accessory carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Accessory information (name, firmware, identify)
    AccessoryInformation,
    /// Switch
    Switch,
    /// Outlet
    Outlet,
    /// Lock mechanism
    LockMechanism,
    /// Valve
    Valve,
    /// Window covering
    WindowCovering,
    /// Garage door opener
    GarageDoorOpener,
    /// Stateless programmable switch
    StatelessProgrammableSwitch,
    /// Motion sensor
    MotionSensor,
    /// Occupancy sensor
    OccupancySensor,
    /// Contact sensor
    ContactSensor,
    /// Doorbell
    Doorbell,
}

/// A service exposed on an accessory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Service {
    /// Service kind
    pub kind: ServiceKind,
    /// Component that backs the service, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<(ComponentKind, ChannelId)>,
}

impl Service {
    /// The accessory information service
    pub fn info() -> Self {
        Self {
            kind: ServiceKind::AccessoryInformation,
            component: None,
        }
    }

    /// A service backed by a component
    pub fn backed_by(kind: ServiceKind, component: ComponentKind, id: ChannelId) -> Self {
        Self {
            kind,
            component: Some((component, id)),
        }
    }
}

/// Accessory server, as seen by the accessories it hosts
pub trait AccessoryServer: Send + Sync {
    /// Handle an identify request for an accessory
    fn identify(&self, aid: AccessoryId, name: &str);
}

/// Server that answers identify requests by logging them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingServer;

impl AccessoryServer for LoggingServer {
    fn identify(&self, aid: AccessoryId, name: &str) {
        info!(aid = %aid, "=== IDENTIFY {} ===", name);
    }
}

/// Shared handle to the accessory server
#[derive(Clone)]
pub struct ServerHandle(Arc<dyn AccessoryServer>);

impl ServerHandle {
    /// Wrap a server
    pub fn new(server: Arc<dyn AccessoryServer>) -> Self {
        Self(server)
    }

    /// Handle to a [`LoggingServer`]
    pub fn logging() -> Self {
        Self(Arc::new(LoggingServer))
    }

    /// Whether two handles point at the same server
    pub fn same_server(&self, other: &ServerHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerHandle").finish_non_exhaustive()
    }
}

/// A named, categorized group of services
#[derive(Debug, Clone, Serialize)]
pub struct Accessory {
    aid: AccessoryId,
    category: Category,
    name: String,
    services: Vec<Service>,
    #[serde(skip)]
    server: ServerHandle,
}

impl Accessory {
    /// The primary accessory: aid 1, announced as a bridge until a primary
    /// component claims it
    pub fn primary<S: Into<String>>(name: S, server: ServerHandle) -> Self {
        Self {
            aid: AccessoryId::PRIMARY,
            category: Category::Bridges,
            name: name.into(),
            services: vec![Service::info()],
            server,
        }
    }

    /// A bridged accessory carrying the accessory information service
    pub fn bridged<S: Into<String>>(aid: AccessoryId, name: S, server: ServerHandle) -> Self {
        Self {
            aid,
            category: Category::BridgedAccessory,
            name: name.into(),
            services: vec![Service::info()],
            server,
        }
    }

    /// Accessory id
    pub fn aid(&self) -> AccessoryId {
        self.aid
    }

    /// Category
    pub fn category(&self) -> Category {
        self.category
    }

    /// Name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Services, in the order they were added
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Add a service
    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    /// Whether a service of `kind` is present
    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.services.iter().any(|s| s.kind == kind)
    }

    /// Identify callback, routed to the server this accessory belongs to
    pub fn identify(&self) {
        self.server.0.identify(self.aid, &self.name);
    }

    /// Server handle the accessory was created with
    pub fn server(&self) -> &ServerHandle {
        &self.server
    }
}

/// Ordered accessory collection; the primary accessory always comes first
#[derive(Debug, Clone)]
pub struct AccessorySet {
    primary: Accessory,
    primary_owner: Option<(ComponentKind, ChannelId)>,
    bridged: Vec<Accessory>,
}

impl AccessorySet {
    /// Start a collection from the primary accessory
    pub fn new(primary: Accessory) -> Self {
        Self {
            primary,
            primary_owner: None,
            bridged: Vec::new(),
        }
    }

    /// The primary accessory
    pub fn primary(&self) -> &Accessory {
        &self.primary
    }

    /// Component that claimed the primary accessory, if any
    pub fn primary_owner(&self) -> Option<(ComponentKind, ChannelId)> {
        self.primary_owner
    }

    /// Narrow mutable access to the primary accessory
    pub fn primary_slot(&mut self) -> PrimarySlot<'_> {
        PrimarySlot { set: self }
    }

    /// Append a bridged accessory
    pub fn push_bridged(&mut self, accessory: Accessory) {
        self.bridged.push(accessory);
    }

    /// Bridged accessories, in creation order
    pub fn bridged(&self) -> &[Accessory] {
        &self.bridged
    }

    /// All accessories, primary first
    pub fn iter(&self) -> impl Iterator<Item = &Accessory> {
        std::iter::once(&self.primary).chain(self.bridged.iter())
    }

    /// Find an accessory by aid
    pub fn find(&self, aid: AccessoryId) -> Option<&Accessory> {
        self.iter().find(|a| a.aid() == aid)
    }

    /// Number of accessories, primary included
    pub fn len(&self) -> usize {
        1 + self.bridged.len()
    }

    /// Always false: the primary accessory is always present
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Mutable view of the primary accessory.
///
/// Only the category and the service list can change; the aid and name of
/// the primary accessory are fixed by the server runtime.
pub struct PrimarySlot<'a> {
    set: &'a mut AccessorySet,
}

impl PrimarySlot<'_> {
    /// Record `kind`/`id` as the owner of the primary accessory.
    ///
    /// Returns true if this call made the component the owner, false if the
    /// accessory was already claimed.
    pub fn claim(&mut self, kind: ComponentKind, id: ChannelId) -> bool {
        if self.set.primary_owner.is_some() {
            return false;
        }
        self.set.primary_owner = Some((kind, id));
        true
    }

    /// Overwrite the category
    pub fn set_category(&mut self, category: Category) {
        self.set.primary.category = category;
    }

    /// Append a service
    pub fn add_service(&mut self, service: Service) {
        self.set.primary.add_service(service);
    }

    /// Current category
    pub fn category(&self) -> Category {
        self.set.primary.category
    }
}
