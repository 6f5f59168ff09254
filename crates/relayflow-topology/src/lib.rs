/*!
 * RelayFlow Topology
 *
 * This crate turns a populated channel registry and the persisted
 * configuration into the component and accessory graph handed to the
 * accessory server: one of dual switch, roller shutter or garage door
 * opener, selected by the device mode.
 */

#![warn(missing_docs)]

// Re-export core types
pub use relayflow_core::prelude;

pub mod accessory;
pub mod builder;
pub mod component;
pub mod components;
pub mod error;
pub mod factory;
pub mod legacy;
pub mod mode;
pub mod topology;

// Re-export main types for convenience
pub use accessory::{Accessory, AccessoryServer, AccessorySet, Category, ServerHandle, Service, ServiceKind};
pub use builder::{build_topology, selected_mode, TopologyBuilder};
pub use component::{Component, ComponentKind};
pub use error::{Error, Result};
pub use factory::{BoxedComponent, ComponentFactory, StandardComponents};
pub use legacy::{SwitchLayout, SwitchPlan};
pub use mode::{DeviceMode, ModeTag};
pub use topology::{Topology, TopologyReport};

/// RelayFlow topology crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
