/*!
 * Prelude module for RelayFlow Core.
 *
 * This module re-exports commonly used types and functions from the RelayFlow Core crate
 * to make them easier to import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export identifiers
pub use crate::types::{AccessoryId, ChannelId};

// Re-export event types
pub use crate::event::{emit_to, BootEvent, BootEventKind, EventBus, SharedEventBus, Stage};

// Re-export config types
pub use crate::config::{
    Config, ConfigBuilder, CoveringConfig, GarageDoorConfig, InputConfig, SharedConfig,
    SwitchConfig,
};

// Re-export logging helpers
pub use crate::logging::{channel_span, stage_span};
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::logging::init;
