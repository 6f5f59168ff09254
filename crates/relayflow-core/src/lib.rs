/*!
 * RelayFlow Core
 *
 * This crate provides the ambient functionality shared by the RelayFlow
 * crates: the persisted configuration record, logging setup, error types,
 * channel and accessory identifiers, and the boot event bus.
 */

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod prelude;
pub mod types;

/// Re-export of dependencies that are part of the public API
pub mod deps {
    pub use anyhow;
    pub use chrono;
    pub use serde;
    pub use tokio;
    pub use tracing;
}

/// RelayFlow core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
