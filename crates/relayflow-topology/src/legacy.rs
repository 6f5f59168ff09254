/*!
 * Legacy accessory layout.
 *
 * Devices upgraded from the pre-2.1 firmware announced both switches on the
 * primary accessory, switch 2 first. To keep their accessory database valid
 * the dual-switch branch reproduces that build order, then restores the
 * natural component order. A detached input on either switch always selects
 * the current layout.
 */
use serde::Serialize;

use relayflow_core::types::ChannelId;

use crate::mode::SwitchInMode;

/// How one switch is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchPlan {
    /// Switch channel
    pub id: ChannelId,
    /// Attach the service to the primary accessory instead of a bridged one
    pub to_primary: bool,
}

/// Build order of the two switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchLayout {
    /// Switches, in build order
    pub order: [SwitchPlan; 2],
    /// Reverse the component collection once both are built
    pub reverse_components: bool,
}

impl SwitchLayout {
    /// Decide the layout from the legacy flag and both switch input modes
    pub fn reconcile(legacy_layout: bool, in_modes: [SwitchInMode; 2]) -> Self {
        let detached = in_modes.iter().any(|m| m.is_detached());
        if legacy_layout && !detached {
            Self::legacy()
        } else {
            Self::current()
        }
    }

    /// Switch 2 then switch 1, both on the primary accessory, reversed after
    pub fn legacy() -> Self {
        Self {
            order: [plan(2, true), plan(1, true)],
            reverse_components: true,
        }
    }

    /// Switch 1 then switch 2, each on its own bridged accessory
    pub fn current() -> Self {
        Self {
            order: [plan(1, false), plan(2, false)],
            reverse_components: false,
        }
    }

    /// Whether this is the legacy layout
    pub fn is_legacy(&self) -> bool {
        self.reverse_components
    }
}

fn plan(id: u8, to_primary: bool) -> SwitchPlan {
    SwitchPlan {
        id: ChannelId::new(id),
        to_primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mode::SwitchInMode::{Detached, Momentary, Toggle};

    #[test]
    fn test_legacy_flag_without_detached() {
        let layout = SwitchLayout::reconcile(true, [Momentary, Toggle]);
        assert!(layout.is_legacy());
        assert_eq!(layout.order[0].id, ChannelId::new(2));
        assert_eq!(layout.order[1].id, ChannelId::new(1));
        assert!(layout.order.iter().all(|p| p.to_primary));
    }

    #[test]
    fn test_detached_overrides_flag() {
        for in_modes in [[Detached, Momentary], [Momentary, Detached], [Detached, Detached]] {
            let layout = SwitchLayout::reconcile(true, in_modes);
            assert_eq!(layout, SwitchLayout::current());
        }
    }

    #[test]
    fn test_no_flag_is_current() {
        let layout = SwitchLayout::reconcile(false, [Momentary, Momentary]);
        assert!(!layout.is_legacy());
        assert_eq!(layout.order[0].id, ChannelId::new(1));
        assert!(layout.order.iter().all(|p| !p.to_primary));
    }
}
