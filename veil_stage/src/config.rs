// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stage configuration.

/// How the stage treats the Tab key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TabControl {
    /// Tab and Shift+Tab always cycle the composed list.
    #[default]
    Managed,
    /// Tab cycles the composed list until Escape releases the lock; while
    /// released, Tab is left to the host (native browser tabbing). Any focus
    /// change locks again.
    LockedIn,
}

/// How keyboard users leave an entered group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum GroupExit {
    /// Only Escape leaves a group.
    #[default]
    EscapeOnly,
    /// The group's list is bracketed with invisible sentinels; tabbing onto
    /// either one leaves the group and refocuses the group element.
    ExitOnEdge,
}

/// Construction-time options for a stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StageConfig {
    /// Tab key policy.
    pub tab_control: TabControl,
    /// Group exit policy.
    pub group_exit: GroupExit,
    /// Dwell activation for every element, not just those flagged for it.
    pub dwell: bool,
    /// Time focus must rest on an element before dwell activates it.
    pub dwell_delay_ms: u64,
    /// Interacting with an element that is reachable only through the
    /// extended family pops (or enters) contexts until it is tabbable.
    pub auto_pop_on_parent_interaction: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            tab_control: TabControl::Managed,
            group_exit: GroupExit::EscapeOnly,
            dwell: false,
            dwell_delay_ms: 2000,
            auto_pop_on_parent_interaction: false,
        }
    }
}
