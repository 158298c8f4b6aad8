// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: element identifiers, flags, and gesture vocabularies.

use core::fmt;

/// Identifier for an interactive element (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}v{}", self.0, self.1)
    }
}

bitflags::bitflags! {
    /// Element state and capability flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is visible. Invisible elements are never focusable.
        const VISIBLE       = 0b0000_0001;
        /// Element is enabled. Disabled elements are never focusable.
        const ENABLED       = 0b0000_0010;
        /// Reachable by pointer only; skipped by Tab cycling.
        const POINTER_ONLY  = 0b0000_0100;
        /// Reachable by keyboard only; never bound to pointer input.
        const KEYBOARD_ONLY = 0b0000_1000;
        /// Dwell activation applies to this element even when it is off globally.
        const DWELL         = 0b0001_0000;
        /// Element owns a child context. Set by the stage, not by callers.
        const GROUP         = 0b0010_0000;
        /// Invisible edge sentinel used to leave a group. Set by the stage.
        const SENTINEL      = 0b0100_0000;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::ENABLED
    }
}

/// How a pointer drag is being held.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DragType {
    /// Button or finger held down for the whole drag.
    Held,
    /// A click armed the drag; the next click ends it.
    StickyClick,
    /// A tap armed the drag; the next unclaimed tap ends it.
    StickyTap,
    /// Driven by keys rather than a pointer (drag controllers only).
    Keyboard,
}

impl DragType {
    /// Whether the drag continues without a held button.
    pub fn is_sticky(self) -> bool {
        matches!(self, Self::StickyClick | Self::StickyTap)
    }
}

/// Which pointer gestures turn into drags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DragStrategy {
    /// Clicks only.
    #[default]
    None,
    /// Every press starts a held drag immediately; never clicks.
    DragOnly,
    /// Mouse: a click arms a sticky drag, the next click ends it; movement
    /// past the threshold while held drags normally. Touch behaves like
    /// [`DragStrategy::DragOrClick`].
    DragWithStickyClick,
    /// Movement past the threshold turns the press into a held drag;
    /// otherwise the release is a click.
    DragOrClick,
    /// Like [`DragStrategy::DragWithStickyClick`], and touch taps arm a
    /// sticky tap drag as well.
    DragWithStickyClickTap,
}

impl DragStrategy {
    /// Whether a press that moves past the threshold becomes a held drag.
    pub fn converts_movement(self) -> bool {
        matches!(
            self,
            Self::DragOrClick | Self::DragWithStickyClick | Self::DragWithStickyClickTap
        )
    }

    /// The sticky drag a stationary release arms, if any.
    pub fn sticky_kind(self, kind: crate::PointerKind) -> Option<DragType> {
        use crate::PointerKind;
        match (self, kind) {
            (Self::DragWithStickyClick | Self::DragWithStickyClickTap, PointerKind::Mouse | PointerKind::Pen) => {
                Some(DragType::StickyClick)
            }
            (Self::DragWithStickyClickTap, PointerKind::Touch) => Some(DragType::StickyTap),
            _ => None,
        }
    }
}

/// How Enter/Space on a focused element are reported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyStrategy {
    /// Release of the key activates the element.
    #[default]
    Click,
    /// Press and release are reported as key start/stop; no activation.
    Hold,
}

/// Where the current focus came from. Drives focus-ring styling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FocusSource {
    /// Mouse or pen.
    Pointer,
    /// Touch.
    Touch,
    /// Keyboard navigation or programmatic focus.
    Keyboard,
}

impl FocusSource {
    /// Whether the focus came from a pointer device of any kind.
    pub fn is_pointer(self) -> bool {
        !matches!(self, Self::Keyboard)
    }

    /// CSS class naming this focus source on the proxy element.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Pointer => "veil-focus-pointer",
            Self::Touch => "veil-focus-touch",
            Self::Keyboard => "veil-focus-keyboard",
        }
    }
}
