// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed signals published by a stage.

use alloc::string::String;

use kurbo::Point;
use veil_element::{DragType, ElementEvent, ElementId};

use crate::behavior::BehaviorId;

/// Event published by a drag controller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragEvent {
    /// A drag started (for sticky drags: was armed).
    Started {
        /// Publishing controller.
        controller: BehaviorId,
        /// Dragged element.
        target: ElementId,
        /// How the drag is held.
        kind: DragType,
    },
    /// The target should move so that its bounds' origin is at `position`.
    Moved {
        /// Publishing controller.
        controller: BehaviorId,
        /// Dragged element.
        target: ElementId,
        /// New origin of the target's bounds.
        position: Point,
    },
    /// The drag finished. `drop` is the index of the drop area hit, for
    /// controllers that have drop areas.
    Completed {
        /// Publishing controller.
        controller: BehaviorId,
        /// Dragged element.
        target: ElementId,
        /// Drop area index.
        drop: Option<usize>,
    },
    /// The drag finished outside every drop area.
    Failed {
        /// Publishing controller.
        controller: BehaviorId,
        /// Dragged element.
        target: ElementId,
    },
    /// The drag was cancelled; the target should return to where it started.
    Cancelled {
        /// Publishing controller.
        controller: BehaviorId,
        /// Dragged element.
        target: ElementId,
    },
}

impl DragEvent {
    /// The controller that published the event.
    pub fn controller(&self) -> BehaviorId {
        match *self {
            Self::Started { controller, .. }
            | Self::Moved { controller, .. }
            | Self::Completed { controller, .. }
            | Self::Failed { controller, .. }
            | Self::Cancelled { controller, .. } => controller,
        }
    }

    /// The dragged element.
    pub fn target(&self) -> ElementId {
        match *self {
            Self::Started { target, .. }
            | Self::Moved { target, .. }
            | Self::Completed { target, .. }
            | Self::Failed { target, .. }
            | Self::Cancelled { target, .. } => target,
        }
    }
}

/// Everything a stage publishes to behaviors and to the application.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// An element emitted a semantic event.
    Element {
        /// Source element.
        id: ElementId,
        /// The event.
        event: ElementEvent,
    },
    /// A drag controller published an event.
    Drag(DragEvent),
    /// A focus context was pushed, or replaced in place by name.
    ContextPushed {
        /// Context name.
        name: String,
    },
    /// A focus context was removed from the stack.
    ContextPopped {
        /// Context name.
        name: String,
    },
    /// Escape released the Tab lock; the host should let Tab through.
    TabReleased,
    /// Frame tick. Delivered to behaviors only, never queued for
    /// [`Stage::poll_event`](crate::Stage::poll_event).
    Tick {
        /// Current time in milliseconds.
        now: u64,
        /// Time since the previous tick.
        delta: u64,
    },
}

impl Signal {
    /// The element event, if this signal carries one for `id`.
    pub fn element_event(&self, id: ElementId) -> Option<&ElementEvent> {
        match self {
            Self::Element { id: source, event } if *source == id => Some(event),
            _ => None,
        }
    }
}
