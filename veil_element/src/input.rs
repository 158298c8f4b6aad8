// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer input normalization.
//!
//! Hosts deliver whichever event family the platform supports: pointer
//! events where available, otherwise touch events, otherwise plain mouse
//! events. [`InputDevice`] records which family an event came from and
//! [`InputDevice::gesture_id`] collapses it to a single [`PointerId`] per
//! gesture, so the rest of the crate only deals with one id space.

use kurbo::Point;

/// Normalized identifier of one pointer gesture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub i64);

impl PointerId {
    /// The id used for legacy mouse events, which carry no identifier.
    pub const MOUSE: Self = Self(-1);
}

/// Touch identifiers are offset so they never collide with pointer ids.
const TOUCH_ID_BASE: i64 = 1 << 32;

/// Physical kind of pointing device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Mouse.
    Mouse,
    /// Pen or stylus.
    Pen,
    /// Finger on a touch surface.
    Touch,
}

/// Which browser event family produced an input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputDevice {
    /// Pointer events (`pointerId`, `pointerType`).
    Pointer {
        /// The event's `pointerId`.
        pointer_id: i32,
        /// The event's `pointerType`.
        kind: PointerKind,
    },
    /// Touch events; one entry of `changedTouches`.
    Touch {
        /// The touch's `identifier`.
        identifier: i32,
    },
    /// Legacy mouse events.
    Mouse,
}

impl InputDevice {
    /// The normalized gesture id.
    pub fn gesture_id(self) -> PointerId {
        match self {
            Self::Pointer { pointer_id, .. } => PointerId(i64::from(pointer_id)),
            Self::Touch { identifier } => PointerId(TOUCH_ID_BASE + i64::from(identifier)),
            Self::Mouse => PointerId::MOUSE,
        }
    }

    /// The device kind.
    pub fn kind(self) -> PointerKind {
        match self {
            Self::Pointer { kind, .. } => kind,
            Self::Touch { .. } => PointerKind::Touch,
            Self::Mouse => PointerKind::Mouse,
        }
    }
}

/// A raw pointer event in client (page) coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerInput {
    /// Event family and device id.
    pub device: InputDevice,
    /// Client-space position.
    pub client: Point,
    /// Event timestamp in milliseconds.
    pub time: u64,
}

impl PointerInput {
    /// Create an input at client position `(x, y)` with timestamp 0.
    pub fn new(device: InputDevice, x: f64, y: f64) -> Self {
        Self {
            device,
            client: Point::new(x, y),
            time: 0,
        }
    }

    /// Shorthand for a mouse event.
    pub fn mouse(x: f64, y: f64) -> Self {
        Self::new(InputDevice::Mouse, x, y)
    }

    /// Shorthand for a touch event.
    pub fn touch(identifier: i32, x: f64, y: f64) -> Self {
        Self::new(InputDevice::Touch { identifier }, x, y)
    }

    /// Set the timestamp.
    pub fn at(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Build the normalized sample once the client position has been mapped
    /// into scene coordinates.
    pub fn sample(&self, position: Point) -> PointerSample {
        PointerSample {
            pointer: self.device.gesture_id(),
            kind: self.device.kind(),
            position,
            time: self.time,
        }
    }
}

/// A normalized pointer sample in scene coordinates, as consumed by elements.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerSample {
    /// Gesture id.
    pub pointer: PointerId,
    /// Device kind.
    pub kind: PointerKind,
    /// Scene-space position.
    pub position: Point,
    /// Timestamp in milliseconds.
    pub time: u64,
}

impl PointerSample {
    /// Convenience constructor, mostly for tests and adapters.
    pub fn new(pointer: PointerId, kind: PointerKind, x: f64, y: f64) -> Self {
        Self {
            pointer,
            kind,
            position: Point::new(x, y),
            time: 0,
        }
    }
}
