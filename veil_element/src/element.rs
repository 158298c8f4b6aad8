// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interactive element state machine.
//!
//! An [`InteractiveElement`] receives normalized pointer samples and key
//! events and turns them into a small vocabulary of [`ElementEvent`]s:
//! focus/blur, activation, key start/stop, and drag start/move/stop/cancel.
//!
//! ## Pointer gestures
//!
//! ```text
//!            down (claimed)                 move past threshold
//!   Idle ───────────────────▶ Pressed ───────────────────────────▶ Dragging(Held)
//!    ▲                          │  up: sticky strategy ──────────▶ Dragging(Sticky*)
//!    │                          │  up: otherwise → Activate if hit
//!    └──────────────────────────┘
//!   Dragging ── up / second click / free tap ──▶ DragStop ──▶ Idle
//! ```
//!
//! [`DragStrategy::DragOnly`] skips `Pressed` and starts a held drag on the
//! press itself.
//!
//! Pointer ids are arbitrated by [`PointerClaims`]: an element only reacts to
//! a pointer it owns, except that a sticky tap drag also completes on a tap
//! whose id nobody owns.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::fmt;

use kurbo::{Point, Rect};
use smallvec::{SmallVec, smallvec};
use veil_keyboard::KeyEvent;

use crate::claims::PointerClaims;
use crate::geometry::ElementGeometry;
use crate::input::{PointerId, PointerSample};
use crate::press::Press;
use crate::types::{DragStrategy, DragType, ElementFlags, ElementId, KeyStrategy};

/// Semantic event emitted by an element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ElementEvent {
    /// The element gained focus.
    Focus {
        /// Whether focus came from a pointer or touch device.
        from_pointer: bool,
    },
    /// The element lost focus.
    Blur {
        /// Whether the focus change came from a pointer or touch device.
        from_pointer: bool,
    },
    /// The element was activated. `position` is set for pointer activation
    /// and `None` for keyboard, dwell and programmatic activation.
    Activate {
        /// Scene position of the click or tap.
        position: Option<Point>,
    },
    /// An activation key went down on an element with [`KeyStrategy::Hold`].
    KeyStart,
    /// The held activation key went up, or focus left while it was held.
    KeyStop,
    /// A pointer drag started.
    DragStart {
        /// Scene position where the drag is anchored.
        position: Point,
        /// How the drag is held.
        kind: DragType,
    },
    /// The pointer moved during a drag.
    DragMove {
        /// Scene position.
        position: Point,
        /// How the drag is held.
        kind: DragType,
    },
    /// The drag ended normally.
    DragStop {
        /// Scene position of the release.
        position: Point,
        /// How the drag was held.
        kind: DragType,
    },
    /// The drag was aborted by the platform (pointer cancel).
    DragCancel,
}

/// Events produced by one input on one element.
pub type ElementEvents = SmallVec<[ElementEvent; 2]>;

/// Static configuration of an element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementConfig {
    /// Accessible label.
    pub label: String,
    /// ARIA role of the proxy.
    pub role: String,
    /// Visibility, enablement and reachability flags.
    pub flags: ElementFlags,
    /// Which pointer gestures become drags.
    pub drag: DragStrategy,
    /// How Enter/Space are reported.
    pub keys: KeyStrategy,
    /// Distance a press must travel before it counts as a drag.
    pub min_drag_distance: f64,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            role: String::from("button"),
            flags: ElementFlags::default(),
            drag: DragStrategy::None,
            keys: KeyStrategy::Click,
            min_drag_distance: 5.0,
        }
    }
}

impl ElementConfig {
    /// A visible, enabled button labelled `label`.
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Set the ARIA role.
    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    /// Set the drag strategy.
    pub fn drag(mut self, drag: DragStrategy) -> Self {
        self.drag = drag;
        self
    }

    /// Set the key strategy.
    pub fn keys(mut self, keys: KeyStrategy) -> Self {
        self.keys = keys;
        self
    }

    /// Set the minimum drag distance.
    pub fn min_drag_distance(mut self, distance: f64) -> Self {
        self.min_drag_distance = distance;
        self
    }

    /// Reachable by pointer only.
    pub fn pointer_only(mut self) -> Self {
        self.flags.insert(ElementFlags::POINTER_ONLY);
        self
    }

    /// Reachable by keyboard only.
    pub fn keyboard_only(mut self) -> Self {
        self.flags.insert(ElementFlags::KEYBOARD_ONLY);
        self
    }

    /// Opt into dwell activation.
    pub fn dwell(mut self) -> Self {
        self.flags.insert(ElementFlags::DWELL);
        self
    }

    /// Start hidden.
    pub fn hidden(mut self) -> Self {
        self.flags.remove(ElementFlags::VISIBLE);
        self
    }

    /// Start disabled.
    pub fn disabled(mut self) -> Self {
        self.flags.remove(ElementFlags::ENABLED);
        self
    }
}

/// An in-progress pointer drag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragSession {
    /// Pointer that started the drag.
    pub pointer: PointerId,
    /// How the drag is held.
    pub kind: DragType,
    /// Most recent position.
    pub last_position: Point,
}

#[derive(Clone, Debug, PartialEq)]
enum Gesture {
    Idle,
    Pressed(Press),
    Dragging(DragSession),
}

/// One focusable, optionally draggable, proxy element.
pub struct InteractiveElement {
    id: ElementId,
    config: ElementConfig,
    geometry: Box<dyn ElementGeometry>,
    gesture: Gesture,
    key_armed: bool,
    key_held: bool,
    focused: bool,
}

impl fmt::Debug for InteractiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveElement")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("gesture", &self.gesture)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl InteractiveElement {
    /// Create an element. Normally done through an element store.
    pub fn new(id: ElementId, config: ElementConfig, geometry: Box<dyn ElementGeometry>) -> Self {
        Self {
            id,
            config,
            geometry,
            gesture: Gesture::Idle,
            key_armed: false,
            key_held: false,
            focused: false,
        }
    }

    /// This element's id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Configuration.
    pub fn config(&self) -> &ElementConfig {
        &self.config
    }

    /// Accessible label.
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Replace the accessible label.
    pub fn set_label(&mut self, label: &str) {
        self.config.label = label.to_string();
    }

    /// ARIA role.
    pub fn role(&self) -> &str {
        &self.config.role
    }

    /// Current flags.
    pub fn flags(&self) -> ElementFlags {
        self.config.flags
    }

    /// Set or clear a flag.
    pub fn set_flag(&mut self, flag: ElementFlags, on: bool) {
        self.config.flags.set(flag, on);
    }

    /// Drag strategy.
    pub fn drag_strategy(&self) -> DragStrategy {
        self.config.drag
    }

    /// Change the drag strategy. Takes effect on the next press.
    pub fn set_drag_strategy(&mut self, drag: DragStrategy) {
        self.config.drag = drag;
    }

    /// Whether the element is visible.
    pub fn is_visible(&self) -> bool {
        self.config.flags.contains(ElementFlags::VISIBLE)
    }

    /// Whether the element is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.flags.contains(ElementFlags::ENABLED)
    }

    /// `visible && enabled`.
    pub fn is_focusable(&self) -> bool {
        self.is_visible() && self.is_enabled()
    }

    /// Focusable and not pointer-only.
    pub fn is_tabbable(&self) -> bool {
        self.is_focusable() && !self.config.flags.contains(ElementFlags::POINTER_ONLY)
    }

    /// Whether pointer input is bound to this element. Groups route pointer
    /// input to their children instead.
    pub fn accepts_pointer(&self) -> bool {
        self.is_focusable()
            && !self.config.flags.intersects(
                ElementFlags::KEYBOARD_ONLY | ElementFlags::GROUP | ElementFlags::SENTINEL,
            )
    }

    /// Whether the element owns a child context.
    pub fn is_group(&self) -> bool {
        self.config.flags.contains(ElementFlags::GROUP)
    }

    /// Whether the element is an exit sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.config.flags.contains(ElementFlags::SENTINEL)
    }

    /// Whether the element currently has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Current bounds.
    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    /// Whether `point` hits the element.
    pub fn hit_test(&self, point: Point) -> bool {
        self.geometry.hit_test(point)
    }

    /// Whether the backing object is visible in the scene.
    pub fn world_visible(&self) -> bool {
        self.geometry.world_visible()
    }

    /// Let the geometry adapter refresh itself.
    pub fn update_position(&mut self) {
        self.geometry.update_position();
    }

    /// Replace the geometry adapter.
    pub fn set_geometry(&mut self, geometry: Box<dyn ElementGeometry>) {
        self.geometry = geometry;
    }

    /// The in-progress drag, if any.
    pub fn drag_session(&self) -> Option<&DragSession> {
        match &self.gesture {
            Gesture::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// Whether a pointer is physically held on this element (pressed, or a
    /// held drag). Sticky drags do not count.
    pub fn is_pointer_held(&self) -> bool {
        match &self.gesture {
            Gesture::Idle => false,
            Gesture::Pressed(_) => true,
            Gesture::Dragging(session) => session.kind == DragType::Held,
        }
    }

    /// Whether a press or drag is in progress.
    pub fn has_gesture(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Handle a pointer press that hit this element.
    pub fn pointer_down(&mut self, sample: &PointerSample, claims: &mut PointerClaims) -> ElementEvents {
        if !self.accepts_pointer() || self.has_gesture() {
            return ElementEvents::new();
        }
        if !claims.claim(sample.pointer, self.id) {
            return ElementEvents::new();
        }
        tracing::trace!(id = %self.id, pointer = ?sample.pointer, "pointer down");
        if self.config.drag == DragStrategy::DragOnly {
            self.gesture = Gesture::Dragging(DragSession {
                pointer: sample.pointer,
                kind: DragType::Held,
                last_position: sample.position,
            });
            return smallvec![ElementEvent::DragStart {
                position: sample.position,
                kind: DragType::Held,
            }];
        }
        self.gesture = Gesture::Pressed(Press::new(sample));
        ElementEvents::new()
    }

    /// Handle pointer movement. Delivered to every element with a gesture.
    pub fn pointer_move(&mut self, sample: &PointerSample, claims: &PointerClaims) -> ElementEvents {
        let id = self.id;
        let strategy = self.config.drag;
        let min_distance = self.config.min_drag_distance;
        match &mut self.gesture {
            Gesture::Idle => ElementEvents::new(),
            Gesture::Pressed(press) => {
                if press.pointer != sample.pointer {
                    return ElementEvents::new();
                }
                let exceeded = press.on_move(sample.position, min_distance);
                if !(exceeded && strategy.converts_movement()) {
                    return ElementEvents::new();
                }
                let anchor = press.down_position;
                self.gesture = Gesture::Dragging(DragSession {
                    pointer: sample.pointer,
                    kind: DragType::Held,
                    last_position: sample.position,
                });
                tracing::trace!(%id, "press became a held drag");
                smallvec![
                    ElementEvent::DragStart {
                        position: anchor,
                        kind: DragType::Held,
                    },
                    ElementEvent::DragMove {
                        position: sample.position,
                        kind: DragType::Held,
                    },
                ]
            }
            Gesture::Dragging(session) => {
                if !session_accepts(session, id, sample.pointer, claims) {
                    return ElementEvents::new();
                }
                session.last_position = sample.position;
                smallvec![ElementEvent::DragMove {
                    position: sample.position,
                    kind: session.kind,
                }]
            }
        }
    }

    /// Handle a pointer release. Delivered to every element with a gesture.
    pub fn pointer_up(&mut self, sample: &PointerSample, claims: &mut PointerClaims) -> ElementEvents {
        let id = self.id;
        match &self.gesture {
            Gesture::Idle => ElementEvents::new(),
            Gesture::Pressed(press) => {
                if press.pointer != sample.pointer {
                    return ElementEvents::new();
                }
                if let Some(kind) = self.config.drag.sticky_kind(press.kind) {
                    // A tap's id ends with the tap; the drag is finished by a later, unowned tap.
                    if kind == DragType::StickyTap {
                        claims.release(sample.pointer, id);
                    }
                    self.gesture = Gesture::Dragging(DragSession {
                        pointer: sample.pointer,
                        kind,
                        last_position: sample.position,
                    });
                    tracing::trace!(%id, ?kind, "sticky drag armed");
                    return smallvec![ElementEvent::DragStart {
                        position: sample.position,
                        kind,
                    }];
                }
                claims.release(sample.pointer, id);
                self.gesture = Gesture::Idle;
                if self.hit_test(sample.position) {
                    smallvec![ElementEvent::Activate {
                        position: Some(sample.position),
                    }]
                } else {
                    ElementEvents::new()
                }
            }
            Gesture::Dragging(session) => {
                if !session_accepts(session, id, sample.pointer, claims) {
                    return ElementEvents::new();
                }
                let kind = session.kind;
                let pointer = session.pointer;
                claims.release(pointer, id);
                self.gesture = Gesture::Idle;
                tracing::trace!(%id, ?kind, "drag stopped");
                smallvec![ElementEvent::DragStop {
                    position: sample.position,
                    kind,
                }]
            }
        }
    }

    /// Handle a platform pointer cancel for `pointer`.
    pub fn pointer_cancel(&mut self, pointer: PointerId, claims: &mut PointerClaims) -> ElementEvents {
        match &self.gesture {
            Gesture::Pressed(press) if press.pointer == pointer => {
                claims.release(pointer, self.id);
                self.gesture = Gesture::Idle;
                ElementEvents::new()
            }
            Gesture::Dragging(session) if session.pointer == pointer && claims.is_owned_by(pointer, self.id) => {
                claims.release(pointer, self.id);
                self.gesture = Gesture::Idle;
                smallvec![ElementEvent::DragCancel]
            }
            _ => ElementEvents::new(),
        }
    }

    /// Abort any press or drag without emitting events. Returns whether a
    /// drag was in progress.
    pub fn cancel_drag(&mut self, claims: &mut PointerClaims) -> bool {
        let was_dragging = matches!(self.gesture, Gesture::Dragging(_));
        match &self.gesture {
            Gesture::Idle => return false,
            Gesture::Pressed(press) => claims.release(press.pointer, self.id),
            Gesture::Dragging(session) => claims.release(session.pointer, self.id),
        }
        self.gesture = Gesture::Idle;
        if was_dragging {
            tracing::debug!(id = %self.id, "drag cancelled");
        }
        was_dragging
    }

    /// Remove the in-progress drag so it can be adopted by another element.
    /// The pointer claim is left untouched for the caller to transfer.
    pub fn take_drag(&mut self) -> Option<DragSession> {
        let Gesture::Dragging(session) = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        Some(session)
    }

    /// Continue a drag taken from another element.
    ///
    /// Emits [`ElementEvent::DragStart`] at the session's last position so
    /// controllers bound to this element can initialise. Refused when this
    /// element already has a gesture.
    pub fn adopt_drag(&mut self, session: DragSession) -> ElementEvents {
        if self.has_gesture() {
            return ElementEvents::new();
        }
        self.gesture = Gesture::Dragging(session);
        smallvec![ElementEvent::DragStart {
            position: session.last_position,
            kind: session.kind,
        }]
    }

    /// Handle a key-down while focused. Returns whether the key was consumed.
    pub fn key_down(&mut self, event: &KeyEvent) -> (bool, ElementEvents) {
        if !event.is_activation() || !event.modifiers.is_empty() || !self.is_enabled() {
            return (false, ElementEvents::new());
        }
        if event.repeat || self.key_armed || self.key_held {
            return (true, ElementEvents::new());
        }
        match self.config.keys {
            KeyStrategy::Hold => {
                self.key_held = true;
                (true, smallvec![ElementEvent::KeyStart])
            }
            KeyStrategy::Click => {
                self.key_armed = true;
                (true, ElementEvents::new())
            }
        }
    }

    /// Handle a key-up while focused. Returns whether the key was consumed.
    pub fn key_up(&mut self, event: &KeyEvent) -> (bool, ElementEvents) {
        if !event.is_activation() {
            return (false, ElementEvents::new());
        }
        if self.key_held {
            self.key_held = false;
            return (true, smallvec![ElementEvent::KeyStop]);
        }
        if self.key_armed {
            self.key_armed = false;
            return (true, smallvec![ElementEvent::Activate { position: None }]);
        }
        (false, ElementEvents::new())
    }

    /// Mark the element focused.
    pub fn focus(&mut self, from_pointer: bool) -> ElementEvent {
        self.focused = true;
        ElementEvent::Focus { from_pointer }
    }

    /// Mark the element blurred. A held activation key is stopped.
    pub fn blur(&mut self, from_pointer: bool) -> ElementEvents {
        self.focused = false;
        self.key_armed = false;
        let mut events = smallvec![ElementEvent::Blur { from_pointer }];
        if self.key_held {
            self.key_held = false;
            events.push(ElementEvent::KeyStop);
        }
        events
    }

    /// Activation without a pointer position (dwell, programmatic).
    pub fn activate(&self) -> ElementEvent {
        ElementEvent::Activate { position: None }
    }

    /// Release everything this element holds. Safe to call repeatedly.
    pub fn dispose(&mut self, claims: &mut PointerClaims) {
        self.gesture = Gesture::Idle;
        self.key_armed = false;
        self.key_held = false;
        self.focused = false;
        claims.release_all(self.id);
    }
}

fn session_accepts(
    session: &DragSession,
    id: ElementId,
    pointer: PointerId,
    claims: &PointerClaims,
) -> bool {
    if session.kind == DragType::StickyTap {
        return claims.is_owned_by(pointer, id) || claims.is_free(pointer);
    }
    pointer == session.pointer && claims.is_owned_by(pointer, id)
}
