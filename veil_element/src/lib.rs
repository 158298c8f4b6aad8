// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Veil Element: the interactive proxy element and its supporting pieces.
//!
//! An interactive element stands in for one object drawn on a canvas. It
//! holds visibility, enablement and reachability flags, a drag strategy, and
//! a geometry adapter, and translates low-level input into semantic events:
//!
//! - [`InteractiveElement`]: the per-element state machine.
//! - [`ElementStore`]: generational arena owning every element.
//! - [`PointerClaims`]: which element owns which pointer id, with deferred release.
//! - [`InputDevice`], [`PointerSample`]: one normalized id space for pointer,
//!   touch and mouse input.
//! - [`ElementGeometry`]: bounds and hit testing supplied by the rendering engine.
//!
//! Elements never talk to each other or to any focus logic directly; a stage
//! drives them and routes their [`ElementEvent`]s.
//!
//! ## Example
//!
//! ```
//! use kurbo::Rect;
//! use veil_element::{
//!     DragStrategy, ElementConfig, ElementEvent, ElementStore, PointerClaims, PointerId,
//!     PointerKind, PointerSample,
//! };
//!
//! let mut store = ElementStore::new();
//! let mut claims = PointerClaims::new();
//! let piece = store.insert(
//!     ElementConfig::new("Knight").drag(DragStrategy::DragOrClick),
//!     Box::new(Rect::new(0.0, 0.0, 40.0, 40.0)),
//! );
//!
//! let el = store.get_mut(piece).unwrap();
//! let at = |x, y| PointerSample::new(PointerId::MOUSE, PointerKind::Mouse, x, y);
//! el.pointer_down(&at(10.0, 10.0), &mut claims);
//! let events = el.pointer_move(&at(30.0, 10.0), &claims);
//! assert!(matches!(events[0], ElementEvent::DragStart { .. }));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod claims;
mod element;
mod geometry;
mod input;
mod press;
mod store;
mod types;

pub use claims::PointerClaims;
pub use element::{DragSession, ElementConfig, ElementEvent, ElementEvents, InteractiveElement};
pub use geometry::{ElementGeometry, NoGeometry, SharedBounds};
pub use input::{InputDevice, PointerId, PointerInput, PointerKind, PointerSample};
pub use press::Press;
pub use store::ElementStore;
pub use types::{DragStrategy, DragType, ElementFlags, ElementId, FocusSource, KeyStrategy};
