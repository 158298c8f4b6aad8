// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Veil Drag: drag controllers for elements of a Veil stage.
//!
//! Each controller is a [`Behavior`](veil_stage::Behavior) attached to a
//! [`Stage`](veil_stage::Stage). It follows the drag events of one target
//! element and publishes [`DragEvent`](veil_stage::DragEvent)s carrying the
//! new origin of the target. The application owns the scene object and moves
//! it; the element's geometry is expected to follow.
//!
//! - [`StandardDrag`]: pointer drags, held or sticky.
//! - [`KeyboardFreeDrag`]: arrow, WASD and numpad movement after activation.
//! - [`UnifiedDrag`]: both of the above under one controller id.
//! - [`DropAreaDrag`]: drags that resolve to one of a set of drop targets,
//!   with a focus-driven keyboard mode.
//!
//! [`DragBounds`] constrains movement for all of them.
//!
//! ## Example
//!
//! ```
//! use kurbo::{Point, Rect};
//! use veil_drag::StandardDrag;
//! use veil_element::{DragStrategy, ElementConfig, PointerInput};
//! use veil_stage::{DragEvent, Signal, Stage, StageConfig};
//!
//! let mut stage = Stage::new(StageConfig::default());
//! let card = stage.create_element(
//!     ElementConfig::new("Card").drag(DragStrategy::DragOnly),
//!     Box::new(Rect::new(0.0, 0.0, 20.0, 30.0)),
//! );
//! stage.activate_context(vec![card], false);
//! let drag = stage.attach(StandardDrag::new(card));
//!
//! stage.pointer_down(PointerInput::mouse(5.0, 5.0));
//! stage.pointer_move(PointerInput::mouse(45.0, 5.0));
//! stage.pointer_up(PointerInput::mouse(45.0, 5.0));
//!
//! let moved = stage.drain_events().into_iter().find_map(|s| match s {
//!     Signal::Drag(DragEvent::Moved { position, .. }) => Some(position),
//!     _ => None,
//! });
//! assert_eq!(moved, Some(Point::new(40.0, 0.0)));
//! # let _ = drag;
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bounds;
mod drop_area;
mod keyboard;
mod standard;
mod unified;

pub use bounds::DragBounds;
pub use drop_area::{DropAreaDrag, DropTest};
pub use keyboard::{KeyMotion, KeyboardFreeDrag};
pub use standard::StandardDrag;
pub use unified::UnifiedDrag;
