// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Veil Stage: focus contexts, keyboard navigation and input routing for
//! accessible canvas scenes.
//!
//! A [`Stage`] owns the interactive elements of one scene and decides which
//! of them are reachable:
//!
//! - A stack of named **focus contexts** (menus, dialogs, boards). The top
//!   context, merged with an optional baseline, is the Tab order.
//! - **Groups**: an element with a child context. Activating it enters the
//!   child; Escape (or an edge sentinel) leaves it. Elements of enclosing
//!   contexts stay reachable by pointer as the *extended family*.
//! - **Behaviors**: typed subscribers that see every [`Signal`] in attach
//!   order. Drag controllers and complex contexts such as grids are behaviors.
//! - A **proxy set** mirrored into a host [`ProxyLayer`], one focusable
//!   stand-in per reachable element, so screen readers and native focus work.
//!
//! Input arrives as client-space pointer events, key events and frame ticks.
//! Each call runs to completion; surviving signals are read back with
//! [`Stage::poll_event`].
//!
//! ## Example
//!
//! ```
//! use kurbo::Rect;
//! use veil_element::{ElementConfig, ElementEvent, PointerInput};
//! use veil_keyboard::KeyEvent;
//! use veil_stage::{Signal, Stage, StageConfig};
//!
//! let mut stage = Stage::new(StageConfig::default());
//! let play = stage.create_element(
//!     ElementConfig::new("Play"),
//!     Box::new(Rect::new(0.0, 0.0, 100.0, 40.0)),
//! );
//! let quit = stage.create_element(
//!     ElementConfig::new("Quit"),
//!     Box::new(Rect::new(0.0, 50.0, 100.0, 90.0)),
//! );
//! stage.activate_context(vec![play, quit], false);
//!
//! // Tab moves focus; Enter activates on release.
//! stage.key_down(&KeyEvent::new("Tab"));
//! assert_eq!(stage.focused(), Some(play));
//!
//! // A click activates whatever it hits.
//! stage.pointer_down(PointerInput::mouse(10.0, 60.0));
//! stage.pointer_up(PointerInput::mouse(10.0, 60.0));
//! let activated = stage.drain_events().into_iter().any(|s| {
//!     s.element_event(quit)
//!         .is_some_and(|e| matches!(e, ElementEvent::Activate { .. }))
//! });
//! assert!(activated);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod behavior;
mod config;
mod context;
mod interaction;
mod navigation;
mod proxy;
mod signal;
mod stage;
mod timer;

pub use behavior::{Behavior, BehaviorId, Disposables, DragPhase, Outcome, Resource};
pub use config::{GroupExit, StageConfig, TabControl};
pub use context::{ChildContext, ContextSpec};
pub use interaction::{Interaction, KeyOutcome};
pub use proxy::{DWELL_CLASS, IdentityRenderer, NullProxyLayer, ProxyEntry, ProxyLayer, RendererPlugin};
pub use signal::{DragEvent, Signal};
pub use stage::Stage;
pub use timer::TimerId;
