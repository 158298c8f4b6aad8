// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Veil Keyboard: key combos and a layered key-binding router.
//!
//! - [`KeyEvent`] is the host's raw key event (`key`, `code`, modifiers, repeat flag).
//! - [`KeyCombo`] is a key plus an exact [`Modifiers`] set, parseable from
//!   strings such as `"shift+tab"` or `"ctrl+alt+numpad8"`.
//! - [`KeyboardRouter`] keeps a global layer and a stack of named context
//!   layers, maps key-down/key-up events to opaque actions, and supports
//!   quick (anonymous, dispose-on-demand) contexts and named truncation.
//! - [`Direction`] names the arrow, WASD and numpad keys used for movement.
//!
//! The router is independent of focus handling: a higher layer decides what
//! actions mean and when contexts are pushed or popped.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod combo;
mod direction;
mod router;

pub use combo::{KeyCombo, KeyEvent, Modifiers, ParseKeyComboError, normalize_key};
pub use direction::Direction;
pub use router::{BindingId, KeyDispatch, KeyPhase, KeyboardRouter, LayerId};
