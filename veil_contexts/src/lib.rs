// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Veil Contexts: complex focus contexts for Veil stages.
//!
//! A complex context is a [`Behavior`](veil_stage::Behavior) that fills a
//! focus context when it is pushed and adds its own navigation on top of
//! Tab and Escape:
//!
//! - [`GridContext`]: a sparse 2D grid with arrow, WASD and numpad
//!   movement, tabbed flat or by row/column groups.
//! - [`KeyboardShortcutContext`]: a list whose items can be focused by
//!   their own key combo.
//!
//! Push either with [`ContextSpec::complex`](veil_stage::ContextSpec::complex),
//! or make it the child of a group element.
//!
//! ## Example
//!
//! ```
//! use veil_contexts::{GridContext, GridOptions};
//! use veil_element::{ElementConfig, FocusSource, NoGeometry};
//! use veil_keyboard::KeyEvent;
//! use veil_stage::{ContextSpec, Stage, StageConfig};
//!
//! let mut stage = Stage::new(StageConfig::default());
//! let mut cell = |name: &str| stage.create_element(ElementConfig::new(name), Box::new(NoGeometry));
//! let (a, b, c) = (cell("a"), cell("b"), cell("c"));
//!
//! let grid = stage.attach(GridContext::new(
//!     vec![vec![Some(a), Some(b)], vec![None, Some(c)]],
//!     GridOptions::default(),
//! ));
//! stage.activate_context(ContextSpec::complex(grid), false);
//!
//! stage.focus(a, FocusSource::Keyboard);
//! stage.key_down(&KeyEvent::new("ArrowRight"));
//! stage.key_down(&KeyEvent::new("ArrowDown"));
//! assert_eq!(stage.focused(), Some(c));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod grid;
mod shortcut;

pub use grid::{GridCells, GridContext, GridOptions, GridTabMode, target_cell};
pub use shortcut::KeyboardShortcutContext;
