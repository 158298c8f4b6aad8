// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The invisible DOM proxy surface and the renderer plugin.
//!
//! The stage keeps one [`ProxyEntry`] per element that is currently
//! reachable (tabbable or extended family). A host implements
//! [`ProxyLayer`] to mirror those entries as absolutely positioned,
//! focusable DOM elements with ARIA attributes; the stage itself never
//! touches a DOM.

use alloc::string::String;

use kurbo::{Point, Rect};
use smallvec::SmallVec;
use veil_element::{ElementId, FocusSource};

/// CSS class present on the proxy while a dwell activation is pending.
pub const DWELL_CLASS: &str = "veil-dwell";

/// One proxy element.
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyEntry {
    /// Element the proxy stands for.
    pub id: ElementId,
    /// `tabIndex`: 1-based position in the tab order, or -1 for entries
    /// reachable only by pointer.
    pub tab_index: i32,
    /// ARIA role.
    pub role: String,
    /// Accessible label.
    pub label: String,
    /// Screen rectangle, refreshed every tick.
    pub rect: Rect,
    /// Focus source when this proxy holds focus.
    pub focused: Option<FocusSource>,
    /// Whether a dwell activation is pending.
    pub dwelling: bool,
}

impl ProxyEntry {
    /// Whether Tab can reach this proxy.
    pub fn is_tabbable(&self) -> bool {
        self.tab_index > 0
    }

    /// CSS classes describing focus and dwell state.
    pub fn classes(&self) -> SmallVec<[&'static str; 2]> {
        let mut classes = SmallVec::new();
        if let Some(source) = self.focused {
            classes.push(source.class_name());
        }
        if self.dwelling {
            classes.push(DWELL_CLASS);
        }
        classes
    }
}

/// Host-side mirror of the proxy set.
pub trait ProxyLayer {
    /// The reachable set changed; `entries` is the complete new set in DOM order.
    fn sync(&mut self, entries: &[ProxyEntry]);

    /// One entry's rectangle, focus or dwell state changed.
    fn update(&mut self, entry: &ProxyEntry) {
        let _ = entry;
    }

    /// DOM focus should move to `id`, or be removed when `None`.
    fn focus(&mut self, id: Option<ElementId>) {
        let _ = id;
    }
}

/// A proxy layer that discards everything. Useful headless and in tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullProxyLayer;

impl ProxyLayer for NullProxyLayer {
    fn sync(&mut self, _entries: &[ProxyEntry]) {}
}

/// Coordinate mapping supplied by the rendering engine.
pub trait RendererPlugin {
    /// Convert browser client coordinates to scene coordinates.
    fn map_client_pos_to_point(&self, client: Point) -> Point;

    /// Flush pending transform computation before bounds are read.
    fn force_transform_update(&mut self) {}
}

/// Renderer whose scene coordinates are client coordinates.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityRenderer;

impl RendererPlugin for IdentityRenderer {
    fn map_client_pos_to_point(&self, client: Point) -> Point {
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use veil_element::{ElementConfig, ElementStore, NoGeometry};

    #[test]
    fn classes_reflect_focus_and_dwell() {
        let id = ElementStore::new().insert(ElementConfig::new("Play"), Box::new(NoGeometry));
        let mut entry = ProxyEntry {
            id,
            tab_index: 1,
            role: String::from("button"),
            label: String::from("Play"),
            rect: Rect::ZERO,
            focused: None,
            dwelling: false,
        };
        assert!(entry.classes().is_empty());
        entry.focused = Some(FocusSource::Touch);
        entry.dwelling = true;
        assert_eq!(entry.classes().as_slice(), &["veil-focus-touch", "veil-dwell"]);
    }
}
