// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry adapters connecting elements to the scene objects they stand for.
//!
//! Rendering engines implement [`ElementGeometry`] to report where the backing
//! object currently is. The default methods describe an element with no
//! geometry at all: empty bounds, never hit, always world-visible.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use kurbo::{Point, Rect};

/// Scene-space geometry of an interactive element.
pub trait ElementGeometry {
    /// Current bounds in scene coordinates.
    fn bounds(&self) -> Rect {
        Rect::ZERO
    }

    /// Whether `point` (scene coordinates) is inside the element.
    ///
    /// The default uses [`Self::bounds`]; adapters with non-rectangular
    /// shapes override it.
    fn hit_test(&self, point: Point) -> bool {
        let bounds = self.bounds();
        bounds.area() > 0.0 && bounds.contains(point)
    }

    /// Whether the backing object and all of its ancestors are visible in the
    /// scene. Proxies of world-invisible objects are not repositioned.
    fn world_visible(&self) -> bool {
        true
    }

    /// Called once per tick before [`Self::bounds`] is read, so adapters can
    /// pull fresh transforms from the engine.
    fn update_position(&mut self) {}
}

/// Geometry for elements that have no on-screen presence (menu entries read
/// out by a screen reader, sentinels).
#[derive(Copy, Clone, Debug, Default)]
pub struct NoGeometry;

impl ElementGeometry for NoGeometry {}

/// Shared, externally updated rectangle.
///
/// Clones share the same cell, so the game keeps one handle and writes the
/// object's bounds each frame while the element reads them.
#[derive(Clone, Default)]
pub struct SharedBounds {
    rect: Rc<Cell<Rect>>,
    visible: Rc<Cell<bool>>,
}

impl SharedBounds {
    /// Create shared bounds starting at `rect`, world-visible.
    pub fn new(rect: Rect) -> Self {
        Self {
            rect: Rc::new(Cell::new(rect)),
            visible: Rc::new(Cell::new(true)),
        }
    }

    /// Replace the rectangle.
    pub fn set(&self, rect: Rect) {
        self.rect.set(rect);
    }

    /// Read the rectangle.
    pub fn get(&self) -> Rect {
        self.rect.get()
    }

    /// Mark the backing object as shown or hidden in the scene.
    pub fn set_world_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

impl fmt::Debug for SharedBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBounds")
            .field("rect", &self.rect.get())
            .field("visible", &self.visible.get())
            .finish()
    }
}

impl ElementGeometry for SharedBounds {
    fn bounds(&self) -> Rect {
        self.rect.get()
    }

    fn world_visible(&self) -> bool {
        self.visible.get()
    }
}

impl ElementGeometry for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_is_never_hit() {
        assert!(!NoGeometry.hit_test(Point::ZERO));
        assert_eq!(NoGeometry.bounds(), Rect::ZERO);
    }

    #[test]
    fn shared_bounds_follow_writes() {
        let bounds = SharedBounds::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let view = bounds.clone();
        assert!(view.hit_test(Point::new(5.0, 5.0)));
        bounds.set(Rect::new(20.0, 0.0, 30.0, 10.0));
        assert!(!view.hit_test(Point::new(5.0, 5.0)));
        assert!(view.hit_test(Point::new(25.0, 5.0)));
        bounds.set_world_visible(false);
        assert!(!view.world_visible());
    }
}
