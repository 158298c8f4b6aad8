// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Movement constraints shared by every drag controller.

use alloc::rc::Rc;
use core::fmt;

use kurbo::{Point, Rect, Size};

/// Where a dragged target may go.
///
/// Positions are the origin of the target's bounds.
#[derive(Clone, Default)]
pub enum DragBounds {
    /// Anywhere.
    #[default]
    Unbounded,
    /// Clamp so the target's bounds stay inside this rectangle. A target
    /// larger than the rectangle is pinned to its top-left corner.
    Rect(Rect),
    /// Veto any move the predicate rejects; the target stays put.
    Validate(Rc<dyn Fn(Point) -> bool>),
}

impl fmt::Debug for DragBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("Unbounded"),
            Self::Rect(rect) => f.debug_tuple("Rect").field(rect).finish(),
            Self::Validate(_) => f.write_str("Validate(..)"),
        }
    }
}

impl DragBounds {
    /// A validator from a closure.
    pub fn validate(f: impl Fn(Point) -> bool + 'static) -> Self {
        Self::Validate(Rc::new(f))
    }

    /// The allowed position for a target of `size` asked to move to
    /// `proposed`, or `None` if the move is vetoed.
    pub fn apply(&self, proposed: Point, size: Size) -> Option<Point> {
        match self {
            Self::Unbounded => Some(proposed),
            Self::Rect(area) => {
                let clamp = |v: f64, lo: f64, hi: f64| if hi < lo { lo } else { v.clamp(lo, hi) };
                Some(Point::new(
                    clamp(proposed.x, area.x0, area.x1 - size.width),
                    clamp(proposed.y, area.y0, area.y1 - size.height),
                ))
            }
            Self::Validate(accept) => accept(proposed).then_some(proposed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_clamps_the_whole_target() {
        let bounds = DragBounds::Rect(Rect::new(0.0, 0.0, 100.0, 50.0));
        let size = Size::new(20.0, 10.0);
        assert_eq!(bounds.apply(Point::new(95.0, -5.0), size), Some(Point::new(80.0, 0.0)));
        assert_eq!(bounds.apply(Point::new(10.0, 10.0), size), Some(Point::new(10.0, 10.0)));
        let huge = Size::new(200.0, 10.0);
        assert_eq!(bounds.apply(Point::new(30.0, 5.0), huge), Some(Point::new(0.0, 5.0)));
    }

    #[test]
    fn validator_vetoes() {
        let bounds = DragBounds::validate(|p| p.x >= 0.0);
        assert_eq!(bounds.apply(Point::new(-1.0, 0.0), Size::ZERO), None);
        assert_eq!(bounds.apply(Point::new(1.0, 0.0), Size::ZERO), Some(Point::new(1.0, 0.0)));
    }
}
