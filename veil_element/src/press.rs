// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Press tracking for click-versus-drag disambiguation.

use kurbo::Point;

use crate::input::{PointerId, PointerKind, PointerSample};

/// State for an active pointer press that has not become a drag yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Press {
    /// Pointer that pressed.
    pub pointer: PointerId,
    /// Device kind of that pointer.
    pub kind: PointerKind,
    /// Position at press time.
    pub down_position: Point,
    /// Timestamp of the press in milliseconds.
    pub down_time: u64,
    /// Most recent position seen for this pointer.
    pub last_position: Point,
    /// True once the pointer travelled past the drag threshold.
    pub distance_exceeded: bool,
}

impl Press {
    /// Start tracking a press.
    pub fn new(sample: &PointerSample) -> Self {
        Self {
            pointer: sample.pointer,
            kind: sample.kind,
            down_position: sample.position,
            down_time: sample.time,
            last_position: sample.position,
            distance_exceeded: false,
        }
    }

    /// Record movement to `position`.
    ///
    /// Returns `true` only on the move that first carries the pointer strictly
    /// further than `min_distance` from the press position.
    pub fn on_move(&mut self, position: Point, min_distance: f64) -> bool {
        self.last_position = position;
        if self.distance_exceeded {
            return false;
        }
        let moved = (position - self.down_position).hypot2();
        if moved > min_distance * min_distance {
            self.distance_exceeded = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_reports_once() {
        let sample = PointerSample::new(PointerId::MOUSE, PointerKind::Mouse, 10.0, 10.0);
        let mut press = Press::new(&sample);
        assert!(!press.on_move(Point::new(13.0, 14.0), 5.0)); // exactly 5px
        assert!(press.on_move(Point::new(16.0, 10.0), 5.0));
        assert!(!press.on_move(Point::new(30.0, 10.0), 5.0));
        assert_eq!(press.last_position, Point::new(30.0, 10.0));
    }
}
