// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The four movement directions and the keys bound to them.

use crate::combo::KeyCombo;

/// A movement direction on screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards smaller y.
    Up,
    /// Towards larger y.
    Down,
    /// Towards smaller x.
    Left,
    /// Towards larger x.
    Right,
}

impl Direction {
    /// All directions, in [`Direction::index`] order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Position in [`Direction::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// Inverse of [`Direction::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Unit step as `(dx, dy)`.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Arrow, WASD and numpad key names for this direction.
    pub const fn keys(self) -> [&'static str; 3] {
        match self {
            Self::Up => ["arrowup", "w", "numpad8"],
            Self::Down => ["arrowdown", "s", "numpad2"],
            Self::Left => ["arrowleft", "a", "numpad4"],
            Self::Right => ["arrowright", "d", "numpad6"],
        }
    }

    /// Unmodified combos for [`Direction::keys`].
    pub fn combos(self) -> impl Iterator<Item = KeyCombo> {
        self.keys().into_iter().map(KeyCombo::key_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyEvent;

    #[test]
    fn numpad_binds_by_code() {
        let numpad = KeyEvent::new("8").with_code("Numpad8");
        assert!(Direction::Up.combos().any(|c| c.matches(&numpad)));
        assert!(!Direction::Down.combos().any(|c| c.matches(&numpad)));
        assert!(Direction::Left.combos().any(|c| c.matches(&KeyEvent::new("A"))));
    }

    #[test]
    fn index_round_trips() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(4), None);
    }
}
