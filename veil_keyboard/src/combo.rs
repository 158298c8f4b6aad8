// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key events, modifier sets, and parsed key combinations.
//!
//! Key names follow the browser `KeyboardEvent.key` / `KeyboardEvent.code`
//! vocabulary and are compared after normalization: lowercased, with a
//! handful of aliases folded together (`" "` and `"spacebar"` become
//! `"space"`, `"esc"` becomes `"escape"`, `"left"` becomes `"arrowleft"`, …).
//!
//! A [`KeyCombo`] matches a [`KeyEvent`] when the modifier sets are equal and
//! the combo's key equals either the event's normalized `key` or its
//! normalized `code`. Matching on `code` is what lets `"numpad8"` bind the
//! physical numpad key regardless of `NumLock`.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

bitflags::bitflags! {
    /// Modifier keys held while a key event fires.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Either Shift key.
        const SHIFT = 0b0000_0001;
        /// Either Control key.
        const CTRL  = 0b0000_0010;
        /// Either Alt / Option key.
        const ALT   = 0b0000_0100;
        /// Either Meta / Command / Super key.
        const META  = 0b0000_1000;
    }
}

/// Normalize a key or code name for comparison.
pub fn normalize_key(name: &str) -> String {
    if name == " " {
        return String::from("space");
    }
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "spacebar" => String::from("space"),
        "esc" => String::from("escape"),
        "return" => String::from("enter"),
        "left" => String::from("arrowleft"),
        "right" => String::from("arrowright"),
        "up" => String::from("arrowup"),
        "down" => String::from("arrowdown"),
        "del" => String::from("delete"),
        _ => lower,
    }
}

/// A raw key event as delivered by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyEvent {
    /// Logical key (`KeyboardEvent.key`), for example `"a"`, `"Enter"`, `" "`.
    pub key: String,
    /// Physical key (`KeyboardEvent.code`), for example `"KeyA"`, `"Numpad8"`.
    /// Empty when unknown.
    pub code: String,
    /// Modifiers held during the event.
    pub modifiers: Modifiers,
    /// Whether this is an auto-repeat key-down.
    pub repeat: bool,
}

impl KeyEvent {
    /// Create an unmodified, non-repeating event for `key`.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    /// Set the physical key code.
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark the event as an auto-repeat.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Normalized logical key.
    pub fn normalized_key(&self) -> String {
        normalize_key(&self.key)
    }

    /// Normalized physical code, empty when the code is unknown.
    pub fn normalized_code(&self) -> String {
        if self.code.is_empty() {
            String::new()
        } else {
            normalize_key(&self.code)
        }
    }

    /// Whether this is one of the keys that activate a focused element
    /// (Enter or Space).
    pub fn is_activation(&self) -> bool {
        matches!(self.normalized_key().as_str(), "enter" | "space")
    }
}

/// Error returned when parsing a textual key combo.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyComboError {
    /// The input was empty or whitespace.
    #[error("key combo is empty")]
    Empty,
    /// A `+`-separated segment was empty (for example `"ctrl++a"`).
    #[error("key combo `{0}` has an empty segment")]
    EmptySegment(String),
    /// Only modifiers were named.
    #[error("key combo `{0}` names no key, only modifiers")]
    MissingKey(String),
    /// More than one non-modifier key was named.
    #[error("key combo `{0}` names more than one key")]
    MultipleKeys(String),
}

/// A key plus an exact modifier set.
///
/// ```
/// use veil_keyboard::{KeyCombo, KeyEvent, Modifiers};
///
/// let combo: KeyCombo = "shift+Tab".parse().unwrap();
/// assert_eq!(combo.key(), "tab");
/// assert_eq!(combo.modifiers(), Modifiers::SHIFT);
///
/// let ev = KeyEvent::new("Tab").with_modifiers(Modifiers::SHIFT);
/// assert!(combo.matches(&ev));
/// assert!(!combo.matches(&KeyEvent::new("Tab")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    key: String,
    modifiers: Modifiers,
}

impl KeyCombo {
    /// Create a combo from a key name and modifiers. The key is normalized.
    pub fn new(key: &str, modifiers: Modifiers) -> Self {
        Self {
            key: normalize_key(key),
            modifiers,
        }
    }

    /// Create an unmodified combo.
    pub fn key_only(key: &str) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// The normalized key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The required modifiers.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether `event` triggers this combo.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.modifiers == event.modifiers && self.matches_key(event)
    }

    /// Whether `event` names this combo's key, ignoring modifiers.
    pub fn matches_key(&self, event: &KeyEvent) -> bool {
        if self.key == event.normalized_key() {
            return true;
        }
        !event.code.is_empty() && self.key == event.normalized_code()
    }
}

impl FromStr for KeyCombo {
    type Err = ParseKeyComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseKeyComboError::Empty);
        }
        let mut modifiers = Modifiers::empty();
        let mut key: Option<String> = None;
        for part in s.split('+') {
            let part = part.trim();
            if part.is_empty() {
                return Err(ParseKeyComboError::EmptySegment(s.to_string()));
            }
            match part.to_ascii_lowercase().as_str() {
                "shift" => modifiers |= Modifiers::SHIFT,
                "ctrl" | "control" => modifiers |= Modifiers::CTRL,
                "alt" | "option" => modifiers |= Modifiers::ALT,
                "meta" | "cmd" | "command" | "super" => modifiers |= Modifiers::META,
                _ => {
                    if key.is_some() {
                        return Err(ParseKeyComboError::MultipleKeys(s.to_string()));
                    }
                    key = Some(normalize_key(part));
                }
            }
        }
        let key = key.ok_or_else(|| ParseKeyComboError::MissingKey(s.to_string()))?;
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CTRL, "ctrl"),
            (Modifiers::ALT, "alt"),
            (Modifiers::SHIFT, "shift"),
            (Modifiers::META, "meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn parses_modifiers_in_any_order() {
        let a: KeyCombo = "ctrl+shift+s".parse().unwrap();
        let b: KeyCombo = "Shift + Control + S".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.modifiers(), Modifiers::CTRL | Modifiers::SHIFT);
        assert_eq!(a.key(), "s");
    }

    #[test]
    fn rejects_malformed_combos() {
        assert_eq!("".parse::<KeyCombo>(), Err(ParseKeyComboError::Empty));
        assert!(matches!(
            "ctrl+".parse::<KeyCombo>(),
            Err(ParseKeyComboError::EmptySegment(_))
        ));
        assert!(matches!(
            "ctrl+shift".parse::<KeyCombo>(),
            Err(ParseKeyComboError::MissingKey(_))
        ));
        assert!(matches!(
            "a+b".parse::<KeyCombo>(),
            Err(ParseKeyComboError::MultipleKeys(_))
        ));
    }

    #[test]
    fn aliases_fold_together() {
        let esc: KeyCombo = "esc".parse().unwrap();
        assert!(esc.matches(&KeyEvent::new("Escape")));
        let space: KeyCombo = "space".parse().unwrap();
        assert!(space.matches(&KeyEvent::new(" ")));
        let left: KeyCombo = "left".parse().unwrap();
        assert!(left.matches(&KeyEvent::new("ArrowLeft")));
    }

    #[test]
    fn code_matching_covers_numpad() {
        let up = KeyCombo::key_only("numpad8");
        // NumLock off reports a navigation key, on reports a digit; the code is stable.
        assert!(up.matches(&KeyEvent::new("ArrowUp").with_code("Numpad8")));
        assert!(up.matches(&KeyEvent::new("8").with_code("Numpad8")));
        assert!(!up.matches(&KeyEvent::new("8").with_code("Digit8")));
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let tab = KeyCombo::key_only("tab");
        assert!(!tab.matches(&KeyEvent::new("Tab").with_modifiers(Modifiers::SHIFT)));
        assert!(tab.matches_key(&KeyEvent::new("Tab").with_modifiers(Modifiers::SHIFT)));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let combo: KeyCombo = "alt+ctrl+ArrowUp".parse().unwrap();
        let shown = format!("{combo}");
        assert_eq!(shown, "ctrl+alt+arrowup");
        assert_eq!(shown.parse::<KeyCombo>().unwrap(), combo);
    }

    #[test]
    fn activation_keys() {
        assert!(KeyEvent::new("Enter").is_activation());
        assert!(KeyEvent::new(" ").is_activation());
        assert!(!KeyEvent::new("a").is_activation());
    }
}
