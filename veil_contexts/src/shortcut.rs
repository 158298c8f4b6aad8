// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shortcut-key context.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use veil_element::{ElementId, FocusSource};
use veil_keyboard::{KeyCombo, KeyPhase};
use veil_stage::{Behavior, BehaviorId, Disposables, Interaction, Outcome, Resource, Signal};

const ESCAPE_TAG: u32 = u32::MAX;

/// A list context where each item may have a key combo that focuses it
/// directly.
///
/// Shortcuts only apply while the context is on top. Optionally Escape pops
/// it.
#[derive(Debug)]
pub struct KeyboardShortcutContext {
    items: Vec<(ElementId, Option<KeyCombo>)>,
    escape_pops: bool,
    context: Option<String>,
    keys: Disposables,
}

impl KeyboardShortcutContext {
    /// A context over `items`, in tab order.
    pub fn new(items: Vec<(ElementId, Option<KeyCombo>)>) -> Self {
        Self {
            items,
            escape_pops: false,
            context: None,
            keys: Disposables::new(),
        }
    }

    /// Whether Escape pops the context.
    pub fn with_escape(mut self, pops: bool) -> Self {
        self.escape_pops = pops;
        self
    }

    /// The items and their shortcuts.
    pub fn items(&self) -> &[(ElementId, Option<KeyCombo>)] {
        &self.items
    }

    /// Name of the context currently filled.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    fn bind_keys(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let layer = cx.add_quick_key_context();
        for (index, (_, combo)) in self.items.iter().enumerate() {
            let Some(combo) = combo else {
                continue;
            };
            let Ok(tag) = u32::try_from(index) else {
                break;
            };
            cx.bind_key(layer, combo.clone(), me, tag);
        }
        if self.escape_pops {
            cx.bind_key(layer, KeyCombo::key_only("escape"), me, ESCAPE_TAG);
        }
        self.keys.add(Resource::KeyLayer(layer));
    }

    /// Shortcuts apply only while this context is on top.
    fn sync_keys(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let live = self.context.is_some() && cx.top_context() == self.context.as_deref();
        if live && self.keys.is_empty() {
            self.bind_keys(me, cx);
        } else if !live && !self.keys.is_empty() {
            self.keys.dispose(cx);
        }
    }
}

impl Behavior for KeyboardShortcutContext {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        if let Signal::ContextPushed { .. } | Signal::ContextPopped { .. } = signal {
            self.sync_keys(me, cx);
        }
        Outcome::Continue
    }

    fn on_key(&mut self, _me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        if phase != KeyPhase::Down {
            return;
        }
        if tag == ESCAPE_TAG {
            if let Some(context) = self.context.clone() {
                tracing::debug!(context = %context, "shortcut context dismissed");
                cx.pop_context(Some(&context), false);
            }
            return;
        }
        if let Some(&(id, _)) = self.items.get(tag as usize) {
            cx.focus(id, FocusSource::Keyboard);
        }
    }

    fn activate(&mut self, me: BehaviorId, context: &str, cx: &mut Interaction) {
        self.keys.dispose(cx);
        self.context = Some(context.to_string());
        let ids = self.items.iter().map(|(id, _)| *id).collect();
        cx.replace_current_context(Some(context), ids);
        self.bind_keys(me, cx);
    }

    fn deactivate(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        self.keys.dispose(cx);
        self.context = None;
    }

    fn context_members(&self) -> Vec<ElementId> {
        self.items.iter().map(|(id, _)| *id).collect()
    }

    fn dispose(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        self.keys.dispose(cx);
        self.context = None;
    }
}
