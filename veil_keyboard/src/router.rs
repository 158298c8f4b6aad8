// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layered key-binding router.
//!
//! ## Model
//!
//! The router owns one **global** layer plus a stack of named **context**
//! layers. At any time the active bindings are the topmost context layer and
//! the global layer:
//!
//! - A key-down first matches the top layer. If any binding there matches,
//!   the key is consumed and global bindings for the same key do not fire.
//! - Otherwise the global layer is consulted. Global bindings are therefore
//!   always reachable unless a context deliberately shadows them.
//! - Lower context layers are dormant until the layers above them are popped.
//!
//! Bindings carry opaque actions of type `A`; the router returns them and the
//! host decides what they mean. It never runs callbacks itself.
//!
//! ## Key-up pairing
//!
//! Every binding that fires on key-down is remembered until the matching
//! key-up, which then fires that binding's `on_up` action. Pairing is by key
//! (or code), not by the full combo, so releasing Shift before the letter
//! still delivers the up action.
//!
//! ```
//! use veil_keyboard::{KeyCombo, KeyEvent, KeyboardRouter};
//!
//! let mut router: KeyboardRouter<&'static str> = KeyboardRouter::new();
//! router.bind_global(KeyCombo::key_only("escape"), Some("close"), None);
//!
//! let menu = router.push_context("menu");
//! router.bind(menu, KeyCombo::key_only("escape"), Some("back"), None);
//!
//! // The context shadows the global binding…
//! assert_eq!(router.key_down(&KeyEvent::new("Escape")).actions.as_slice(), &["back"]);
//! router.key_up(&KeyEvent::new("Escape"));
//!
//! // …until it is popped.
//! router.pop_context(None, false);
//! assert_eq!(router.key_down(&KeyEvent::new("Escape")).actions.as_slice(), &["close"]);
//! ```

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::combo::{KeyCombo, KeyEvent};

/// Handle of a context layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(u32);

/// Handle of a single binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(u32);

/// Whether an action fired on key-down or key-up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    /// Key pressed (including auto-repeat).
    Down,
    /// Key released.
    Up,
}

/// Result of routing one key event.
#[derive(Clone, Debug)]
pub struct KeyDispatch<A> {
    /// Actions to run, in binding order.
    pub actions: SmallVec<[A; 2]>,
    /// Whether any binding matched, even one without an action for this phase.
    pub matched: bool,
}

impl<A> Default for KeyDispatch<A> {
    fn default() -> Self {
        Self {
            actions: SmallVec::new(),
            matched: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Binding<A> {
    id: BindingId,
    combo: KeyCombo,
    on_down: Option<A>,
    on_up: Option<A>,
}

#[derive(Clone, Debug)]
struct Layer<A> {
    id: LayerId,
    name: String,
    bindings: Vec<Binding<A>>,
}

impl<A> Layer<A> {
    fn new(id: LayerId, name: String) -> Self {
        Self {
            id,
            name,
            bindings: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct Held {
    key: String,
    code: String,
    binding: BindingId,
}

/// Key-binding dispatcher with a global layer and a stack of named contexts.
#[derive(Clone, Debug)]
pub struct KeyboardRouter<A> {
    global: Layer<A>,
    stack: Vec<Layer<A>>,
    held: Vec<Held>,
    next_layer: u32,
    next_binding: u32,
    next_quick: u32,
}

impl<A: Clone> Default for KeyboardRouter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> KeyboardRouter<A> {
    /// Create a router with an empty global layer and no contexts.
    pub fn new() -> Self {
        Self {
            global: Layer::new(LayerId(0), String::from("global")),
            stack: Vec::new(),
            held: Vec::new(),
            next_layer: 1,
            next_binding: 0,
            next_quick: 0,
        }
    }

    /// The global layer's handle. Bindings added to it stay active regardless
    /// of the context stack.
    pub fn global(&self) -> LayerId {
        self.global.id
    }

    /// Bind a combo in the global layer.
    pub fn bind_global(&mut self, combo: KeyCombo, on_down: Option<A>, on_up: Option<A>) -> BindingId {
        let id = self.alloc_binding();
        self.global.bindings.push(Binding {
            id,
            combo,
            on_down,
            on_up,
        });
        id
    }

    /// Push a named context layer and return its handle.
    ///
    /// If a layer with this name is already on the stack, every layer above
    /// it is popped and its bindings are cleared, so the name is reused in
    /// place instead of duplicated.
    pub fn push_context(&mut self, name: &str) -> LayerId {
        if let Some(i) = self.stack.iter().position(|l| l.name == name) {
            self.stack.truncate(i + 1);
            let layer = &mut self.stack[i];
            layer.bindings.clear();
            tracing::debug!(name, "reset keyboard context");
            return layer.id;
        }
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.stack.push(Layer::new(id, name.to_string()));
        tracing::debug!(name, depth = self.stack.len(), "pushed keyboard context");
        id
    }

    /// Push an anonymous context that lives until [`Self::remove_layer`].
    pub fn add_quick_context(&mut self) -> LayerId {
        let name = format!("quick-{}", self.next_quick);
        self.next_quick += 1;
        self.push_context(&name)
    }

    /// Bind a combo in `layer`. Returns `None` if the layer no longer exists.
    pub fn bind(
        &mut self,
        layer: LayerId,
        combo: KeyCombo,
        on_down: Option<A>,
        on_up: Option<A>,
    ) -> Option<BindingId> {
        let id = BindingId(self.next_binding);
        let target = if layer == self.global.id {
            &mut self.global
        } else {
            self.stack.iter_mut().find(|l| l.id == layer)?
        };
        target.bindings.push(Binding {
            id,
            combo,
            on_down,
            on_up,
        });
        self.next_binding += 1;
        Some(id)
    }

    /// Remove a binding. Unknown ids are ignored.
    pub fn unbind(&mut self, binding: BindingId) {
        for layer in core::iter::once(&mut self.global).chain(self.stack.iter_mut()) {
            layer.bindings.retain(|b| b.id != binding);
        }
        self.held.retain(|h| h.binding != binding);
    }

    /// Pop context layers.
    ///
    /// - `name == None` pops exactly the top layer.
    /// - `name == Some(n)` truncates the stack to just above `n` when
    ///   `keep_named` is true, or removes `n` as well when it is false.
    ///   Unknown names are a no-op.
    ///
    /// Returns the number of layers removed.
    pub fn pop_context(&mut self, name: Option<&str>, keep_named: bool) -> usize {
        let before = self.stack.len();
        match name {
            None => {
                self.stack.pop();
            }
            Some(name) => {
                let Some(i) = self.stack.iter().position(|l| l.name == name) else {
                    return 0;
                };
                self.stack.truncate(if keep_named { i + 1 } else { i });
            }
        }
        let removed = before - self.stack.len();
        if removed > 0 {
            self.forget_dead_held();
            tracing::debug!(removed, depth = self.stack.len(), "popped keyboard contexts");
        }
        removed
    }

    /// Remove one layer wherever it sits in the stack. Returns whether it
    /// existed; removing twice is a no-op.
    pub fn remove_layer(&mut self, layer: LayerId) -> bool {
        let Some(i) = self.stack.iter().position(|l| l.id == layer) else {
            return false;
        };
        let removed = self.stack.remove(i);
        self.forget_dead_held();
        tracing::debug!(name = %removed.name, "removed keyboard context");
        true
    }

    /// Name of the top context layer, if any.
    pub fn top(&self) -> Option<&str> {
        self.stack.last().map(|l| l.name.as_str())
    }

    /// Number of context layers (the global layer is not counted).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether a layer with this name is on the stack.
    pub fn contains(&self, name: &str) -> bool {
        self.stack.iter().any(|l| l.name == name)
    }

    /// Whether a layer handle is still live.
    pub fn is_live(&self, layer: LayerId) -> bool {
        layer == self.global.id || self.stack.iter().any(|l| l.id == layer)
    }

    /// Route a key-down.
    pub fn key_down(&mut self, event: &KeyEvent) -> KeyDispatch<A> {
        let mut out = KeyDispatch::default();
        let mut fired: SmallVec<[BindingId; 2]> = SmallVec::new();
        if let Some(top) = self.stack.last() {
            collect_down(top, event, &mut out, &mut fired);
        }
        if !out.matched {
            collect_down(&self.global, event, &mut out, &mut fired);
        }
        let key = event.normalized_key();
        let code = event.normalized_code();
        for binding in fired {
            if !self.held.iter().any(|h| h.binding == binding) {
                self.held.push(Held {
                    key: key.clone(),
                    code: code.clone(),
                    binding,
                });
            }
        }
        tracing::trace!(key = %key, matched = out.matched, actions = out.actions.len(), "key down");
        out
    }

    /// Route a key-up to the bindings whose key-down fired for the same key.
    pub fn key_up(&mut self, event: &KeyEvent) -> KeyDispatch<A> {
        let mut out = KeyDispatch::default();
        let key = event.normalized_key();
        let code = event.normalized_code();
        let mut released: SmallVec<[BindingId; 2]> = SmallVec::new();
        self.held.retain(|h| {
            let same = h.key == key || (!code.is_empty() && h.code == code);
            if same {
                released.push(h.binding);
            }
            !same
        });
        for id in released {
            if let Some(binding) = self.find_binding(id) {
                out.matched = true;
                if let Some(action) = &binding.on_up {
                    out.actions.push(action.clone());
                }
            }
        }
        tracing::trace!(key = %key, actions = out.actions.len(), "key up");
        out
    }

    /// Forget every held key without firing up actions (for example on window blur).
    pub fn clear_held(&mut self) {
        self.held.clear();
    }

    fn alloc_binding(&mut self) -> BindingId {
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        id
    }

    fn find_binding(&self, id: BindingId) -> Option<&Binding<A>> {
        core::iter::once(&self.global)
            .chain(self.stack.iter())
            .flat_map(|l| l.bindings.iter())
            .find(|b| b.id == id)
    }

    fn forget_dead_held(&mut self) {
        let live: Vec<BindingId> = core::iter::once(&self.global)
            .chain(self.stack.iter())
            .flat_map(|l| l.bindings.iter().map(|b| b.id))
            .collect();
        self.held.retain(|h| live.contains(&h.binding));
    }
}

fn collect_down<A: Clone>(
    layer: &Layer<A>,
    event: &KeyEvent,
    out: &mut KeyDispatch<A>,
    fired: &mut SmallVec<[BindingId; 2]>,
) {
    for binding in layer.bindings.iter().filter(|b| b.combo.matches(event)) {
        out.matched = true;
        fired.push(binding.id);
        if let Some(action) = &binding.on_down {
            out.actions.push(action.clone());
        }
    }
}
