// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interaction core: context stack, focus, proxies and input routing.
//!
//! [`Interaction`] owns every piece of mutable stage state except the
//! behaviors themselves. Behaviors receive `&mut Interaction` and drive the
//! stage through it; anything they trigger that needs a behavior (signals,
//! context hooks, key actions, timers) is queued as work and drained by the
//! [`Stage`](crate::Stage) before its input method returns.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::Point;
use veil_element::{
    ElementConfig, ElementEvent, ElementEvents, ElementFlags, ElementGeometry, ElementId,
    ElementStore, FocusSource, InteractiveElement, NoGeometry, PointerClaims, PointerId,
    PointerInput, PointerKind,
};
use veil_keyboard::{BindingId, KeyCombo, KeyEvent, KeyPhase, KeyboardRouter, LayerId, Modifiers};

use crate::behavior::BehaviorId;
use crate::config::{GroupExit, StageConfig, TabControl};
use crate::context::{
    Baseline, ChildContext, Composition, ContextSpec, FocusContext, GroupEntry, compose,
};
use crate::navigation::{Step, next_linear};
use crate::proxy::{ProxyEntry, ProxyLayer, RendererPlugin};
use crate::signal::Signal;
use crate::timer::{Scheduler, TimerId, TimerTarget};

/// Whether the host should treat a key event as consumed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyOutcome {
    /// The stage acted on the key; suppress the default action.
    Handled,
    /// Let the key through (for example native Tab after the lock is released).
    Unhandled,
}

impl KeyOutcome {
    /// Whether the key was handled.
    pub fn is_handled(self) -> bool {
        self == Self::Handled
    }
}

/// Action attached to a key binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Next,
    Prev,
    Escape,
    Behavior(BehaviorId, u32),
}

/// Deferred work drained by the stage.
#[derive(Clone, Debug)]
pub(crate) enum Work {
    Signal(Signal),
    Activate { behavior: BehaviorId, context: String },
    Deactivate { behavior: BehaviorId },
    FocusFirst { context: String },
    Key { behavior: BehaviorId, tag: u32, phase: KeyPhase },
    Timer { behavior: BehaviorId, tag: u32 },
}

fn focus_source(kind: PointerKind) -> FocusSource {
    match kind {
        PointerKind::Touch => FocusSource::Touch,
        PointerKind::Mouse | PointerKind::Pen => FocusSource::Pointer,
    }
}

/// Stage state reachable from behaviors.
pub struct Interaction {
    config: StageConfig,
    elements: ElementStore,
    pub(crate) claims: PointerClaims,
    keyboard: KeyboardRouter<KeyAction>,
    scheduler: Scheduler,
    stack: Vec<FocusContext>,
    baseline: Baseline,
    groups: HashMap<ElementId, GroupEntry>,
    sentinels: HashMap<ElementId, (ElementId, ElementId)>,
    composition: Composition,
    proxies: Vec<ProxyEntry>,
    focused: Option<(ElementId, FocusSource)>,
    dwell: Option<(ElementId, TimerId)>,
    locked: bool,
    pub(crate) renderer: Box<dyn RendererPlugin>,
    pub(crate) layer: Box<dyn ProxyLayer>,
    pub(crate) work: VecDeque<Work>,
    now: u64,
    last_tick: Option<u64>,
    next_context: u32,
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("config", &self.config)
            .field("elements", &self.elements)
            .field("contexts", &self.stack.iter().map(|c| c.name.as_str()).collect::<Vec<_>>())
            .field("tabbable", &self.composition.tabbable)
            .field("family", &self.composition.family)
            .field("focused", &self.focused)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl Interaction {
    pub(crate) fn new(
        config: StageConfig,
        renderer: Box<dyn RendererPlugin>,
        layer: Box<dyn ProxyLayer>,
    ) -> Self {
        let mut keyboard = KeyboardRouter::new();
        keyboard.bind_global(KeyCombo::key_only("tab"), Some(KeyAction::Next), None);
        keyboard.bind_global(KeyCombo::new("tab", Modifiers::SHIFT), Some(KeyAction::Prev), None);
        keyboard.bind_global(KeyCombo::key_only("escape"), Some(KeyAction::Escape), None);
        Self {
            config,
            elements: ElementStore::new(),
            claims: PointerClaims::new(),
            keyboard,
            scheduler: Scheduler::default(),
            stack: Vec::new(),
            baseline: Baseline::default(),
            groups: HashMap::new(),
            sentinels: HashMap::new(),
            composition: Composition::default(),
            proxies: Vec::new(),
            focused: None,
            dwell: None,
            locked: true,
            renderer,
            layer,
            work: VecDeque::new(),
            now: 0,
            last_tick: None,
            next_context: 0,
        }
    }

    pub(crate) fn set_layer(&mut self, layer: Box<dyn ProxyLayer>) {
        self.layer = layer;
        self.layer.sync(&self.proxies);
    }

    /// Configuration the stage was built with.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    // --- elements -----------------------------------------------------------

    /// Create an element. It becomes reachable once a context lists it.
    pub fn create_element(
        &mut self,
        config: ElementConfig,
        geometry: Box<dyn ElementGeometry>,
    ) -> ElementId {
        let mut config = config;
        config.flags.remove(ElementFlags::GROUP | ElementFlags::SENTINEL);
        self.elements.insert(config, geometry)
    }

    /// Destroy an element, releasing its pointer claims. Contexts that still
    /// list it skip it from now on. Returns `false` for stale ids.
    pub fn destroy_element(&mut self, id: ElementId) -> bool {
        let Some(mut element) = self.elements.remove(id) else {
            return false;
        };
        element.dispose(&mut self.claims);
        if self.focused_id() == Some(id) {
            self.focused = None;
            self.layer.focus(None);
        }
        if self.dwell.is_some_and(|(d, _)| d == id) {
            self.cancel_dwell();
        }
        self.groups.remove(&id);
        if let Some((start, end)) = self.sentinels.remove(&id) {
            self.elements.remove(start);
            self.elements.remove(end);
        }
        if self.composition.contains(id) {
            self.regenerate(true);
        }
        true
    }

    /// All elements.
    pub fn elements(&self) -> &ElementStore {
        &self.elements
    }

    /// One element.
    pub fn element(&self, id: ElementId) -> Option<&InteractiveElement> {
        self.elements.get(id)
    }

    /// One element, mutably. Flag changes made this way are not reflected in
    /// the proxy set until the next regeneration; prefer the setters below.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut InteractiveElement> {
        self.elements.get_mut(id)
    }

    /// Show or hide an element. Hiding drops focus and aborts gestures.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        self.set_state_flag(id, ElementFlags::VISIBLE, visible);
    }

    /// Enable or disable an element. Disabling drops focus and aborts gestures.
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) {
        self.set_state_flag(id, ElementFlags::ENABLED, enabled);
    }

    fn set_state_flag(&mut self, id: ElementId, flag: ElementFlags, on: bool) {
        let Some(element) = self.elements.get_mut(id) else {
            return;
        };
        element.set_flag(flag, on);
        if !on {
            element.cancel_drag(&mut self.claims);
            if self.focused_id() == Some(id) {
                self.clear_focus();
            }
        }
        if self.composition.contains(id) {
            self.regenerate(true);
        }
    }

    /// Give `item` a child context, making it a group, or clear it with `None`.
    ///
    /// Complex children registered here have no known members; the stage's
    /// own setter asks the behavior for them.
    pub fn set_child_context(&mut self, item: ElementId, child: Option<ChildContext>) {
        let entry = child.map(|child| {
            let members = match &child {
                ChildContext::Items(items) => items.clone(),
                ChildContext::Complex(_) => Vec::new(),
            };
            GroupEntry { child, members }
        });
        self.set_group(item, entry);
    }

    pub(crate) fn set_group(&mut self, item: ElementId, entry: Option<GroupEntry>) {
        let Some(element) = self.elements.get_mut(item) else {
            return;
        };
        element.set_flag(ElementFlags::GROUP, entry.is_some());
        match entry {
            Some(entry) => {
                element.cancel_drag(&mut self.claims);
                self.groups.insert(item, entry);
            }
            None => {
                self.groups.remove(&item);
            }
        }
        tracing::debug!(%item, group = self.groups.contains_key(&item), "child context set");
        self.regenerate(true);
    }

    /// The child context of a group element.
    pub fn child_context(&self, item: ElementId) -> Option<&ChildContext> {
        self.groups.get(&item).map(|g| &g.child)
    }

    // --- contexts -----------------------------------------------------------

    /// Push a context, or replace the one with the same name in place.
    ///
    /// Replacing pops every context above the existing entry. `as_child`
    /// links the context under the current top so the parent's elements stay
    /// reachable by pointer. Focus is cleared. Returns the context's name.
    pub fn activate_context(&mut self, spec: impl Into<ContextSpec>, as_child: bool) -> String {
        let spec = spec.into();
        let name = match spec.name {
            Some(name) => name,
            None => self.auto_name(),
        };
        let mut context = FocusContext {
            name: name.clone(),
            items: Vec::new(),
            allow_baseline: spec.allow_baseline,
            is_child: false,
            complex: spec.complex,
            owner: None,
            sentinels: None,
        };
        context.set_items(spec.items);
        self.push_context(context, as_child);
        name
    }

    fn auto_name(&mut self) -> String {
        loop {
            let name = format!("ctx-{}", self.next_context);
            self.next_context += 1;
            if !self.has_context(&name) {
                return name;
            }
        }
    }

    fn push_context(&mut self, mut context: FocusContext, as_child: bool) {
        if let Some(i) = self.stack.iter().position(|c| c.name == context.name) {
            self.truncate_stack(i + 1);
            let old = &self.stack[i];
            if old.complex.is_some() && old.complex != context.complex {
                if let Some(behavior) = old.complex {
                    self.work.push_back(Work::Deactivate { behavior });
                }
            }
            context.is_child = old.is_child || (as_child && i > 0);
            context.owner = context.owner.or(old.owner);
            context.sentinels = context.sentinels.or(old.sentinels);
            let items = core::mem::take(&mut context.items);
            context.set_items(items);
            tracing::debug!(name = %context.name, depth = i + 1, "context replaced in place");
            self.stack[i] = context;
        } else {
            context.is_child = as_child && !self.stack.is_empty();
            tracing::debug!(name = %context.name, depth = self.stack.len() + 1, child = context.is_child, "context pushed");
            self.stack.push(context);
        }
        let Some(top) = self.stack.last() else {
            return;
        };
        let name = top.name.clone();
        let complex = top.complex;
        self.emit(Signal::ContextPushed { name: name.clone() });
        self.regenerate(false);
        if let Some(behavior) = complex {
            self.work.push_back(Work::Activate {
                behavior,
                context: name,
            });
        }
    }

    /// Remove contexts above `len`, queueing their cleanup in removal order.
    fn truncate_stack(&mut self, len: usize) -> usize {
        if len >= self.stack.len() {
            return 0;
        }
        let removed = self.stack.split_off(len);
        let count = removed.len();
        for context in removed.into_iter().rev() {
            if let Some(behavior) = context.complex {
                self.work.push_back(Work::Deactivate { behavior });
            }
            tracing::debug!(name = %context.name, "context popped");
            self.emit(Signal::ContextPopped { name: context.name });
        }
        count
    }

    /// Pop contexts.
    ///
    /// `None` removes the top context. `Some(name)` truncates the stack to
    /// just above `name` when `keep_named` is set, or removes `name` too
    /// otherwise. Unknown names do nothing. Returns how many were removed.
    pub fn pop_context(&mut self, name: Option<&str>, keep_named: bool) -> usize {
        let cut = match name {
            None => match self.stack.len().checked_sub(1) {
                Some(cut) => cut,
                None => return 0,
            },
            Some(name) => match self.stack.iter().position(|c| c.name == name) {
                Some(i) if keep_named => i + 1,
                Some(i) => i,
                None => return 0,
            },
        };
        let removed = self.truncate_stack(cut);
        if removed > 0 {
            self.regenerate(false);
        }
        removed
    }

    /// Replace the items of the named context (or the top one) in place.
    ///
    /// Focus survives when the focused element is still reachable. Returns
    /// `false` when there is no such context.
    pub fn replace_current_context(&mut self, name: Option<&str>, items: Vec<ElementId>) -> bool {
        let index = match name {
            Some(name) => self.stack.iter().position(|c| c.name == name),
            None => self.stack.len().checked_sub(1),
        };
        let Some(index) = index else {
            return false;
        };
        self.stack[index].set_items(items);
        tracing::debug!(name = %self.stack[index].name, "context items replaced");
        // Only the top and the parents it is linked to feed the composition.
        if self.stack[index + 1..].iter().all(|c| c.is_child) {
            self.regenerate(true);
        }
        true
    }

    /// Set the elements merged around every context that allows the baseline.
    pub fn set_baseline(&mut self, prepend: Vec<ElementId>, append: Vec<ElementId>) {
        self.baseline = Baseline { prepend, append };
        self.regenerate(true);
    }

    /// Enter a group: push its child context (or `override_child`) linked
    /// under the current top, and focus its first element.
    ///
    /// Returns the generated context name, or `None` when `item` has no
    /// child context.
    pub fn enter_group(
        &mut self,
        item: ElementId,
        override_child: Option<ChildContext>,
    ) -> Option<String> {
        self.enter_group_inner(item, override_child, true)
    }

    fn enter_group_inner(
        &mut self,
        item: ElementId,
        override_child: Option<ChildContext>,
        focus_first: bool,
    ) -> Option<String> {
        if !self.elements.contains(item) {
            return None;
        }
        let child = match override_child {
            Some(child) => child,
            None => self.groups.get(&item)?.child.clone(),
        };
        let name = format!("group-{item}");
        let (items, complex) = match child {
            ChildContext::Items(items) => (items, None),
            ChildContext::Complex(behavior) => (Vec::new(), Some(behavior)),
        };
        let sentinels = match self.config.group_exit {
            GroupExit::ExitOnEdge => Some(self.sentinels_for(item)),
            GroupExit::EscapeOnly => None,
        };
        let mut context = FocusContext {
            name: name.clone(),
            items: Vec::new(),
            allow_baseline: false,
            is_child: true,
            complex,
            owner: Some(item),
            sentinels,
        };
        context.set_items(items);
        tracing::debug!(%item, name = %name, "entering group");
        self.push_context(context, true);
        if focus_first {
            if complex.is_some() {
                self.work.push_back(Work::FocusFirst {
                    context: name.clone(),
                });
            } else {
                self.focus_first(FocusSource::Keyboard);
            }
        }
        Some(name)
    }

    fn sentinels_for(&mut self, item: ElementId) -> (ElementId, ElementId) {
        if let Some(pair) = self.sentinels.get(&item) {
            return *pair;
        }
        let label = self
            .elements
            .get(item)
            .map(|e| format!("Leave {}", e.label()))
            .unwrap_or_default();
        let make = |elements: &mut ElementStore| {
            let id = elements.insert(ElementConfig::new(&label), Box::new(NoGeometry));
            if let Some(sentinel) = elements.get_mut(id) {
                sentinel.set_flag(ElementFlags::SENTINEL, true);
            }
            id
        };
        let pair = (make(&mut self.elements), make(&mut self.elements));
        self.sentinels.insert(item, pair);
        pair
    }

    /// Whether a context with this name is on the stack.
    pub fn has_context(&self, name: &str) -> bool {
        self.stack.iter().any(|c| c.name == name)
    }

    /// Name of the top context.
    pub fn top_context(&self) -> Option<&str> {
        self.stack.last().map(|c| c.name.as_str())
    }

    /// Context names from bottom to top.
    pub fn context_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.stack.iter().map(|c| c.name.as_str())
    }

    /// Number of contexts on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The group element a context was entered from.
    pub fn context_owner(&self, name: &str) -> Option<ElementId> {
        self.stack.iter().find(|c| c.name == name)?.owner
    }

    /// Items of a context, including sentinels.
    pub fn context_items(&self, name: &str) -> Option<&[ElementId]> {
        self.stack
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.items.as_slice())
    }

    /// The composed Tab order.
    pub fn tab_order(&self) -> &[ElementId] {
        &self.composition.tabbable
    }

    /// Elements reachable by pointer but not by Tab.
    pub fn family(&self) -> &[ElementId] {
        &self.composition.family
    }

    /// The proxy set, in DOM order.
    pub fn proxies(&self) -> &[ProxyEntry] {
        &self.proxies
    }

    /// The proxy for `id`, if it is reachable.
    pub fn proxy(&self, id: ElementId) -> Option<&ProxyEntry> {
        self.proxies.iter().find(|p| p.id == id)
    }

    fn regenerate(&mut self, keep_focus: bool) {
        self.composition = compose(&self.stack, &self.baseline, &self.groups, &self.elements);
        let keep = keep_focus
            && self
                .focused
                .is_some_and(|(id, _)| self.composition.contains(id));
        if !keep && self.focused.is_some() {
            self.clear_focus();
        }
        let mut proxies = Vec::with_capacity(self.composition.tabbable.len() + self.composition.family.len());
        let mut tab_index = 0;
        for &id in &self.composition.tabbable {
            let Some(element) = self.elements.get(id) else {
                continue;
            };
            if !element.is_visible() {
                continue;
            }
            let index = if element.is_tabbable() {
                tab_index += 1;
                tab_index
            } else {
                -1
            };
            proxies.push(self.entry_for(element, index));
        }
        for &id in &self.composition.family {
            if let Some(element) = self.elements.get(id).filter(|e| e.is_visible()) {
                proxies.push(self.entry_for(element, -1));
            }
        }
        self.proxies = proxies;
        self.layer.sync(&self.proxies);
        tracing::trace!(
            tabbable = self.composition.tabbable.len(),
            family = self.composition.family.len(),
            "proxies regenerated"
        );
    }

    fn entry_for(&self, element: &InteractiveElement, tab_index: i32) -> ProxyEntry {
        let id = element.id();
        ProxyEntry {
            id,
            tab_index,
            role: String::from(element.role()),
            label: String::from(element.label()),
            rect: element.bounds(),
            focused: self.focused.filter(|(f, _)| *f == id).map(|(_, s)| s),
            dwelling: self.dwell.is_some_and(|(d, _)| d == id),
        }
    }

    fn refresh_proxy(&mut self, id: ElementId) {
        let focused = self.focused.filter(|(f, _)| *f == id).map(|(_, s)| s);
        let dwelling = self.dwell.is_some_and(|(d, _)| d == id);
        if let Some(entry) = self.proxies.iter_mut().find(|p| p.id == id) {
            entry.focused = focused;
            entry.dwelling = dwelling;
            self.layer.update(entry);
        }
    }

    // --- focus --------------------------------------------------------------

    /// The focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.focused_id()
    }

    fn focused_id(&self) -> Option<ElementId> {
        self.focused.map(|(id, _)| id)
    }

    /// Where the current focus came from.
    pub fn focus_source(&self) -> Option<FocusSource> {
        self.focused.map(|(_, s)| s)
    }

    /// Whether Tab is currently intercepted.
    pub fn is_tab_locked(&self) -> bool {
        self.config.tab_control == TabControl::Managed || self.locked
    }

    /// Focus an element. Focusing an exit sentinel leaves its group instead.
    /// Returns `false` if the element is stale or not focusable.
    pub fn focus(&mut self, id: ElementId, source: FocusSource) -> bool {
        let Some(element) = self.elements.get(id) else {
            return false;
        };
        if !element.is_focusable() {
            return false;
        }
        if element.is_sentinel() {
            return self.exit_through_sentinel(id);
        }
        self.locked = true;
        if self.focused_id() == Some(id) {
            self.focused = Some((id, source));
            self.refresh_proxy(id);
            return true;
        }
        self.blur_current(source.is_pointer());
        self.focused = Some((id, source));
        if let Some(element) = self.elements.get_mut(id) {
            let event = element.focus(source.is_pointer());
            self.push_event(id, event);
        }
        self.start_dwell(id);
        self.refresh_proxy(id);
        self.layer.focus(Some(id));
        tracing::debug!(%id, ?source, "focused");
        true
    }

    /// Remove focus.
    pub fn clear_focus(&mut self) {
        if self.focused.is_some() {
            self.blur_current(false);
            self.layer.focus(None);
        }
    }

    fn blur_current(&mut self, from_pointer: bool) {
        let Some((previous, _)) = self.focused.take() else {
            return;
        };
        self.cancel_dwell();
        if let Some(element) = self.elements.get_mut(previous) {
            let events = element.blur(from_pointer);
            self.push_events(previous, events);
        }
        self.refresh_proxy(previous);
        tracing::trace!(id = %previous, "blurred");
    }

    /// Focus the first tabbable element of the composed list.
    pub fn focus_first(&mut self, source: FocusSource) -> Option<ElementId> {
        let target = self.composition.tabbable.iter().copied().find(|&id| {
            self.elements
                .get(id)
                .is_some_and(|e| e.is_tabbable() && !e.is_sentinel())
        })?;
        self.focus(target, source).then_some(target)
    }

    pub(crate) fn focus_first_in(&mut self, context: &str) {
        if self.top_context() == Some(context) {
            self.focus_first(FocusSource::Keyboard);
        }
    }

    /// Tab: focus the next tabbable element, wrapping around.
    pub fn next(&mut self) -> Option<ElementId> {
        self.step(Step::Forward)
    }

    /// Shift+Tab: focus the previous tabbable element, wrapping around.
    pub fn prev(&mut self) -> Option<ElementId> {
        self.step(Step::Backward)
    }

    fn step(&mut self, step: Step) -> Option<ElementId> {
        let elements = &self.elements;
        let origin = self
            .focused_id()
            .filter(|id| self.composition.tabbable.contains(id));
        // Without a focused origin Tab enters the list; edge sentinels only
        // exit when stepped onto from an item.
        let target = next_linear(&self.composition.tabbable, origin, step, |id| {
            elements
                .get(id)
                .is_some_and(|e| e.is_tabbable() && (origin.is_some() || !e.is_sentinel()))
        })?;
        self.focus(target, FocusSource::Keyboard);
        Some(target)
    }

    fn exit_through_sentinel(&mut self, sentinel: ElementId) -> bool {
        let Some(index) = self.stack.iter().rposition(|c| {
            c.sentinels
                .is_some_and(|(start, end)| start == sentinel || end == sentinel)
        }) else {
            return false;
        };
        let owner = self.stack[index].owner;
        tracing::debug!(name = %self.stack[index].name, "left group through edge");
        if self.truncate_stack(index) > 0 {
            self.regenerate(false);
        }
        if let Some(owner) = owner {
            self.focus(owner, FocusSource::Keyboard);
        }
        true
    }

    /// Escape: leave the current child context and refocus its group;
    /// otherwise release the Tab lock (locked-in mode); otherwise clear focus.
    pub fn escape(&mut self) -> bool {
        let child_owner = self.stack.last().filter(|c| c.is_child).map(|c| c.owner);
        if let Some(owner) = child_owner {
            self.pop_context(None, false);
            if let Some(owner) = owner {
                self.focus(owner, FocusSource::Keyboard);
            }
            return true;
        }
        if self.config.tab_control == TabControl::LockedIn && self.locked {
            self.locked = false;
            self.clear_focus();
            self.emit(Signal::TabReleased);
            tracing::debug!("tab lock released");
            return true;
        }
        self.clear_focus();
        true
    }

    fn start_dwell(&mut self, id: ElementId) {
        let Some(element) = self.elements.get(id) else {
            return;
        };
        let wanted = self.config.dwell || element.flags().contains(ElementFlags::DWELL);
        if !wanted || element.is_pointer_held() {
            return;
        }
        let timer = self
            .scheduler
            .schedule(self.now + self.config.dwell_delay_ms, TimerTarget::Dwell(id));
        self.dwell = Some((id, timer));
    }

    fn cancel_dwell(&mut self) {
        if let Some((id, timer)) = self.dwell.take() {
            self.scheduler.cancel(timer);
            self.refresh_proxy(id);
        }
    }

    fn fire_dwell(&mut self, id: ElementId) {
        if self.dwell.is_none_or(|(d, _)| d != id) {
            return;
        }
        self.dwell = None;
        self.refresh_proxy(id);
        let Some(element) = self.elements.get(id) else {
            return;
        };
        if self.focused_id() != Some(id) || !element.is_focusable() || element.is_pointer_held() {
            return;
        }
        tracing::debug!(%id, "dwell activation");
        let event = element.activate();
        self.push_event(id, event);
    }

    // --- auto-pop -----------------------------------------------------------

    fn auto_pop_for(&mut self, id: ElementId) {
        if !self.config.auto_pop_on_parent_interaction || self.composition.tabbable.contains(&id) {
            return;
        }
        if let Some(index) = self.stack.iter().rposition(|c| c.items.contains(&id)) {
            let name = self.stack[index].name.clone();
            tracing::debug!(%id, name = %name, "auto-pop to parent context");
            self.pop_context(Some(&name), true);
            return;
        }
        if let Some(path) = self.group_path_to(id) {
            tracing::debug!(%id, depth = path.len(), "auto-enter group");
            for group in path {
                self.enter_group_inner(group, None, false);
            }
        }
    }

    /// Groups to enter, outermost first, to make `id` tabbable.
    fn group_path_to(&self, id: ElementId) -> Option<Vec<ElementId>> {
        let mut queue: VecDeque<ElementId> = VecDeque::new();
        let mut visited: HashSet<ElementId> = HashSet::new();
        let mut parent: HashMap<ElementId, ElementId> = HashMap::new();
        for &root in &self.composition.tabbable {
            if self.groups.contains_key(&root) && visited.insert(root) {
                queue.push_back(root);
            }
        }
        while let Some(group) = queue.pop_front() {
            let Some(entry) = self.groups.get(&group) else {
                continue;
            };
            for &member in &entry.members {
                if !visited.insert(member) {
                    continue;
                }
                parent.insert(member, group);
                if member == id {
                    let mut path = Vec::new();
                    let mut cursor = id;
                    while let Some(&up) = parent.get(&cursor) {
                        path.push(up);
                        cursor = up;
                    }
                    path.reverse();
                    return Some(path);
                }
                if self.groups.contains_key(&member) {
                    queue.push_back(member);
                }
            }
        }
        None
    }

    // --- pointer input ------------------------------------------------------

    /// Topmost proxy under `point` that takes pointer input.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.proxies.iter().rev().map(|p| p.id).find(|&id| {
            self.elements
                .get(id)
                .is_some_and(|e| e.accepts_pointer() && e.hit_test(point))
        })
    }

    pub(crate) fn pointer_down(&mut self, input: &PointerInput) {
        let position = self.renderer.map_client_pos_to_point(input.client);
        let sample = input.sample(position);
        let Some(id) = self.hit_test(position) else {
            tracing::trace!(?position, "pointer down on nothing");
            return;
        };
        self.auto_pop_for(id);
        let Some(element) = self.elements.get_mut(id) else {
            return;
        };
        let events = element.pointer_down(&sample, &mut self.claims);
        let accepted = element.has_gesture() && self.claims.is_owned_by(sample.pointer, id);
        self.push_events(id, events);
        if accepted {
            self.focus(id, focus_source(sample.kind));
        }
    }

    pub(crate) fn pointer_move(&mut self, input: &PointerInput) {
        let position = self.renderer.map_client_pos_to_point(input.client);
        let sample = input.sample(position);
        let mut out: Vec<(ElementId, ElementEvents)> = Vec::new();
        for element in self.elements.iter_mut().filter(|e| e.has_gesture()) {
            let events = element.pointer_move(&sample, &self.claims);
            if !events.is_empty() {
                out.push((element.id(), events));
            }
        }
        for (id, events) in out {
            self.push_events(id, events);
        }
    }

    pub(crate) fn pointer_up(&mut self, input: &PointerInput) {
        let position = self.renderer.map_client_pos_to_point(input.client);
        let sample = input.sample(position);
        let mut out: Vec<(ElementId, ElementEvents)> = Vec::new();
        for element in self.elements.iter_mut().filter(|e| e.has_gesture()) {
            let events = element.pointer_up(&sample, &mut self.claims);
            if !events.is_empty() {
                out.push((element.id(), events));
            }
        }
        for (id, events) in out {
            self.push_events(id, events);
        }
    }

    pub(crate) fn pointer_cancel(&mut self, pointer: PointerId) {
        let mut out: Vec<(ElementId, ElementEvents)> = Vec::new();
        for element in self.elements.iter_mut().filter(|e| e.has_gesture()) {
            let events = element.pointer_cancel(pointer, &mut self.claims);
            if !events.is_empty() {
                out.push((element.id(), events));
            }
        }
        for (id, events) in out {
            self.push_events(id, events);
        }
    }

    /// Abort an element's press or drag without events.
    pub fn cancel_element_drag(&mut self, id: ElementId) -> bool {
        self.elements
            .get_mut(id)
            .is_some_and(|e| e.cancel_drag(&mut self.claims))
    }

    /// Hand an in-progress pointer drag from one element to another.
    ///
    /// The pointer claim moves with it. `from` sees a drag cancel; `to` sees
    /// a drag start at the last pointer position. Refused when `from` is not
    /// dragging or `to` already has a gesture.
    pub fn transfer_drag(&mut self, from: ElementId, to: ElementId) -> bool {
        if from == to || self.elements.get(to).is_none_or(InteractiveElement::has_gesture) {
            return false;
        }
        let Some(session) = self.elements.get_mut(from).and_then(InteractiveElement::take_drag) else {
            return false;
        };
        self.claims.transfer(session.pointer, from, to);
        let Some(receiver) = self.elements.get_mut(to) else {
            return false;
        };
        let events = receiver.adopt_drag(session);
        tracing::debug!(%from, %to, kind = ?session.kind, "drag transferred");
        self.push_event(from, ElementEvent::DragCancel);
        self.push_events(to, events);
        true
    }

    // --- keyboard -----------------------------------------------------------

    pub(crate) fn key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        if let Some(id) = self.focused_id() {
            if let Some(element) = self.elements.get_mut(id) {
                let (handled, events) = element.key_down(event);
                self.push_events(id, events);
                if handled {
                    return KeyOutcome::Handled;
                }
            }
        }
        let dispatch = self.keyboard.key_down(event);
        let mut handled = dispatch.matched;
        for action in dispatch.actions {
            match action {
                KeyAction::Next | KeyAction::Prev if !self.is_tab_locked() => handled = false,
                KeyAction::Next => {
                    self.next();
                }
                KeyAction::Prev => {
                    self.prev();
                }
                KeyAction::Escape => {
                    self.escape();
                }
                KeyAction::Behavior(behavior, tag) => self.work.push_back(Work::Key {
                    behavior,
                    tag,
                    phase: KeyPhase::Down,
                }),
            }
        }
        if handled {
            KeyOutcome::Handled
        } else {
            KeyOutcome::Unhandled
        }
    }

    pub(crate) fn key_up(&mut self, event: &KeyEvent) -> KeyOutcome {
        if let Some(id) = self.focused_id() {
            if let Some(element) = self.elements.get_mut(id) {
                let (handled, events) = element.key_up(event);
                self.push_events(id, events);
                if handled {
                    return KeyOutcome::Handled;
                }
            }
        }
        let dispatch = self.keyboard.key_up(event);
        for action in dispatch.actions {
            if let KeyAction::Behavior(behavior, tag) = action {
                self.work.push_back(Work::Key {
                    behavior,
                    tag,
                    phase: KeyPhase::Up,
                });
            }
        }
        if dispatch.matched {
            KeyOutcome::Handled
        } else {
            KeyOutcome::Unhandled
        }
    }

    /// Push an anonymous keyboard context; remove it with
    /// [`Self::remove_key_layer`].
    pub fn add_quick_key_context(&mut self) -> LayerId {
        self.keyboard.add_quick_context()
    }

    /// Push (or reset in place) a named keyboard context.
    pub fn push_key_context(&mut self, name: &str) -> LayerId {
        self.keyboard.push_context(name)
    }

    /// Pop keyboard contexts; see [`KeyboardRouter::pop_context`].
    pub fn pop_key_context(&mut self, name: Option<&str>, keep_named: bool) -> usize {
        self.keyboard.pop_context(name, keep_named)
    }

    /// Remove one keyboard layer wherever it sits.
    pub fn remove_key_layer(&mut self, layer: LayerId) -> bool {
        self.keyboard.remove_layer(layer)
    }

    /// The always-active global keyboard layer.
    pub fn global_key_layer(&self) -> LayerId {
        self.keyboard.global()
    }

    /// Bind `combo` in `layer` to `behavior`'s [`on_key`](crate::Behavior::on_key)
    /// with `tag`, for both key-down and key-up.
    pub fn bind_key(
        &mut self,
        layer: LayerId,
        combo: KeyCombo,
        behavior: BehaviorId,
        tag: u32,
    ) -> Option<BindingId> {
        let action = KeyAction::Behavior(behavior, tag);
        self.keyboard.bind(layer, combo, Some(action), Some(action))
    }

    /// Remove a binding.
    pub fn unbind_key(&mut self, binding: BindingId) {
        self.keyboard.unbind(binding);
    }

    /// Forget held keys without firing their key-up actions (window blur).
    pub fn clear_held_keys(&mut self) {
        self.keyboard.clear_held();
    }

    // --- time ---------------------------------------------------------------

    /// Time of the latest tick, in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Fire `behavior`'s [`on_timer`](crate::Behavior::on_timer) with `tag`
    /// on the first tick at least `delay_ms` from now.
    pub fn schedule(&mut self, behavior: BehaviorId, tag: u32, delay_ms: u64) -> TimerId {
        self.scheduler
            .schedule(self.now + delay_ms, TimerTarget::Behavior(behavior, tag))
    }

    /// Like [`Self::schedule`], repeating every `interval_ms` until cancelled.
    pub fn schedule_repeating(&mut self, behavior: BehaviorId, tag: u32, interval_ms: u64) -> TimerId {
        self.scheduler.schedule_repeating(
            self.now + interval_ms,
            interval_ms,
            TimerTarget::Behavior(behavior, tag),
        )
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel_timer(&mut self, timer: TimerId) -> bool {
        self.scheduler.cancel(timer)
    }

    /// Whether a timer is still pending.
    pub fn is_timer_pending(&self, timer: TimerId) -> bool {
        self.scheduler.is_scheduled(timer)
    }

    pub(crate) fn cancel_behavior_timers(&mut self, behavior: BehaviorId) {
        self.scheduler.cancel_behavior(behavior);
    }

    pub(crate) fn tick(&mut self, now: u64) {
        let delta = self.last_tick.map_or(0, |last| now.saturating_sub(last));
        self.last_tick = Some(now);
        self.now = now;
        self.renderer.force_transform_update();
        for entry in &mut self.proxies {
            let Some(element) = self.elements.get_mut(entry.id) else {
                continue;
            };
            if !element.world_visible() {
                continue;
            }
            element.update_position();
            let rect = element.bounds();
            if rect != entry.rect {
                entry.rect = rect;
                self.layer.update(entry);
            }
        }
        for target in self.scheduler.due(now) {
            match target {
                TimerTarget::Dwell(id) => self.fire_dwell(id),
                TimerTarget::Behavior(behavior, tag) => {
                    self.work.push_back(Work::Timer { behavior, tag });
                }
            }
        }
        self.claims.commit();
        self.emit(Signal::Tick { now, delta });
    }

    // --- signals ------------------------------------------------------------

    /// Publish a signal to behaviors and the application.
    pub fn emit(&mut self, signal: Signal) {
        self.work.push_back(Work::Signal(signal));
    }

    fn push_event(&mut self, id: ElementId, event: ElementEvent) {
        self.emit(Signal::Element { id, event });
    }

    fn push_events(&mut self, id: ElementId, events: ElementEvents) {
        for event in events {
            self.push_event(id, event);
        }
    }

    /// Stage reactions that run before any behavior sees a signal.
    pub(crate) fn handle_builtin(&mut self, signal: &Signal) {
        if let Signal::Element {
            id,
            event: ElementEvent::Activate { .. },
        } = signal
        {
            if self.groups.contains_key(id) {
                self.enter_group(*id, None);
            }
        }
    }
}
