// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stage: interaction core plus attached behaviors.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use veil_element::{
    ElementConfig, ElementGeometry, ElementId, FocusSource, InteractiveElement, PointerId,
    PointerInput,
};
use veil_keyboard::KeyEvent;

use crate::behavior::{Behavior, BehaviorId, DragPhase, Outcome, Subscriber};
use crate::config::StageConfig;
use crate::context::{ChildContext, ContextSpec, GroupEntry};
use crate::interaction::{Interaction, KeyOutcome, Work};
use crate::proxy::{IdentityRenderer, NullProxyLayer, ProxyEntry, ProxyLayer, RendererPlugin};
use crate::signal::Signal;

/// Accessible interaction layer for one canvas scene.
///
/// Every input or mutating method runs to completion before returning:
/// element events, behavior reactions and everything they trigger are
/// processed, and signals that survive are queued for [`Stage::poll_event`].
pub struct Stage {
    core: Interaction,
    behaviors: Vec<Option<Box<dyn Behavior>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    order: Vec<BehaviorId>,
    outbox: VecDeque<Signal>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("core", &self.core)
            .field("behaviors", &self.order)
            .field("pending", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

impl Stage {
    /// Create a stage with an identity renderer and no proxy layer.
    pub fn new(config: StageConfig) -> Self {
        Self {
            core: Interaction::new(config, Box::new(IdentityRenderer), Box::new(NullProxyLayer)),
            behaviors: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            order: Vec::new(),
            outbox: VecDeque::new(),
        }
    }

    /// Use `renderer` to map client coordinates.
    pub fn with_renderer(mut self, renderer: impl RendererPlugin + 'static) -> Self {
        self.core.renderer = Box::new(renderer);
        self
    }

    /// Mirror proxies into `layer`. The current set is synced immediately.
    pub fn with_proxy_layer(mut self, layer: impl ProxyLayer + 'static) -> Self {
        self.core.set_layer(Box::new(layer));
        self
    }

    /// Read access to the interaction core.
    pub fn interaction(&self) -> &Interaction {
        &self.core
    }

    /// Run `f` against the interaction core, then process what it triggered.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut Interaction) -> R) -> R {
        let result = f(&mut self.core);
        self.pump();
        result
    }

    // --- behaviors ----------------------------------------------------------

    /// Attach a behavior. Behaviors see signals in attach order.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "BehaviorId uses 32-bit indices."
    )]
    pub fn attach(&mut self, behavior: impl Behavior) -> BehaviorId {
        let boxed: Box<dyn Behavior> = Box::new(behavior);
        let id = if let Some(idx) = self.free_list.pop() {
            self.generations[idx] = self.generations[idx].wrapping_add(1);
            self.behaviors[idx] = Some(boxed);
            BehaviorId::new(idx as u32, self.generations[idx])
        } else {
            let idx = self.behaviors.len();
            self.behaviors.push(Some(boxed));
            self.generations.push(1);
            BehaviorId::new(idx as u32, 1)
        };
        self.order.push(id);
        tracing::debug!(%id, "behavior attached");
        id
    }

    /// Attach a closure that observes every signal.
    pub fn subscribe(
        &mut self,
        f: impl FnMut(&Signal, &mut Interaction) -> Outcome + 'static,
    ) -> BehaviorId {
        self.attach(Subscriber(f))
    }

    /// Dispose and remove a behavior. Returns `false` for stale ids, so
    /// detaching twice is harmless.
    pub fn detach(&mut self, id: BehaviorId) -> bool {
        let Some(mut behavior) = self.take(id) else {
            return false;
        };
        behavior.dispose(id, &mut self.core);
        self.core.cancel_behavior_timers(id);
        self.order.retain(|&b| b != id);
        self.free_list.push(id.idx());
        tracing::debug!(%id, "behavior detached");
        self.pump();
        true
    }

    fn is_live(&self, id: BehaviorId) -> bool {
        self.generations.get(id.idx()) == Some(&id.generation())
    }

    fn behavior_dyn(&self, id: BehaviorId) -> Option<&dyn Behavior> {
        if !self.is_live(id) {
            return None;
        }
        self.behaviors.get(id.idx())?.as_deref()
    }

    /// Borrow an attached behavior as its concrete type.
    pub fn behavior<T: Behavior>(&self, id: BehaviorId) -> Option<&T> {
        let any: &dyn Any = self.behavior_dyn(id)?;
        any.downcast_ref::<T>()
    }

    /// Mutably borrow an attached behavior as its concrete type.
    ///
    /// Changes made this way bypass signal processing; prefer
    /// [`Stage::with_behavior`] when the behavior needs to act on the stage.
    pub fn behavior_mut<T: Behavior>(&mut self, id: BehaviorId) -> Option<&mut T> {
        if !self.is_live(id) {
            return None;
        }
        let behavior: &mut dyn Behavior = self.behaviors.get_mut(id.idx())?.as_deref_mut()?;
        let any: &mut dyn Any = behavior;
        any.downcast_mut::<T>()
    }

    /// Run `f` with a behavior and the interaction core, then process what
    /// it triggered.
    pub fn with_behavior<T: Behavior, R>(
        &mut self,
        id: BehaviorId,
        f: impl FnOnce(&mut T, BehaviorId, &mut Interaction) -> R,
    ) -> Option<R> {
        let result = self.call(id, |behavior, me, cx| {
            let any: &mut dyn Any = &mut **behavior;
            any.downcast_mut::<T>().map(|typed| f(typed, me, cx))
        });
        self.pump();
        result.flatten()
    }

    /// Drag phase reported by a behavior.
    pub fn drag_phase(&self, id: BehaviorId) -> DragPhase {
        self.behavior_dyn(id).map_or(DragPhase::Idle, |b| b.phase())
    }

    /// Ask a drag controller to cancel its drag.
    pub fn cancel_drag(&mut self, id: BehaviorId) -> bool {
        let cancelled = self.call(id, |b, me, cx| b.cancel(me, cx)).unwrap_or(false);
        self.pump();
        cancelled
    }

    fn take(&mut self, id: BehaviorId) -> Option<Box<dyn Behavior>> {
        if !self.is_live(id) {
            return None;
        }
        self.behaviors.get_mut(id.idx())?.take()
    }

    fn restore(&mut self, id: BehaviorId, behavior: Box<dyn Behavior>) {
        if self.is_live(id) {
            if let Some(slot) = self.behaviors.get_mut(id.idx()) {
                *slot = Some(behavior);
            }
        }
    }

    fn call<R>(
        &mut self,
        id: BehaviorId,
        f: impl FnOnce(&mut Box<dyn Behavior>, BehaviorId, &mut Interaction) -> R,
    ) -> Option<R> {
        let mut behavior = self.take(id)?;
        let result = f(&mut behavior, id, &mut self.core);
        self.restore(id, behavior);
        Some(result)
    }

    fn pump(&mut self) {
        while let Some(work) = self.core.work.pop_front() {
            match work {
                Work::Signal(signal) => self.deliver(signal),
                Work::Activate { behavior, context } => {
                    tracing::trace!(%behavior, context = %context, "activate complex context");
                    self.call(behavior, |b, me, cx| b.activate(me, &context, cx));
                }
                Work::Deactivate { behavior } => {
                    self.call(behavior, |b, me, cx| b.deactivate(me, cx));
                }
                Work::FocusFirst { context } => self.core.focus_first_in(&context),
                Work::Key {
                    behavior,
                    tag,
                    phase,
                } => {
                    self.call(behavior, |b, me, cx| b.on_key(me, tag, phase, cx));
                }
                Work::Timer { behavior, tag } => {
                    self.call(behavior, |b, me, cx| b.on_timer(me, tag, cx));
                }
            }
        }
        self.core.claims.commit();
    }

    fn deliver(&mut self, signal: Signal) {
        tracing::trace!(?signal, "deliver");
        self.core.handle_builtin(&signal);
        let order = self.order.clone();
        for id in order {
            let outcome = self
                .call(id, |b, me, cx| b.on_signal(me, &signal, cx))
                .unwrap_or_default();
            if outcome == Outcome::Stop {
                tracing::trace!(%id, "signal stopped");
                return;
            }
        }
        if !matches!(signal, Signal::Tick { .. }) {
            self.outbox.push_back(signal);
        }
    }

    /// Next signal for the application.
    pub fn poll_event(&mut self) -> Option<Signal> {
        self.outbox.pop_front()
    }

    /// All pending signals for the application.
    pub fn drain_events(&mut self) -> Vec<Signal> {
        self.outbox.drain(..).collect()
    }

    // --- elements -----------------------------------------------------------

    /// Create an element. List it in a context to make it reachable.
    pub fn create_element(
        &mut self,
        config: ElementConfig,
        geometry: Box<dyn ElementGeometry>,
    ) -> ElementId {
        self.core.create_element(config, geometry)
    }

    /// Destroy an element.
    pub fn destroy_element(&mut self, id: ElementId) -> bool {
        let removed = self.core.destroy_element(id);
        self.pump();
        removed
    }

    /// One element.
    pub fn element(&self, id: ElementId) -> Option<&InteractiveElement> {
        self.core.element(id)
    }

    /// Show or hide an element.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        self.core.set_visible(id, visible);
        self.pump();
    }

    /// Enable or disable an element.
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) {
        self.core.set_enabled(id, enabled);
        self.pump();
    }

    /// Make `item` a group with `child` as its child context, or clear it.
    ///
    /// For a complex child the providing behavior is asked for the elements
    /// its context can contain.
    pub fn set_child_context(&mut self, item: ElementId, child: Option<ChildContext>) {
        let entry = child.map(|child| {
            let members = match &child {
                ChildContext::Items(items) => items.clone(),
                ChildContext::Complex(behavior) => self
                    .behavior_dyn(*behavior)
                    .map(|b| b.context_members())
                    .unwrap_or_default(),
            };
            GroupEntry { child, members }
        });
        self.core.set_group(item, entry);
        self.pump();
    }

    // --- contexts -----------------------------------------------------------

    /// See [`Interaction::activate_context`].
    pub fn activate_context(&mut self, spec: impl Into<ContextSpec>, as_child: bool) -> String {
        let name = self.core.activate_context(spec, as_child);
        self.pump();
        name
    }

    /// See [`Interaction::pop_context`].
    pub fn pop_context(&mut self, name: Option<&str>, keep_named: bool) -> usize {
        let removed = self.core.pop_context(name, keep_named);
        self.pump();
        removed
    }

    /// See [`Interaction::replace_current_context`].
    pub fn replace_current_context(&mut self, name: Option<&str>, items: Vec<ElementId>) -> bool {
        let replaced = self.core.replace_current_context(name, items);
        self.pump();
        replaced
    }

    /// See [`Interaction::set_baseline`].
    pub fn set_baseline(&mut self, prepend: Vec<ElementId>, append: Vec<ElementId>) {
        self.core.set_baseline(prepend, append);
        self.pump();
    }

    /// See [`Interaction::enter_group`].
    pub fn enter_group(&mut self, item: ElementId, child: Option<ChildContext>) -> Option<String> {
        let name = self.core.enter_group(item, child);
        self.pump();
        name
    }

    /// Name of the top context.
    pub fn top_context(&self) -> Option<&str> {
        self.core.top_context()
    }

    /// Composed Tab order.
    pub fn tab_order(&self) -> &[ElementId] {
        self.core.tab_order()
    }

    /// Elements reachable by pointer only.
    pub fn family(&self) -> &[ElementId] {
        self.core.family()
    }

    /// Current proxy set.
    pub fn proxies(&self) -> &[ProxyEntry] {
        self.core.proxies()
    }

    // --- focus --------------------------------------------------------------

    /// The focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.core.focused()
    }

    /// Focus an element.
    pub fn focus(&mut self, id: ElementId, source: FocusSource) -> bool {
        let focused = self.core.focus(id, source);
        self.pump();
        focused
    }

    /// Remove focus.
    pub fn clear_focus(&mut self) {
        self.core.clear_focus();
        self.pump();
    }

    /// Move focus forward.
    pub fn next(&mut self) -> Option<ElementId> {
        let target = self.core.next();
        self.pump();
        target
    }

    /// Move focus backward.
    pub fn prev(&mut self) -> Option<ElementId> {
        let target = self.core.prev();
        self.pump();
        target
    }

    /// Escape; see [`Interaction::escape`].
    pub fn escape(&mut self) -> bool {
        let handled = self.core.escape();
        self.pump();
        handled
    }

    // --- input --------------------------------------------------------------

    /// Pointer, touch or mouse press in client coordinates.
    pub fn pointer_down(&mut self, input: PointerInput) {
        self.core.pointer_down(&input);
        self.pump();
    }

    /// Pointer movement in client coordinates.
    pub fn pointer_move(&mut self, input: PointerInput) {
        self.core.pointer_move(&input);
        self.pump();
    }

    /// Pointer release in client coordinates.
    pub fn pointer_up(&mut self, input: PointerInput) {
        self.core.pointer_up(&input);
        self.pump();
    }

    /// Platform cancel for a pointer id.
    pub fn pointer_cancel(&mut self, pointer: PointerId) {
        self.core.pointer_cancel(pointer);
        self.pump();
    }

    /// Key press. The focused element sees activation keys first, then the
    /// keyboard contexts from the top down, then the global layer.
    pub fn key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        let outcome = self.core.key_down(event);
        self.pump();
        outcome
    }

    /// Key release.
    pub fn key_up(&mut self, event: &KeyEvent) -> KeyOutcome {
        let outcome = self.core.key_up(event);
        self.pump();
        outcome
    }

    /// Frame tick at `now` milliseconds: refresh proxy rectangles, fire due
    /// timers and dwell activations, and deliver [`Signal::Tick`].
    pub fn tick(&mut self, now: u64) {
        self.core.tick(now);
        self.pump();
    }

    /// See [`Interaction::transfer_drag`].
    pub fn transfer_drag(&mut self, from: ElementId, to: ElementId) -> bool {
        let transferred = self.core.transfer_drag(from, to);
        self.pump();
        transferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;
    use kurbo::{Point, Rect};
    use veil_element::{DragStrategy, ElementEvent, NoGeometry};
    use veil_keyboard::{KeyCombo, KeyPhase, Modifiers};

    use crate::config::{GroupExit, TabControl};

    fn button(stage: &mut Stage, label: &str) -> ElementId {
        stage.create_element(ElementConfig::new(label), Box::new(NoGeometry))
    }

    fn boxed(stage: &mut Stage, label: &str, rect: Rect) -> ElementId {
        stage.create_element(ElementConfig::new(label), Box::new(rect))
    }

    fn tab() -> KeyEvent {
        KeyEvent::new("Tab")
    }

    fn press(stage: &mut Stage, key: &str) -> KeyOutcome {
        let event = KeyEvent::new(key);
        let outcome = stage.key_down(&event);
        stage.key_up(&event);
        outcome
    }

    fn activations(events: &[Signal]) -> Vec<ElementId> {
        events
            .iter()
            .filter_map(|s| match s {
                Signal::Element {
                    id,
                    event: ElementEvent::Activate { .. },
                } => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tab_cycles_and_wraps() {
        let mut stage = Stage::default();
        let (a, b, c) = (button(&mut stage, "a"), button(&mut stage, "b"), button(&mut stage, "c"));
        stage.activate_context(vec![a, b, c], false);
        assert_eq!(stage.focused(), None);

        let mut visited = Vec::new();
        for _ in 0..4 {
            assert_eq!(stage.key_down(&tab()), KeyOutcome::Handled);
            stage.key_up(&tab());
            visited.extend(stage.focused());
        }
        assert_eq!(visited, [a, b, c, a]);

        let back = KeyEvent::new("Tab").with_modifiers(Modifiers::SHIFT);
        stage.key_down(&back);
        assert_eq!(stage.focused(), Some(c));
    }

    #[test]
    fn disabled_and_hidden_elements_are_skipped() {
        let mut stage = Stage::default();
        let (a, b, c) = (button(&mut stage, "a"), button(&mut stage, "b"), button(&mut stage, "c"));
        stage.activate_context(vec![a, b, c], false);
        stage.set_enabled(b, false);
        stage.next();
        assert_eq!(stage.next(), Some(c));
        stage.set_visible(c, false);
        assert_eq!(stage.proxies().len(), 2);
        assert_eq!(stage.focused(), None);
        assert_eq!(stage.next(), Some(a));
        assert_eq!(stage.next(), Some(a));
    }

    #[test]
    fn enter_on_focused_element_activates() {
        let mut stage = Stage::default();
        let play = button(&mut stage, "Play");
        stage.activate_context(vec![play], false);
        stage.next();
        stage.drain_events();

        let enter = KeyEvent::new("Enter");
        assert!(stage.key_down(&enter).is_handled());
        assert!(activations(&stage.drain_events()).is_empty());
        stage.key_up(&enter);
        assert_eq!(activations(&stage.drain_events()), [play]);
    }

    #[test]
    fn contexts_replace_in_place_and_pop_by_name() {
        let mut stage = Stage::default();
        let (a, b, c) = (button(&mut stage, "a"), button(&mut stage, "b"), button(&mut stage, "c"));
        stage.activate_context(ContextSpec::named("menu").with_items(vec![a]), false);
        stage.activate_context(ContextSpec::named("options").with_items(vec![b]), false);
        stage.activate_context(ContextSpec::named("confirm").with_items(vec![c]), false);
        assert_eq!(stage.interaction().depth(), 3);

        // Re-activating "menu" truncates above it and replaces its items.
        stage.activate_context(ContextSpec::named("menu").with_items(vec![b, c]), false);
        assert_eq!(stage.interaction().depth(), 1);
        assert_eq!(stage.tab_order(), [b, c]);

        let popped: Vec<_> = stage
            .drain_events()
            .into_iter()
            .filter_map(|s| match s {
                Signal::ContextPopped { name } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(popped, ["confirm", "options"]);

        assert_eq!(stage.pop_context(Some("missing"), false), 0);
        stage.activate_context(ContextSpec::named("options").with_items(vec![a]), false);
        assert_eq!(stage.pop_context(Some("menu"), true), 1);
        assert_eq!(stage.top_context(), Some("menu"));
        assert_eq!(stage.pop_context(None, false), 1);
        assert_eq!(stage.pop_context(None, false), 0);
    }

    #[test]
    fn baseline_follows_contexts_that_allow_it() {
        let mut stage = Stage::default();
        let (settings, a, b) = (button(&mut stage, "settings"), button(&mut stage, "a"), button(&mut stage, "b"));
        stage.set_baseline(vec![], vec![settings]);
        stage.activate_context(vec![a], false);
        assert_eq!(stage.tab_order(), [a, settings]);
        stage.activate_context(ContextSpec::named("modal").with_items(vec![b]), false);
        assert_eq!(stage.tab_order(), [b]);
    }

    #[test]
    fn replace_keeps_focus_when_still_present() {
        let mut stage = Stage::default();
        let (a, b, c) = (button(&mut stage, "a"), button(&mut stage, "b"), button(&mut stage, "c"));
        stage.activate_context(vec![a, b], false);
        stage.next();
        assert!(stage.replace_current_context(None, vec![c, a]));
        assert_eq!(stage.focused(), Some(a));
        assert!(stage.replace_current_context(None, vec![b]));
        assert_eq!(stage.focused(), None);
    }

    #[test]
    fn group_enter_and_escape() {
        let mut stage = Stage::default();
        let (menu, quit) = (button(&mut stage, "menu"), button(&mut stage, "quit"));
        let (x, y) = (button(&mut stage, "x"), button(&mut stage, "y"));
        stage.set_child_context(menu, Some(ChildContext::Items(vec![x, y])));
        stage.activate_context(vec![menu, quit], false);
        assert_eq!(stage.family(), [x, y]);

        stage.next();
        assert_eq!(press(&mut stage, "Enter"), KeyOutcome::Handled);
        assert_eq!(stage.focused(), Some(x));
        assert_eq!(stage.tab_order(), [x, y]);
        assert_eq!(stage.family(), [menu, quit]);

        assert_eq!(press(&mut stage, "Escape"), KeyOutcome::Handled);
        assert_eq!(stage.focused(), Some(menu));
        assert_eq!(stage.tab_order(), [menu, quit]);
    }

    #[test]
    fn edge_sentinels_exit_the_group() {
        let mut stage = Stage::new(StageConfig {
            group_exit: GroupExit::ExitOnEdge,
            ..StageConfig::default()
        });
        let (menu, quit) = (button(&mut stage, "menu"), button(&mut stage, "quit"));
        let (x, y) = (button(&mut stage, "x"), button(&mut stage, "y"));
        stage.set_child_context(menu, Some(ChildContext::Items(vec![x, y])));
        stage.activate_context(vec![menu, quit], false);
        stage.enter_group(menu, None);
        assert_eq!(stage.focused(), Some(x));
        assert_eq!(stage.tab_order().len(), 4);

        stage.next();
        assert_eq!(stage.focused(), Some(y));
        // Tab onto the trailing sentinel leaves the group.
        stage.next();
        assert_eq!(stage.focused(), Some(menu));
        assert_eq!(stage.tab_order(), [menu, quit]);

        // Sentinels are reused on re-entry.
        stage.enter_group(menu, None);
        let first = stage.tab_order().to_vec();
        stage.escape();
        stage.enter_group(menu, None);
        assert_eq!(stage.tab_order(), first);
    }

    #[test]
    fn late_proxy_layer_receives_the_current_set() {
        struct Mirror(Rc<RefCell<Vec<Vec<ElementId>>>>);
        impl ProxyLayer for Mirror {
            fn sync(&mut self, entries: &[ProxyEntry]) {
                self.0.borrow_mut().push(entries.iter().map(|e| e.id).collect());
            }
        }

        let mut stage = Stage::default();
        let (a, b) = (button(&mut stage, "a"), button(&mut stage, "b"));
        stage.activate_context(vec![a, b], false);
        let synced = Rc::new(RefCell::new(Vec::new()));
        let mut stage = stage.with_proxy_layer(Mirror(synced.clone()));
        assert_eq!(*synced.borrow(), [vec![a, b]]);

        stage.activate_context(vec![b], false);
        assert_eq!(synced.borrow().last(), Some(&vec![b]));
    }

    #[test]
    fn tab_without_focus_stays_inside_a_sentinel_group() {
        let mut stage = Stage::new(StageConfig {
            group_exit: GroupExit::ExitOnEdge,
            ..StageConfig::default()
        });
        let menu = button(&mut stage, "menu");
        let (x, y) = (button(&mut stage, "x"), button(&mut stage, "y"));
        stage.set_child_context(menu, Some(ChildContext::Items(vec![x, y])));
        stage.activate_context(vec![menu], false);
        stage.enter_group(menu, None);

        stage.clear_focus();
        assert_eq!(stage.next(), Some(x));
        assert_eq!(stage.tab_order().len(), 4);

        stage.clear_focus();
        assert_eq!(stage.prev(), Some(y));
        assert_eq!(stage.tab_order().len(), 4);
    }

    #[test]
    fn locked_in_escape_releases_tab() {
        let mut stage = Stage::new(StageConfig {
            tab_control: TabControl::LockedIn,
            ..StageConfig::default()
        });
        let a = button(&mut stage, "a");
        stage.activate_context(vec![a], false);
        stage.next();
        stage.drain_events();

        assert_eq!(press(&mut stage, "Escape"), KeyOutcome::Handled);
        assert!(stage.drain_events().contains(&Signal::TabReleased));
        assert_eq!(stage.focused(), None);
        assert_eq!(stage.key_down(&tab()), KeyOutcome::Unhandled);
        stage.key_up(&tab());

        // Any focus relocks.
        stage.focus(a, FocusSource::Pointer);
        assert_eq!(stage.key_down(&tab()), KeyOutcome::Handled);
    }

    #[test]
    fn click_focuses_and_activates() {
        let mut stage = Stage::default();
        let a = boxed(&mut stage, "a", Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = boxed(&mut stage, "b", Rect::new(5.0, 0.0, 15.0, 10.0));
        stage.activate_context(vec![a, b], false);

        stage.pointer_down(PointerInput::mouse(7.0, 5.0));
        // The later proxy is on top.
        assert_eq!(stage.focused(), Some(b));
        assert_eq!(stage.interaction().focus_source(), Some(FocusSource::Pointer));
        stage.pointer_up(PointerInput::mouse(7.0, 5.0));
        assert_eq!(activations(&stage.drain_events()), [b]);

        stage.pointer_down(PointerInput::touch(3, 2.0, 2.0));
        assert_eq!(stage.interaction().focus_source(), Some(FocusSource::Touch));
        let classes = stage.interaction().proxy(a).map(|p| p.classes());
        assert_eq!(classes.as_deref(), Some(&["veil-focus-touch"][..]));
    }

    #[test]
    fn dwell_activates_after_delay() {
        let mut stage = Stage::new(StageConfig {
            dwell: true,
            dwell_delay_ms: 500,
            ..StageConfig::default()
        });
        let (a, b) = (button(&mut stage, "a"), button(&mut stage, "b"));
        stage.activate_context(vec![a, b], false);
        stage.tick(0);
        stage.next();
        assert!(stage.interaction().proxy(a).is_some_and(|p| p.dwelling));
        stage.tick(400);
        // Moving focus restarts the dwell.
        stage.next();
        stage.tick(800);
        assert!(activations(&stage.drain_events()).is_empty());
        stage.tick(900);
        assert_eq!(activations(&stage.drain_events()), [b]);
        assert!(stage.interaction().proxy(b).is_some_and(|p| !p.dwelling));
    }

    #[test]
    fn stop_hides_signal_from_later_behaviors_and_outbox() {
        let mut stage = Stage::default();
        let a = button(&mut stage, "a");
        let seen = Rc::new(RefCell::new(0));
        stage.subscribe(|signal, _| match signal {
            Signal::Element {
                event: ElementEvent::Focus { .. },
                ..
            } => Outcome::Stop,
            _ => Outcome::Continue,
        });
        let counter = Rc::clone(&seen);
        stage.subscribe(move |_, _| {
            *counter.borrow_mut() += 1;
            Outcome::Continue
        });
        stage.activate_context(vec![a], false);
        stage.drain_events();
        let before = *seen.borrow();
        stage.next();
        assert_eq!(*seen.borrow(), before);
        assert!(stage.drain_events().is_empty());
    }

    #[derive(Default)]
    struct Recorder {
        keys: Vec<(u32, KeyPhase)>,
        timers: Vec<u32>,
        disposed: bool,
    }

    impl Behavior for Recorder {
        fn on_key(&mut self, _me: BehaviorId, tag: u32, phase: KeyPhase, _cx: &mut Interaction) {
            self.keys.push((tag, phase));
        }

        fn on_timer(&mut self, _me: BehaviorId, tag: u32, _cx: &mut Interaction) {
            self.timers.push(tag);
        }

        fn dispose(&mut self, _me: BehaviorId, _cx: &mut Interaction) {
            self.disposed = true;
        }
    }

    #[test]
    fn behaviors_receive_keys_and_timers() {
        let mut stage = Stage::default();
        let id = stage.attach(Recorder::default());
        stage.with(|cx| {
            let layer = cx.add_quick_key_context();
            cx.bind_key(layer, KeyCombo::key_only("x"), id, 7);
            cx.schedule(id, 1, 100);
            cx.schedule_repeating(id, 2, 50);
        });
        press(&mut stage, "x");
        stage.tick(50);
        stage.tick(100);
        let recorder = stage.behavior::<Recorder>(id).unwrap();
        assert_eq!(recorder.keys, [(7, KeyPhase::Down), (7, KeyPhase::Up)]);
        assert_eq!(recorder.timers, [2, 1, 2]);
        assert!(stage.behavior::<Fill>(id).is_none());
    }

    #[test]
    fn detach_disposes_once() {
        let mut stage = Stage::default();
        let id = stage.attach(Recorder::default());
        stage.with(|cx| cx.schedule(id, 1, 10));
        assert!(stage.detach(id));
        assert!(!stage.detach(id));
        assert!(stage.behavior::<Recorder>(id).is_none());
        stage.tick(20);
        // A new behavior reuses the slot with a fresh generation.
        let next = stage.attach(Recorder::default());
        assert_ne!(next, id);
        assert!(stage.behavior::<Recorder>(next).is_some_and(|r| r.timers.is_empty()));
    }

    #[test]
    fn pointer_on_parent_item_pops_child_context() {
        let mut stage = Stage::new(StageConfig {
            auto_pop_on_parent_interaction: true,
            ..StageConfig::default()
        });
        let menu = boxed(&mut stage, "menu", Rect::new(0.0, 0.0, 10.0, 10.0));
        let quit = boxed(&mut stage, "quit", Rect::new(20.0, 0.0, 30.0, 10.0));
        let x = boxed(&mut stage, "x", Rect::new(0.0, 20.0, 10.0, 30.0));
        stage.set_child_context(menu, Some(ChildContext::Items(vec![x])));
        stage.activate_context(ContextSpec::named("main").with_items(vec![menu, quit]), false);

        // Clicking a grouped element enters its group.
        stage.pointer_down(PointerInput::mouse(5.0, 25.0));
        assert_eq!(stage.tab_order(), [x]);
        assert_eq!(stage.focused(), Some(x));
        stage.pointer_up(PointerInput::mouse(5.0, 25.0));

        // Clicking a parent item returns to the parent.
        stage.pointer_down(PointerInput::mouse(25.0, 5.0));
        assert_eq!(stage.top_context(), Some("main"));
        assert_eq!(stage.focused(), Some(quit));
    }

    #[test]
    fn transfer_moves_the_drag_and_claim() {
        let mut stage = Stage::default();
        let placeholder = stage.create_element(
            ElementConfig::new("card").drag(DragStrategy::DragOnly),
            Box::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        let real = stage.create_element(
            ElementConfig::new("real card").drag(DragStrategy::DragOnly),
            Box::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        stage.activate_context(vec![placeholder], false);
        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.drain_events();

        assert!(stage.transfer_drag(placeholder, real));
        let events = stage.drain_events();
        assert_eq!(events[0].element_event(placeholder), Some(&ElementEvent::DragCancel));
        assert!(matches!(
            events[1].element_event(real),
            Some(ElementEvent::DragStart { .. })
        ));

        stage.pointer_move(PointerInput::mouse(8.0, 5.0));
        let moved = stage.drain_events();
        assert!(matches!(
            moved[0].element_event(real),
            Some(ElementEvent::DragMove { position, .. }) if *position == Point::new(8.0, 5.0)
        ));
        assert!(!stage.transfer_drag(placeholder, real));
    }

    struct Fill(Vec<ElementId>);

    impl Behavior for Fill {
        fn activate(&mut self, _me: BehaviorId, context: &str, cx: &mut Interaction) {
            cx.replace_current_context(Some(context), self.0.clone());
        }

        fn context_members(&self) -> Vec<ElementId> {
            self.0.clone()
        }
    }

    #[test]
    fn complex_child_fills_itself_then_focuses_first() {
        let mut stage = Stage::default();
        let board = button(&mut stage, "board");
        let (c1, c2) = (button(&mut stage, "c1"), button(&mut stage, "c2"));
        let grid = stage.attach(Fill(vec![c1, c2]));
        stage.set_child_context(board, Some(ChildContext::Complex(grid)));
        stage.activate_context(vec![board], false);
        assert_eq!(stage.family(), [c1, c2]);

        stage.focus(board, FocusSource::Keyboard);
        press(&mut stage, "Enter");
        assert_eq!(stage.tab_order(), [c1, c2]);
        assert_eq!(stage.focused(), Some(c1));
    }
}
