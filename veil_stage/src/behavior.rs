// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behaviors: typed subscribers attached to a stage.
//!
//! Drag controllers and complex contexts are behaviors. A behavior sees every
//! [`Signal`] in attach order and may return [`Outcome::Stop`] to hide it
//! from later behaviors and from the application. It also receives key
//! bindings and timers it registered, and the activate/deactivate hooks of
//! contexts it provides.
//!
//! Behaviors change stage state only through the [`Interaction`] they are
//! handed. Whatever they trigger is queued and handled after they return.

use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use veil_element::ElementId;
use veil_keyboard::{BindingId, KeyPhase, LayerId};

use crate::interaction::Interaction;
use crate::signal::Signal;
use crate::timer::TimerId;

/// Identifier of an attached behavior (generational). Doubles as the
/// disposable subscription handle: pass it to
/// [`Stage::detach`](crate::Stage::detach).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BehaviorId(u32, u32);

impl BehaviorId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}v{}", self.0, self.1)
    }
}

/// Propagation control returned from [`Behavior::on_signal`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Let later behaviors and the application see the signal.
    #[default]
    Continue,
    /// Stop here.
    Stop,
}

/// Drag controller state, ordered from least to most engaged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DragPhase {
    /// No drag.
    #[default]
    Idle,
    /// A sticky drag is armed and waiting for movement.
    Armed,
    /// Dragging.
    Dragging,
}

/// A typed subscriber attached to a stage. Every method has a no-op default.
pub trait Behavior: Any {
    /// Observe a signal.
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        let _ = (me, signal, cx);
        Outcome::Continue
    }

    /// A key bound with [`Interaction::bind_key`] fired.
    fn on_key(&mut self, me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        let _ = (me, tag, phase, cx);
    }

    /// A timer scheduled with [`Interaction::schedule`] fired.
    fn on_timer(&mut self, me: BehaviorId, tag: u32, cx: &mut Interaction) {
        let _ = (me, tag, cx);
    }

    /// A context this behavior provides was pushed under `context`. The
    /// behavior fills it with [`Interaction::replace_current_context`].
    fn activate(&mut self, me: BehaviorId, context: &str, cx: &mut Interaction) {
        let _ = (me, context, cx);
    }

    /// A context this behavior provides was popped.
    fn deactivate(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let _ = (me, cx);
    }

    /// Every element the provided context can contain, for computing the
    /// extended family of a group whose child context is this behavior.
    fn context_members(&self) -> Vec<ElementId> {
        Vec::new()
    }

    /// Current drag phase, for drag controllers.
    fn phase(&self) -> DragPhase {
        DragPhase::Idle
    }

    /// Cancel an in-progress drag. Returns whether anything was cancelled.
    fn cancel(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        let _ = (me, cx);
        false
    }

    /// Release everything the behavior holds. Called once on detach.
    fn dispose(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let _ = (me, cx);
    }
}

/// Closure subscriber created by [`Stage::subscribe`](crate::Stage::subscribe).
pub(crate) struct Subscriber<F>(pub(crate) F);

impl<F> Behavior for Subscriber<F>
where
    F: FnMut(&Signal, &mut Interaction) -> Outcome + 'static,
{
    fn on_signal(&mut self, _me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        (self.0)(signal, cx)
    }
}

/// One releasable resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// A keyboard context layer.
    KeyLayer(LayerId),
    /// A single key binding.
    Binding(BindingId),
    /// A scheduled timer.
    Timer(TimerId),
    /// A pushed focus context, popped by name.
    Context(String),
}

/// A group of resources released together.
///
/// Disposing releases everything in reverse registration order and leaves
/// the group empty, so disposing twice is a no-op.
#[derive(Clone, Debug, Default)]
pub struct Disposables {
    items: Vec<Resource>,
}

impl Disposables {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    pub fn add(&mut self, resource: Resource) {
        self.items.push(resource);
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release every held resource.
    pub fn dispose(&mut self, cx: &mut Interaction) {
        while let Some(resource) = self.items.pop() {
            match resource {
                Resource::KeyLayer(layer) => {
                    cx.remove_key_layer(layer);
                }
                Resource::Binding(binding) => cx.unbind_key(binding),
                Resource::Timer(timer) => {
                    cx.cancel_timer(timer);
                }
                Resource::Context(name) => {
                    if cx.has_context(&name) {
                        cx.pop_context(Some(&name), false);
                    }
                }
            }
        }
    }
}
