// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag onto a fixed set of drop targets, by pointer or by keyboard.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Point;
use veil_element::{DragType, ElementEvent, ElementId, FocusSource, InteractiveElement};
use veil_keyboard::{KeyCombo, KeyPhase};
use veil_stage::{
    Behavior, BehaviorId, ContextSpec, Disposables, DragEvent, DragPhase, Interaction, Outcome,
    Resource, Signal,
};

use crate::bounds::DragBounds;
use crate::standard::StandardDrag;

const ESCAPE_TAG: u32 = 0;

/// Custom drop test: does a drop at this point land on this target?
pub type DropTest = Rc<dyn Fn(Point, &InteractiveElement) -> bool>;

struct KeyboardDrop {
    context: String,
    keys: Disposables,
}

/// Pointer drags that resolve to one of several drop targets, plus a
/// keyboard mode that picks a target through focus.
///
/// A pointer drop hit-tests the targets in order and publishes
/// [`DragEvent::Completed`] with the index of the first hit, or
/// [`DragEvent::Failed`].
///
/// Activating the dragged element without a pointer (Enter or Space) starts
/// a keyboard drop: a child context
/// with the targets (and the element itself unless excluded) is pushed and
/// the first target focused. Activating a target completes the drop;
/// activating the element again or pressing Escape cancels it. Either way
/// focus returns to the element. Activations consumed this way are stopped.
pub struct DropAreaDrag {
    pointer: StandardDrag,
    targets: Vec<ElementId>,
    include_self: bool,
    test: Option<DropTest>,
    keyboard: Option<KeyboardDrop>,
}

impl fmt::Debug for DropAreaDrag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropAreaDrag")
            .field("pointer", &self.pointer)
            .field("targets", &self.targets)
            .field("include_self", &self.include_self)
            .field("custom_test", &self.test.is_some())
            .field("keyboard", &self.keyboard.as_ref().map(|k| &k.context))
            .finish()
    }
}

impl DropAreaDrag {
    /// Drag `target` onto `targets`.
    pub fn new(target: ElementId, targets: Vec<ElementId>) -> Self {
        Self {
            pointer: StandardDrag::new(target),
            targets,
            include_self: true,
            test: None,
            keyboard: None,
        }
    }

    /// Leave the dragged element out of the keyboard drop context.
    pub fn exclude_self(mut self) -> Self {
        self.include_self = false;
        self
    }

    /// Replace target hit testing with `test`.
    pub fn with_test(mut self, test: impl Fn(Point, &InteractiveElement) -> bool + 'static) -> Self {
        self.test = Some(Rc::new(test));
        self
    }

    /// Constrain pointer movement.
    pub fn with_bounds(mut self, bounds: DragBounds) -> Self {
        self.pointer = self.pointer.with_bounds(bounds);
        self
    }

    /// The dragged element.
    pub fn target(&self) -> ElementId {
        self.pointer.target()
    }

    /// The drop targets.
    pub fn targets(&self) -> &[ElementId] {
        &self.targets
    }

    /// Whether a keyboard drop is in progress.
    pub fn is_keyboard_active(&self) -> bool {
        self.keyboard.is_some()
    }

    fn resolve(&self, position: Point, cx: &Interaction) -> Option<usize> {
        self.targets.iter().position(|&t| {
            cx.element(t).is_some_and(|e| match &self.test {
                Some(test) => test(position, e),
                None => e.hit_test(position),
            })
        })
    }

    fn begin_keyboard(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let target = self.target();
        let mut items = self.targets.clone();
        if self.include_self {
            items.push(target);
        }
        let context = cx.activate_context(
            ContextSpec::named(&format!("drop-{target}")).with_items(items),
            true,
        );
        let mut keys = Disposables::new();
        let layer = cx.add_quick_key_context();
        cx.bind_key(layer, KeyCombo::key_only("escape"), me, ESCAPE_TAG);
        keys.add(Resource::KeyLayer(layer));
        keys.add(Resource::Context(context.clone()));
        tracing::debug!(%target, context = %context, "keyboard drop started");
        self.keyboard = Some(KeyboardDrop { context, keys });
        cx.emit(Signal::Drag(DragEvent::Started {
            controller: me,
            target,
            kind: DragType::Keyboard,
        }));
        for &t in &self.targets {
            if cx.focus(t, FocusSource::Keyboard) {
                break;
            }
        }
    }

    fn end_keyboard(&mut self, cx: &mut Interaction) -> bool {
        let Some(mut session) = self.keyboard.take() else {
            return false;
        };
        session.keys.dispose(cx);
        cx.focus(self.target(), FocusSource::Keyboard);
        true
    }

    fn finish_keyboard(&mut self, me: BehaviorId, drop: Option<usize>, cx: &mut Interaction) {
        if !self.end_keyboard(cx) {
            return;
        }
        let target = self.target();
        let event = match drop {
            Some(_) => DragEvent::Completed {
                controller: me,
                target,
                drop,
            },
            None => DragEvent::Cancelled {
                controller: me,
                target,
            },
        };
        tracing::debug!(%target, ?drop, "keyboard drop finished");
        cx.emit(Signal::Drag(event));
    }
}

impl Behavior for DropAreaDrag {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        let target = self.target();
        if self.keyboard.is_some() {
            let Signal::Element {
                id,
                event: ElementEvent::Activate { .. },
            } = signal
            else {
                return Outcome::Continue;
            };
            if *id == target {
                self.finish_keyboard(me, None, cx);
                return Outcome::Stop;
            }
            if let Some(k) = self.targets.iter().position(|t| t == id) {
                self.finish_keyboard(me, Some(k), cx);
                return Outcome::Stop;
            }
            return Outcome::Continue;
        }
        let Some(event) = signal.element_event(target) else {
            return Outcome::Continue;
        };
        // Clicks stay pointer interactions.
        if matches!(event, ElementEvent::Activate { position: None })
            && self.pointer.phase() == DragPhase::Idle
        {
            self.begin_keyboard(me, cx);
            return Outcome::Stop;
        }
        if let Some(position) = self.pointer.track(me, event, cx) {
            let drag = match self.resolve(position, cx) {
                Some(k) => DragEvent::Completed {
                    controller: me,
                    target,
                    drop: Some(k),
                },
                None => DragEvent::Failed {
                    controller: me,
                    target,
                },
            };
            tracing::debug!(%target, ?drag, "pointer drop resolved");
            cx.emit(Signal::Drag(drag));
        }
        Outcome::Continue
    }

    fn on_key(&mut self, me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        if tag == ESCAPE_TAG && phase == KeyPhase::Down {
            self.finish_keyboard(me, None, cx);
        }
    }

    fn phase(&self) -> DragPhase {
        if self.keyboard.is_some() {
            DragPhase::Dragging
        } else {
            self.pointer.phase()
        }
    }

    fn cancel(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        if self.keyboard.is_some() {
            self.finish_keyboard(me, None, cx);
            return true;
        }
        self.pointer.abort(me, cx)
    }

    fn dispose(&mut self, me: BehaviorId, cx: &mut Interaction) {
        self.pointer.dispose(me, cx);
        if let Some(mut session) = self.keyboard.take() {
            session.keys.dispose(cx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use kurbo::Rect;
    use veil_element::{DragStrategy, ElementConfig, PointerInput};
    use veil_keyboard::KeyEvent;
    use veil_stage::{Stage, StageConfig};

    struct Board {
        stage: Stage,
        item: ElementId,
        targets: [ElementId; 2],
    }

    fn board(strategy: DragStrategy) -> Board {
        let mut stage = Stage::new(StageConfig::default());
        let item = stage.create_element(
            ElementConfig::new("gem").drag(strategy),
            Box::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        let t0 = stage.create_element(
            ElementConfig::new("left slot"),
            Box::new(Rect::new(100.0, 0.0, 120.0, 20.0)),
        );
        let t1 = stage.create_element(
            ElementConfig::new("right slot"),
            Box::new(Rect::new(200.0, 0.0, 220.0, 20.0)),
        );
        stage.activate_context(vec![item], false);
        Board {
            stage,
            item,
            targets: [t0, t1],
        }
    }

    fn drag_events(stage: &mut Stage) -> Vec<DragEvent> {
        stage
            .drain_events()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Drag(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    fn press(stage: &mut Stage, key: &str) {
        stage.key_down(&KeyEvent::new(key));
        stage.key_up(&KeyEvent::new(key));
    }

    #[test]
    fn pointer_drop_hits_or_fails() {
        let Board {
            mut stage,
            item,
            targets,
        } = board(DragStrategy::DragOnly);
        let drag = stage.attach(DropAreaDrag::new(item, targets.to_vec()));

        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.pointer_move(PointerInput::mouse(205.0, 10.0));
        stage.pointer_up(PointerInput::mouse(205.0, 10.0));
        assert_eq!(
            drag_events(&mut stage).last(),
            Some(&DragEvent::Completed {
                controller: drag,
                target: item,
                drop: Some(1)
            })
        );

        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.pointer_up(PointerInput::mouse(50.0, 50.0));
        assert_eq!(
            drag_events(&mut stage).last(),
            Some(&DragEvent::Failed {
                controller: drag,
                target: item
            })
        );
    }

    #[test]
    fn custom_test_replaces_hit_testing() {
        let Board {
            mut stage,
            item,
            targets,
        } = board(DragStrategy::DragOnly);
        let drag = stage.attach(
            DropAreaDrag::new(item, targets.to_vec())
                .with_test(|p, e| e.bounds().inflate(10.0, 10.0).contains(p)),
        );
        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.pointer_up(PointerInput::mouse(95.0, 5.0));
        assert!(matches!(
            drag_events(&mut stage).last(),
            Some(DragEvent::Completed { drop: Some(0), controller, .. }) if *controller == drag
        ));
    }

    #[test]
    fn keyboard_drop_through_focus() {
        let Board {
            mut stage,
            item,
            targets,
        } = board(DragStrategy::DragOrClick);
        let drag = stage.attach(DropAreaDrag::new(item, targets.to_vec()));
        stage.focus(item, FocusSource::Keyboard);

        press(&mut stage, "Enter");
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);
        assert_eq!(stage.tab_order(), [targets[0], targets[1], item]);
        assert_eq!(stage.focused(), Some(targets[0]));

        press(&mut stage, "Tab");
        assert_eq!(stage.focused(), Some(targets[1]));
        press(&mut stage, "Enter");

        let events = stage.drain_events();
        // The target's activation was consumed by the drop.
        assert!(!events.iter().any(|s| matches!(
            s,
            Signal::Element { event: ElementEvent::Activate { .. }, .. }
        )));
        let drops: Vec<_> = events
            .iter()
            .filter_map(|s| match s {
                Signal::Drag(d) => Some(*d),
                _ => None,
            })
            .collect();
        assert!(matches!(
            drops.as_slice(),
            [
                DragEvent::Started { kind: DragType::Keyboard, .. },
                DragEvent::Completed { drop: Some(1), .. }
            ]
        ));
        assert_eq!(stage.tab_order(), [item]);
        assert_eq!(stage.focused(), Some(item));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
    }

    #[test]
    fn escape_cancels_and_clicks_do_not_start() {
        let Board {
            mut stage,
            item,
            targets,
        } = board(DragStrategy::DragOrClick);
        let drag = stage.attach(DropAreaDrag::new(item, targets.to_vec()).exclude_self());
        stage.focus(item, FocusSource::Keyboard);

        press(&mut stage, "Enter");
        assert_eq!(stage.tab_order(), targets);
        press(&mut stage, "Escape");
        assert!(matches!(
            drag_events(&mut stage).last(),
            Some(DragEvent::Cancelled { .. })
        ));
        assert_eq!(stage.focused(), Some(item));

        // A click activates the item but leaves keyboard mode alone.
        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.pointer_up(PointerInput::mouse(5.0, 5.0));
        assert!(!stage.behavior::<DropAreaDrag>(drag).is_some_and(DropAreaDrag::is_keyboard_active));
        assert_eq!(stage.interaction().depth(), 1);
        assert_eq!(stage.tab_order(), [item]);
        assert!(stage.drain_events().iter().any(|s| matches!(
            s,
            Signal::Element { id, event: ElementEvent::Activate { position: Some(_) } } if *id == item
        )));
    }

    #[test]
    fn reactivating_the_item_cancels() {
        let Board {
            mut stage,
            item,
            targets,
        } = board(DragStrategy::DragOrClick);
        let drag = stage.attach(DropAreaDrag::new(item, targets.to_vec()));
        stage.focus(item, FocusSource::Keyboard);

        press(&mut stage, "Enter");
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);
        stage.focus(item, FocusSource::Keyboard);
        press(&mut stage, "Enter");
        assert!(matches!(
            drag_events(&mut stage).last(),
            Some(DragEvent::Cancelled { .. })
        ));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
        assert_eq!(stage.interaction().depth(), 1);
        assert_eq!(stage.focused(), Some(item));
    }
}
