// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One controller for both pointer and keyboard drags.

use veil_element::ElementId;
use veil_keyboard::KeyPhase;
use veil_stage::{Behavior, BehaviorId, DragPhase, Interaction, Outcome, Signal};

use crate::bounds::DragBounds;
use crate::keyboard::{KeyMotion, KeyboardFreeDrag};
use crate::standard::StandardDrag;

/// A [`StandardDrag`] and a [`KeyboardFreeDrag`] for the same element behind
/// one [`BehaviorId`].
///
/// Both publish under the unified id, so observers cannot tell which input
/// drove the drag. While one side is dragging the other ignores its input.
#[derive(Debug)]
pub struct UnifiedDrag {
    pointer: StandardDrag,
    keyboard: KeyboardFreeDrag,
}

impl UnifiedDrag {
    /// Control pointer and keyboard drags of `target`.
    pub fn new(target: ElementId) -> Self {
        Self {
            pointer: StandardDrag::new(target),
            keyboard: KeyboardFreeDrag::new(target),
        }
    }

    /// Constrain movement for both inputs.
    pub fn with_bounds(self, bounds: DragBounds) -> Self {
        Self {
            pointer: self.pointer.with_bounds(bounds.clone()),
            keyboard: self.keyboard.with_bounds(bounds),
        }
    }

    /// Choose how held keys move the target.
    pub fn with_motion(mut self, motion: KeyMotion) -> Self {
        self.keyboard = self.keyboard.with_motion(motion);
        self
    }

    /// The pointer side.
    pub fn pointer(&self) -> &StandardDrag {
        &self.pointer
    }

    /// The keyboard side.
    pub fn keyboard(&self) -> &KeyboardFreeDrag {
        &self.keyboard
    }
}

impl Behavior for UnifiedDrag {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        if self.keyboard.phase() == DragPhase::Idle {
            self.pointer.on_signal(me, signal, cx);
        }
        if self.pointer.phase() == DragPhase::Idle {
            self.keyboard.on_signal(me, signal, cx);
        }
        Outcome::Continue
    }

    fn on_key(&mut self, me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        self.keyboard.on_key(me, tag, phase, cx);
    }

    fn on_timer(&mut self, me: BehaviorId, tag: u32, cx: &mut Interaction) {
        self.keyboard.on_timer(me, tag, cx);
    }

    fn phase(&self) -> DragPhase {
        self.pointer.phase().max(self.keyboard.phase())
    }

    fn cancel(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        // Only one side can be engaged at a time.
        self.pointer.cancel(me, cx) || self.keyboard.cancel(me, cx)
    }

    fn dispose(&mut self, me: BehaviorId, cx: &mut Interaction) {
        self.pointer.dispose(me, cx);
        self.keyboard.dispose(me, cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::{Point, Rect};
    use veil_element::{DragStrategy, DragType, ElementConfig, FocusSource, PointerInput};
    use veil_keyboard::KeyEvent;
    use veil_stage::{DragEvent, Stage, StageConfig};

    #[test]
    fn both_inputs_publish_under_one_id() {
        let mut stage = Stage::new(StageConfig::default());
        let id = stage.create_element(
            ElementConfig::new("crate").drag(DragStrategy::DragOrClick),
            Box::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        stage.activate_context(vec![id], false);
        let drag = stage.attach(UnifiedDrag::new(id).with_motion(KeyMotion::PerTick {
            interval_ms: 100,
            step: 1.0,
        }));

        stage.pointer_down(PointerInput::mouse(5.0, 5.0));
        stage.pointer_move(PointerInput::mouse(20.0, 5.0));
        // Keys do nothing while the pointer drags.
        stage.key_down(&KeyEvent::new("Enter"));
        stage.key_up(&KeyEvent::new("Enter"));
        assert!(!stage.behavior::<UnifiedDrag>(drag).is_some_and(|u| u.keyboard().is_active()));
        stage.pointer_up(PointerInput::mouse(20.0, 5.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);

        stage.focus(id, FocusSource::Keyboard);
        stage.key_down(&KeyEvent::new("Enter"));
        stage.key_up(&KeyEvent::new("Enter"));
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);
        stage.key_down(&KeyEvent::new("ArrowUp"));
        assert!(stage.cancel_drag(drag));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);

        let drags: Vec<_> = stage
            .drain_events()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Drag(d) => Some(d),
                _ => None,
            })
            .collect();
        assert!(drags.iter().all(|d| d.controller() == drag));
        let kinds: Vec<_> = drags
            .iter()
            .filter_map(|d| match d {
                DragEvent::Started { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, [DragType::Held, DragType::Keyboard]);
        assert!(drags.contains(&DragEvent::Moved {
            controller: drag,
            target: id,
            position: Point::new(0.0, -1.0),
        }));
        assert!(matches!(drags.last(), Some(DragEvent::Cancelled { .. })));
    }
}
