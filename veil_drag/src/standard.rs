// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer drag controller.

use kurbo::{Point, Vec2};
use veil_element::{DragType, ElementEvent, ElementId};
use veil_stage::{Behavior, BehaviorId, DragEvent, DragPhase, Interaction, Outcome, Signal};

use crate::bounds::DragBounds;

/// Follows one element's pointer drag events and publishes
/// [`DragEvent`]s for it.
///
/// The grab offset is kept so the target does not jump to the pointer.
/// [`DragEvent::Moved`] carries the new origin of the target's bounds; the
/// application moves its object there.
#[derive(Clone, Debug)]
pub struct StandardDrag {
    target: ElementId,
    bounds: DragBounds,
    phase: DragPhase,
    kind: Option<DragType>,
    offset: Vec2,
    start: Point,
    position: Point,
}

impl StandardDrag {
    /// Control drags of `target`.
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            bounds: DragBounds::Unbounded,
            phase: DragPhase::Idle,
            kind: None,
            offset: Vec2::ZERO,
            start: Point::ORIGIN,
            position: Point::ORIGIN,
        }
    }

    /// Constrain movement.
    pub fn with_bounds(mut self, bounds: DragBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// The dragged element.
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// How the current drag is held.
    pub fn kind(&self) -> Option<DragType> {
        self.kind
    }

    /// Target origin when the drag started.
    pub fn start_position(&self) -> Point {
        self.start
    }

    /// Latest target origin.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Feed one element event. Publishes start, move and cancel signals and
    /// returns the pointer position when the drag ends normally, leaving the
    /// completion signal to the caller.
    pub(crate) fn track(
        &mut self,
        me: BehaviorId,
        event: &ElementEvent,
        cx: &mut Interaction,
    ) -> Option<Point> {
        match *event {
            ElementEvent::DragStart { position, kind } => {
                self.start(me, position, kind, cx);
                None
            }
            ElementEvent::DragMove { position, .. } => {
                self.move_to(me, position, cx);
                None
            }
            ElementEvent::DragStop { position, .. } if self.phase != DragPhase::Idle => {
                self.move_to(me, position, cx);
                self.phase = DragPhase::Idle;
                self.kind = None;
                tracing::debug!(target = %self.target, "pointer drag stopped");
                Some(position)
            }
            ElementEvent::DragCancel if self.phase != DragPhase::Idle => {
                self.reset();
                cx.emit(Signal::Drag(DragEvent::Cancelled {
                    controller: me,
                    target: self.target,
                }));
                None
            }
            _ => None,
        }
    }

    fn start(&mut self, me: BehaviorId, pointer: Point, kind: DragType, cx: &mut Interaction) {
        let origin = cx
            .element(self.target)
            .map_or(pointer, |e| e.bounds().origin());
        self.offset = pointer - origin;
        self.start = origin;
        self.position = origin;
        self.kind = Some(kind);
        self.phase = if kind.is_sticky() {
            DragPhase::Armed
        } else {
            DragPhase::Dragging
        };
        tracing::debug!(target = %self.target, ?kind, "pointer drag started");
        cx.emit(Signal::Drag(DragEvent::Started {
            controller: me,
            target: self.target,
            kind,
        }));
    }

    fn move_to(&mut self, me: BehaviorId, pointer: Point, cx: &mut Interaction) {
        if self.phase == DragPhase::Idle {
            return;
        }
        self.phase = DragPhase::Dragging;
        let size = cx
            .element(self.target)
            .map(|e| e.bounds().size())
            .unwrap_or_default();
        let Some(position) = self.bounds.apply(pointer - self.offset, size) else {
            return;
        };
        if position == self.position {
            return;
        }
        self.position = position;
        cx.emit(Signal::Drag(DragEvent::Moved {
            controller: me,
            target: self.target,
            position,
        }));
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.kind = None;
    }

    pub(crate) fn abort(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        if self.phase == DragPhase::Idle {
            return false;
        }
        cx.cancel_element_drag(self.target);
        self.reset();
        tracing::debug!(target = %self.target, "pointer drag cancelled");
        cx.emit(Signal::Drag(DragEvent::Cancelled {
            controller: me,
            target: self.target,
        }));
        true
    }
}

impl Behavior for StandardDrag {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        let Some(event) = signal.element_event(self.target) else {
            return Outcome::Continue;
        };
        if self.track(me, event, cx).is_some() {
            cx.emit(Signal::Drag(DragEvent::Completed {
                controller: me,
                target: self.target,
                drop: None,
            }));
        }
        Outcome::Continue
    }

    fn phase(&self) -> DragPhase {
        self.phase
    }

    fn cancel(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        self.abort(me, cx)
    }

    fn dispose(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        cx.cancel_element_drag(self.target);
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::Rect;
    use veil_element::{DragStrategy, ElementConfig, PointerInput, SharedBounds};
    use veil_stage::{Stage, StageConfig};

    fn drags(stage: &mut Stage) -> Vec<DragEvent> {
        stage
            .drain_events()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Drag(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    fn piece(stage: &mut Stage, strategy: DragStrategy) -> (ElementId, SharedBounds) {
        let bounds = SharedBounds::new(Rect::new(10.0, 10.0, 30.0, 30.0));
        let id = stage.create_element(
            ElementConfig::new("piece").drag(strategy),
            Box::new(bounds.clone()),
        );
        stage.activate_context(vec![id], false);
        (id, bounds)
    }

    #[test]
    fn held_drag_keeps_grab_offset() {
        let mut stage = Stage::new(StageConfig::default());
        let (id, _) = piece(&mut stage, DragStrategy::DragOrClick);
        let drag = stage.attach(StandardDrag::new(id));

        stage.pointer_down(PointerInput::mouse(15.0, 15.0));
        stage.pointer_move(PointerInput::mouse(35.0, 15.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);
        stage.pointer_up(PointerInput::mouse(45.0, 20.0));

        let events = drags(&mut stage);
        assert_eq!(
            events,
            [
                DragEvent::Started {
                    controller: drag,
                    target: id,
                    kind: DragType::Held
                },
                DragEvent::Moved {
                    controller: drag,
                    target: id,
                    position: Point::new(30.0, 10.0)
                },
                DragEvent::Moved {
                    controller: drag,
                    target: id,
                    position: Point::new(40.0, 15.0)
                },
                DragEvent::Completed {
                    controller: drag,
                    target: id,
                    drop: None
                },
            ]
        );
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
    }

    #[test]
    fn sticky_click_arms_then_completes_on_second_click() {
        let mut stage = Stage::new(StageConfig::default());
        let (id, _) = piece(&mut stage, DragStrategy::DragWithStickyClick);
        let drag = stage.attach(StandardDrag::new(id));

        stage.pointer_down(PointerInput::mouse(15.0, 15.0));
        stage.pointer_up(PointerInput::mouse(15.0, 15.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Armed);
        stage.pointer_move(PointerInput::mouse(60.0, 60.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);
        // The second click lands away from the piece's proxy.
        stage.pointer_down(PointerInput::mouse(80.0, 80.0));
        stage.pointer_up(PointerInput::mouse(80.0, 80.0));
        assert!(matches!(
            drags(&mut stage).last(),
            Some(DragEvent::Completed { .. })
        ));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
    }

    #[test]
    fn bounds_clamp_and_cancel_restores_idle() {
        let mut stage = Stage::new(StageConfig::default());
        let (id, _) = piece(&mut stage, DragStrategy::DragOnly);
        let area = Rect::new(0.0, 0.0, 50.0, 50.0);
        let drag = stage.attach(StandardDrag::new(id).with_bounds(DragBounds::Rect(area)));

        stage.pointer_down(PointerInput::mouse(15.0, 15.0));
        stage.pointer_move(PointerInput::mouse(100.0, 15.0));
        let last = stage.behavior::<StandardDrag>(drag).map(StandardDrag::position);
        assert_eq!(last, Some(Point::new(30.0, 10.0)));

        assert!(stage.cancel_drag(drag));
        assert!(!stage.cancel_drag(drag));
        let events = drags(&mut stage);
        assert!(matches!(events.last(), Some(DragEvent::Cancelled { .. })));
        assert!(!events.iter().any(|e| matches!(e, DragEvent::Completed { .. })));
        // The element let go of the pointer.
        stage.pointer_move(PointerInput::mouse(20.0, 20.0));
        assert!(drags(&mut stage).is_empty());
    }

    #[test]
    fn sticky_tap_ends_on_unclaimed_tap_only() {
        let mut stage = Stage::new(StageConfig::default());
        let (id, _) = piece(&mut stage, DragStrategy::DragWithStickyClickTap);
        let other = stage.create_element(
            ElementConfig::new("other").drag(DragStrategy::DragOnly),
            Box::new(Rect::new(100.0, 100.0, 120.0, 120.0)),
        );
        stage.activate_context(vec![id, other], false);
        let drag = stage.attach(StandardDrag::new(id));

        stage.pointer_down(PointerInput::touch(1, 15.0, 15.0));
        stage.pointer_up(PointerInput::touch(1, 15.0, 15.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Armed);

        // Finger 2 grabs the other element and keeps its id claimed.
        stage.pointer_down(PointerInput::touch(2, 110.0, 110.0));
        stage.pointer_up(PointerInput::touch(2, 110.0, 110.0));
        stage.pointer_down(PointerInput::touch(2, 110.0, 110.0));
        stage.pointer_up(PointerInput::touch(2, 110.0, 110.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Armed);

        // A fresh, unclaimed tap finishes the sticky drag.
        stage.pointer_down(PointerInput::touch(3, 60.0, 60.0));
        stage.pointer_up(PointerInput::touch(3, 60.0, 60.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
    }
}
