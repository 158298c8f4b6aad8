// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyboard drag controller.

use kurbo::{Point, Vec2};
use veil_element::{DragType, ElementEvent, ElementId};
use veil_keyboard::{Direction, KeyCombo, KeyPhase};
use veil_stage::{
    Behavior, BehaviorId, Disposables, DragEvent, DragPhase, Interaction, Outcome, Resource,
    Signal, TimerId,
};

use crate::bounds::DragBounds;

const ESCAPE_TAG: u32 = 4;
const STEP_TAG: u32 = 5;

/// How held direction keys move the target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum KeyMotion {
    /// Move `step` units immediately and then every `interval_ms`.
    PerTick {
        /// Time between steps.
        interval_ms: u64,
        /// Distance per step.
        step: f64,
    },
    /// Move continuously at `speed` units per second, on frame ticks.
    PerSecond {
        /// Units per second.
        speed: f64,
    },
}

impl Default for KeyMotion {
    fn default() -> Self {
        Self::PerTick {
            interval_ms: 100,
            step: 10.0,
        }
    }
}

/// Moves an element with arrow, WASD or numpad keys.
///
/// Activating the target without a pointer (Enter, Space, dwell) toggles
/// the drag. While it runs a keyboard context with the direction keys and
/// Escape is pushed. Escape, a second activation or losing focus end the
/// drag with [`DragEvent::Completed`].
#[derive(Debug)]
pub struct KeyboardFreeDrag {
    target: ElementId,
    bounds: DragBounds,
    motion: KeyMotion,
    active: bool,
    held: [bool; 4],
    timer: Option<TimerId>,
    keys: Disposables,
    start: Point,
    position: Point,
}

impl KeyboardFreeDrag {
    /// Control keyboard drags of `target`.
    pub fn new(target: ElementId) -> Self {
        Self {
            target,
            bounds: DragBounds::Unbounded,
            motion: KeyMotion::default(),
            active: false,
            held: [false; 4],
            timer: None,
            keys: Disposables::new(),
            start: Point::ORIGIN,
            position: Point::ORIGIN,
        }
    }

    /// Constrain movement.
    pub fn with_bounds(mut self, bounds: DragBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Choose how held keys move the target.
    pub fn with_motion(mut self, motion: KeyMotion) -> Self {
        self.motion = motion;
        self
    }

    /// The dragged element.
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Whether a keyboard drag is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Target origin when the drag started.
    pub fn start_position(&self) -> Point {
        self.start
    }

    /// Latest target origin.
    pub fn position(&self) -> Point {
        self.position
    }

    fn begin(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let Some(origin) = cx.element(self.target).map(|e| e.bounds().origin()) else {
            return;
        };
        self.active = true;
        self.start = origin;
        self.position = origin;
        let layer = cx.add_quick_key_context();
        self.keys.add(Resource::KeyLayer(layer));
        for direction in Direction::ALL {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "Direction indices are below 4."
            )]
            let tag = direction.index() as u32;
            for combo in direction.combos() {
                cx.bind_key(layer, combo, me, tag);
            }
        }
        cx.bind_key(layer, KeyCombo::key_only("escape"), me, ESCAPE_TAG);
        tracing::debug!(target = %self.target, "keyboard drag started");
        cx.emit(Signal::Drag(DragEvent::Started {
            controller: me,
            target: self.target,
            kind: DragType::Keyboard,
        }));
    }

    fn stop(&mut self, cx: &mut Interaction) {
        self.active = false;
        self.held = [false; 4];
        if let Some(timer) = self.timer.take() {
            cx.cancel_timer(timer);
        }
        self.keys.dispose(cx);
    }

    fn finish(&mut self, me: BehaviorId, cx: &mut Interaction) {
        if !self.active {
            return;
        }
        self.stop(cx);
        tracing::debug!(target = %self.target, "keyboard drag completed");
        cx.emit(Signal::Drag(DragEvent::Completed {
            controller: me,
            target: self.target,
            drop: None,
        }));
    }

    fn heading(&self) -> Vec2 {
        Direction::ALL
            .iter()
            .filter(|d| self.held[d.index()])
            .fold(Vec2::ZERO, |acc, d| {
                let (dx, dy) = d.delta();
                acc + Vec2::new(f64::from(dx), f64::from(dy))
            })
    }

    fn advance(&mut self, me: BehaviorId, distance: f64, cx: &mut Interaction) {
        let heading = self.heading();
        if heading == Vec2::ZERO || distance <= 0.0 {
            return;
        }
        let size = cx
            .element(self.target)
            .map(|e| e.bounds().size())
            .unwrap_or_default();
        let Some(position) = self.bounds.apply(self.position + heading * distance, size) else {
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

    fn press(&mut self, me: BehaviorId, direction: Direction, cx: &mut Interaction) {
        if self.held[direction.index()] {
            return;
        }
        self.held[direction.index()] = true;
        if let KeyMotion::PerTick { interval_ms, step } = self.motion {
            self.advance(me, step, cx);
            if self.timer.is_none() {
                self.timer = Some(cx.schedule_repeating(me, STEP_TAG, interval_ms));
            }
        }
    }

    fn release(&mut self, direction: Direction, cx: &mut Interaction) {
        self.held[direction.index()] = false;
        if self.held.iter().any(|&h| h) {
            return;
        }
        if let Some(timer) = self.timer.take() {
            cx.cancel_timer(timer);
        }
    }
}

impl Behavior for KeyboardFreeDrag {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        if let Signal::Tick { delta, .. } = *signal {
            if let (true, KeyMotion::PerSecond { speed }) = (self.active, self.motion) {
                let seconds = delta as f64 / 1000.0;
                self.advance(me, speed * seconds, cx);
            }
            return Outcome::Continue;
        }
        match signal.element_event(self.target) {
            Some(ElementEvent::Activate { position: None }) => {
                if self.active {
                    self.finish(me, cx);
                } else {
                    self.begin(me, cx);
                }
            }
            Some(ElementEvent::Blur { .. }) => self.finish(me, cx),
            _ => {}
        }
        Outcome::Continue
    }

    fn on_key(&mut self, me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        if !self.active {
            return;
        }
        if tag == ESCAPE_TAG {
            if phase == KeyPhase::Down {
                self.finish(me, cx);
            }
            return;
        }
        let Some(direction) = Direction::from_index(tag as usize) else {
            return;
        };
        match phase {
            KeyPhase::Down => self.press(me, direction, cx),
            KeyPhase::Up => self.release(direction, cx),
        }
    }

    fn on_timer(&mut self, me: BehaviorId, tag: u32, cx: &mut Interaction) {
        if let (STEP_TAG, KeyMotion::PerTick { step, .. }) = (tag, self.motion) {
            self.advance(me, step, cx);
        }
    }

    fn phase(&self) -> DragPhase {
        if self.active {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    fn cancel(&mut self, me: BehaviorId, cx: &mut Interaction) -> bool {
        if !self.active {
            return false;
        }
        self.stop(cx);
        tracing::debug!(target = %self.target, "keyboard drag cancelled");
        cx.emit(Signal::Drag(DragEvent::Cancelled {
            controller: me,
            target: self.target,
        }));
        true
    }

    fn dispose(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        self.stop(cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::Rect;
    use veil_element::{ElementConfig, FocusSource};
    use veil_keyboard::KeyEvent;
    use veil_stage::{Stage, StageConfig};

    fn setup(motion: KeyMotion) -> (Stage, ElementId, BehaviorId) {
        let mut stage = Stage::new(StageConfig::default());
        let id = stage.create_element(
            ElementConfig::new("token"),
            Box::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        stage.activate_context(vec![id], false);
        stage.focus(id, FocusSource::Keyboard);
        let drag = stage.attach(KeyboardFreeDrag::new(id).with_motion(motion));
        stage.tick(0);
        (stage, id, drag)
    }

    fn tap(stage: &mut Stage, key: &str) {
        stage.key_down(&KeyEvent::new(key));
        stage.key_up(&KeyEvent::new(key));
    }

    fn positions(stage: &mut Stage) -> Vec<Point> {
        stage
            .drain_events()
            .into_iter()
            .filter_map(|s| match s {
                Signal::Drag(DragEvent::Moved { position, .. }) => Some(position),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn enter_toggles_and_arrows_step_per_tick() {
        let (mut stage, _, drag) = setup(KeyMotion::PerTick {
            interval_ms: 50,
            step: 5.0,
        });
        tap(&mut stage, "Enter");
        assert_eq!(stage.drag_phase(drag), DragPhase::Dragging);

        stage.key_down(&KeyEvent::new("ArrowRight"));
        stage.tick(50);
        stage.tick(100);
        stage.key_up(&KeyEvent::new("ArrowRight"));
        stage.tick(150);
        assert_eq!(
            positions(&mut stage),
            [Point::new(5.0, 0.0), Point::new(10.0, 0.0), Point::new(15.0, 0.0)]
        );

        tap(&mut stage, "Enter");
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
        // Direction keys are unbound again.
        stage.key_down(&KeyEvent::new("ArrowRight"));
        assert!(positions(&mut stage).is_empty());
    }

    #[test]
    fn per_second_motion_follows_tick_delta() {
        let (mut stage, _, drag) = setup(KeyMotion::PerSecond { speed: 100.0 });
        tap(&mut stage, "Space");
        stage.key_down(&KeyEvent::new("s"));
        stage.key_down(&KeyEvent::new("d"));
        stage.tick(100);
        assert_eq!(positions(&mut stage), [Point::new(10.0, 10.0)]);

        tap(&mut stage, "Escape");
        let completed = stage.drain_events().into_iter().any(|s| {
            matches!(s, Signal::Drag(DragEvent::Completed { controller, .. }) if controller == drag)
        });
        assert!(completed);
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
        // Escape was consumed by the drag; focus is untouched.
        assert!(stage.focused().is_some());
    }

    #[test]
    fn clicks_do_not_start_a_keyboard_drag() {
        let (mut stage, _, drag) = setup(KeyMotion::default());
        stage.pointer_down(veil_element::PointerInput::mouse(5.0, 5.0));
        stage.pointer_up(veil_element::PointerInput::mouse(5.0, 5.0));
        assert_eq!(stage.drag_phase(drag), DragPhase::Idle);
    }
}
