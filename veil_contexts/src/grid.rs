// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-dimensional grid context.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use veil_element::{ElementConfig, ElementEvent, ElementId, FocusSource, NoGeometry};
use veil_keyboard::{Direction, KeyPhase};
use veil_stage::{
    Behavior, BehaviorId, ChildContext, Disposables, Interaction, Outcome, Resource, Signal,
};

/// How Tab moves through a grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum GridTabMode {
    /// Every cell, row by row.
    #[default]
    Flat,
    /// One group per row. Entering a row tabs through its cells.
    RowsFirst,
    /// One group per column. Entering a column tabs through its cells.
    ColumnsFirst,
}

/// Grid navigation options.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridOptions {
    /// Tab structure.
    pub tab_mode: GridTabMode,
    /// Arrow movement onto a gap continues in the same direction instead of
    /// stopping.
    pub arrow_skips_gaps: bool,
    /// Arrow movement past an edge wraps to the opposite edge.
    pub arrow_loops_at_edges: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            tab_mode: GridTabMode::Flat,
            arrow_skips_gaps: true,
            arrow_loops_at_edges: false,
        }
    }
}

/// Rows of cells; `None` is a gap. Rows may differ in length.
pub type GridCells = Vec<Vec<Option<ElementId>>>;

fn cell_at(cells: &[Vec<Option<ElementId>>], x: usize, y: usize) -> Option<ElementId> {
    cells.get(y)?.get(x).copied().flatten()
}

fn step(pos: usize, delta: i32, len: usize, wrap: bool) -> Option<usize> {
    match delta {
        0 => Some(pos),
        d if d > 0 => {
            if pos + 1 < len {
                Some(pos + 1)
            } else if wrap {
                (len > 0).then_some(0)
            } else {
                None
            }
        }
        _ => {
            if pos > 0 && pos <= len {
                Some(pos - 1)
            } else if wrap {
                len.checked_sub(1)
            } else {
                None
            }
        }
    }
}

/// The cell an arrow press moves to from `from`, as `(x, y)`.
///
/// Width is the longest row. Gaps are skipped or block movement depending
/// on [`GridOptions::arrow_skips_gaps`]; edges wrap or block depending on
/// [`GridOptions::arrow_loops_at_edges`]. Returns `None` when focus should
/// stay put.
pub fn target_cell(
    cells: &[Vec<Option<ElementId>>],
    from: (usize, usize),
    direction: Direction,
    options: &GridOptions,
) -> Option<(usize, usize)> {
    let height = cells.len();
    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    let (dx, dy) = direction.delta();
    let (mut x, mut y) = from;
    let steps = if dx != 0 { width } else { height };
    for _ in 0..steps {
        x = step(x, dx, width, options.arrow_loops_at_edges)?;
        y = step(y, dy, height, options.arrow_loops_at_edges)?;
        if (x, y) == from {
            return None;
        }
        if cell_at(cells, x, y).is_some() {
            return Some((x, y));
        }
        if !options.arrow_skips_gaps {
            return None;
        }
    }
    None
}

#[derive(Copy, Clone, Debug)]
struct Line {
    element: ElementId,
    first: (usize, usize),
}

enum Origin {
    Cell((usize, usize)),
    Line((usize, usize)),
    Start,
}

/// A complex context over a sparse 2D grid of elements.
///
/// Push it with [`ContextSpec::complex`](veil_stage::ContextSpec::complex).
/// Depending on [`GridTabMode`] Tab walks every cell or a row/column group
/// per line. Arrow, WASD and numpad keys move between cells with
/// [`target_cell`]. An arrow press while tabbing by groups switches the
/// context to the flat cell list for the rest of its activation, so Tab
/// continues from the arrowed-to cell.
///
/// The current cell follows every focus signal, whatever moved focus.
#[derive(Debug)]
pub struct GridContext {
    cells: GridCells,
    options: GridOptions,
    lines: Vec<Line>,
    context: Option<String>,
    cursor: Option<(usize, usize)>,
    flat: bool,
    keys: Disposables,
}

impl GridContext {
    /// A grid over `cells`, indexed `cells[y][x]`.
    pub fn new(cells: GridCells, options: GridOptions) -> Self {
        Self {
            cells,
            options,
            lines: Vec::new(),
            context: None,
            cursor: None,
            flat: false,
            keys: Disposables::new(),
        }
    }

    /// The cells.
    pub fn cells(&self) -> &[Vec<Option<ElementId>>] {
        &self.cells
    }

    /// The options.
    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// The element at `(x, y)`.
    pub fn cell(&self, x: usize, y: usize) -> Option<ElementId> {
        cell_at(&self.cells, x, y)
    }

    /// First cell holding `id`, in row order.
    pub fn position_of(&self, id: ElementId) -> Option<(usize, usize)> {
        self.cells.iter().enumerate().find_map(|(y, row)| {
            row.iter()
                .position(|&c| c == Some(id))
                .map(|x| (x, y))
        })
    }

    /// The cell that last received focus.
    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.cursor
    }

    /// Whether Tab currently walks every cell.
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    /// Name of the context this grid currently fills.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Group elements created for rows or columns.
    pub fn group_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.lines.iter().map(|l| l.element)
    }

    fn cells_in_order(&self) -> Vec<ElementId> {
        self.cells.iter().flatten().flatten().copied().collect()
    }

    fn first_cell(&self) -> Option<(usize, usize)> {
        self.cells.iter().enumerate().find_map(|(y, row)| {
            row.iter().position(Option::is_some).map(|x| (x, y))
        })
    }

    fn ensure_lines(&mut self, cx: &mut Interaction) {
        if !self.lines.is_empty() {
            return;
        }
        let width = self.cells.iter().map(Vec::len).max().unwrap_or(0);
        let (count, rows) = match self.options.tab_mode {
            GridTabMode::Flat => return,
            GridTabMode::RowsFirst => (self.cells.len(), true),
            GridTabMode::ColumnsFirst => (width, false),
        };
        for n in 0..count {
            let positions: Vec<(usize, usize)> = if rows {
                (0..width).map(|x| (x, n)).collect()
            } else {
                (0..self.cells.len()).map(|y| (n, y)).collect()
            };
            let occupied: Vec<((usize, usize), ElementId)> = positions
                .into_iter()
                .filter_map(|(x, y)| self.cell(x, y).map(|id| ((x, y), id)))
                .collect();
            let Some(&(first, _)) = occupied.first() else {
                continue;
            };
            let config = if rows {
                ElementConfig::new(&format!("Row {}", n + 1)).role("row")
            } else {
                ElementConfig::new(&format!("Column {}", n + 1)).role("group")
            };
            let element = cx.create_element(config, Box::new(NoGeometry));
            let members = occupied.into_iter().map(|(_, id)| id).collect();
            cx.set_child_context(element, Some(ChildContext::Items(members)));
            self.lines.push(Line { element, first });
        }
        tracing::debug!(lines = self.lines.len(), rows, "grid groups created");
    }

    fn origin(&self, cx: &Interaction) -> Option<Origin> {
        match cx.focused() {
            Some(focused) => {
                if let Some(line) = self.lines.iter().find(|l| l.element == focused) {
                    return Some(Origin::Line(line.first));
                }
                let at_cursor = self
                    .cursor
                    .filter(|&(x, y)| self.cell(x, y) == Some(focused));
                at_cursor.or_else(|| self.position_of(focused)).map(Origin::Cell)
            }
            None => {
                let context = self.context.as_deref()?;
                if cx.top_context() != Some(context) {
                    return None;
                }
                Some(self.cursor.map_or(Origin::Start, Origin::Cell))
            }
        }
    }

    /// Arrows apply while the grid, or a row or column entered from it, is
    /// the top context.
    fn is_live(&self, cx: &Interaction) -> bool {
        let (Some(context), Some(top)) = (self.context.as_deref(), cx.top_context()) else {
            return false;
        };
        top == context
            || cx
                .context_owner(top)
                .is_some_and(|owner| self.lines.iter().any(|l| l.element == owner))
    }

    fn bind_keys(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let layer = cx.add_quick_key_context();
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
        self.keys.add(Resource::KeyLayer(layer));
    }

    /// Drop the key layer while another context covers the grid, and bind it
    /// again once the grid is back on top.
    fn sync_keys(&mut self, me: BehaviorId, cx: &mut Interaction) {
        let live = self.is_live(cx);
        if live && self.keys.is_empty() {
            self.bind_keys(me, cx);
            tracing::trace!("grid keys restored");
        } else if !live && !self.keys.is_empty() {
            self.keys.dispose(cx);
            tracing::trace!("grid keys suspended");
        }
    }

    fn arrow(&mut self, direction: Direction, cx: &mut Interaction) {
        let Some(context) = self.context.clone() else {
            return;
        };
        // Focus outside the grid (a dialog above it, say) leaves arrows alone.
        let Some(origin) = self.origin(cx) else {
            return;
        };
        let target = match origin {
            Origin::Cell(from) => target_cell(&self.cells, from, direction, &self.options),
            Origin::Line(first) => Some(first),
            Origin::Start => self.first_cell(),
        };
        let Some(id) = target.and_then(|(x, y)| self.cell(x, y)) else {
            tracing::trace!(?direction, "no grid cell in that direction");
            return;
        };
        if !self.flat {
            cx.pop_context(Some(&context), true);
            cx.replace_current_context(Some(&context), self.cells_in_order());
            self.flat = true;
            tracing::debug!(context = %context, "grid switched to flat arrow navigation");
        }
        cx.focus(id, FocusSource::Keyboard);
    }
}

impl Behavior for GridContext {
    fn on_signal(&mut self, me: BehaviorId, signal: &Signal, cx: &mut Interaction) -> Outcome {
        match signal {
            Signal::Element {
                id,
                event: ElementEvent::Focus { .. },
            } => {
                let current = self.cursor.and_then(|(x, y)| self.cell(x, y));
                if current != Some(*id) {
                    if let Some(position) = self.position_of(*id) {
                        self.cursor = Some(position);
                    }
                }
            }
            Signal::ContextPushed { .. } | Signal::ContextPopped { .. } => self.sync_keys(me, cx),
            _ => {}
        }
        Outcome::Continue
    }

    fn on_key(&mut self, _me: BehaviorId, tag: u32, phase: KeyPhase, cx: &mut Interaction) {
        if phase != KeyPhase::Down {
            return;
        }
        if let Some(direction) = Direction::from_index(tag as usize) {
            self.arrow(direction, cx);
        }
    }

    fn activate(&mut self, me: BehaviorId, context: &str, cx: &mut Interaction) {
        self.keys.dispose(cx);
        self.context = Some(context.to_string());
        self.flat = self.options.tab_mode == GridTabMode::Flat;
        let items = if self.flat {
            self.cells_in_order()
        } else {
            self.ensure_lines(cx);
            self.lines.iter().map(|l| l.element).collect()
        };
        cx.replace_current_context(Some(context), items);
        self.bind_keys(me, cx);
        tracing::debug!(context = %context, mode = ?self.options.tab_mode, "grid activated");
    }

    fn deactivate(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        self.keys.dispose(cx);
        self.context = None;
        self.flat = false;
    }

    fn context_members(&self) -> Vec<ElementId> {
        let mut members = self.cells_in_order();
        members.extend(self.group_elements());
        members
    }

    fn dispose(&mut self, _me: BehaviorId, cx: &mut Interaction) {
        self.keys.dispose(cx);
        for line in self.lines.drain(..) {
            cx.destroy_element(line.element);
        }
        self.context = None;
    }
}
