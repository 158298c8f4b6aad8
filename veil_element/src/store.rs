// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational arena of interactive elements.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::element::{ElementConfig, InteractiveElement};
use crate::geometry::ElementGeometry;
use crate::types::ElementId;

/// Owner of every live element. Removed slots are reused with a bumped
/// generation so stale ids never alias a new element.
#[derive(Default)]
pub struct ElementStore {
    slots: Vec<Option<InteractiveElement>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl fmt::Debug for ElementStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementStore")
            .field("live", &self.len())
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl ElementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new element and return its id.
    pub fn insert(&mut self, config: ElementConfig, geometry: Box<dyn ElementGeometry>) -> ElementId {
        let id = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ElementId::new(idx as u32, generation)
        } else {
            self.slots.push(None);
            self.generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ElementId::new((self.slots.len() - 1) as u32, 1)
        };
        self.slots[id.idx()] = Some(InteractiveElement::new(id, config, geometry));
        tracing::debug!(%id, "element created");
        id
    }

    /// Remove an element. Stale ids return `None`.
    pub fn remove(&mut self, id: ElementId) -> Option<InteractiveElement> {
        if !self.contains(id) {
            return None;
        }
        let element = self.slots[id.idx()].take();
        self.free_list.push(id.idx());
        tracing::debug!(%id, "element removed");
        element
    }

    /// Whether `id` refers to a live element.
    pub fn contains(&self, id: ElementId) -> bool {
        self.generations.get(id.idx()) == Some(&id.1)
            && self.slots.get(id.idx()).is_some_and(Option::is_some)
    }

    /// Borrow a live element.
    pub fn get(&self, id: ElementId) -> Option<&InteractiveElement> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    /// Mutably borrow a live element.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut InteractiveElement> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.slots.get_mut(id.idx())?.as_mut()
    }

    /// Iterate over live elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &InteractiveElement> {
        self.slots.iter().flatten()
    }

    /// Mutably iterate over live elements in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InteractiveElement> {
        self.slots.iter_mut().flatten()
    }

    /// Ids of live elements in slot order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.iter().map(InteractiveElement::id)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
