// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus contexts and composition of the reachable set.
//!
//! ## Composition
//!
//! Given the context stack, the baseline, and the group table, the stage
//! derives two disjoint lists:
//!
//! - **Tabbable**: `baseline.prepend ++ top.items ++ baseline.append` when
//!   the top context allows the baseline, otherwise `top.items` alone. With
//!   an empty stack only the baseline remains.
//! - **Family**: elements reachable by pointer but not by Tab. These are the
//!   descendants of every tabbable group (children of nested groups
//!   included, the nested group elements and keyboard-only children
//!   excluded) plus, walking up through child contexts, every parent
//!   context's items and their descendants.
//!
//! Both lists skip dead ids and contain no duplicates. The group graph may
//! contain cycles; traversal keeps a visited set.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use veil_element::{ElementId, ElementStore};

use crate::behavior::BehaviorId;

/// The child context of a group element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildContext {
    /// A plain list of elements.
    Items(Vec<ElementId>),
    /// A context provided by a behavior (for example a grid).
    Complex(BehaviorId),
}

/// Description of a context to activate.
///
/// A plain `Vec<ElementId>` converts into an auto-named spec that merges
/// with the baseline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextSpec {
    /// Context name; generated when absent.
    pub name: Option<String>,
    /// Elements in Tab order. Complex contexts fill this themselves.
    pub items: Vec<ElementId>,
    /// Whether the baseline is merged around the items.
    pub allow_baseline: bool,
    /// Behavior providing this context.
    pub complex: Option<BehaviorId>,
}

impl ContextSpec {
    /// A named, empty context that does not merge with the baseline.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            ..Self::default()
        }
    }

    /// A context provided by `behavior`.
    pub fn complex(behavior: BehaviorId) -> Self {
        Self {
            complex: Some(behavior),
            ..Self::default()
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(String::from(name));
        self
    }

    /// Set the items.
    pub fn with_items(mut self, items: Vec<ElementId>) -> Self {
        self.items = items;
        self
    }

    /// Set whether the baseline is merged.
    pub fn with_baseline(mut self, allow: bool) -> Self {
        self.allow_baseline = allow;
        self
    }
}

impl From<Vec<ElementId>> for ContextSpec {
    fn from(items: Vec<ElementId>) -> Self {
        Self {
            items,
            allow_baseline: true,
            ..Self::default()
        }
    }
}

/// A context on the stack.
#[derive(Clone, Debug)]
pub(crate) struct FocusContext {
    pub(crate) name: String,
    pub(crate) items: Vec<ElementId>,
    pub(crate) allow_baseline: bool,
    /// Linked under the context below it.
    pub(crate) is_child: bool,
    pub(crate) complex: Option<BehaviorId>,
    /// Group element this context was entered from.
    pub(crate) owner: Option<ElementId>,
    /// Exit sentinels bracketing `items`.
    pub(crate) sentinels: Option<(ElementId, ElementId)>,
}

impl FocusContext {
    /// Replace the items, keeping sentinels at both ends.
    pub(crate) fn set_items(&mut self, items: Vec<ElementId>) {
        self.items = match self.sentinels {
            Some((start, end)) => {
                let mut bracketed = Vec::with_capacity(items.len() + 2);
                bracketed.push(start);
                bracketed.extend(items.into_iter().filter(|&id| id != start && id != end));
                bracketed.push(end);
                bracketed
            }
            None => items,
        };
    }
}

/// Elements merged into every context that allows it.
#[derive(Clone, Debug, Default)]
pub(crate) struct Baseline {
    pub(crate) prepend: Vec<ElementId>,
    pub(crate) append: Vec<ElementId>,
}

/// A group's child context plus the elements it can contain.
#[derive(Clone, Debug)]
pub(crate) struct GroupEntry {
    pub(crate) child: ChildContext,
    pub(crate) members: Vec<ElementId>,
}

/// The composed reachable set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Composition {
    pub(crate) tabbable: Vec<ElementId>,
    pub(crate) family: Vec<ElementId>,
}

impl Composition {
    pub(crate) fn contains(&self, id: ElementId) -> bool {
        self.tabbable.contains(&id) || self.family.contains(&id)
    }
}

pub(crate) fn compose(
    stack: &[FocusContext],
    baseline: &Baseline,
    groups: &HashMap<ElementId, GroupEntry>,
    elements: &ElementStore,
) -> Composition {
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut out = Composition::default();

    let push_tabbable = |id: ElementId, seen: &mut HashSet<ElementId>, out: &mut Composition| {
        if elements.contains(id) && seen.insert(id) {
            out.tabbable.push(id);
        }
    };
    match stack.last() {
        Some(top) if !top.allow_baseline => {
            for &id in &top.items {
                push_tabbable(id, &mut seen, &mut out);
            }
        }
        top => {
            let items = top.map(|t| t.items.as_slice()).unwrap_or_default();
            for &id in baseline.prepend.iter().chain(items).chain(&baseline.append) {
                push_tabbable(id, &mut seen, &mut out);
            }
        }
    }

    let mut visited: HashSet<ElementId> = HashSet::new();
    let tabbable = out.tabbable.clone();
    for id in tabbable {
        descendants(id, groups, elements, &mut visited, &mut seen, &mut out.family);
    }

    // Walk up through child contexts.
    let mut level = stack.len();
    while level >= 2 && stack[level - 1].is_child {
        let parent = &stack[level - 2];
        for &id in &parent.items {
            let sentinel = elements.get(id).is_some_and(|e| e.is_sentinel());
            if elements.contains(id) && !sentinel && seen.insert(id) {
                out.family.push(id);
            }
            descendants(id, groups, elements, &mut visited, &mut seen, &mut out.family);
        }
        level -= 1;
    }
    out
}

fn descendants(
    id: ElementId,
    groups: &HashMap<ElementId, GroupEntry>,
    elements: &ElementStore,
    visited: &mut HashSet<ElementId>,
    seen: &mut HashSet<ElementId>,
    family: &mut Vec<ElementId>,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(group) = groups.get(&id) else {
        return;
    };
    for &child in &group.members {
        let Some(element) = elements.get(child) else {
            continue;
        };
        if groups.contains_key(&child) {
            descendants(child, groups, elements, visited, seen, family);
            continue;
        }
        if element.flags().contains(veil_element::ElementFlags::KEYBOARD_ONLY) || element.is_sentinel() {
            continue;
        }
        if seen.insert(child) {
            family.push(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;
    use veil_element::{ElementConfig, NoGeometry};

    struct Fixture {
        store: ElementStore,
        groups: HashMap<ElementId, GroupEntry>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: ElementStore::new(),
                groups: HashMap::new(),
            }
        }

        fn el(&mut self, label: &str) -> ElementId {
            self.store.insert(ElementConfig::new(label), Box::new(NoGeometry))
        }

        fn group(&mut self, id: ElementId, members: Vec<ElementId>) {
            self.groups.insert(
                id,
                GroupEntry {
                    child: ChildContext::Items(members.clone()),
                    members,
                },
            );
        }
    }

    fn ctx(name: &str, items: Vec<ElementId>, allow_baseline: bool, is_child: bool) -> FocusContext {
        FocusContext {
            name: String::from(name),
            items,
            allow_baseline,
            is_child,
            complex: None,
            owner: None,
            sentinels: None,
        }
    }

    #[test]
    fn baseline_brackets_items() {
        let mut f = Fixture::new();
        let (a, b, c) = (f.el("a"), f.el("b"), f.el("c"));
        let baseline = Baseline {
            prepend: vec![a],
            append: vec![b],
        };
        let stack = [ctx("x", vec![c], true, false)];
        let composed = compose(&stack, &baseline, &f.groups, &f.store);
        assert_eq!(composed.tabbable, [a, c, b]);
        assert!(composed.family.is_empty());

        let closed = [ctx("x", vec![c], false, false)];
        assert_eq!(compose(&closed, &baseline, &f.groups, &f.store).tabbable, [c]);
        assert_eq!(compose(&[], &baseline, &f.groups, &f.store).tabbable, [a, b]);
    }

    #[test]
    fn duplicates_and_dead_ids_are_dropped() {
        let mut f = Fixture::new();
        let (a, b) = (f.el("a"), f.el("b"));
        let dead = f.el("dead");
        f.store.remove(dead);
        let baseline = Baseline {
            prepend: vec![a],
            append: vec![],
        };
        let stack = [ctx("x", vec![a, b, dead, b], true, false)];
        assert_eq!(compose(&stack, &baseline, &f.groups, &f.store).tabbable, [a, b]);
    }

    #[test]
    fn family_holds_group_descendants_and_parent_items() {
        let mut f = Fixture::new();
        let menu = f.el("menu");
        let inner = f.el("inner-group");
        let (x, y, z) = (f.el("x"), f.el("y"), f.el("z"));
        let kb = f.store.insert(ElementConfig::new("kb").keyboard_only(), Box::new(NoGeometry));
        let other = f.el("other");
        f.group(menu, vec![x, inner, kb]);
        f.group(inner, vec![y]);

        let root = [ctx("root", vec![menu, other], false, false)];
        let composed = compose(&root, &Baseline::default(), &f.groups, &f.store);
        assert_eq!(composed.tabbable, [menu, other]);
        assert_eq!(composed.family, [x, y]);

        let entered = [
            ctx("root", vec![menu, other], false, false),
            ctx("menu", vec![x, inner, kb], false, true),
        ];
        let composed = compose(&entered, &Baseline::default(), &f.groups, &f.store);
        assert_eq!(composed.tabbable, [x, inner, kb]);
        // y via the tabbable inner group; menu and other via the parent.
        assert_eq!(composed.family, [y, menu, other]);
        assert!(!composed.family.contains(&z));
    }

    #[test]
    fn three_levels_compose_without_duplicates() {
        let mut f = Fixture::new();
        let (menu, other, sub, x) = (f.el("menu"), f.el("other"), f.el("sub"), f.el("x"));
        let (y, z, q) = (f.el("y"), f.el("z"), f.el("q"));
        f.group(menu, vec![sub, x]);
        f.group(sub, vec![y, z]);
        f.group(other, vec![q]);

        let stack = [
            ctx("root", vec![menu, other], false, false),
            ctx("menu", vec![sub, x], false, true),
            ctx("sub", vec![y, z], false, true),
        ];
        let composed = compose(&stack, &Baseline::default(), &f.groups, &f.store);
        assert_eq!(composed.tabbable, [y, z]);
        assert_eq!(composed.family, [sub, x, menu, other, q]);

        let mut all: Vec<ElementId> = composed.tabbable.clone();
        all.extend(&composed.family);
        let unique: HashSet<ElementId> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn group_cycles_terminate() {
        let mut f = Fixture::new();
        let (a, b, leaf) = (f.el("a"), f.el("b"), f.el("leaf"));
        f.group(a, vec![b, leaf]);
        f.group(b, vec![a]);
        let stack = [ctx("x", vec![a], false, false)];
        let composed = compose(&stack, &Baseline::default(), &f.groups, &f.store);
        assert_eq!(composed.family, [leaf]);
    }

    #[test]
    fn sentinels_stay_at_the_edges() {
        let mut f = Fixture::new();
        let (s, e, a, b) = (f.el("s"), f.el("e"), f.el("a"), f.el("b"));
        let mut context = ctx("g", vec![], false, true);
        context.sentinels = Some((s, e));
        context.set_items(vec![a, b]);
        assert_eq!(context.items, [s, a, b, e]);
    }
}
