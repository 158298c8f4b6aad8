// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer claim registry.
//!
//! At most one element owns a given [`PointerId`] at a time. Releases are
//! deferred: [`PointerClaims::release`] only marks an id, and the owner keeps
//! it until [`PointerClaims::commit`] runs at the end of the current input
//! batch. That way every element that sees the same pointer-up still observes
//! the id as claimed, and a sticky drag on one element is not ended by a tap
//! that another element is in the middle of consuming.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::input::PointerId;
use crate::types::ElementId;

/// Registry mapping pointer ids to the element that owns them.
#[derive(Clone, Debug, Default)]
pub struct PointerClaims {
    owners: HashMap<PointerId, ElementId>,
    pending: Vec<PointerId>,
}

impl PointerClaims {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `pointer` for `owner`.
    ///
    /// Returns `false` if another element holds the id, including one whose
    /// release has not been committed yet. Re-claiming an id you already own
    /// cancels its pending release.
    pub fn claim(&mut self, pointer: PointerId, owner: ElementId) -> bool {
        match self.owners.get(&pointer) {
            Some(current) if *current != owner => {
                tracing::trace!(?pointer, %owner, holder = %current, "claim refused");
                false
            }
            Some(_) => {
                self.pending.retain(|p| *p != pointer);
                true
            }
            None => {
                self.owners.insert(pointer, owner);
                tracing::trace!(?pointer, %owner, "pointer claimed");
                true
            }
        }
    }

    /// The element currently owning `pointer`.
    pub fn owner(&self, pointer: PointerId) -> Option<ElementId> {
        self.owners.get(&pointer).copied()
    }

    /// Whether any element owns `pointer`. Ids with a pending release still count.
    pub fn is_claimed(&self, pointer: PointerId) -> bool {
        self.owners.contains_key(&pointer)
    }

    /// Whether no element owns `pointer`.
    pub fn is_free(&self, pointer: PointerId) -> bool {
        !self.is_claimed(pointer)
    }

    /// Whether `owner` holds `pointer`.
    pub fn is_owned_by(&self, pointer: PointerId, owner: ElementId) -> bool {
        self.owner(pointer) == Some(owner)
    }

    /// Request release of `pointer` by `owner`. Takes effect on the next
    /// [`Self::commit`]. Requests from non-owners are ignored.
    pub fn release(&mut self, pointer: PointerId, owner: ElementId) {
        if self.is_owned_by(pointer, owner) && !self.pending.contains(&pointer) {
            self.pending.push(pointer);
        }
    }

    /// Hand `pointer` from `from` to `to`. Returns `false` if `from` does not own it.
    pub fn transfer(&mut self, pointer: PointerId, from: ElementId, to: ElementId) -> bool {
        if !self.is_owned_by(pointer, from) {
            return false;
        }
        self.owners.insert(pointer, to);
        self.pending.retain(|p| *p != pointer);
        tracing::debug!(?pointer, %from, %to, "pointer claim transferred");
        true
    }

    /// Apply every pending release.
    pub fn commit(&mut self) {
        for pointer in self.pending.drain(..) {
            self.owners.remove(&pointer);
        }
    }

    /// Release every id held by `owner` immediately (used on dispose).
    pub fn release_all(&mut self, owner: ElementId) {
        self.owners.retain(|_, o| *o != owner);
        let owners = &self.owners;
        self.pending.retain(|p| owners.contains_key(p));
    }

    /// Number of claimed ids.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether nothing is claimed.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ElementId = ElementId(0, 1);
    const B: ElementId = ElementId(1, 1);
    const P: PointerId = PointerId(7);

    #[test]
    fn only_one_owner_at_a_time() {
        let mut claims = PointerClaims::new();
        assert!(claims.claim(P, A));
        assert!(!claims.claim(P, B));
        assert!(claims.claim(P, A));
        assert_eq!(claims.owner(P), Some(A));
    }

    #[test]
    fn release_is_deferred_until_commit() {
        let mut claims = PointerClaims::new();
        claims.claim(P, A);
        claims.release(P, A);
        assert!(claims.is_claimed(P));
        assert!(!claims.claim(P, B));
        claims.commit();
        assert!(claims.is_free(P));
        assert!(claims.claim(P, B));
    }

    #[test]
    fn reclaim_cancels_pending_release() {
        let mut claims = PointerClaims::new();
        claims.claim(P, A);
        claims.release(P, A);
        claims.claim(P, A);
        claims.commit();
        assert!(claims.is_owned_by(P, A));
    }

    #[test]
    fn foreign_release_and_transfer_are_ignored() {
        let mut claims = PointerClaims::new();
        claims.claim(P, A);
        claims.release(P, B);
        claims.commit();
        assert!(claims.is_owned_by(P, A));
        assert!(!claims.transfer(P, B, A));
        assert!(claims.transfer(P, A, B));
        assert!(claims.is_owned_by(P, B));
    }

    #[test]
    fn release_all_is_immediate() {
        let mut claims = PointerClaims::new();
        claims.claim(P, A);
        claims.claim(PointerId::MOUSE, A);
        claims.claim(PointerId(3), B);
        claims.release(P, A);
        claims.release_all(A);
        assert_eq!(claims.len(), 1);
        claims.commit();
        assert!(claims.is_owned_by(PointerId(3), B));
    }
}
