// Copyright 2025 the Veil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear Tab traversal over the composed list.

use veil_element::ElementId;

/// Direction of a linear step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Forward,
    Backward,
}

/// The next eligible entry after (or before) `origin`, wrapping at the ends.
///
/// When `origin` is not in `list` the first (or last) eligible entry is
/// returned. A full cycle may come back to `origin` itself, so a list with
/// one eligible entry always yields that entry.
pub(crate) fn next_linear(
    list: &[ElementId],
    origin: Option<ElementId>,
    step: Step,
    eligible: impl Fn(ElementId) -> bool,
) -> Option<ElementId> {
    let len = list.len();
    if len == 0 {
        return None;
    }
    let origin_pos = origin.and_then(|o| list.iter().position(|&id| id == o));
    let start = match (origin_pos, step) {
        (Some(pos), Step::Forward) => pos + 1,
        (Some(pos), Step::Backward) => pos + len - 1,
        (None, Step::Forward) => 0,
        (None, Step::Backward) => len - 1,
    };
    (0..len)
        .map(|i| match step {
            Step::Forward => (start + i) % len,
            Step::Backward => (start + len - i) % len,
        })
        .map(|i| list[i])
        .find(|&id| eligible(id))
}
