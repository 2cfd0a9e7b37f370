// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-rect accumulation.
//!
//! Each consumer of a surface accumulates the regions that changed since it
//! last uploaded the surface. The accumulation keeps a single bounding
//! rectangle: merging two disjoint regions over-invalidates the gap between
//! them, but the result always covers every reported region.
//!
//! Rectangles are in surface pixel space. Rectangles with no area are treated
//! as "nothing changed" and never widen the accumulated region.

use kurbo::Rect;

/// Returns `true` if `rect` covers no pixels.
#[inline]
#[must_use]
pub fn is_empty(rect: Rect) -> bool {
    !(rect.width() > 0.0 && rect.height() > 0.0)
}

/// Accumulated dirty region waiting to be uploaded by one consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendingDirty(Option<Rect>);

impl PendingDirty {
    /// Creates an empty accumulator.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(None)
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the pending region without draining it.
    #[inline]
    #[must_use]
    pub const fn get(&self) -> Option<Rect> {
        self.0
    }

    /// Merges `rect` into the pending region.
    pub fn merge(&mut self, rect: Rect) {
        if is_empty(rect) {
            return;
        }
        self.0 = Some(match self.0 {
            Some(pending) => pending.union(rect),
            None => rect,
        });
    }

    /// Merges `rect`, if any, into the pending region.
    pub fn merge_opt(&mut self, rect: Option<Rect>) {
        if let Some(rect) = rect {
            self.merge(rect);
        }
    }

    /// Drains the pending region, leaving nothing pending.
    #[inline]
    pub fn take(&mut self) -> Option<Rect> {
        self.0.take()
    }
}
