// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinator configuration.

/// Configuration for the [`SharingCoordinator`](crate::SharingCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Whether ids released by an unshare may be handed out again.
    ///
    /// Off by default: remote messages still in flight may name a released
    /// id, and reusing it would make them refer to the wrong surface.
    pub recycle_released_ids: bool,
    /// Maximum number of external ids issued per transport namespace.
    pub max_external_ids: u32,
    /// Capacity of the cross-thread share request queue. `None` is
    /// unbounded.
    ///
    /// With a bounded queue, requests posted while it is full are dropped
    /// and the surface is left unshared.
    pub async_queue_capacity: Option<usize>,
}

impl CoordinatorConfig {
    /// The default configuration: no recycling, the full id space, and an
    /// unbounded request queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            recycle_released_ids: false,
            max_external_ids: u32::MAX - 1,
            async_queue_capacity: None,
        }
    }

    /// Returns this configuration with id recycling set to `recycle`.
    #[must_use]
    pub const fn with_recycling(mut self, recycle: bool) -> Self {
        self.recycle_released_ids = recycle;
        self
    }

    /// Returns this configuration with at most `max` ids per namespace.
    #[must_use]
    pub const fn with_max_external_ids(mut self, max: u32) -> Self {
        self.max_external_ids = max;
        self
    }

    /// Returns this configuration with a bounded request queue.
    #[must_use]
    pub const fn with_async_queue_capacity(mut self, capacity: usize) -> Self {
        self.async_queue_capacity = Some(capacity);
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
