// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached sharing state for one surface.

use crate::id::ExternalImageId;

use super::keys::ConsumerKeys;

/// What the cache remembers about one surface.
///
/// An entry moves through three states:
///
/// - no id: created, nothing allocated yet (or allocation failed);
/// - id, not shared: allocated but the transport has not acknowledged the
///   mapping (a failed mapping leaves the entry here for a later retry);
/// - id, shared: mapped in the remote process.
///
/// `shared` implies an id is present.
#[derive(Clone, Debug, Default)]
pub struct SurfaceEntry {
    id: Option<ExternalImageId>,
    shared: bool,
    keys: ConsumerKeys,
}

impl SurfaceEntry {
    /// Creates an entry with no id.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: None,
            shared: false,
            keys: ConsumerKeys::new(),
        }
    }

    /// Returns the allocated id, if any.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> Option<ExternalImageId> {
        self.id
    }

    /// Returns `true` once the remote process acknowledged the mapping.
    #[inline]
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.shared
    }

    /// Returns the id if the surface is mapped.
    #[inline]
    #[must_use]
    pub const fn shared_id(&self) -> Option<ExternalImageId> {
        if self.shared { self.id } else { None }
    }

    /// Assigns a new id, forgetting the previous mapping and every key.
    ///
    /// Used for the first allocation and when the previous id belongs to a
    /// remote endpoint that no longer exists.
    pub fn set_id(&mut self, id: ExternalImageId) {
        self.id = Some(id);
        self.shared = false;
        self.keys.clear();
    }

    /// Records that the remote process acknowledged the mapping.
    ///
    /// # Panics
    ///
    /// Panics if no id has been assigned.
    pub fn mark_shared(&mut self) {
        assert!(self.id.is_some(), "cannot mark an entry without id shared");
        debug_assert!(!self.shared, "entry already shared");
        self.shared = true;
    }

    /// Returns the per-consumer key records.
    #[inline]
    #[must_use]
    pub const fn keys(&self) -> &ConsumerKeys {
        &self.keys
    }

    /// Returns the per-consumer key records for mutation.
    #[inline]
    pub fn keys_mut(&mut self) -> &mut ConsumerKeys {
        &mut self.keys
    }
}
