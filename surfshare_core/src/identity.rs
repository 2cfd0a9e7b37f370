// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide external image id allocation.

use alloc::vec::Vec;

use crate::error::{AllocationKind, ShareError};
use crate::id::{ExternalImageId, IdNamespace};

/// Hands out [`ExternalImageId`]s that are unique within the current
/// transport namespace.
///
/// Resource numbers are issued monotonically starting at 1. Released ids are
/// only handed out again when recycling has been enabled with
/// [`set_recycling`](Self::set_recycling); otherwise [`release`](Self::release)
/// is pure bookkeeping. Reuse is off by default because remote messages still
/// in flight may name a released id.
///
/// The allocator is not synchronized. Callers serialize access on the
/// coordinator thread.
#[derive(Debug)]
pub struct IdentityAllocator {
    namespace: IdNamespace,
    next: u32,
    limit: u32,
    recycle: bool,
    recycled: Vec<u32>,
    issued: u32,
}

impl IdentityAllocator {
    /// Creates an allocator for `namespace` with the full resource space.
    #[must_use]
    pub fn new(namespace: IdNamespace) -> Self {
        Self::with_limit(namespace, u32::MAX - 1)
    }

    /// Creates an allocator that issues at most `limit` resources per
    /// namespace before reporting exhaustion.
    #[must_use]
    pub fn with_limit(namespace: IdNamespace, limit: u32) -> Self {
        Self {
            namespace,
            next: 1,
            limit: limit.min(u32::MAX - 1),
            recycle: false,
            recycled: Vec::new(),
            issued: 0,
        }
    }

    /// Enables or disables reuse of released ids.
    ///
    /// Disabling drops any ids already queued for reuse.
    pub fn set_recycling(&mut self, recycle: bool) {
        self.recycle = recycle;
        if !recycle {
            self.recycled.clear();
        }
    }

    /// Returns the namespace ids are currently allocated under.
    #[inline]
    #[must_use]
    pub const fn namespace(&self) -> IdNamespace {
        self.namespace
    }

    /// Returns the number of ids issued and not yet released.
    #[inline]
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.issued
    }

    /// Allocates a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::AllocationFailed`] once `limit` resources have
    /// been handed out and none are available for reuse.
    pub fn allocate(&mut self) -> Result<ExternalImageId, ShareError> {
        let resource = if let Some(resource) = self.recycled.pop() {
            resource
        } else {
            if self.next > self.limit {
                return Err(ShareError::AllocationFailed(AllocationKind::ExternalId));
            }
            let resource = self.next;
            self.next += 1;
            resource
        };
        self.issued += 1;
        Ok(ExternalImageId::new(self.namespace, resource))
    }

    /// Returns `true` if `id` was allocated under the current namespace.
    #[inline]
    #[must_use]
    pub fn owns(&self, id: ExternalImageId) -> bool {
        id.namespace() == self.namespace
    }

    /// Marks `id` as no longer referenced.
    ///
    /// Ids from an older namespace are ignored.
    pub fn release(&mut self, id: ExternalImageId) {
        if !self.owns(id) {
            return;
        }
        self.issued = self.issued.saturating_sub(1);
        if self.recycle {
            debug_assert!(
                !self.recycled.contains(&id.resource()),
                "double release of {id:?}"
            );
            self.recycled.push(id.resource());
        }
    }

    /// Restarts allocation under a new namespace.
    ///
    /// Used when the remote endpoint restarted and every mapping made under
    /// the previous namespace is gone. Ids stay unique across the reset
    /// because the namespace differs.
    pub fn reset(&mut self, namespace: IdNamespace) {
        debug_assert_ne!(namespace, self.namespace, "reset to the same namespace");
        self.namespace = namespace;
        self.next = 1;
        self.recycled.clear();
        self.issued = 0;
    }
}
