// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays consumer storage with key allocation and deferred discards.

use alloc::vec::Vec;

use crate::error::{AllocationKind, Precondition, ShareError};
use crate::id::{ConsumerId, IdNamespace, ImageKey};

/// Storage for all consumers (rendering contexts) that hold image keys.
///
/// Consumers are addressed by [`ConsumerId`] handles. Each consumer owns a key
/// namespace and a counter for the next key resource. Keys whose surface went
/// away are parked on the consumer until its next transaction flushes them.
///
/// Removed consumers are recycled via a free list, and generation counters
/// make stale handles fail [`is_alive`](Self::is_alive).
#[derive(Debug, Default)]
pub struct ConsumerTable {
    namespace: Vec<IdNamespace>,
    next_key: Vec<u32>,
    discards: Vec<Vec<ImageKey>>,
    generation: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,
    len: u32,
}

impl ConsumerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer whose keys live in `namespace`.
    pub fn create(&mut self, namespace: IdNamespace) -> ConsumerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.namespace[i] = namespace;
            self.next_key[i] = 1;
            self.discards[i].clear();
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.namespace.push(namespace);
            self.next_key.push(1);
            self.discards.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        ConsumerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Removes a consumer. Its pending discards are dropped with it.
    ///
    /// Returns `false` if the handle was already stale.
    pub fn remove(&mut self, id: ConsumerId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let i = id.idx as usize;
        self.alive[i] = false;
        self.discards[i].clear();
        // Bump generation so old handles immediately fail validation.
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(id.idx);
        true
    }

    /// Returns whether the handle refers to a live consumer.
    #[must_use]
    pub fn is_alive(&self, id: ConsumerId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the number of live consumers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Returns `true` if no consumer is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the consumer's current key namespace.
    #[must_use]
    pub fn namespace(&self, id: ConsumerId) -> Option<IdNamespace> {
        self.is_alive(id).then(|| self.namespace[id.idx as usize])
    }

    /// Moves the consumer to a new key namespace.
    ///
    /// Every key issued under the old namespace becomes stale, and keys
    /// waiting to be discarded are dropped since the renderer already forgot
    /// them.
    pub fn set_namespace(&mut self, id: ConsumerId, namespace: IdNamespace) {
        if !self.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        self.namespace[i] = namespace;
        self.next_key[i] = 1;
        self.discards[i].clear();
    }

    /// Returns `true` if `key` belongs to the consumer's current namespace.
    #[must_use]
    pub fn owns_key(&self, id: ConsumerId, key: ImageKey) -> bool {
        self.namespace(id) == Some(key.namespace)
    }

    /// Allocates the next image key in the consumer's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::AllocationFailed`] when the consumer's key space
    /// is exhausted, and [`ShareError::PreconditionViolated`] for a stale
    /// handle.
    pub fn next_key(&mut self, id: ConsumerId) -> Result<ImageKey, ShareError> {
        if !self.is_alive(id) {
            return Err(ShareError::PreconditionViolated(
                Precondition::StaleConsumer,
            ));
        }
        let i = id.idx as usize;
        let resource = self.next_key[i];
        if resource == u32::MAX {
            return Err(ShareError::AllocationFailed(AllocationKind::ImageKey));
        }
        self.next_key[i] = resource + 1;
        Ok(ImageKey::new(self.namespace[i], resource))
    }

    /// Parks `key` for deletion on the consumer's next transaction.
    ///
    /// Keys of removed consumers, or from an older namespace, are dropped.
    pub fn discard_key(&mut self, id: ConsumerId, key: ImageKey) {
        if self.owns_key(id, key) {
            self.discards[id.idx as usize].push(key);
        }
    }

    /// Takes every key parked for deletion on the consumer.
    pub fn take_discards(&mut self, id: ConsumerId) -> Vec<ImageKey> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        core::mem::take(&mut self.discards[id.idx as usize])
    }
}
