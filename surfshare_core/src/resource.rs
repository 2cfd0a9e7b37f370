// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource update instructions for the remote renderer.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::id::{ExternalImageId, ImageKey};

/// A single instruction for the remote renderer's resource cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResourceUpdate {
    /// Bind `key` to the mapped surface named by `id`.
    AddImage {
        /// Consumer-local key to create.
        key: ImageKey,
        /// External image the key refers to.
        id: ExternalImageId,
    },
    /// Re-read `dirty` from the mapped surface named by `id` into `key`.
    ///
    /// `id` may differ from the one `key` was added with; the key is then
    /// re-pointed (animation frames).
    UpdateImage {
        /// Key being updated.
        key: ImageKey,
        /// External image the key now refers to.
        id: ExternalImageId,
        /// Region to re-upload, in surface pixels.
        dirty: Rect,
    },
    /// Discard `key`.
    DeleteImage {
        /// Key to discard.
        key: ImageKey,
    },
}

impl ResourceUpdate {
    /// Returns the key this instruction applies to.
    #[must_use]
    pub const fn key(&self) -> ImageKey {
        match *self {
            Self::AddImage { key, .. }
            | Self::UpdateImage { key, .. }
            | Self::DeleteImage { key } => key,
        }
    }
}

/// Append-only queue of [`ResourceUpdate`]s for one consumer transaction.
///
/// The queue is filled on the coordinator thread and handed to the consumer,
/// which ships it to the remote renderer. Instructions for the same key are
/// never reordered.
#[derive(Clone, Debug, Default)]
pub struct ResourceUpdateQueue {
    updates: Vec<ResourceUpdate>,
}

impl ResourceUpdateQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            updates: Vec::new(),
        }
    }

    /// Appends an [`AddImage`](ResourceUpdate::AddImage) instruction.
    pub fn add_image(&mut self, key: ImageKey, id: ExternalImageId) {
        self.updates.push(ResourceUpdate::AddImage { key, id });
    }

    /// Appends an [`UpdateImage`](ResourceUpdate::UpdateImage) instruction.
    pub fn update_image(&mut self, key: ImageKey, id: ExternalImageId, dirty: Rect) {
        self.updates
            .push(ResourceUpdate::UpdateImage { key, id, dirty });
    }

    /// Appends a [`DeleteImage`](ResourceUpdate::DeleteImage) instruction.
    pub fn delete_image(&mut self, key: ImageKey) {
        self.updates.push(ResourceUpdate::DeleteImage { key });
    }

    /// Returns the queued instructions in order.
    #[must_use]
    pub fn updates(&self) -> &[ResourceUpdate] {
        &self.updates
    }

    /// Returns the number of queued instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Takes all queued instructions, leaving the queue empty.
    pub fn take(&mut self) -> Vec<ResourceUpdate> {
        core::mem::take(&mut self.updates)
    }
}
