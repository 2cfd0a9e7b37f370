// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator contract for surfaces, transports, and image containers.
//!
//! The sharing core does not allocate memory, move pixels, or talk to the
//! remote process itself. It consumes three narrow interfaces:
//!
//! - **Surface**: a pixel buffer in shareable memory, owned by the imaging
//!   subsystem, with a stable [`SurfaceId`]. Implements [`SharedSurface`] and
//!   embeds a [`SharingState`] so that prefetch requests can be deduplicated
//!   from any thread without touching the cache.
//!
//! - **Transport**: maps a surface's memory into the remote process under an
//!   [`ExternalImageId`] and unmaps it again. Implements [`Transport`].
//!
//! - **Container**: an image container that may hand out its current frame as
//!   a shared surface. Implements [`ImageContainer`].
//!
//! All three are traits so that frame loops can be generic and tests can use
//! doubles.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use kurbo::{Rect, Size};

use crate::error::ShareError;
use crate::id::{ExternalImageId, IdNamespace, SurfaceId};

const UNSHARED: u8 = 0;
const PENDING: u8 = 1;
const SHARED: u8 = 2;

/// Cross-thread view of whether a surface has been shared.
///
/// Written by the coordinator thread when a share settles, and by any thread
/// requesting a prefetch. The cache itself stays confined to the coordinator
/// thread; this flag only deduplicates prefetch requests.
///
/// `Shared` is a hint. The mapping can go away without the surface being
/// told (an unshare by id, or a restart of the remote endpoint), so only a
/// pending request suppresses another one.
#[derive(Default)]
pub struct SharingState(AtomicU8);

impl fmt::Debug for SharingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.0.load(Ordering::Acquire) {
            PENDING => "Pending",
            SHARED => "Shared",
            _ => "Unshared",
        };
        f.debug_tuple("SharingState").field(&state).finish()
    }
}

impl SharingState {
    /// Creates a state for a surface that was never shared.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(UNSHARED))
    }

    /// Marks a share request as pending.
    ///
    /// Returns `false` if one is already pending. A surface that was shared
    /// before may begin again; the coordinator answers the request from its
    /// cache, or maps the surface anew if the mapping is gone.
    pub fn try_begin(&self) -> bool {
        self.0.swap(PENDING, Ordering::AcqRel) != PENDING
    }

    /// Records that the remote process acknowledged the mapping.
    pub fn mark_shared(&self) {
        self.0.store(SHARED, Ordering::Release);
    }

    /// Returns to unshared after a failure or an unshare.
    pub fn reset(&self) {
        self.0.store(UNSHARED, Ordering::Release);
    }

    /// Returns `true` once the mapping was acknowledged.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.0.load(Ordering::Acquire) == SHARED
    }

    /// Returns `true` while a prefetch request is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }
}

/// A pixel buffer that can be mapped into the remote process.
pub trait SharedSurface: Send + Sync {
    /// Returns the stable identity of this surface.
    fn surface_id(&self) -> SurfaceId;

    /// Returns the size of the surface in pixels.
    fn size(&self) -> Size;

    /// Returns `true` if the pixels live in memory that can be handed to
    /// another process.
    fn has_shared_memory(&self) -> bool;

    /// Returns the surface's sharing flag.
    fn sharing_state(&self) -> &SharingState;

    /// Returns the full bounds of the surface in pixels.
    fn bounds(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.size())
    }
}

impl fmt::Debug for dyn SharedSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSurface")
            .field("surface_id", &self.surface_id())
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// Maps shared surfaces into the remote process.
pub trait Transport {
    /// Returns the namespace of the remote endpoint currently connected.
    ///
    /// A change of namespace means every earlier mapping is gone.
    fn namespace(&self) -> IdNamespace;

    /// Returns `false` if the remote endpoint cannot receive mappings right
    /// now.
    fn can_send(&self) -> bool {
        true
    }

    /// Maps `surface` into the remote process under `id`.
    ///
    /// This may perform a blocking round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::TransportRejected`] if the remote process
    /// declined the mapping.
    fn map_surface(
        &mut self,
        surface: &dyn SharedSurface,
        id: ExternalImageId,
    ) -> Result<(), ShareError>;

    /// Unmaps `id` in the remote process. Unmapping an unmapped id is a no-op.
    fn unmap_surface(&mut self, id: ExternalImageId);
}

/// An image container that may expose its current frame as a shared surface.
pub trait ImageContainer {
    /// Returns `true` if this container's images can be shared by mapping
    /// their memory.
    fn supports_shared_surfaces(&self) -> bool;

    /// Returns the first surface of the container's current image, if any.
    fn current_surface_for_sharing(&self) -> Option<Arc<dyn SharedSurface>>;
}
