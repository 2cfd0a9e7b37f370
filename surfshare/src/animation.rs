// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stable image keys for animated images.
//!
//! Each frame of an animation is its own surface with its own external id,
//! but consumers should not have to add and delete a key per frame. An
//! [`AnimationKeyOwner`] keeps one key per consumer for the lifetime of the
//! animation and re-points it at whichever frame is current. Keys never change
//! across frames; only the id they refer to does.
//!
//! An image container that plays an animation owns its
//! [`AnimationKeyOwner`] and exposes it through [`AnimatedImageContainer`],
//! so frames can be advanced and keys handed out through the container.

use std::sync::{Arc, Weak};

use kurbo::Rect;
use surfshare_core::{Precondition, ShareError, Unsupported};
use surfshare_core::backend::{ImageContainer, SharedSurface, Transport};
use surfshare_core::cache::ConsumerKeys;
use surfshare_core::dirty;
use surfshare_core::id::{ConsumerId, ExternalImageId, ImageKey, SurfaceId};
use surfshare_core::resource::ResourceUpdateQueue;

use crate::coordinator::{SharingCoordinator, container_surface};
use crate::thread::CoordinatorThread;

/// An image container that owns the key owner of its animation.
pub trait AnimatedImageContainer: ImageContainer {
    /// Returns the container's animation key owner, creating it on first use.
    fn animation_mut(&mut self) -> &mut AnimationKeyOwner;
}

#[derive(Debug)]
struct CurrentFrame {
    surface_id: SurfaceId,
    surface: Weak<dyn SharedSurface>,
    id: ExternalImageId,
    bounds: Rect,
}

/// Owns the image keys of one animation.
///
/// The owner is either unbound (no current frame) or bound to the frame most
/// recently passed to [`set_current_frame`](Self::set_current_frame) or
/// [`update_key`](Self::update_key). Moving to a different frame surface
/// retires the previous frame's external id; the surface itself stays with
/// the imaging subsystem.
#[derive(Debug, Default)]
pub struct AnimationKeyOwner {
    current: Option<CurrentFrame>,
    keys: ConsumerKeys,
}

impl AnimationKeyOwner {
    /// Creates an unbound owner with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a frame has been set.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the id of the current frame.
    #[must_use]
    pub fn current_external_id(&self) -> Option<ExternalImageId> {
        self.current.as_ref().map(|frame| frame.id)
    }

    /// Returns `consumer`'s key, if it has one.
    #[must_use]
    pub fn key_for(&self, consumer: ConsumerId) -> Option<ImageKey> {
        self.keys.get(consumer).map(|record| record.key)
    }

    /// Makes `surface` the current frame, with `dirty` changed since the
    /// previous frame.
    ///
    /// Shares the frame first; if that fails the owner is unchanged. When the
    /// frame surface differs from the current one, the previous frame is
    /// unshared without releasing its id, and every key is re-pointed at the
    /// new frame. A re-pointed key is always updated, so an empty `dirty`
    /// invalidates the whole frame.
    ///
    /// # Errors
    ///
    /// Everything [`SharingCoordinator::share_for_external_id`] returns.
    pub fn set_current_frame<T: Transport>(
        &mut self,
        coordinator: &mut SharingCoordinator<T>,
        thread: CoordinatorThread,
        surface: &Arc<dyn SharedSurface>,
        dirty: Rect,
    ) -> Result<(), ShareError> {
        self.bind_frame(coordinator, thread, surface, dirty)?;
        Ok(())
    }

    /// Shares and adopts `surface`, returning the current frame's id.
    fn bind_frame<T: Transport>(
        &mut self,
        coordinator: &mut SharingCoordinator<T>,
        thread: CoordinatorThread,
        surface: &Arc<dyn SharedSurface>,
        dirty: Rect,
    ) -> Result<ExternalImageId, ShareError> {
        let id = coordinator.share_for_external_id(thread, surface.as_ref())?;
        let surface_id = surface.surface_id();
        let bounds = surface.bounds();

        let Some(current) = &mut self.current else {
            self.keys.merge_dirty(dirty);
            self.current = Some(CurrentFrame {
                surface_id,
                surface: Arc::downgrade(surface),
                id,
                bounds,
            });
            return Ok(id);
        };

        if current.surface_id == surface_id {
            if current.id == id {
                coordinator.notify_dirty(thread, surface_id, dirty);
                self.keys.merge_dirty(dirty);
            } else {
                // The remote endpoint restarted; the same frame has a new id.
                coordinator.trace_retarget(current.id, id, surface_id);
                current.id = id;
                current.bounds = bounds;
                self.keys.merge_dirty(bounds);
            }
            return Ok(id);
        }

        let previous = std::mem::replace(
            current,
            CurrentFrame {
                surface_id,
                surface: Arc::downgrade(surface),
                id,
                bounds,
            },
        );
        coordinator.unshare(thread, previous.surface_id, false);
        if let Some(previous_surface) = previous.surface.upgrade() {
            previous_surface.sharing_state().reset();
        }
        coordinator.trace_retarget(previous.id, id, surface_id);
        tracing::trace!(from = ?previous.id, to = ?id, "animation frame retargeted");
        self.keys
            .merge_dirty(if dirty::is_empty(dirty) { bounds } else { dirty });
        Ok(id)
    }

    /// Returns `consumer`'s key for the animation, with `surface` as the
    /// current frame.
    ///
    /// The first call for a consumer enqueues an `AddImage`. Later calls
    /// enqueue an `UpdateImage` naming the current frame's id when something
    /// changed since the consumer last updated.
    ///
    /// # Errors
    ///
    /// Everything [`set_current_frame`](Self::set_current_frame) returns, and
    /// [`ShareError::PreconditionViolated`] if `consumer` was removed.
    pub fn update_key<T: Transport>(
        &mut self,
        coordinator: &mut SharingCoordinator<T>,
        thread: CoordinatorThread,
        surface: &Arc<dyn SharedSurface>,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> Result<ImageKey, ShareError> {
        coordinator.check_thread(thread);
        if !coordinator.is_consumer_alive(consumer) {
            return Err(ShareError::PreconditionViolated(
                Precondition::StaleConsumer,
            ));
        }
        let surface_id = surface.surface_id();
        if self.current.as_ref().map(|frame| frame.surface_id) != Some(surface_id) {
            tracing::debug!(
                surface = ?surface_id,
                "key requested for a frame that is not current; adopting it"
            );
        }
        // Re-shares the frame (a cache hit in steady state) and follows a
        // changed id.
        let id = self.bind_frame(coordinator, thread, surface, Rect::ZERO)?;
        coordinator.update_owned_keys(&mut self.keys, id, consumer, queue)
    }

    /// Parks every key for deletion on its consumer and unbinds the owner.
    ///
    /// The current frame stays shared; the imaging subsystem owns it.
    ///
    /// Returns the number of keys parked.
    pub fn destroy<T: Transport>(
        &mut self,
        coordinator: &mut SharingCoordinator<T>,
        thread: CoordinatorThread,
    ) -> usize {
        self.current = None;
        coordinator.discard_owned_keys(thread, &mut self.keys)
    }
}

impl<T: Transport> SharingCoordinator<T> {
    /// Makes `surface` the current frame of `container`'s animation.
    ///
    /// # Errors
    ///
    /// [`ShareError::NotSupported`] if the container does not offer shared
    /// surfaces or `surface` has no shareable memory, and everything
    /// [`AnimationKeyOwner::set_current_frame`] returns.
    pub fn update_animation(
        &mut self,
        thread: CoordinatorThread,
        container: &mut dyn AnimatedImageContainer,
        surface: &Arc<dyn SharedSurface>,
        dirty: Rect,
    ) -> Result<(), ShareError> {
        self.check_thread(thread);
        if !container.supports_shared_surfaces() {
            return Err(ShareError::NotSupported(Unsupported::Container));
        }
        if !surface.has_shared_memory() {
            return Err(ShareError::NotSupported(Unsupported::NotShareable));
        }
        container
            .animation_mut()
            .set_current_frame(self, thread, surface, dirty)
    }

    /// Returns `consumer`'s key for the animation of `container`, with the
    /// container's current image as the current frame.
    ///
    /// # Errors
    ///
    /// The container errors of
    /// [`share_from_container`](Self::share_from_container), and everything
    /// [`AnimationKeyOwner::update_key`] returns.
    pub fn share_animation_from_container(
        &mut self,
        thread: CoordinatorThread,
        container: &mut dyn AnimatedImageContainer,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> Result<ImageKey, ShareError> {
        self.check_thread(thread);
        let surface = container_surface(container)?;
        container
            .animation_mut()
            .update_key(self, thread, &surface, consumer, queue)
    }
}
