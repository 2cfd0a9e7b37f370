// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The thread-affine sharing coordinator.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::ThreadId;

use kurbo::Rect;
use surfshare_core::backend::{ImageContainer, SharedSurface, Transport};
use surfshare_core::cache::{ConsumerKeys, KeyOutcome, KeyUpdate, SurfaceCache, SurfaceEntry};
use surfshare_core::consumer::ConsumerTable;
use surfshare_core::dirty;
use surfshare_core::id::{ConsumerId, ExternalImageId, IdNamespace, ImageKey, SurfaceId};
use surfshare_core::identity::IdentityAllocator;
use surfshare_core::resource::ResourceUpdateQueue;
use surfshare_core::trace::{TraceSink, Tracer};
use surfshare_core::{Precondition, ShareError, Unsupported};

use crate::config::CoordinatorConfig;
use crate::dispatch::{ShareQueue, ShareSender};
use crate::thread::CoordinatorThread;

/// Owns the surface cache, the id allocator, and the consumer table, and
/// serializes every mutation of them on one thread.
///
/// # Lifecycle
///
/// Cache entries are created lazily by the first share of a surface. The
/// imaging subsystem must call [`detach`](Self::detach) when it destroys a
/// surface; nothing else removes the entry.
///
/// Consumers (rendering contexts) are registered with
/// [`register_consumer`](Self::register_consumer) and torn down with
/// [`remove_consumer`](Self::remove_consumer). Keys whose surface is
/// unshared are parked on their consumer and turned into `DeleteImage`
/// instructions by [`flush_discards`](Self::flush_discards), which the
/// consumer calls when it builds its next transaction.
///
/// # Threading
///
/// The coordinator is neither `Send` nor `Sync`. Every synchronous operation
/// takes a [`CoordinatorThread`] token; other threads post share requests
/// through a [`ShareSender`] and the coordinator handles them in
/// [`process_pending`](Self::process_pending).
pub struct SharingCoordinator<T: Transport> {
    transport: T,
    config: CoordinatorConfig,
    ids: IdentityAllocator,
    cache: SurfaceCache,
    consumers: ConsumerTable,
    requests: ShareQueue,
    tracer: Tracer,
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl<T: Transport + fmt::Debug> fmt::Debug for SharingCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharingCoordinator")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("ids", &self.ids)
            .field("cache", &self.cache)
            .field("consumers", &self.consumers)
            .field("requests", &self.requests)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SharingCoordinator<T> {
    /// Creates a coordinator bound to the current thread.
    pub fn new(thread: CoordinatorThread, transport: T, config: CoordinatorConfig) -> Self {
        _ = thread;
        let mut ids = IdentityAllocator::with_limit(transport.namespace(), config.max_external_ids);
        ids.set_recycling(config.recycle_released_ids);
        Self {
            transport,
            config,
            ids,
            cache: SurfaceCache::new(),
            consumers: ConsumerTable::new(),
            requests: ShareQueue::new(config.async_queue_capacity),
            tracer: Tracer::none(),
            thread: std::thread::current().id(),
            _not_send: PhantomData,
        }
    }

    /// Installs a trace sink. Events are only emitted with the `trace`
    /// feature enabled.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer = Tracer::new(sink);
    }

    /// Returns a handle for requesting shares from any thread.
    #[must_use]
    pub fn sender(&self) -> ShareSender {
        self.requests.sender()
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport for mutation.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Returns the configuration the coordinator was created with.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Returns the number of cached surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no surface is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub(crate) fn check_thread(&self, thread: CoordinatorThread) {
        _ = thread;
        debug_assert_eq!(
            std::thread::current().id(),
            self.thread,
            "sharing coordinator used off its thread"
        );
    }

    // -- sharing ------------------------------------------------------------

    /// Handles every share request posted through a [`ShareSender`].
    ///
    /// Requests whose surface was dropped are skipped. Failures are logged
    /// and leave the surface unshared.
    ///
    /// Returns the number of requests that led to a share attempt.
    pub fn process_pending(&mut self, thread: CoordinatorThread) -> usize {
        self.check_thread(thread);
        let mut attempted = 0;
        while let Some(request) = self.requests.try_next() {
            let Some(surface) = request.surface.upgrade() else {
                tracing::debug!("surface dropped before its share request was handled");
                continue;
            };
            attempted += 1;
            // Errors are already logged and traced.
            _ = Self::share_entry(
                &mut self.cache,
                &mut self.ids,
                &mut self.transport,
                &mut self.tracer,
                surface.as_ref(),
            );
        }
        attempted
    }

    /// Shares `surface` and returns the id it is mapped under.
    ///
    /// A surface that is already mapped returns its id without a round trip.
    ///
    /// # Errors
    ///
    /// - [`ShareError::PreconditionViolated`] if the surface has no shareable
    ///   memory.
    /// - [`ShareError::TransportUnavailable`] if the remote process cannot be
    ///   reached; nothing is cached.
    /// - [`ShareError::AllocationFailed`] if the id space is exhausted.
    /// - Mapping errors from the transport. The entry is kept, so a later
    ///   call retries the mapping under the same id.
    pub fn share_for_external_id(
        &mut self,
        thread: CoordinatorThread,
        surface: &dyn SharedSurface,
    ) -> Result<ExternalImageId, ShareError> {
        self.check_thread(thread);
        let (id, _) = Self::share_entry(
            &mut self.cache,
            &mut self.ids,
            &mut self.transport,
            &mut self.tracer,
            surface,
        )?;
        Ok(id)
    }

    /// Shares `surface` and returns `consumer`'s key for it.
    ///
    /// The first call for a consumer allocates a key and enqueues an
    /// `AddImage`. Later calls enqueue an `UpdateImage` for the region made
    /// dirty since the consumer last updated, or nothing if the image is
    /// clean.
    ///
    /// # Errors
    ///
    /// [`ShareError::PreconditionViolated`] if `consumer` was removed, and
    /// everything [`share_for_external_id`](Self::share_for_external_id)
    /// returns.
    pub fn share_for_image_key(
        &mut self,
        thread: CoordinatorThread,
        surface: &dyn SharedSurface,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> Result<ImageKey, ShareError> {
        self.check_thread(thread);
        if !self.consumers.is_alive(consumer) {
            return Err(ShareError::PreconditionViolated(
                Precondition::StaleConsumer,
            ));
        }
        let (id, entry) = Self::share_entry(
            &mut self.cache,
            &mut self.ids,
            &mut self.transport,
            &mut self.tracer,
            surface,
        )?;
        let update = entry
            .keys_mut()
            .update_key(id, consumer, &mut self.consumers, queue, None)?;
        trace_key_update(&mut self.tracer, consumer, id, update);
        Ok(update.key)
    }

    /// Shares the current image of `container` and returns `consumer`'s key
    /// for it.
    ///
    /// # Errors
    ///
    /// [`ShareError::NotSupported`] if the container's image cannot be shared
    /// through mapped memory, so the caller should copy it instead, and
    /// everything [`share_for_image_key`](Self::share_for_image_key) returns.
    pub fn share_from_container(
        &mut self,
        thread: CoordinatorThread,
        container: &dyn ImageContainer,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> Result<ImageKey, ShareError> {
        self.check_thread(thread);
        let surface = container_surface(container)?;
        self.share_for_image_key(thread, surface.as_ref(), consumer, queue)
    }

    /// Looks up or creates the entry for `surface` and makes sure it is
    /// mapped.
    ///
    /// Written over disjoint fields so that callers can keep using the
    /// consumer table while holding the returned entry.
    fn share_entry<'a>(
        cache: &'a mut SurfaceCache,
        ids: &mut IdentityAllocator,
        transport: &mut T,
        tracer: &mut Tracer,
        surface: &dyn SharedSurface,
    ) -> Result<(ExternalImageId, &'a mut SurfaceEntry), ShareError> {
        let surface_id = surface.surface_id();
        match Self::try_share_entry(cache, ids, transport, tracer, surface) {
            Ok(shared) => {
                surface.sharing_state().mark_shared();
                Ok(shared)
            }
            Err(error) => {
                surface.sharing_state().reset();
                tracer.share_failed(surface_id, error);
                tracing::warn!(surface = ?surface_id, %error, "failed to share surface");
                Err(error)
            }
        }
    }

    fn try_share_entry<'a>(
        cache: &'a mut SurfaceCache,
        ids: &mut IdentityAllocator,
        transport: &mut T,
        tracer: &mut Tracer,
        surface: &dyn SharedSurface,
    ) -> Result<(ExternalImageId, &'a mut SurfaceEntry), ShareError> {
        if !surface.has_shared_memory() {
            return Err(ShareError::PreconditionViolated(
                Precondition::NoSharedMemory,
            ));
        }
        if !transport.can_send() {
            return Err(ShareError::TransportUnavailable);
        }
        let namespace = transport.namespace();
        if namespace != ids.namespace() {
            tracing::debug!(
                from = ?ids.namespace(),
                to = ?namespace,
                "transport namespace changed; restarting id allocation"
            );
            ids.reset(namespace);
        }

        let surface_id = surface.surface_id();
        let entry = cache.get_or_insert(surface_id);
        let id = match entry.id() {
            Some(id) if ids.owns(id) => id,
            stale => {
                if let Some(stale) = stale {
                    // The remote side forgot the mapping and every key with it.
                    tracing::debug!(surface = ?surface_id, ?stale, "replacing id from a previous namespace");
                }
                let id = ids.allocate()?;
                entry.set_id(id);
                id
            }
        };

        if entry.is_shared() {
            tracing::trace!(surface = ?surface_id, ?id, "share cache hit");
            return Ok((id, entry));
        }

        transport.map_surface(surface, id)?;
        entry.mark_shared();
        tracer.surface_shared(surface_id, id);
        tracing::debug!(surface = ?surface_id, ?id, "surface shared");
        Ok((id, entry))
    }

    // -- lookup and invalidation --------------------------------------------

    /// Returns the id `surface` is mapped under, if it is shared.
    #[must_use]
    pub fn external_id(
        &self,
        thread: CoordinatorThread,
        surface: SurfaceId,
    ) -> Option<ExternalImageId> {
        self.check_thread(thread);
        self.cache.get(surface).and_then(SurfaceEntry::shared_id)
    }

    /// Records that `rect` of `surface` changed.
    ///
    /// The region is held for every consumer and sent with its next key
    /// update. Nothing is enqueued here. Empty rectangles and surfaces that
    /// were never shared are ignored.
    pub fn notify_dirty(&mut self, thread: CoordinatorThread, surface: SurfaceId, rect: Rect) {
        self.check_thread(thread);
        if dirty::is_empty(rect) {
            return;
        }
        if let Some(entry) = self.cache.get_mut(surface) {
            entry.keys_mut().merge_dirty(rect);
        }
    }

    // -- teardown -----------------------------------------------------------

    /// Tears down the entry of a destroyed surface and releases its id.
    pub fn detach(&mut self, thread: CoordinatorThread, surface: SurfaceId) {
        self.unshare(thread, surface, true);
    }

    /// Removes the entry for `surface`.
    ///
    /// Every key held by a live consumer is parked for deletion on that
    /// consumer. If the surface was mapped, the transport unmaps it. With
    /// `release_id`, the id is handed back to the allocator; it is only
    /// reused if [`CoordinatorConfig::recycle_released_ids`] is set.
    ///
    /// The surface's own sharing flag is not reachable from here and may
    /// still read as shared. That does not block a later [`ShareSender`]
    /// request, which maps the surface again.
    ///
    /// Returns `false` if the surface had no entry.
    pub fn unshare(&mut self, thread: CoordinatorThread, surface: SurfaceId, release_id: bool) -> bool {
        self.check_thread(thread);
        let Some(mut entry) = self.cache.remove(surface) else {
            return false;
        };
        let discarded = entry.keys_mut().discard_all(&mut self.consumers);
        if let Some(id) = entry.shared_id() {
            // Mappings from an older namespace died with it.
            if self.ids.owns(id) {
                self.transport.unmap_surface(id);
            }
        }
        let released = match entry.id() {
            Some(id) if release_id => {
                self.ids.release(id);
                true
            }
            _ => false,
        };
        self.tracer.surface_unshared(
            surface,
            entry.id(),
            u32::try_from(discarded).unwrap_or(u32::MAX),
            released,
        );
        tracing::debug!(?surface, id = ?entry.id(), discarded, released, "surface unshared");
        true
    }

    // -- consumers ----------------------------------------------------------

    /// Registers a consumer whose keys live in `namespace`.
    pub fn register_consumer(
        &mut self,
        thread: CoordinatorThread,
        namespace: IdNamespace,
    ) -> ConsumerId {
        self.check_thread(thread);
        self.consumers.create(namespace)
    }

    /// Removes a consumer and forgets every key it holds.
    ///
    /// No `DeleteImage` is produced: the consumer's key namespace goes away
    /// with it.
    pub fn remove_consumer(&mut self, thread: CoordinatorThread, consumer: ConsumerId) {
        self.check_thread(thread);
        if !self.consumers.is_alive(consumer) {
            return;
        }
        for (_, entry) in self.cache.iter_mut() {
            entry.keys_mut().remove_consumer(consumer);
        }
        self.consumers.remove(consumer);
    }

    /// Moves a reinitialized consumer to `namespace`.
    ///
    /// Its existing keys become stale; the next key update for each image
    /// allocates a fresh key and enqueues an `AddImage`.
    pub fn reset_consumer_namespace(
        &mut self,
        thread: CoordinatorThread,
        consumer: ConsumerId,
        namespace: IdNamespace,
    ) {
        self.check_thread(thread);
        self.consumers.set_namespace(consumer, namespace);
    }

    /// Returns `true` if `consumer` has not been removed.
    #[must_use]
    pub fn is_consumer_alive(&self, consumer: ConsumerId) -> bool {
        self.consumers.is_alive(consumer)
    }

    /// Enqueues a `DeleteImage` for every key parked on `consumer`.
    ///
    /// Returns the number of instructions enqueued.
    pub fn flush_discards(
        &mut self,
        thread: CoordinatorThread,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> usize {
        self.check_thread(thread);
        let keys = self.consumers.take_discards(consumer);
        for &key in &keys {
            queue.delete_image(key);
        }
        keys.len()
    }

    // -- animation support --------------------------------------------------

    /// Runs a key update against a key set owned outside the cache.
    pub(crate) fn update_owned_keys(
        &mut self,
        keys: &mut ConsumerKeys,
        id: ExternalImageId,
        consumer: ConsumerId,
        queue: &mut ResourceUpdateQueue,
    ) -> Result<ImageKey, ShareError> {
        if !self.consumers.is_alive(consumer) {
            return Err(ShareError::PreconditionViolated(
                Precondition::StaleConsumer,
            ));
        }
        let update = keys.update_key(id, consumer, &mut self.consumers, queue, None)?;
        trace_key_update(&mut self.tracer, consumer, id, update);
        Ok(update.key)
    }

    /// Parks every key of a key set owned outside the cache for deletion.
    pub(crate) fn discard_owned_keys(
        &mut self,
        thread: CoordinatorThread,
        keys: &mut ConsumerKeys,
    ) -> usize {
        self.check_thread(thread);
        keys.discard_all(&mut self.consumers)
    }

    pub(crate) fn trace_retarget(
        &mut self,
        from: ExternalImageId,
        to: ExternalImageId,
        surface: SurfaceId,
    ) {
        self.tracer.frame_retargeted(from, to, surface);
    }
}

/// Returns the surface of `container`'s current image, if it can be shared
/// by mapping.
pub(crate) fn container_surface<C: ImageContainer + ?Sized>(
    container: &C,
) -> Result<Arc<dyn SharedSurface>, ShareError> {
    if !container.supports_shared_surfaces() {
        return Err(ShareError::NotSupported(Unsupported::Container));
    }
    let Some(surface) = container.current_surface_for_sharing() else {
        return Err(ShareError::NotSupported(Unsupported::NoCurrentImage));
    };
    if !surface.has_shared_memory() {
        return Err(ShareError::NotSupported(Unsupported::NotShareable));
    }
    Ok(surface)
}

fn trace_key_update(
    tracer: &mut Tracer,
    consumer: ConsumerId,
    id: ExternalImageId,
    update: KeyUpdate,
) {
    match update.outcome {
        KeyOutcome::Added => {
            tracer.key_added(consumer, update.key, id);
            tracing::debug!(?consumer, key = ?update.key, ?id, "image key added");
        }
        KeyOutcome::Updated(rect) => {
            tracer.key_updated(consumer, update.key, id, rect);
        }
        KeyOutcome::Unchanged => {}
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use surfshare_core::AllocationKind;
    use surfshare_core::resource::ResourceUpdate;

    use super::*;
    use crate::testing::{RecordingTransport, TestContainer, TestSurface};

    fn coordinator() -> (CoordinatorThread, SharingCoordinator<RecordingTransport>) {
        coordinator_with(CoordinatorConfig::default())
    }

    fn coordinator_with(
        config: CoordinatorConfig,
    ) -> (CoordinatorThread, SharingCoordinator<RecordingTransport>) {
        let thread = CoordinatorThread::bind();
        let coordinator = SharingCoordinator::new(thread, RecordingTransport::new(1), config);
        (thread, coordinator)
    }

    #[test]
    fn first_share_then_dirty_update() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();

        let k = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let h = coord.external_id(thread, SurfaceId(1)).unwrap();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        coord.notify_dirty(thread, SurfaceId(1), rect);
        let again = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();

        assert_eq!(k, again);
        assert_eq!(
            queue.updates(),
            &[
                ResourceUpdate::AddImage { key: k, id: h },
                ResourceUpdate::UpdateImage {
                    key: k,
                    id: h,
                    dirty: rect
                },
            ]
        );
        assert_eq!(coord.transport().mapped.len(), 1);
    }

    #[test]
    fn share_is_idempotent() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        let a = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        let b = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(coord.transport().mapped, [(SurfaceId(1), a)]);
        assert!(surface.sharing_state().is_shared());
        assert_eq!(coord.len(), 1);
    }

    #[test]
    fn live_ids_are_distinct() {
        let (thread, mut coord) = coordinator();
        let mut seen = BTreeSet::new();
        let surfaces: Vec<_> = (1..=64).map(TestSurface::shareable).collect();
        for surface in &surfaces {
            let id = coord
                .share_for_external_id(thread, surface.as_ref())
                .unwrap();
            assert!(seen.insert(id), "duplicate id {id:?}");
        }
    }

    #[test]
    fn clean_key_updates_enqueue_nothing() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        let k1 = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let mut queue = ResourceUpdateQueue::new();
        let k2 = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        assert_eq!(k1, k2);
        assert!(queue.is_empty());
    }

    #[test]
    fn dirty_rects_merge_into_their_union() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        let key = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();

        coord.notify_dirty(thread, SurfaceId(1), Rect::new(0.0, 0.0, 2.0, 2.0));
        coord.notify_dirty(thread, SurfaceId(1), Rect::new(5.0, 5.0, 8.0, 9.0));
        coord.notify_dirty(thread, SurfaceId(1), Rect::ZERO);

        let mut queue = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let h = coord.external_id(thread, SurfaceId(1)).unwrap();
        assert_eq!(
            queue.updates(),
            &[ResourceUpdate::UpdateImage {
                key,
                id: h,
                dirty: Rect::new(0.0, 0.0, 8.0, 9.0)
            }]
        );
    }

    #[test]
    fn consumers_drain_dirty_independently() {
        let (thread, mut coord) = coordinator();
        let a = coord.register_consumer(thread, IdNamespace(100));
        let b = coord.register_consumer(thread, IdNamespace(200));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut queue)
            .unwrap();
        let kb = coord
            .share_for_image_key(thread, surface.as_ref(), b, &mut queue)
            .unwrap();

        let rect = Rect::new(1.0, 1.0, 3.0, 3.0);
        coord.notify_dirty(thread, SurfaceId(1), rect);

        let mut qa = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut qa)
            .unwrap();
        assert_eq!(qa.len(), 1);

        let mut qb = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), b, &mut qb)
            .unwrap();
        let h = coord.external_id(thread, SurfaceId(1)).unwrap();
        assert_eq!(
            qb.updates(),
            &[ResourceUpdate::UpdateImage {
                key: kb,
                id: h,
                dirty: rect
            }]
        );
    }

    #[test]
    fn unshare_discards_keys_and_unmaps() {
        let (thread, mut coord) = coordinator();
        let a = coord.register_consumer(thread, IdNamespace(100));
        let b = coord.register_consumer(thread, IdNamespace(200));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        let ka = coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut queue)
            .unwrap();
        let kb = coord
            .share_for_image_key(thread, surface.as_ref(), b, &mut queue)
            .unwrap();
        let h = coord.external_id(thread, SurfaceId(1)).unwrap();

        assert!(coord.unshare(thread, SurfaceId(1), true));
        assert!(!coord.unshare(thread, SurfaceId(1), true));
        assert_eq!(coord.transport().unmapped, [h]);
        assert_eq!(coord.external_id(thread, SurfaceId(1)), None);
        assert!(coord.is_empty());

        let mut qa = ResourceUpdateQueue::new();
        assert_eq!(coord.flush_discards(thread, a, &mut qa), 1);
        assert_eq!(qa.updates(), &[ResourceUpdate::DeleteImage { key: ka }]);
        let mut qb = ResourceUpdateQueue::new();
        assert_eq!(coord.flush_discards(thread, b, &mut qb), 1);
        assert_eq!(qb.updates(), &[ResourceUpdate::DeleteImage { key: kb }]);
        assert_eq!(coord.flush_discards(thread, a, &mut qa), 0);
    }

    #[test]
    fn detach_of_unknown_surface_is_a_no_op() {
        let (thread, mut coord) = coordinator();
        coord.detach(thread, SurfaceId(42));
        assert!(coord.transport().unmapped.is_empty());
    }

    #[test]
    fn released_ids_are_reused_only_when_configured() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        let first = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        coord.detach(thread, SurfaceId(1));
        let second = coord
            .share_for_external_id(thread, TestSurface::shareable(2).as_ref())
            .unwrap();
        assert_ne!(first, second);

        let (thread, mut coord) = coordinator_with(CoordinatorConfig::new().with_recycling(true));
        let first = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        coord.detach(thread, SurfaceId(1));
        let second = coord
            .share_for_external_id(thread, TestSurface::shareable(2).as_ref())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unshare_without_release_keeps_the_id_retired() {
        let (thread, mut coord) =
            coordinator_with(CoordinatorConfig::new().with_recycling(true));
        let surface = TestSurface::shareable(1);
        let first = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        coord.unshare(thread, SurfaceId(1), false);
        let second = coord
            .share_for_external_id(thread, TestSurface::shareable(2).as_ref())
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn failed_map_is_retryable() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        coord.transport_mut().reject = true;
        let err = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap_err();
        assert!(matches!(err, ShareError::TransportRejected(_)));
        assert!(err.is_retryable());
        assert_eq!(coord.external_id(thread, SurfaceId(1)), None);
        assert!(!surface.sharing_state().is_shared());

        coord.transport_mut().reject = false;
        let id = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        assert_eq!(err, ShareError::TransportRejected(id));
        assert_eq!(coord.transport().mapped, [(SurfaceId(1), id)]);
    }

    #[test]
    fn unavailable_transport_caches_nothing() {
        let (thread, mut coord) = coordinator();
        coord.transport_mut().connected = false;
        let err = coord
            .share_for_external_id(thread, TestSurface::shareable(1).as_ref())
            .unwrap_err();
        assert_eq!(err, ShareError::TransportUnavailable);
        assert!(coord.is_empty());
    }

    #[test]
    fn surface_without_shared_memory_is_rejected() {
        let (thread, mut coord) = coordinator();
        let err = coord
            .share_for_external_id(thread, TestSurface::unshareable(1).as_ref())
            .unwrap_err();
        assert_eq!(
            err,
            ShareError::PreconditionViolated(Precondition::NoSharedMemory)
        );
    }

    #[test]
    fn exhausted_id_space_is_reported() {
        let (thread, mut coord) =
            coordinator_with(CoordinatorConfig::new().with_max_external_ids(1));
        coord
            .share_for_external_id(thread, TestSurface::shareable(1).as_ref())
            .unwrap();
        let err = coord
            .share_for_external_id(thread, TestSurface::shareable(2).as_ref())
            .unwrap_err();
        assert_eq!(err, ShareError::AllocationFailed(AllocationKind::ExternalId));
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_restart_reallocates_and_re_adds() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let old = coord.external_id(thread, SurfaceId(1)).unwrap();

        coord.transport_mut().namespace = IdNamespace(2);
        let mut queue = ResourceUpdateQueue::new();
        let key = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let new = coord.external_id(thread, SurfaceId(1)).unwrap();

        assert_ne!(old, new);
        assert_eq!(new.namespace(), IdNamespace(2));
        assert_eq!(queue.updates(), &[ResourceUpdate::AddImage { key, id: new }]);
        assert_eq!(coord.transport().mapped.len(), 2);

        // The old key was dropped without a discard.
        let mut flushed = ResourceUpdateQueue::new();
        assert_eq!(coord.flush_discards(thread, consumer, &mut flushed), 0);
    }

    #[test]
    fn consumer_reset_re_adds_its_key() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        let old = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();

        coord.reset_consumer_namespace(thread, consumer, IdNamespace(101));
        let mut queue = ResourceUpdateQueue::new();
        let key = coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        let h = coord.external_id(thread, SurfaceId(1)).unwrap();

        assert_ne!(old, key);
        assert_eq!(key.namespace, IdNamespace(101));
        assert_eq!(queue.updates(), &[ResourceUpdate::AddImage { key, id: h }]);
    }

    #[test]
    fn removed_consumers_are_rejected_and_forgotten() {
        let (thread, mut coord) = coordinator();
        let a = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut queue)
            .unwrap();

        coord.remove_consumer(thread, a);
        assert!(!coord.is_consumer_alive(a));
        let err = coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut queue)
            .unwrap_err();
        assert_eq!(
            err,
            ShareError::PreconditionViolated(Precondition::StaleConsumer)
        );

        // Nothing is parked for a consumer that no longer exists.
        coord.unshare(thread, SurfaceId(1), true);
        let b = coord.register_consumer(thread, IdNamespace(200));
        assert_eq!(b.index(), a.index());
        let mut flushed = ResourceUpdateQueue::new();
        assert_eq!(coord.flush_discards(thread, b, &mut flushed), 0);
    }

    #[test]
    fn removing_one_consumer_leaves_the_other_key_alone() {
        let (thread, mut coord) = coordinator();
        let a = coord.register_consumer(thread, IdNamespace(100));
        let b = coord.register_consumer(thread, IdNamespace(200));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        let ka = coord
            .share_for_image_key(thread, surface.as_ref(), a, &mut queue)
            .unwrap();
        let kb = coord
            .share_for_image_key(thread, surface.as_ref(), b, &mut queue)
            .unwrap();
        assert_ne!(ka, kb);

        coord.remove_consumer(thread, a);
        let mut queue = ResourceUpdateQueue::new();
        let again = coord
            .share_for_image_key(thread, surface.as_ref(), b, &mut queue)
            .unwrap();
        assert_eq!(again, kb);
        assert!(queue.is_empty());
        assert!(coord.is_consumer_alive(b));
        assert_eq!(coord.transport().mapped.len(), 1);
    }

    #[test]
    fn container_checks_come_first() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let mut queue = ResourceUpdateQueue::new();

        let unsupported = TestContainer::new(false, Some(TestSurface::shareable(1)));
        let empty = TestContainer::new(true, None);
        let copy_only = TestContainer::new(true, Some(TestSurface::unshareable(2)));
        let ok = TestContainer::new(true, Some(TestSurface::shareable(3)));

        let share = |coord: &mut SharingCoordinator<RecordingTransport>,
                     container: &TestContainer,
                     queue: &mut ResourceUpdateQueue| {
            coord.share_from_container(thread, container, consumer, queue)
        };
        assert_eq!(
            share(&mut coord, &unsupported, &mut queue),
            Err(ShareError::NotSupported(Unsupported::Container))
        );
        assert_eq!(
            share(&mut coord, &empty, &mut queue),
            Err(ShareError::NotSupported(Unsupported::NoCurrentImage))
        );
        assert_eq!(
            share(&mut coord, &copy_only, &mut queue),
            Err(ShareError::NotSupported(Unsupported::NotShareable))
        );
        assert!(queue.is_empty());
        assert!(coord.is_empty());

        let key = share(&mut coord, &ok, &mut queue).unwrap();
        assert_eq!(queue.updates()[0].key(), key);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "sharing coordinator used off its thread")]
    fn container_share_checks_the_thread_first() {
        let (thread, mut coord) = coordinator();
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        coord.thread = std::thread::spawn(|| std::thread::current().id())
            .join()
            .unwrap();
        let unsupported = TestContainer::new(false, None);
        let mut queue = ResourceUpdateQueue::new();
        _ = coord.share_from_container(thread, &unsupported, consumer, &mut queue);
    }

    #[test]
    fn async_share_is_deduplicated() {
        let (thread, mut coord) = coordinator();
        let sender = coord.sender();
        let surface = TestSurface::shareable(1);
        sender.share(&surface);
        sender.share(&surface);

        assert_eq!(coord.process_pending(thread), 1);
        assert!(surface.sharing_state().is_shared());
        assert_eq!(coord.transport().mapped.len(), 1);

        // Already shared: answered from the cache.
        sender.share(&surface);
        assert_eq!(coord.process_pending(thread), 1);
        assert_eq!(coord.transport().mapped.len(), 1);
    }

    #[test]
    fn async_share_after_unshare_maps_again() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        let first = coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();
        coord.unshare(thread, SurfaceId(1), true);

        coord.sender().share(&surface);
        assert_eq!(coord.process_pending(thread), 1);
        let second = coord.external_id(thread, SurfaceId(1)).unwrap();
        assert_ne!(first, second);
        assert_eq!(coord.transport().mapped.len(), 2);
        assert!(surface.sharing_state().is_shared());
    }

    #[test]
    fn async_share_after_transport_restart_maps_again() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        coord
            .share_for_external_id(thread, surface.as_ref())
            .unwrap();

        coord.transport_mut().namespace = IdNamespace(2);
        coord.sender().share(&surface);
        assert_eq!(coord.process_pending(thread), 1);
        let id = coord.external_id(thread, SurfaceId(1)).unwrap();
        assert_eq!(id.namespace(), IdNamespace(2));
        assert_eq!(coord.transport().mapped.len(), 2);
        assert_eq!(coord.transport().mapped[1], (SurfaceId(1), id));
    }

    #[test]
    fn async_share_of_dropped_surface_is_skipped() {
        let (thread, mut coord) = coordinator();
        let surface = TestSurface::shareable(1);
        coord.sender().share(&surface);
        drop(surface);
        assert_eq!(coord.process_pending(thread), 0);
        assert!(coord.is_empty());
    }

    #[test]
    fn async_failure_allows_a_later_request() {
        let (thread, mut coord) = coordinator();
        let sender = coord.sender();
        let surface = TestSurface::shareable(1);
        coord.transport_mut().reject = true;
        sender.share(&surface);
        assert_eq!(coord.process_pending(thread), 1);
        assert!(!surface.sharing_state().is_pending());

        coord.transport_mut().reject = false;
        sender.share(&surface);
        assert_eq!(coord.process_pending(thread), 1);
        assert!(coord.external_id(thread, SurfaceId(1)).is_some());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn trace_sink_sees_sharing_events() {
        use std::cell::RefCell;
        use std::rc::Rc;

        use surfshare_core::trace::{KeyAddedEvent, SurfaceSharedEvent, SurfaceUnsharedEvent};

        struct Log(Rc<RefCell<Vec<&'static str>>>);

        impl TraceSink for Log {
            fn on_surface_shared(&mut self, _: &SurfaceSharedEvent) {
                self.0.borrow_mut().push("shared");
            }
            fn on_key_added(&mut self, _: &KeyAddedEvent) {
                self.0.borrow_mut().push("key");
            }
            fn on_surface_unshared(&mut self, _: &SurfaceUnsharedEvent) {
                self.0.borrow_mut().push("unshared");
            }
        }

        let (thread, mut coord) = coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        coord.set_trace_sink(Box::new(Log(Rc::clone(&log))));
        let consumer = coord.register_consumer(thread, IdNamespace(100));
        let surface = TestSurface::shareable(1);
        let mut queue = ResourceUpdateQueue::new();
        coord
            .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
            .unwrap();
        coord.detach(thread, SurfaceId(1));
        assert_eq!(*log.borrow(), ["shared", "key", "unshared"]);
    }

    #[test]
    fn async_share_from_worker_thread() {
        let (thread, mut coord) = coordinator();
        let sender = coord.sender();
        let surface = TestSurface::shareable(7);
        let posted = Arc::clone(&surface);
        std::thread::spawn(move || sender.share(&posted))
            .join()
            .unwrap();
        assert_eq!(coord.process_pending(thread), 1);
        assert!(coord.external_id(thread, SurfaceId(7)).is_some());
    }
}
