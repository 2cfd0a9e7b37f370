// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for sharing operations.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! coordinator calls as surfaces are shared, keyed, and torn down. All method
//! bodies default to no-ops, so implementing only the events you care about is
//! fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`] and stamps every event with
//! a sequence number. When the `trace` feature is **off**, every `Tracer`
//! method compiles to nothing (zero overhead). When **on**, each method
//! performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;

use kurbo::Rect;

use crate::error::ShareError;
use crate::id::{ConsumerId, ExternalImageId, ImageKey, SurfaceId};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the transport acknowledged a new mapping.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceSharedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The surface that was mapped.
    pub surface: SurfaceId,
    /// The id it was mapped under.
    pub id: ExternalImageId,
}

/// Emitted when a share attempt failed.
#[derive(Clone, Copy, Debug)]
pub struct ShareFailedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The surface that could not be shared.
    pub surface: SurfaceId,
    /// Why.
    pub error: ShareError,
}

/// Emitted when a consumer received a new key and an `AddImage` was queued.
#[derive(Clone, Copy, Debug)]
pub struct KeyAddedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The consumer holding the key.
    pub consumer: ConsumerId,
    /// The new key.
    pub key: ImageKey,
    /// The image the key refers to.
    pub id: ExternalImageId,
}

/// Emitted when an `UpdateImage` was queued for an existing key.
#[derive(Clone, Copy, Debug)]
pub struct KeyUpdatedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The consumer holding the key.
    pub consumer: ConsumerId,
    /// The key being updated.
    pub key: ImageKey,
    /// The image the key refers to.
    pub id: ExternalImageId,
    /// The drained dirty region.
    pub dirty: Rect,
}

/// Emitted when a surface entry was torn down.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceUnsharedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The surface whose entry was removed.
    pub surface: SurfaceId,
    /// The id it held, if any.
    pub id: Option<ExternalImageId>,
    /// Number of keys parked for deletion.
    pub keys_discarded: u32,
    /// Whether the id was released to the allocator.
    pub released: bool,
}

/// Emitted when an animation moved its key to a new frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameRetargetedEvent {
    /// Event sequence number.
    pub seq: u64,
    /// The previous frame's id.
    pub from: ExternalImageId,
    /// The new frame's id.
    pub to: ExternalImageId,
    /// The new frame's surface.
    pub surface: SurfaceId,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the sharing coordinator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a mapping was acknowledged.
    fn on_surface_shared(&mut self, e: &SurfaceSharedEvent) {
        _ = e;
    }

    /// Called when a share attempt failed.
    fn on_share_failed(&mut self, e: &ShareFailedEvent) {
        _ = e;
    }

    /// Called when a key was added.
    fn on_key_added(&mut self, e: &KeyAddedEvent) {
        _ = e;
    }

    /// Called when a key update was queued.
    fn on_key_updated(&mut self, e: &KeyUpdatedEvent) {
        _ = e;
    }

    /// Called when an entry was torn down.
    fn on_surface_unshared(&mut self, e: &SurfaceUnsharedEvent) {
        _ = e;
    }

    /// Called when an animation key moved to a new frame.
    fn on_frame_retargeted(&mut self, e: &FrameRetargetedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// Callers fill in every field except `seq`; the tracer assigns sequence
/// numbers in emission order.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
    #[cfg(feature = "trace")]
    seq: u64,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<Option<Box<dyn TraceSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink: Some(sink),
                seq: 0,
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self::none()
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[cfg(feature = "trace")]
    #[inline]
    fn dispatch(&mut self, f: impl FnOnce(&mut dyn TraceSink, u64)) {
        if let Some(s) = &mut self.sink {
            let seq = self.seq;
            self.seq += 1;
            f(s.as_mut(), seq);
        }
    }

    /// Emits a [`SurfaceSharedEvent`].
    #[inline]
    pub fn surface_shared(&mut self, surface: SurfaceId, id: ExternalImageId) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| s.on_surface_shared(&SurfaceSharedEvent { seq, surface, id }));
        #[cfg(not(feature = "trace"))]
        {
            _ = (surface, id);
        }
    }

    /// Emits a [`ShareFailedEvent`].
    #[inline]
    pub fn share_failed(&mut self, surface: SurfaceId, error: ShareError) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| {
            s.on_share_failed(&ShareFailedEvent {
                seq,
                surface,
                error,
            });
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (surface, error);
        }
    }

    /// Emits a [`KeyAddedEvent`].
    #[inline]
    pub fn key_added(&mut self, consumer: ConsumerId, key: ImageKey, id: ExternalImageId) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| {
            s.on_key_added(&KeyAddedEvent {
                seq,
                consumer,
                key,
                id,
            });
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (consumer, key, id);
        }
    }

    /// Emits a [`KeyUpdatedEvent`].
    #[inline]
    pub fn key_updated(
        &mut self,
        consumer: ConsumerId,
        key: ImageKey,
        id: ExternalImageId,
        dirty: Rect,
    ) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| {
            s.on_key_updated(&KeyUpdatedEvent {
                seq,
                consumer,
                key,
                id,
                dirty,
            });
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (consumer, key, id, dirty);
        }
    }

    /// Emits a [`SurfaceUnsharedEvent`].
    #[inline]
    pub fn surface_unshared(
        &mut self,
        surface: SurfaceId,
        id: Option<ExternalImageId>,
        keys_discarded: u32,
        released: bool,
    ) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| {
            s.on_surface_unshared(&SurfaceUnsharedEvent {
                seq,
                surface,
                id,
                keys_discarded,
                released,
            });
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (surface, id, keys_discarded, released);
        }
    }

    /// Emits a [`FrameRetargetedEvent`].
    #[inline]
    pub fn frame_retargeted(&mut self, from: ExternalImageId, to: ExternalImageId, surface: SurfaceId) {
        #[cfg(feature = "trace")]
        self.dispatch(|s, seq| {
            s.on_frame_retargeted(&FrameRetargetedEvent {
                seq,
                from,
                to,
                surface,
            });
        });
        #[cfg(not(feature = "trace"))]
        {
            _ = (from, to, surface);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
