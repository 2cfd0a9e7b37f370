// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-process surface sharing with stable image keys.
//!
//! `surfshare` maps memory-backed image surfaces into a remote compositing
//! process without copying their pixels, and keeps the renderer-visible image
//! keys of every consumer consistent as surfaces, consumers, and the remote
//! endpoint come and go. The data structures live in [`surfshare_core`]; this
//! crate adds the thread-affine orchestration on top.
//!
//! # Overview
//!
//! ```text
//!   any thread                         coordinator thread
//!   ──────────                         ──────────────────
//!   ShareSender::share ──channel──►  SharingCoordinator::process_pending
//!                                      │
//!   producer ─ share_for_image_key ──► SharingCoordinator ──► Transport
//!                                      │      (cache, ids, consumers)
//!                                      ▼
//!                              ResourceUpdateQueue ──► remote renderer
//! ```
//!
//! - [`SharingCoordinator`] owns the cache, the id allocator, and the consumer
//!   table. Every synchronous operation takes a [`CoordinatorThread`] token.
//! - [`ShareSender`] posts share requests from any thread.
//! - [`AnimationKeyOwner`] keeps one key per consumer across the frames of an
//!   animation. Containers that play one implement [`AnimatedImageContainer`].
//! - [`CoordinatorConfig`] holds the few policy knobs.
//!
//! Diagnostics go through [`tracing`]; the library never installs a
//! subscriber. Structured sharing events are delivered to a
//! [`TraceSink`](surfshare_core::trace::TraceSink) installed with
//! [`SharingCoordinator::set_trace_sink`] when the `trace` feature is on.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use kurbo::Size;
//! use surfshare::{CoordinatorConfig, CoordinatorThread, SharingCoordinator};
//! use surfshare_core::ShareError;
//! use surfshare_core::backend::{SharedSurface, SharingState, Transport};
//! use surfshare_core::id::{ExternalImageId, IdNamespace, SurfaceId};
//! use surfshare_core::resource::{ResourceUpdate, ResourceUpdateQueue};
//!
//! struct Surface(SharingState);
//!
//! impl SharedSurface for Surface {
//!     fn surface_id(&self) -> SurfaceId { SurfaceId(1) }
//!     fn size(&self) -> Size { Size::new(64.0, 64.0) }
//!     fn has_shared_memory(&self) -> bool { true }
//!     fn sharing_state(&self) -> &SharingState { &self.0 }
//! }
//!
//! struct Loopback;
//!
//! impl Transport for Loopback {
//!     fn namespace(&self) -> IdNamespace { IdNamespace(1) }
//!     fn map_surface(
//!         &mut self,
//!         _: &dyn SharedSurface,
//!         _: ExternalImageId,
//!     ) -> Result<(), ShareError> {
//!         Ok(())
//!     }
//!     fn unmap_surface(&mut self, _: ExternalImageId) {}
//! }
//!
//! let thread = CoordinatorThread::bind();
//! let mut coordinator = SharingCoordinator::new(thread, Loopback, CoordinatorConfig::new());
//! let consumer = coordinator.register_consumer(thread, IdNamespace(7));
//!
//! let surface: Arc<dyn SharedSurface> = Arc::new(Surface(SharingState::new()));
//! let mut queue = ResourceUpdateQueue::new();
//! let key = coordinator
//!     .share_for_image_key(thread, surface.as_ref(), consumer, &mut queue)
//!     .unwrap();
//! assert!(matches!(queue.updates(), [ResourceUpdate::AddImage { key: k, .. }] if *k == key));
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Emits [`TraceSink`](surfshare_core::trace::TraceSink)
//!   events.

mod animation;
mod config;
mod coordinator;
mod dispatch;
mod thread;

#[cfg(test)]
mod testing;

pub use animation::{AnimatedImageContainer, AnimationKeyOwner};
pub use config::CoordinatorConfig;
pub use coordinator::SharingCoordinator;
pub use dispatch::ShareSender;
pub use thread::CoordinatorThread;

pub use surfshare_core;
