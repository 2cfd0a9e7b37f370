// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity allocation, handle caching, and key registries for cross-process
//! surface sharing.
//!
//! `surfshare_core` provides the data structures behind sharing a
//! memory-backed image surface with a remote compositing process without
//! copying its pixels. It is `no_std` compatible (with `alloc`); the
//! thread-affine orchestration lives in the `surfshare` crate.
//!
//! # Architecture
//!
//! ```text
//!   SharedSurface ──► SurfaceCache ──► SurfaceEntry { id, shared, keys }
//!                         │                              │
//!                         ▼                              ▼
//!               IdentityAllocator           ConsumerKeys ──► ConsumerTable
//!                 (ExternalImageId)           (ImageKey)       (namespaces)
//!                                                 │
//!                                                 ▼
//!                                       ResourceUpdateQueue
//! ```
//!
//! **[`identity`]** — Allocates process-unique [`ExternalImageId`]s within the
//! transport's current namespace.
//!
//! **[`cache`]** — Per-surface cached state, stored in an arena keyed by
//! [`SurfaceId`], and the per-consumer key records attached to each entry.
//!
//! **[`consumer`]** — Generational storage for consumers (rendering contexts):
//! their key namespace, key counter, and keys waiting to be discarded.
//!
//! **[`dirty`]** — Bounding-box accumulation of dirty rectangles.
//!
//! **[`resource`]** — The append-only instruction queue consumed by the remote
//! renderer.
//!
//! **[`backend`]** — The collaborator traits: [`SharedSurface`](backend::SharedSurface),
//! [`Transport`](backend::Transport) and [`ImageContainer`](backend::ImageContainer).
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! sharing instrumentation, with a zero-overhead [`Tracer`](trace::Tracer).
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//!
//! [`ExternalImageId`]: id::ExternalImageId
//! [`SurfaceId`]: id::SurfaceId

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod cache;
pub mod consumer;
pub mod dirty;
pub mod error;
pub mod id;
pub mod identity;
pub mod resource;
pub mod trace;

pub use error::{AllocationKind, Precondition, ShareError, Unsupported};
