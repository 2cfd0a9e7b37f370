// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface handle cache.
//!
//! Every surface that was ever offered for sharing gets a [`SurfaceEntry`]
//! in the [`SurfaceCache`]:
//!
//! - An external id ([`ExternalImageId`](crate::id::ExternalImageId)),
//!   allocated lazily on the first share attempt.
//! - A `shared` flag, set only once the transport acknowledged the mapping.
//!   Later shares of a shared entry are cache hits with no round trip.
//! - The [`ConsumerKeys`]: one [`ConsumerKeyRecord`] per consumer that asked
//!   for an image key, with the dirty region that consumer has not uploaded
//!   yet.
//!
//! # Lifetime
//!
//! Entries are keyed by [`SurfaceId`](crate::id::SurfaceId), not by
//! reference. The surface's destruction path must remove its entry
//! explicitly; removing an entry hands back its records so the caller can
//! discard the keys and unmap the id.

mod entry;
mod keys;
mod store;

pub use entry::SurfaceEntry;
pub use keys::{ConsumerKeyRecord, ConsumerKeys, KeyOutcome, KeyUpdate};
pub use store::SurfaceCache;
