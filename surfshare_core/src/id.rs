// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface, consumer, and image identity types.

use core::fmt;

/// One incarnation of a remote endpoint or consumer.
///
/// When the remote compositor restarts, or a consumer reinitializes its
/// connection, it comes back with a new namespace. Ids minted under an older
/// namespace no longer name anything on the remote side.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IdNamespace(pub u32);

impl fmt::Debug for IdNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdNamespace({})", self.0)
    }
}

/// A process-wide handle naming a shared-memory mapping in the remote process.
///
/// The high 32 bits hold the [`IdNamespace`] the id was allocated under; the
/// low 32 bits hold the resource number within that namespace.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExternalImageId(pub u64);

impl ExternalImageId {
    /// Packs a namespace and a resource number into an id.
    #[inline]
    #[must_use]
    pub const fn new(namespace: IdNamespace, resource: u32) -> Self {
        Self(((namespace.0 as u64) << 32) | resource as u64)
    }

    /// Returns the namespace this id was allocated under.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the high half is the namespace by construction"
    )]
    pub const fn namespace(self) -> IdNamespace {
        IdNamespace((self.0 >> 32) as u32)
    }

    /// Returns the resource number within the namespace.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the low half is the resource number by construction"
    )]
    pub const fn resource(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Debug for ExternalImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExternalImageId({}:{})",
            self.namespace().0,
            self.resource()
        )
    }
}

/// A key naming an image resource within one consumer's namespace.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    /// The consumer namespace this key was allocated under.
    pub namespace: IdNamespace,
    /// Resource number within the namespace.
    pub resource: u32,
}

impl ImageKey {
    /// Creates a key from its parts.
    #[inline]
    #[must_use]
    pub const fn new(namespace: IdNamespace, resource: u32) -> Self {
        Self {
            namespace,
            resource,
        }
    }
}

impl fmt::Debug for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({}:{})", self.namespace.0, self.resource)
    }
}

/// The stable identity of a shared surface.
///
/// Surfaces are created and destroyed by the imaging subsystem, which assigns
/// this id. Caches key on identity, never on pixel content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// A handle to a consumer in a [`ConsumerTable`](crate::consumer::ConsumerTable).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a consumer is removed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId {
    /// Slot index into the table's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the table's generation for this slot.
    pub(crate) generation: u32,
}

impl ConsumerId {
    /// Rebuilds a handle from its raw parts.
    ///
    /// Intended for decoding recorded traces. A handle built this way is only
    /// valid if the table actually issued it.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsumerId({}@gen{})", self.idx, self.generation)
    }
}
