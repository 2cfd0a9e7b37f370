// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for sharing operations.

use crate::id::ExternalImageId;

/// Which identifier space ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocationKind {
    /// The external image id space of the current transport namespace.
    ExternalId,
    /// A consumer's image key space.
    ImageKey,
}

/// Why an input cannot be shared through mapped memory.
///
/// Callers seeing one of these fall back to copying the pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unsupported {
    /// The container shares its images some other way.
    Container,
    /// The container has no current image.
    NoCurrentImage,
    /// The container's current surface is not backed by shareable memory.
    NotShareable,
}

/// A broken calling contract.
///
/// These indicate defects in the caller and should be caught in testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precondition {
    /// The surface has no backing shareable memory.
    NoSharedMemory,
    /// The consumer handle refers to a removed consumer.
    StaleConsumer,
}

/// Errors returned by sharing operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// A handle or key space is exhausted. Not retryable without external
    /// remediation.
    #[error("{0:?} space exhausted")]
    AllocationFailed(AllocationKind),
    /// The remote process declined to map the surface.
    #[error("remote process rejected mapping for {0:?}")]
    TransportRejected(ExternalImageId),
    /// The remote process is not reachable (e.g. it crashed and has not been
    /// restarted yet).
    #[error("transport is not available")]
    TransportUnavailable,
    /// The input cannot be shared through mapped memory.
    #[error("sharing not supported: {0:?}")]
    NotSupported(Unsupported),
    /// The caller broke the calling contract.
    #[error("precondition violated: {0:?}")]
    PreconditionViolated(Precondition),
}

impl ShareError {
    /// Returns `true` if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportRejected(_) | Self::TransportUnavailable)
    }
}
