// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fire-and-forget share requests from any thread.
//!
//! Producers that decode or rasterize off the coordinator thread want their
//! surfaces mapped before the first frame that uses them. [`ShareSender`]
//! posts a request to the coordinator thread, which handles it in
//! [`SharingCoordinator::process_pending`](crate::SharingCoordinator::process_pending).
//!
//! Requests hold the surface weakly: a surface dropped before its request is
//! handled is simply skipped.

use std::fmt;
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use surfshare_core::backend::SharedSurface;

/// A request to share one surface, handled on the coordinator thread.
pub(crate) struct ShareRequest {
    pub(crate) surface: Weak<dyn SharedSurface>,
}

/// The coordinator's end of the request channel.
pub(crate) struct ShareQueue {
    tx: Sender<ShareRequest>,
    rx: Receiver<ShareRequest>,
}

impl fmt::Debug for ShareQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareQueue")
            .field("pending", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl ShareQueue {
    /// Creates a queue, bounded if `capacity` is set.
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        let (tx, rx) = match capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> ShareSender {
        ShareSender {
            tx: self.tx.clone(),
        }
    }

    /// Takes the next posted request without blocking.
    pub(crate) fn try_next(&self) -> Option<ShareRequest> {
        self.rx.try_recv().ok()
    }

    /// Returns the number of requests waiting.
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

/// A `Send + Sync` handle for requesting a share from any thread.
///
/// Obtained from [`SharingCoordinator::sender`](crate::SharingCoordinator::sender).
/// Cloning is cheap.
#[derive(Clone)]
pub struct ShareSender {
    tx: Sender<ShareRequest>,
}

impl fmt::Debug for ShareSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareSender").finish_non_exhaustive()
    }
}

impl ShareSender {
    /// Asks the coordinator thread to share `surface`.
    ///
    /// Returns immediately. If a share of this surface is already pending,
    /// nothing is posted. A request for a surface that is still mapped is a
    /// cache hit on the coordinator thread; one whose mapping was removed or
    /// lost with the remote endpoint maps it again. The outcome is not
    /// reported back; failures are logged on the coordinator thread and
    /// leave the surface unshared so a later request tries again.
    pub fn share(&self, surface: &Arc<dyn SharedSurface>) {
        let state = surface.sharing_state();
        if !state.try_begin() {
            return;
        }
        let request = ShareRequest {
            surface: Arc::downgrade(surface),
        };
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                state.reset();
                tracing::warn!(
                    surface = ?surface.surface_id(),
                    "share request queue is full; dropping request"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                state.reset();
                tracing::warn!(
                    surface = ?surface.surface_id(),
                    "sharing coordinator is gone; dropping request"
                );
            }
        }
    }
}
