// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proof of running on the coordinator thread.
//!
//! Every synchronous [`SharingCoordinator`](crate::SharingCoordinator)
//! operation takes a [`CoordinatorThread`] token. The token cannot leave the
//! thread that produced it, so holding one is evidence that handle-table
//! mutation is serialized on that thread.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

thread_local! {
    static BOUND: Cell<bool> = const { Cell::new(false) };
}

/// A marker proving the current thread is a coordinator thread.
///
/// `Copy`, but neither `Send` nor `Sync`.
#[derive(Clone, Copy)]
pub struct CoordinatorThread {
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for CoordinatorThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorThread").finish_non_exhaustive()
    }
}

impl CoordinatorThread {
    /// Designates the current thread as a coordinator thread and returns its
    /// token.
    ///
    /// Binding is sticky for the lifetime of the thread; binding twice is
    /// harmless.
    #[must_use]
    pub fn bind() -> Self {
        BOUND.with(|bound| bound.set(true));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Returns the token if the current thread was bound with
    /// [`bind`](Self::bind).
    #[must_use]
    pub fn get() -> Option<Self> {
        BOUND.with(Cell::get).then_some(Self {
            _not_send: PhantomData,
        })
    }

    /// Returns `true` if the current thread was bound.
    #[must_use]
    pub fn is_bound() -> bool {
        BOUND.with(Cell::get)
    }
}
