// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator doubles shared by the unit tests.

use std::sync::Arc;

use kurbo::Size;
use surfshare_core::ShareError;
use surfshare_core::backend::{ImageContainer, SharedSurface, SharingState, Transport};
use surfshare_core::id::{ExternalImageId, IdNamespace, SurfaceId};

use crate::animation::{AnimatedImageContainer, AnimationKeyOwner};

/// A surface of 10×10 pixels.
#[derive(Debug)]
pub(crate) struct TestSurface {
    id: SurfaceId,
    shared_memory: bool,
    state: SharingState,
}

impl TestSurface {
    pub(crate) fn shareable(id: u64) -> Arc<dyn SharedSurface> {
        Arc::new(Self {
            id: SurfaceId(id),
            shared_memory: true,
            state: SharingState::new(),
        })
    }

    pub(crate) fn unshareable(id: u64) -> Arc<dyn SharedSurface> {
        Arc::new(Self {
            id: SurfaceId(id),
            shared_memory: false,
            state: SharingState::new(),
        })
    }
}

impl SharedSurface for TestSurface {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> Size {
        Size::new(10.0, 10.0)
    }

    fn has_shared_memory(&self) -> bool {
        self.shared_memory
    }

    fn sharing_state(&self) -> &SharingState {
        &self.state
    }
}

/// A transport that records every call.
#[derive(Debug)]
pub(crate) struct RecordingTransport {
    pub(crate) namespace: IdNamespace,
    pub(crate) connected: bool,
    pub(crate) reject: bool,
    pub(crate) mapped: Vec<(SurfaceId, ExternalImageId)>,
    pub(crate) unmapped: Vec<ExternalImageId>,
}

impl RecordingTransport {
    pub(crate) fn new(namespace: u32) -> Self {
        Self {
            namespace: IdNamespace(namespace),
            connected: true,
            reject: false,
            mapped: Vec::new(),
            unmapped: Vec::new(),
        }
    }
}

impl Transport for RecordingTransport {
    fn namespace(&self) -> IdNamespace {
        self.namespace
    }

    fn can_send(&self) -> bool {
        self.connected
    }

    fn map_surface(
        &mut self,
        surface: &dyn SharedSurface,
        id: ExternalImageId,
    ) -> Result<(), ShareError> {
        if self.reject {
            return Err(ShareError::TransportRejected(id));
        }
        self.mapped.push((surface.surface_id(), id));
        Ok(())
    }

    fn unmap_surface(&mut self, id: ExternalImageId) {
        self.unmapped.push(id);
    }
}

/// A container holding at most one surface, and an animation.
#[derive(Debug)]
pub(crate) struct TestContainer {
    pub(crate) supported: bool,
    pub(crate) current: Option<Arc<dyn SharedSurface>>,
    pub(crate) animation: AnimationKeyOwner,
}

impl TestContainer {
    pub(crate) fn new(supported: bool, current: Option<Arc<dyn SharedSurface>>) -> Self {
        Self {
            supported,
            current,
            animation: AnimationKeyOwner::new(),
        }
    }
}

impl AnimatedImageContainer for TestContainer {
    fn animation_mut(&mut self) -> &mut AnimationKeyOwner {
        &mut self.animation
    }
}

impl ImageContainer for TestContainer {
    fn supports_shared_surfaces(&self) -> bool {
        self.supported
    }

    fn current_surface_for_sharing(&self) -> Option<Arc<dyn SharedSurface>> {
        self.current.clone()
    }
}
