// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use kurbo::Rect;
use surfshare_core::id::{ConsumerId, ExternalImageId, IdNamespace, ImageKey, SurfaceId};
use surfshare_core::trace::{
    FrameRetargetedEvent, KeyAddedEvent, KeyUpdatedEvent, ShareFailedEvent, SurfaceSharedEvent,
    SurfaceUnsharedEvent, TraceSink,
};
use surfshare_core::{AllocationKind, Precondition, ShareError, Unsupported};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SURFACE_SHARED: u8 = 1;
const TAG_SHARE_FAILED: u8 = 2;
const TAG_KEY_ADDED: u8 = 3;
const TAG_KEY_UPDATED: u8 = 4;
const TAG_SURFACE_UNSHARED: u8 = 5;
const TAG_FRAME_RETARGETED: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_consumer(&mut self, c: ConsumerId) {
        self.write_u32(c.index());
        self.write_u32(c.generation());
    }

    fn write_key(&mut self, k: ImageKey) {
        self.write_u32(k.namespace.0);
        self.write_u32(k.resource);
    }

    fn write_rect(&mut self, r: Rect) {
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }

    /// Writes an error as a kind byte, a detail byte, and an id payload.
    fn write_error(&mut self, e: ShareError) {
        let (kind, detail, id) = match e {
            ShareError::AllocationFailed(k) => (
                0,
                match k {
                    AllocationKind::ExternalId => 0,
                    AllocationKind::ImageKey => 1,
                },
                0,
            ),
            ShareError::TransportRejected(id) => (1, 0, id.0),
            ShareError::TransportUnavailable => (2, 0, 0),
            ShareError::NotSupported(u) => (
                3,
                match u {
                    Unsupported::Container => 0,
                    Unsupported::NoCurrentImage => 1,
                    Unsupported::NotShareable => 2,
                },
                0,
            ),
            ShareError::PreconditionViolated(p) => (
                4,
                match p {
                    Precondition::NoSharedMemory => 0,
                    Precondition::StaleConsumer => 1,
                },
                0,
            ),
        };
        self.write_u8(kind);
        self.write_u8(detail);
        self.write_u64(id);
    }
}

impl TraceSink for RecorderSink {
    fn on_surface_shared(&mut self, e: &SurfaceSharedEvent) {
        self.write_u8(TAG_SURFACE_SHARED);
        self.write_u64(e.seq);
        self.write_u64(e.surface.0);
        self.write_u64(e.id.0);
    }

    fn on_share_failed(&mut self, e: &ShareFailedEvent) {
        self.write_u8(TAG_SHARE_FAILED);
        self.write_u64(e.seq);
        self.write_u64(e.surface.0);
        self.write_error(e.error);
    }

    fn on_key_added(&mut self, e: &KeyAddedEvent) {
        self.write_u8(TAG_KEY_ADDED);
        self.write_u64(e.seq);
        self.write_consumer(e.consumer);
        self.write_key(e.key);
        self.write_u64(e.id.0);
    }

    fn on_key_updated(&mut self, e: &KeyUpdatedEvent) {
        self.write_u8(TAG_KEY_UPDATED);
        self.write_u64(e.seq);
        self.write_consumer(e.consumer);
        self.write_key(e.key);
        self.write_u64(e.id.0);
        self.write_rect(e.dirty);
    }

    fn on_surface_unshared(&mut self, e: &SurfaceUnsharedEvent) {
        self.write_u8(TAG_SURFACE_UNSHARED);
        self.write_u64(e.seq);
        self.write_u64(e.surface.0);
        self.write_option_u64(e.id.map(|id| id.0));
        self.write_u32(e.keys_discarded);
        self.write_u8(u8::from(e.released));
    }

    fn on_frame_retargeted(&mut self, e: &FrameRetargetedEvent) {
        self.write_u8(TAG_FRAME_RETARGETED);
        self.write_u64(e.seq);
        self.write_u64(e.from.0);
        self.write_u64(e.to.0);
        self.write_u64(e.surface.0);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SurfaceSharedEvent`].
    SurfaceShared(SurfaceSharedEvent),
    /// A [`ShareFailedEvent`].
    ShareFailed(ShareFailedEvent),
    /// A [`KeyAddedEvent`].
    KeyAdded(KeyAddedEvent),
    /// A [`KeyUpdatedEvent`].
    KeyUpdated(KeyUpdatedEvent),
    /// A [`SurfaceUnsharedEvent`].
    SurfaceUnshared(SurfaceUnsharedEvent),
    /// A [`FrameRetargetedEvent`].
    FrameRetargeted(FrameRetargetedEvent),
}

impl RecordedEvent {
    /// Returns the sequence number of the event.
    #[must_use]
    pub fn seq(&self) -> u64 {
        match self {
            Self::SurfaceShared(e) => e.seq,
            Self::ShareFailed(e) => e.seq,
            Self::KeyAdded(e) => e.seq,
            Self::KeyUpdated(e) => e.seq,
            Self::SurfaceUnshared(e) => e.seq,
            Self::FrameRetargeted(e) => e.seq,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_consumer(&mut self) -> Option<ConsumerId> {
        let idx = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(ConsumerId::from_raw(idx, generation))
    }

    fn read_key(&mut self) -> Option<ImageKey> {
        let namespace = IdNamespace(self.read_u32()?);
        let resource = self.read_u32()?;
        Some(ImageKey::new(namespace, resource))
    }

    fn read_rect(&mut self) -> Option<Rect> {
        Some(Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        ))
    }

    fn read_error(&mut self) -> Option<ShareError> {
        let kind = self.read_u8()?;
        let detail = self.read_u8()?;
        let id = self.read_u64()?;
        Some(match kind {
            0 => ShareError::AllocationFailed(match detail {
                0 => AllocationKind::ExternalId,
                _ => AllocationKind::ImageKey,
            }),
            1 => ShareError::TransportRejected(ExternalImageId(id)),
            2 => ShareError::TransportUnavailable,
            3 => ShareError::NotSupported(match detail {
                0 => Unsupported::Container,
                1 => Unsupported::NoCurrentImage,
                _ => Unsupported::NotShareable,
            }),
            _ => ShareError::PreconditionViolated(match detail {
                0 => Precondition::NoSharedMemory,
                _ => Precondition::StaleConsumer,
            }),
        })
    }

    fn decode_surface_shared(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SurfaceShared(SurfaceSharedEvent {
            seq: self.read_u64()?,
            surface: SurfaceId(self.read_u64()?),
            id: ExternalImageId(self.read_u64()?),
        }))
    }

    fn decode_share_failed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ShareFailed(ShareFailedEvent {
            seq: self.read_u64()?,
            surface: SurfaceId(self.read_u64()?),
            error: self.read_error()?,
        }))
    }

    fn decode_key_added(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::KeyAdded(KeyAddedEvent {
            seq: self.read_u64()?,
            consumer: self.read_consumer()?,
            key: self.read_key()?,
            id: ExternalImageId(self.read_u64()?),
        }))
    }

    fn decode_key_updated(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::KeyUpdated(KeyUpdatedEvent {
            seq: self.read_u64()?,
            consumer: self.read_consumer()?,
            key: self.read_key()?,
            id: ExternalImageId(self.read_u64()?),
            dirty: self.read_rect()?,
        }))
    }

    fn decode_surface_unshared(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SurfaceUnshared(SurfaceUnsharedEvent {
            seq: self.read_u64()?,
            surface: SurfaceId(self.read_u64()?),
            id: self.read_option_u64()?.map(ExternalImageId),
            keys_discarded: self.read_u32()?,
            released: self.read_u8()? != 0,
        }))
    }

    fn decode_frame_retargeted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameRetargeted(FrameRetargetedEvent {
            seq: self.read_u64()?,
            from: ExternalImageId(self.read_u64()?),
            to: ExternalImageId(self.read_u64()?),
            surface: SurfaceId(self.read_u64()?),
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_SURFACE_SHARED => self.decode_surface_shared(),
            TAG_SHARE_FAILED => self.decode_share_failed(),
            TAG_KEY_ADDED => self.decode_key_added(),
            TAG_KEY_UPDATED => self.decode_key_updated(),
            TAG_SURFACE_UNSHARED => self.decode_surface_unshared(),
            TAG_FRAME_RETARGETED => self.decode_frame_retargeted(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
