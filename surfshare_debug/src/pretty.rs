// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use kurbo::Rect;
use surfshare_core::trace::{
    FrameRetargetedEvent, KeyAddedEvent, KeyUpdatedEvent, ShareFailedEvent, SurfaceSharedEvent,
    SurfaceUnsharedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct ShowRect(Rect);

impl std::fmt::Display for ShowRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.0;
        write!(f, "({},{})-({},{})", r.x0, r.y0, r.x1, r.y1)
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_surface_shared(&mut self, e: &SurfaceSharedEvent) {
        let _ = writeln!(
            self.writer,
            "#{} [share] surface={} id={:?}",
            e.seq, e.surface.0, e.id,
        );
    }

    fn on_share_failed(&mut self, e: &ShareFailedEvent) {
        let _ = writeln!(
            self.writer,
            "#{} [share:FAILED] surface={} error={}",
            e.seq, e.surface.0, e.error,
        );
    }

    fn on_key_added(&mut self, e: &KeyAddedEvent) {
        let _ = writeln!(
            self.writer,
            "#{} [key:add] consumer={} key={:?} id={:?}",
            e.seq,
            e.consumer.index(),
            e.key,
            e.id,
        );
    }

    fn on_key_updated(&mut self, e: &KeyUpdatedEvent) {
        let _ = writeln!(
            self.writer,
            "#{} [key:update] consumer={} key={:?} id={:?} dirty={}",
            e.seq,
            e.consumer.index(),
            e.key,
            e.id,
            ShowRect(e.dirty),
        );
    }

    fn on_surface_unshared(&mut self, e: &SurfaceUnsharedEvent) {
        let released = if e.released { "released" } else { "retired" };
        let _ = writeln!(
            self.writer,
            "#{} [unshare] surface={} id={:?} keys={} {released}",
            e.seq, e.surface.0, e.id, e.keys_discarded,
        );
    }

    fn on_frame_retargeted(&mut self, e: &FrameRetargetedEvent) {
        let _ = writeln!(
            self.writer,
            "#{} [retarget] {:?} -> {:?} surface={}",
            e.seq, e.from, e.to, e.surface.0,
        );
    }
}
