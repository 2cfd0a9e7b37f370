// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Sharing events carry no wall-clock time, so the event sequence number is
//! used as the timestamp. Events of one surface share a track (`tid`).
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of instant events, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let event = match recorded {
            RecordedEvent::SurfaceShared(e) => json!({
                "ph": "i",
                "name": "SurfaceShared",
                "cat": "Share",
                "ts": e.seq,
                "pid": 0,
                "tid": e.surface.0,
                "s": "t",
                "args": {
                    "id": format!("{:?}", e.id),
                }
            }),
            RecordedEvent::ShareFailed(e) => json!({
                "ph": "i",
                "name": "ShareFailed",
                "cat": "Share",
                "ts": e.seq,
                "pid": 0,
                "tid": e.surface.0,
                "s": "t",
                "args": {
                    "error": e.error.to_string(),
                    "retryable": e.error.is_retryable(),
                }
            }),
            RecordedEvent::KeyAdded(e) => json!({
                "ph": "i",
                "name": "KeyAdded",
                "cat": "Key",
                "ts": e.seq,
                "pid": 0,
                "tid": 0,
                "s": "p",
                "args": {
                    "consumer": e.consumer.index(),
                    "key": format!("{:?}", e.key),
                    "id": format!("{:?}", e.id),
                }
            }),
            RecordedEvent::KeyUpdated(e) => json!({
                "ph": "i",
                "name": "KeyUpdated",
                "cat": "Key",
                "ts": e.seq,
                "pid": 0,
                "tid": 0,
                "s": "p",
                "args": {
                    "consumer": e.consumer.index(),
                    "key": format!("{:?}", e.key),
                    "id": format!("{:?}", e.id),
                    "dirty": [e.dirty.x0, e.dirty.y0, e.dirty.x1, e.dirty.y1],
                }
            }),
            RecordedEvent::SurfaceUnshared(e) => json!({
                "ph": "i",
                "name": "SurfaceUnshared",
                "cat": "Share",
                "ts": e.seq,
                "pid": 0,
                "tid": e.surface.0,
                "s": "t",
                "args": {
                    "id": e.id.map(|id| format!("{id:?}")),
                    "keys_discarded": e.keys_discarded,
                    "released": e.released,
                }
            }),
            RecordedEvent::FrameRetargeted(e) => json!({
                "ph": "i",
                "name": "FrameRetargeted",
                "cat": "Animation",
                "ts": e.seq,
                "pid": 0,
                "tid": e.surface.0,
                "s": "t",
                "args": {
                    "from": format!("{:?}", e.from),
                    "to": format!("{:?}", e.to),
                }
            }),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
