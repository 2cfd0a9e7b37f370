// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-consumer image key records attached to a shared image.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::consumer::ConsumerTable;
use crate::dirty::PendingDirty;
use crate::error::ShareError;
use crate::id::{ConsumerId, ExternalImageId, ImageKey};
use crate::resource::ResourceUpdateQueue;

/// The key one consumer holds for a shared image, and what it has not yet
/// uploaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsumerKeyRecord {
    /// The consumer holding the key.
    pub consumer: ConsumerId,
    /// The consumer-local key.
    pub key: ImageKey,
    /// Dirty region reported since the consumer last uploaded.
    pub dirty: PendingDirty,
}

impl ConsumerKeyRecord {
    /// Creates a record with nothing pending.
    #[must_use]
    pub const fn new(consumer: ConsumerId, key: ImageKey) -> Self {
        Self {
            consumer,
            key,
            dirty: PendingDirty::new(),
        }
    }
}

/// What [`ConsumerKeys::update_key`] enqueued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyOutcome {
    /// A new key was created and an `AddImage` enqueued.
    Added,
    /// The existing key was kept and an `UpdateImage` enqueued for the
    /// drained region.
    Updated(Rect),
    /// The existing key was kept; nothing was pending so nothing was
    /// enqueued.
    Unchanged,
}

/// Result of [`ConsumerKeys::update_key`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyUpdate {
    /// The consumer's key for the image.
    pub key: ImageKey,
    /// What was enqueued.
    pub outcome: KeyOutcome,
}

/// Ordered set of [`ConsumerKeyRecord`]s for one shared image.
///
/// Records are kept in insertion order with at most one per consumer. There
/// are usually one or two (one per rendering context showing the image), so a
/// linear scan is used throughout.
#[derive(Clone, Debug, Default)]
pub struct ConsumerKeys {
    records: Vec<ConsumerKeyRecord>,
}

impl ConsumerKeys {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Returns the records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[ConsumerKeyRecord] {
        &self.records
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no consumer holds a key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the first record held by `consumer`.
    #[must_use]
    pub fn get(&self, consumer: ConsumerId) -> Option<&ConsumerKeyRecord> {
        self.records.iter().find(|r| r.consumer == consumer)
    }

    /// Merges `rect` into every record's pending region.
    pub fn merge_dirty(&mut self, rect: Rect) {
        for record in &mut self.records {
            record.dirty.merge(rect);
        }
    }

    /// Produces `consumer`'s key for the image named by `id`, enqueueing the
    /// instructions that bring the renderer up to date.
    ///
    /// Every record is visited:
    ///
    /// - records of removed consumers are dropped;
    /// - the first record of `consumer` merges `dirty`, then enqueues an
    ///   `UpdateImage` if anything is pending. If its key is from an older
    ///   namespace of the consumer, a fresh key is allocated and an `AddImage`
    ///   enqueued instead;
    /// - every other record merges `dirty` and waits for its own consumer.
    ///
    /// If `consumer` has no record, a key is allocated, an `AddImage`
    /// enqueued, and a record appended with nothing pending.
    ///
    /// # Errors
    ///
    /// Propagates key allocation failures from [`ConsumerTable::next_key`].
    pub fn update_key(
        &mut self,
        id: ExternalImageId,
        consumer: ConsumerId,
        consumers: &mut ConsumerTable,
        queue: &mut ResourceUpdateQueue,
        dirty: Option<Rect>,
    ) -> Result<KeyUpdate, ShareError> {
        let mut found = None;
        let mut i = 0;
        while i < self.records.len() {
            let record = &mut self.records[i];
            if !consumers.is_alive(record.consumer) {
                self.records.remove(i);
                continue;
            }
            if found.is_none() && record.consumer == consumer {
                if consumers.owns_key(consumer, record.key) {
                    record.dirty.merge_opt(dirty);
                    let outcome = match record.dirty.take() {
                        Some(rect) => {
                            queue.update_image(record.key, id, rect);
                            KeyOutcome::Updated(rect)
                        }
                        None => KeyOutcome::Unchanged,
                    };
                    found = Some(KeyUpdate {
                        key: record.key,
                        outcome,
                    });
                } else {
                    // The consumer was reinitialized; the old key is gone.
                    record.key = consumers.next_key(consumer)?;
                    record.dirty = PendingDirty::new();
                    queue.add_image(record.key, id);
                    found = Some(KeyUpdate {
                        key: record.key,
                        outcome: KeyOutcome::Added,
                    });
                }
            } else {
                record.dirty.merge_opt(dirty);
            }
            i += 1;
        }

        if let Some(update) = found {
            return Ok(update);
        }

        let key = consumers.next_key(consumer)?;
        self.records.push(ConsumerKeyRecord::new(consumer, key));
        queue.add_image(key, id);
        Ok(KeyUpdate {
            key,
            outcome: KeyOutcome::Added,
        })
    }

    /// Drops `consumer`'s record without discarding its key.
    ///
    /// Used when the consumer itself is torn down, taking its keys with it.
    pub fn remove_consumer(&mut self, consumer: ConsumerId) -> Option<ConsumerKeyRecord> {
        let pos = self.records.iter().position(|r| r.consumer == consumer)?;
        Some(self.records.remove(pos))
    }

    /// Parks every key for deletion on its consumer and empties the set.
    ///
    /// Returns the number of keys parked.
    pub fn discard_all(&mut self, consumers: &mut ConsumerTable) -> usize {
        let mut discarded = 0;
        for record in self.records.drain(..) {
            if consumers.owns_key(record.consumer, record.key) {
                consumers.discard_key(record.consumer, record.key);
                discarded += 1;
            }
        }
        discarded
    }

    /// Empties the set without discarding anything.
    ///
    /// Used when the remote side already dropped every key.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdNamespace;
    use crate::resource::ResourceUpdate;

    fn id() -> ExternalImageId {
        ExternalImageId::new(IdNamespace(7), 1)
    }

    #[test]
    fn first_use_adds_then_stays_quiet() {
        let mut consumers = ConsumerTable::new();
        let a = consumers.create(IdNamespace(1));
        let mut keys = ConsumerKeys::new();
        let mut queue = ResourceUpdateQueue::new();

        let first = keys
            .update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap();
        let second = keys
            .update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap();

        assert_eq!(first.outcome, KeyOutcome::Added);
        assert_eq!(second.outcome, KeyOutcome::Unchanged);
        assert_eq!(first.key, second.key);
        assert_eq!(
            queue.updates(),
            &[ResourceUpdate::AddImage {
                key: first.key,
                id: id()
            }]
        );
    }

    #[test]
    fn dirty_for_other_consumers_is_held_back() {
        let mut consumers = ConsumerTable::new();
        let a = consumers.create(IdNamespace(1));
        let b = consumers.create(IdNamespace(2));
        let mut keys = ConsumerKeys::new();
        let mut queue = ResourceUpdateQueue::new();
        keys.update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap();
        let kb = keys
            .update_key(id(), b, &mut consumers, &mut queue, None)
            .unwrap()
            .key;

        let rect = Rect::new(0.0, 0.0, 8.0, 8.0);
        keys.update_key(id(), a, &mut consumers, &mut queue, Some(rect))
            .unwrap();
        assert_eq!(keys.get(b).unwrap().dirty.get(), Some(rect));

        let mut queue_b = ResourceUpdateQueue::new();
        let update = keys
            .update_key(id(), b, &mut consumers, &mut queue_b, None)
            .unwrap();
        assert_eq!(update.outcome, KeyOutcome::Updated(rect));
        assert_eq!(
            queue_b.updates(),
            &[ResourceUpdate::UpdateImage {
                key: kb,
                id: id(),
                dirty: rect
            }]
        );
    }

    #[test]
    fn removed_consumers_are_pruned() {
        let mut consumers = ConsumerTable::new();
        let a = consumers.create(IdNamespace(1));
        let b = consumers.create(IdNamespace(2));
        let mut keys = ConsumerKeys::new();
        let mut queue = ResourceUpdateQueue::new();
        keys.update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap();
        keys.update_key(id(), b, &mut consumers, &mut queue, None)
            .unwrap();

        consumers.remove(a);
        keys.update_key(id(), b, &mut consumers, &mut queue, None)
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.records()[0].consumer, b);
    }

    #[test]
    fn reinitialized_consumer_gets_a_fresh_key() {
        let mut consumers = ConsumerTable::new();
        let a = consumers.create(IdNamespace(1));
        let mut keys = ConsumerKeys::new();
        let mut queue = ResourceUpdateQueue::new();
        let old = keys
            .update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap()
            .key;
        keys.merge_dirty(Rect::new(0.0, 0.0, 2.0, 2.0));

        consumers.set_namespace(a, IdNamespace(5));
        let mut queue = ResourceUpdateQueue::new();
        let update = keys
            .update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap();

        assert_eq!(update.outcome, KeyOutcome::Added);
        assert_ne!(update.key, old);
        assert_eq!(update.key.namespace, IdNamespace(5));
        assert_eq!(
            queue.updates(),
            &[ResourceUpdate::AddImage {
                key: update.key,
                id: id()
            }]
        );
        assert!(keys.get(a).unwrap().dirty.is_none());
    }

    #[test]
    fn discard_all_parks_live_keys() {
        let mut consumers = ConsumerTable::new();
        let a = consumers.create(IdNamespace(1));
        let b = consumers.create(IdNamespace(2));
        let mut keys = ConsumerKeys::new();
        let mut queue = ResourceUpdateQueue::new();
        let ka = keys
            .update_key(id(), a, &mut consumers, &mut queue, None)
            .unwrap()
            .key;
        keys.update_key(id(), b, &mut consumers, &mut queue, None)
            .unwrap();
        consumers.remove(b);

        assert_eq!(keys.discard_all(&mut consumers), 1);
        assert!(keys.is_empty());
        assert_eq!(consumers.take_discards(a), alloc::vec![ka]);
    }
}
