// Copyright 2026 the Surfshare Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena storage for surface entries, indexed by surface identity.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::id::SurfaceId;

use super::entry::SurfaceEntry;

/// Arena of [`SurfaceEntry`]s keyed by [`SurfaceId`].
///
/// Entries occupy slots in parallel arrays; freed slots are recycled via a
/// free list. The map from surface identity to slot is explicit: the owner of
/// a surface must [`remove`](Self::remove) its entry when the surface is
/// destroyed. Nothing here holds a reference to the surface itself.
#[derive(Debug, Default)]
pub struct SurfaceCache {
    owner: Vec<Option<SurfaceId>>,
    entry: Vec<SurfaceEntry>,
    free_list: Vec<u32>,
    len: u32,
    index: HashMap<SurfaceId, u32>,
}

impl SurfaceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cached surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns whether `surface` has an entry.
    #[must_use]
    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.index.contains_key(&surface)
    }

    /// Returns the entry for `surface`.
    #[must_use]
    pub fn get(&self, surface: SurfaceId) -> Option<&SurfaceEntry> {
        let idx = *self.index.get(&surface)?;
        Some(&self.entry[idx as usize])
    }

    /// Returns the entry for `surface` for mutation.
    pub fn get_mut(&mut self, surface: SurfaceId) -> Option<&mut SurfaceEntry> {
        let idx = *self.index.get(&surface)?;
        Some(&mut self.entry[idx as usize])
    }

    /// Returns the entry for `surface`, creating an empty one if needed.
    pub fn get_or_insert(&mut self, surface: SurfaceId) -> &mut SurfaceEntry {
        let idx = match self.index.get(&surface) {
            Some(&idx) => idx,
            None => {
                let idx = if let Some(idx) = self.free_list.pop() {
                    // Reuse a freed slot.
                    self.owner[idx as usize] = Some(surface);
                    self.entry[idx as usize] = SurfaceEntry::new();
                    idx
                } else {
                    // Allocate a new slot.
                    let idx = self.len;
                    self.len += 1;
                    self.owner.push(Some(surface));
                    self.entry.push(SurfaceEntry::new());
                    idx
                };
                self.index.insert(surface, idx);
                idx
            }
        };
        &mut self.entry[idx as usize]
    }

    /// Removes and returns the entry for `surface`, freeing its slot.
    pub fn remove(&mut self, surface: SurfaceId) -> Option<SurfaceEntry> {
        let idx = self.index.remove(&surface)?;
        self.owner[idx as usize] = None;
        self.free_list.push(idx);
        Some(core::mem::take(&mut self.entry[idx as usize]))
    }

    /// Iterates over cached entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &SurfaceEntry)> {
        self.owner
            .iter()
            .zip(&self.entry)
            .filter_map(|(owner, entry)| owner.map(|surface| (surface, entry)))
    }

    /// Iterates mutably over cached entries in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SurfaceId, &mut SurfaceEntry)> {
        self.owner
            .iter()
            .zip(&mut self.entry)
            .filter_map(|(owner, entry)| owner.map(|surface| (surface, entry)))
    }
}
