//! Process-scoped registry of live memory mappings.
//!
//! Every mapped buffer registers itself here once its mapping is established.
//! When a mapping attempt fails from resource exhaustion (for example the
//! process hitting its mapped-region limit), the failing caller invokes
//! [`MappingRegistry::freeup_memory`], which evicts the largest live mappings
//! to make room, and then retries. Eviction only unmaps: the buffer keeps its
//! `(path, length)` identity and transparently re-maps on next access.
//!
//! A `lazy_static` global registry serves as the process default; every mmap
//! constructor also accepts an explicit `Arc<MappingRegistry>` so tests can
//! isolate their mappings.

use std::sync::{Arc, Mutex, Weak};

use lazy_static::lazy_static;

use crate::buffer::lock_unpoisoned;

/// Number of (largest) entries evicted per `freeup_memory` call.
const DEFAULT_PURGE_COUNT: usize = 4;

/// A mapped region that can be asked to unmap itself on demand.
pub trait MappedRegion: Send + Sync + std::fmt::Debug {
    /// Unmap and forget the mapping. The registry entry has already been
    /// removed when this is called; the region must not call back into
    /// [`MappingRegistry::del_entry`].
    fn evict(&self);

    /// Size of the mapped region in bytes.
    fn mapped_len(&self) -> usize;
}

#[derive(Debug)]
struct Entry {
    region: Weak<dyn MappedRegion>,
    size: usize,
}

/// Registry of `(size, worker)` entries for currently-mapped regions.
#[derive(Debug)]
pub struct MappingRegistry {
    entries: Mutex<Vec<Option<Entry>>>,
    purge_count: usize,
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::with_purge_count(DEFAULT_PURGE_COUNT)
    }

    pub fn with_purge_count(purge_count: usize) -> Self {
        MappingRegistry {
            entries: Mutex::new(Vec::new()),
            purge_count: purge_count.max(1),
        }
    }

    /// Register a newly mapped region; returns its slot index.
    pub fn add_entry(&self, region: Weak<dyn MappedRegion>, size: usize) -> usize {
        let mut entries = lock_unpoisoned(&self.entries);
        let entry = Entry { region, size };
        match entries.iter().position(Option::is_none) {
            Some(slot) => {
                entries[slot] = Some(entry);
                slot
            }
            None => {
                entries.push(Some(entry));
                entries.len() - 1
            }
        }
    }

    /// Remove an entry when its worker voluntarily unmaps.
    pub fn del_entry(&self, slot: usize) {
        let mut entries = lock_unpoisoned(&self.entries);
        if slot < entries.len() {
            entries[slot] = None;
        }
    }

    /// Evict the largest live mappings to make room for a new one.
    ///
    /// Victims are selected and unregistered under the lock, but their
    /// `evict()` runs outside it: eviction grabs each worker's own map mutex,
    /// which a worker in the middle of mapping may hold while it registers.
    pub fn freeup_memory(&self) {
        let victims: Vec<Arc<dyn MappedRegion>> = {
            let mut entries = lock_unpoisoned(&self.entries);
            let mut live: Vec<(usize, usize)> = entries
                .iter()
                .enumerate()
                .filter_map(|(slot, e)| e.as_ref().map(|e| (slot, e.size)))
                .collect();
            live.sort_by(|a, b| b.1.cmp(&a.1));
            live.truncate(self.purge_count);

            live.iter()
                .filter_map(|&(slot, _)| {
                    let region = entries[slot].take()?.region.upgrade()?;
                    Some(region)
                })
                .collect()
        };

        for region in victims {
            log::debug!(
                "evicting mapped region of {} bytes to relieve mapping pressure",
                region.mapped_len()
            );
            region.evict();
        }
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> usize {
        lock_unpoisoned(&self.entries)
            .iter()
            .filter(|e| e.is_some())
            .count()
    }

    /// Total bytes across live entries.
    pub fn mapped_bytes(&self) -> usize {
        lock_unpoisoned(&self.entries)
            .iter()
            .filter_map(|e| e.as_ref().map(|e| e.size))
            .sum()
    }
}

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<MappingRegistry> = Arc::new(MappingRegistry::new());
}

/// The process-wide default registry.
pub fn global_registry() -> Arc<MappingRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct FakeRegion {
        size: usize,
        evicted: AtomicBool,
    }

    impl FakeRegion {
        fn new(size: usize) -> Arc<Self> {
            Arc::new(FakeRegion {
                size,
                evicted: AtomicBool::new(false),
            })
        }
    }

    impl MappedRegion for FakeRegion {
        fn evict(&self) {
            self.evicted.store(true, Ordering::SeqCst);
        }
        fn mapped_len(&self) -> usize {
            self.size
        }
    }

    fn weak(r: &Arc<FakeRegion>) -> Weak<dyn MappedRegion> {
        let arc: Arc<dyn MappedRegion> = Arc::clone(r) as Arc<dyn MappedRegion>;
        Arc::downgrade(&arc)
    }

    #[test]
    fn test_slot_reuse() {
        let reg = MappingRegistry::new();
        let a = FakeRegion::new(10);
        let b = FakeRegion::new(20);
        let sa = reg.add_entry(weak(&a), 10);
        let sb = reg.add_entry(weak(&b), 20);
        assert_ne!(sa, sb);
        reg.del_entry(sa);
        assert_eq!(reg.entry_count(), 1);
        let c = FakeRegion::new(30);
        let sc = reg.add_entry(weak(&c), 30);
        assert_eq!(sc, sa);
        assert_eq!(reg.mapped_bytes(), 50);
    }

    #[test]
    fn test_freeup_evicts_largest() {
        let reg = MappingRegistry::with_purge_count(2);
        let regions: Vec<_> = [10usize, 50, 30, 40].iter().map(|&s| FakeRegion::new(s)).collect();
        // Keep the trait-object Arcs alive so the weak refs stay upgradeable.
        let holders: Vec<Arc<dyn MappedRegion>> = regions
            .iter()
            .map(|r| Arc::clone(r) as Arc<dyn MappedRegion>)
            .collect();
        for h in &holders {
            reg.add_entry(Arc::downgrade(h), h.mapped_len());
        }

        reg.freeup_memory();

        let evicted: Vec<bool> = regions
            .iter()
            .map(|r| r.evicted.load(Ordering::SeqCst))
            .collect();
        assert_eq!(evicted, vec![false, true, false, true]);
        assert_eq!(reg.entry_count(), 2);
    }
}
