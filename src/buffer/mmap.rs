//! Memory-mapped file buffers.
//!
//! A mapped buffer establishes its mapping lazily, on the first `data()`
//! access, under a mutex so that concurrent first accesses map exactly once.
//! Once mapped it registers with its [`MappingRegistry`]; under mapping
//! pressure the registry may evict it (unmap and forget), after which the next
//! access transparently re-maps. Mapping attempts that fail are retried a
//! small fixed number of times with an eviction pass in between, then surfaced
//! as [`Error::MmapFailed`].

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Mutex, Weak};

use memmap2::{MmapMut, MmapOptions};
use tempfile::{NamedTempFile, TempPath};

use crate::buffer::registry::{MappedRegion, MappingRegistry};
use crate::buffer::{lock_unpoisoned, BufferImpl};
use crate::error::{Error, Result};

/// Mapping attempts before the failure is treated as fatal.
const MMAP_RETRY_ATTEMPTS: usize = 3;

/// Page size assumed for the overmap slack computation. On targets with
/// larger pages the slack check simply fails more often and the anonymous
/// fallback path is taken instead, which is always correct.
const PAGE_SIZE: usize = 4096;

/// How the file's bytes relate to the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapMode {
    /// Read-write mapping shared with the file (creating/growing a file).
    SharedFile,
    /// Private copy-on-write mapping of an existing file; in-memory writes
    /// are never written back.
    PrivateFile,
}

#[derive(Debug)]
enum MapRegion {
    File(MmapMut),
    /// Anonymous memory populated from the file, used when the requested
    /// overmap scratch does not fit in the final page's slack.
    Anonymous(MmapMut),
}

impl MapRegion {
    fn as_ptr(&self) -> *const u8 {
        match self {
            MapRegion::File(m) | MapRegion::Anonymous(m) => m.as_ptr(),
        }
    }

    fn flush(&self) -> std::io::Result<()> {
        match self {
            MapRegion::File(m) => m.flush(),
            MapRegion::Anonymous(_) => Ok(()),
        }
    }
}

#[derive(Debug)]
struct Mapping {
    region: MapRegion,
    slot: usize,
}

#[derive(Debug)]
pub(crate) struct MmapState {
    path: PathBuf,
    /// Bytes backed by the file.
    file_len: usize,
    /// Extra writable scratch requested past the file's end.
    extra: usize,
    mode: MapMode,
    registry: Arc<MappingRegistry>,
    mapping: Mutex<Option<Mapping>>,
    /// Fast-path cache of the mapped pointer; null while unmapped.
    ptr: AtomicPtr<u8>,
    /// Present for temporary files; deleting is attempted on drop.
    temp: Mutex<Option<TempPath>>,
}

impl MmapState {
    fn total_len(&self) -> usize {
        self.file_len + self.extra
    }

    fn try_map(&self) -> std::io::Result<MapRegion> {
        let total = self.total_len();
        let file = match self.mode {
            MapMode::SharedFile => OpenOptions::new().read(true).write(true).open(&self.path)?,
            MapMode::PrivateFile => OpenOptions::new().read(true).open(&self.path)?,
        };

        if self.extra == 0 {
            let region = match self.mode {
                // Safety: the mapping is dropped before the buffer, and the
                // underlying file is owned by this buffer for its lifetime.
                MapMode::SharedFile => unsafe { MmapOptions::new().map_mut(&file)? },
                MapMode::PrivateFile => unsafe { MmapOptions::new().len(total).map_copy(&file)? },
            };
            return Ok(MapRegion::File(region));
        }

        let rounded = self.file_len.div_ceil(PAGE_SIZE) * PAGE_SIZE;
        if rounded >= total {
            // The scratch fits inside the final page of the file mapping.
            // Safety: as above.
            let region = unsafe { MmapOptions::new().len(total).map_copy(&file)? };
            Ok(MapRegion::File(region))
        } else {
            // Not enough page slack: fall back to anonymous memory populated
            // from the file.
            let mut anon = MmapOptions::new().len(total).map_anon()?;
            let contents = std::fs::read(&self.path)?;
            let n = contents.len().min(self.file_len);
            anon[..n].copy_from_slice(&contents[..n]);
            Ok(MapRegion::Anonymous(anon))
        }
    }

    fn map_with_retries(&self) -> Result<MapRegion> {
        #[cfg(not(any(unix, windows)))]
        {
            return Err(Error::NotSupported(
                "memory-mapping is not available on this platform".to_string(),
            ));
        }
        #[cfg(any(unix, windows))]
        {
            let mut attempt = 0;
            loop {
                match self.try_map() {
                    Ok(region) => return Ok(region),
                    Err(err) => {
                        attempt += 1;
                        if attempt >= MMAP_RETRY_ATTEMPTS {
                            return Err(Error::MmapFailed {
                                path: self.path.clone(),
                                attempts: attempt,
                                source: err,
                            });
                        }
                        log::debug!(
                            "mmap of {:?} failed ({}); evicting mappings and retrying",
                            self.path,
                            err
                        );
                        self.registry.freeup_memory();
                    }
                }
            }
        }
    }
}

impl MappedRegion for MmapState {
    fn evict(&self) {
        self.ptr.store(std::ptr::null_mut(), Ordering::Release);
        let mut guard = lock_unpoisoned(&self.mapping);
        // Dropping the region unmaps it; the registry already removed the
        // entry, so the slot is not released here.
        *guard = None;
    }

    fn mapped_len(&self) -> usize {
        self.total_len()
    }
}

impl Drop for MmapState {
    fn drop(&mut self) {
        let mut guard = lock_unpoisoned(&self.mapping);
        if let Some(mapping) = guard.take() {
            self.registry.del_entry(mapping.slot);
            if self.mode == MapMode::SharedFile {
                if let Err(err) = mapping.region.flush() {
                    log::warn!("flush of mapped file {:?} failed on drop: {}", self.path, err);
                }
            }
            // munmap itself happens when `mapping.region` drops; memmap2 does
            // not surface unmap failures, so nothing further to log.
        }
        drop(guard);
        let mut temp = lock_unpoisoned(&self.temp);
        if let Some(temp_path) = temp.take() {
            if let Err(err) = temp_path.close() {
                log::warn!("failed to delete temporary mapped file: {}", err);
            }
        }
    }
}

/// File-backed buffer, lazily mapped. See the module docs.
#[derive(Debug)]
pub struct MmapBuffer {
    state: Arc<MmapState>,
}

impl MmapBuffer {
    fn from_state(state: MmapState) -> Self {
        MmapBuffer {
            state: Arc::new(state),
        }
    }

    /// Open an existing file as a private copy-on-write mapping.
    pub fn open(path: &Path, registry: Arc<MappingRegistry>) -> Result<Self> {
        let file_len = std::fs::metadata(path)?.len() as usize;
        Ok(Self::from_state(MmapState {
            path: path.to_path_buf(),
            file_len,
            extra: 0,
            mode: MapMode::PrivateFile,
            registry,
            mapping: Mutex::new(None),
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            temp: Mutex::new(None),
        }))
    }

    /// Create a new file of `len` bytes and map it shared-with-file.
    pub fn create(path: &Path, len: usize, registry: Arc<MappingRegistry>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len as u64)?;
        Ok(Self::from_state(MmapState {
            path: path.to_path_buf(),
            file_len: len,
            extra: 0,
            mode: MapMode::SharedFile,
            registry,
            mapping: Mutex::new(None),
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            temp: Mutex::new(None),
        }))
    }

    /// A writable buffer backed by a fresh temporary file, deleted on drop.
    pub fn temporary(len: usize, registry: Arc<MappingRegistry>) -> Result<Self> {
        let file = NamedTempFile::new()?;
        file.as_file().set_len(len as u64)?;
        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        Ok(Self::from_state(MmapState {
            path,
            file_len: len,
            extra: 0,
            mode: MapMode::SharedFile,
            registry,
            mapping: Mutex::new(None),
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            temp: Mutex::new(Some(temp_path)),
        }))
    }

    /// Map an existing file with `extra` bytes of writable scratch guaranteed
    /// past its end.
    pub fn overmap(path: &Path, extra: usize, registry: Arc<MappingRegistry>) -> Result<Self> {
        let file_len = std::fs::metadata(path)?.len() as usize;
        Ok(Self::from_state(MmapState {
            path: path.to_path_buf(),
            file_len,
            extra,
            mode: MapMode::PrivateFile,
            registry,
            mapping: Mutex::new(None),
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            temp: Mutex::new(None),
        }))
    }

    fn ensure_mapped(&self) -> Result<*const u8> {
        if self.state.total_len() == 0 {
            return Ok(std::ptr::null());
        }
        let cached = self.state.ptr.load(Ordering::Acquire);
        if !cached.is_null() {
            return Ok(cached);
        }

        let mut guard = lock_unpoisoned(&self.state.mapping);
        if let Some(mapping) = guard.as_ref() {
            // Another thread mapped while this one waited for the lock.
            let ptr = mapping.region.as_ptr();
            self.state.ptr.store(ptr as *mut u8, Ordering::Release);
            return Ok(ptr);
        }

        let region = self.state.map_with_retries()?;
        let weak: Weak<dyn MappedRegion> = Arc::downgrade(&self.state) as Weak<dyn MappedRegion>;
        let slot = self
            .state
            .registry
            .add_entry(weak, self.state.total_len());
        let ptr = region.as_ptr();
        *guard = Some(Mapping { region, slot });
        self.state.ptr.store(ptr as *mut u8, Ordering::Release);
        Ok(ptr)
    }

    /// Whether the region is currently mapped (diagnostics/tests).
    pub fn is_mapped(&self) -> bool {
        lock_unpoisoned(&self.state.mapping).is_some()
    }
}

impl BufferImpl for MmapBuffer {
    fn data(&self) -> Result<*const u8> {
        self.ensure_mapped()
    }

    fn len(&self) -> usize {
        self.state.total_len()
    }

    fn writable(&self) -> bool {
        // Shared-file mappings write through to the file; private and
        // anonymous ones are writable in memory only.
        true
    }

    fn memory_footprint(&self) -> usize {
        if self.is_mapped() {
            self.state.total_len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<MappingRegistry> {
        Arc::new(MappingRegistry::new())
    }

    #[test]
    fn test_lazy_mapping() {
        let reg = registry();
        let buf = MmapBuffer::temporary(128, Arc::clone(&reg)).unwrap();
        assert!(!buf.is_mapped());
        assert_eq!(reg.entry_count(), 0);

        let ptr = buf.data().unwrap();
        assert!(!ptr.is_null());
        assert!(buf.is_mapped());
        assert_eq!(reg.entry_count(), 1);
        assert_eq!(reg.mapped_bytes(), 128);
    }

    #[test]
    fn test_evict_and_remap() {
        let reg = registry();
        let buf = MmapBuffer::temporary(64, Arc::clone(&reg)).unwrap();
        buf.data().unwrap();
        assert!(buf.is_mapped());

        reg.freeup_memory();
        assert!(!buf.is_mapped());
        assert_eq!(reg.entry_count(), 0);

        // Next access re-maps transparently under a fresh slot.
        buf.data().unwrap();
        assert!(buf.is_mapped());
        assert_eq!(reg.entry_count(), 1);
    }

    #[test]
    fn test_drop_unregisters_and_deletes_temp() {
        let reg = registry();
        let buf = MmapBuffer::temporary(32, Arc::clone(&reg)).unwrap();
        buf.data().unwrap();
        let path = buf.state.path.clone();
        assert!(path.exists());
        drop(buf);
        assert_eq!(reg.entry_count(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_length() {
        let reg = registry();
        let buf = MmapBuffer::temporary(0, reg).unwrap();
        assert_eq!(buf.len(), 0);
        assert!(buf.data().unwrap().is_null());
        assert!(!buf.is_mapped());
    }
}
