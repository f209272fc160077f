//! Buffer ownership layer.
//!
//! A `Buffer` is a value-type handle over a reference-counted physical-memory
//! representation (`BufferImpl`). Cloning a handle shares the memory; the
//! handle's acquisition mode decides what sharing means:
//!
//! - `Exclusive` (the default): normal sharing. The buffer is writable only
//!   while exactly one exclusive handle exists, and resizable only while it is
//!   the sole handle of any kind. This refcount gate is the copy-on-write
//!   boundary: code that must mutate a shared buffer clones an exclusive copy
//!   first.
//! - `Shared` (via [`Buffer::share`]): an explicit opt-out of the single-writer
//!   rule. Multiple shared handles may write into the same bytes; keeping their
//!   written ranges disjoint (or otherwise synchronized) is the caller's
//!   invariant. Shared acquisitions disable resizing.
//!
//! Concrete backings: owned heap memory, externally-owned memory, byte-range
//! views, host-object slots (`memory`), and lazily-mapped files (`mmap`)
//! bounded by the eviction registry (`registry`).

pub mod memory;
pub mod mmap;
pub mod registry;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::types::Object;

pub use memory::{ExternalBuffer, MemoryBuffer, ObjectBuffer, ViewBuffer};
pub use mmap::MmapBuffer;
pub use registry::{global_registry, MappedRegion, MappingRegistry};

/// How a handle acquired its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Normal sharing; disallows concurrent writers.
    Exclusive,
    /// Explicitly allows multiple writers to the same bytes.
    Shared,
}

/// Polymorphic physical-memory representation.
///
/// `data()` is fallible because some variants (memory-mapped files) establish
/// their mapping lazily on first access and that mapping can fail.
pub trait BufferImpl: Send + Sync + std::fmt::Debug {
    /// Pointer to the first byte; null iff `len() == 0`.
    fn data(&self) -> Result<*const u8>;

    /// Size of the buffer in bytes.
    fn len(&self) -> usize;

    /// Whether the backing memory itself may be written.
    fn writable(&self) -> bool;

    /// Whether the backing memory may change length.
    fn resizable(&self) -> bool {
        false
    }

    fn resize(&mut self, _new_len: usize) -> Result<()> {
        Err(Error::InvalidOperation(
            "buffer backing does not support resizing".to_string(),
        ))
    }

    /// Whether the buffer holds host-object handles rather than plain bytes.
    fn contains_objects(&self) -> bool {
        false
    }

    fn as_objects(&self) -> Option<&[Option<Object>]> {
        None
    }

    fn as_objects_mut(&mut self) -> Option<&mut Vec<Option<Object>>> {
        None
    }

    /// Bytes of process memory attributable to this buffer.
    fn memory_footprint(&self) -> usize {
        self.len()
    }

    /// Opt-in diagnostic consistency check.
    fn verify_impl(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct BufferInner {
    body: Box<dyn BufferImpl>,
    shared_refs: AtomicUsize,
}

/// Value-type handle over a `BufferImpl`. See the module docs for the
/// ownership rules.
#[derive(Debug)]
pub struct Buffer {
    inner: Arc<BufferInner>,
    mode: AcquireMode,
}

/// Lock a mutex, recovering the guard if a writer panicked while holding it.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Buffer {
    pub(crate) fn from_impl(body: Box<dyn BufferImpl>) -> Self {
        Buffer {
            inner: Arc::new(BufferInner {
                body,
                shared_refs: AtomicUsize::new(0),
            }),
            mode: AcquireMode::Exclusive,
        }
    }

    /// Allocate a zero-filled heap buffer of `len` bytes.
    pub fn new(len: usize) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MemoryBuffer::new_zeroed(len)?)))
    }

    /// Allocate a buffer holding the bytes of `bytes`.
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MemoryBuffer::from_bytes(&bytes)?)))
    }

    /// Copy bytes from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MemoryBuffer::from_bytes(bytes)?)))
    }

    /// Wrap read-only memory owned by some external entity. The guard is held
    /// for the buffer's lifetime and released (not freed) on drop.
    pub fn external<O>(owner: Arc<O>) -> Self
    where
        O: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self::from_impl(Box::new(ExternalBuffer::new(owner, false)))
    }

    /// Like [`Buffer::external`] but declared mutable; the caller asserts the
    /// foreign memory genuinely is writable.
    pub fn external_writable<O>(owner: Arc<O>) -> Self
    where
        O: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self::from_impl(Box::new(ExternalBuffer::new(owner, true)))
    }

    /// A buffer of host-object slots.
    pub fn objects(slots: Vec<Option<Object>>) -> Self {
        Self::from_impl(Box::new(ObjectBuffer::new(slots)))
    }

    /// Memory-map an existing file (private, copy-on-write mapping),
    /// registered with the process-wide mapping registry.
    pub fn mmap<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::mmap_with(path, global_registry())
    }

    pub fn mmap_with<P: AsRef<std::path::Path>>(
        path: P,
        registry: Arc<MappingRegistry>,
    ) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MmapBuffer::open(
            path.as_ref(),
            registry,
        )?)))
    }

    /// Create a new file of `len` bytes and map it shared-with-file.
    pub fn mmap_new<P: AsRef<std::path::Path>>(path: P, len: usize) -> Result<Self> {
        Self::mmap_new_with(path, len, global_registry())
    }

    pub fn mmap_new_with<P: AsRef<std::path::Path>>(
        path: P,
        len: usize,
        registry: Arc<MappingRegistry>,
    ) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MmapBuffer::create(
            path.as_ref(),
            len,
            registry,
        )?)))
    }

    /// A buffer backed by a fresh temporary file, deleted on drop.
    pub fn mmap_temporary(len: usize) -> Result<Self> {
        Self::mmap_temporary_with(len, global_registry())
    }

    pub fn mmap_temporary_with(len: usize, registry: Arc<MappingRegistry>) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MmapBuffer::temporary(
            len, registry,
        )?)))
    }

    /// Map an existing file plus `extra` bytes of guaranteed writable scratch
    /// past its end, regardless of page-size rounding.
    pub fn overmap<P: AsRef<std::path::Path>>(path: P, extra: usize) -> Result<Self> {
        Self::overmap_with(path, extra, global_registry())
    }

    pub fn overmap_with<P: AsRef<std::path::Path>>(
        path: P,
        extra: usize,
        registry: Arc<MappingRegistry>,
    ) -> Result<Self> {
        Ok(Self::from_impl(Box::new(MmapBuffer::overmap(
            path.as_ref(),
            extra,
            registry,
        )?)))
    }

    /// Acquire a Shared-mode handle on the same buffer.
    pub fn share(&self) -> Buffer {
        self.inner.shared_refs.fetch_add(1, Ordering::AcqRel);
        Buffer {
            inner: Arc::clone(&self.inner),
            mode: AcquireMode::Shared,
        }
    }

    /// A byte-range view `[offset, offset + len)` over this buffer. The view
    /// holds a shared acquisition of the parent and inherits its writability.
    pub fn view(&self, offset: usize, len: usize) -> Result<Buffer> {
        if offset + len > self.len() {
            return Err(Error::IndexOutOfBounds {
                index: offset + len,
                size: self.len(),
            });
        }
        Ok(Self::from_impl(Box::new(ViewBuffer::new(
            self.share(),
            offset,
            len,
        ))))
    }

    pub fn mode(&self) -> AcquireMode {
        self.mode
    }

    pub(crate) fn body(&self) -> &dyn BufferImpl {
        &*self.inner.body
    }

    pub fn len(&self) -> usize {
        self.inner.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw data pointer; establishes the mapping for lazily-mapped backings.
    pub fn data(&self) -> Result<*const u8> {
        self.inner.body.data()
    }

    /// Borrow the contents as a byte slice.
    ///
    /// The slice stays valid while this handle is alive and the buffer is not
    /// resized; for memory-mapped buffers a concurrent eviction can invalidate
    /// it, so mapped data should be consumed inside one read region.
    pub fn as_slice(&self) -> Result<&[u8]> {
        let len = self.len();
        if len == 0 {
            return Ok(&[]);
        }
        let ptr = self.data()?;
        // Safety: ptr covers `len` bytes owned by `self.inner`, which outlives
        // the returned borrow.
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// Total number of live handles on this buffer.
    pub fn total_refs(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Number of Shared-mode handles among them.
    pub fn shared_refs(&self) -> usize {
        self.inner.shared_refs.load(Ordering::Acquire)
    }

    /// True when writing through an exclusive handle is permitted: the backing
    /// is writable and exactly one exclusive handle exists.
    pub fn is_writable(&self) -> bool {
        self.inner.body.writable() && self.total_refs() - self.shared_refs() == 1
    }

    /// True when resizing is permitted: the backing is resizable and this is
    /// the sole handle of any kind.
    pub fn is_resizable(&self) -> bool {
        self.inner.body.resizable() && self.total_refs() == 1
    }

    /// Resize the buffer. Requires a unique exclusive handle; growing
    /// zero-fills the tail.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        if self.mode != AcquireMode::Exclusive {
            return Err(Error::InvalidOperation(
                "cannot resize through a shared acquisition".to_string(),
            ));
        }
        if !self.is_resizable() {
            return Err(Error::InvalidOperation(format!(
                "cannot resize a buffer with {} live references",
                self.total_refs()
            )));
        }
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.body.resize(new_len),
            // is_resizable() above already proved uniqueness.
            None => Err(Error::InvalidOperation(
                "buffer became shared during resize".to_string(),
            )),
        }
    }

    /// Write bytes at `offset`. Permitted through a unique exclusive handle,
    /// or through any Shared-mode handle (disjointness is then the caller's
    /// invariant).
    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset + bytes.len() > self.len() {
            return Err(Error::IndexOutOfBounds {
                index: offset + bytes.len(),
                size: self.len(),
            });
        }
        let permitted = match self.mode {
            AcquireMode::Shared => self.inner.body.writable(),
            AcquireMode::Exclusive => self.is_writable(),
        };
        if !permitted {
            return Err(Error::InvalidOperation(
                "buffer is not writable through this handle".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Ok(());
        }
        let ptr = self.data()? as *mut u8;
        // Safety: bounds checked above; writability of the backing verified.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.add(offset), bytes.len());
        }
        Ok(())
    }

    /// Mutable access to the contents through a unique exclusive handle.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        if self.mode != AcquireMode::Exclusive || !self.is_writable() {
            return Err(Error::InvalidOperation(
                "buffer is not exclusively writable".to_string(),
            ));
        }
        let len = self.len();
        if len == 0 {
            return Ok(&mut []);
        }
        let ptr = self.data()? as *mut u8;
        // Safety: unique exclusive handle, writable backing.
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
    }

    pub fn contains_objects(&self) -> bool {
        self.inner.body.contains_objects()
    }

    pub fn object_slots(&self) -> Option<&[Option<Object>]> {
        self.inner.body.as_objects()
    }

    /// Replace one host-object slot. The displaced handle (if any) is released.
    pub fn set_object(&mut self, index: usize, value: Option<Object>) -> Result<()> {
        if index >= self.len_objects().unwrap_or(0) {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.len_objects().unwrap_or(0),
            });
        }
        if !self.is_writable() {
            return Err(Error::InvalidOperation(
                "object buffer is not exclusively writable".to_string(),
            ));
        }
        match Arc::get_mut(&mut self.inner).and_then(|inner| inner.body.as_objects_mut()) {
            Some(slots) => {
                slots[index] = value;
                Ok(())
            }
            None => Err(Error::InvalidOperation(
                "buffer does not hold host objects".to_string(),
            )),
        }
    }

    fn len_objects(&self) -> Option<usize> {
        self.object_slots().map(|s| s.len())
    }

    pub fn memory_footprint(&self) -> usize {
        self.inner.body.memory_footprint()
    }

    /// Opt-in diagnostic pass; not part of the normal error path.
    pub fn verify_integrity(&self) -> Result<()> {
        if self.len() == 0 {
            return self.inner.body.verify_impl();
        }
        let ptr = self.data()?;
        if ptr.is_null() {
            return Err(Error::Integrity(
                "non-empty buffer with null data pointer".to_string(),
            ));
        }
        self.inner.body.verify_impl()
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        if self.mode == AcquireMode::Shared {
            self.inner.shared_refs.fetch_add(1, Ordering::AcqRel);
        }
        Buffer {
            inner: Arc::clone(&self.inner),
            mode: self.mode,
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.mode == AcquireMode::Shared {
            self.inner.shared_refs.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
