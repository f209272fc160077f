//! Plain-memory buffer backings: owned heap memory, externally-owned memory,
//! byte-range views, and host-object slot arrays.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::buffer::{Buffer, BufferImpl};
use crate::error::{Error, Result};
use crate::types::Object;

/// Minimum alignment for buffer allocations, so fixed-width element slices of
/// any supported width can be read directly from the bytes.
const MIN_ALIGNMENT: usize = 8;

/// Owned heap memory; writable and resizable.
pub struct MemoryBuffer {
    ptr: Option<NonNull<u8>>,
    len: usize,
}

impl MemoryBuffer {
    /// Allocate `len` zero-filled bytes.
    pub fn new_zeroed(len: usize) -> Result<Self> {
        let ptr = Self::allocate(len)?;
        Ok(MemoryBuffer { ptr, len })
    }

    /// Allocate and copy from an existing slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let buf = Self::new_zeroed(bytes.len())?;
        if let Some(ptr) = buf.ptr {
            // Safety: freshly allocated region of exactly `bytes.len()` bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
            }
        }
        Ok(buf)
    }

    fn allocate(len: usize) -> Result<Option<NonNull<u8>>> {
        if len == 0 {
            return Ok(None);
        }
        let layout = Self::layout(len)?;
        // Safety: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        NonNull::new(raw)
            .map(Some)
            .ok_or(Error::AllocationFailed { size: len })
    }

    fn layout(len: usize) -> Result<Layout> {
        Layout::from_size_align(len, MIN_ALIGNMENT)
            .map_err(|_| Error::AllocationFailed { size: len })
    }
}

impl BufferImpl for MemoryBuffer {
    fn data(&self) -> Result<*const u8> {
        Ok(self
            .ptr
            .map(|p| p.as_ptr() as *const u8)
            .unwrap_or(std::ptr::null()))
    }

    fn len(&self) -> usize {
        self.len
    }

    fn writable(&self) -> bool {
        true
    }

    fn resizable(&self) -> bool {
        true
    }

    fn resize(&mut self, new_len: usize) -> Result<()> {
        if new_len == self.len {
            return Ok(());
        }
        let new_ptr = Self::allocate(new_len)?;
        if let (Some(old), Some(new)) = (self.ptr, new_ptr) {
            // Safety: both regions valid; copy the surviving prefix.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    old.as_ptr(),
                    new.as_ptr(),
                    self.len.min(new_len),
                );
            }
        }
        self.release();
        self.ptr = new_ptr;
        self.len = new_len;
        Ok(())
    }
}

impl MemoryBuffer {
    fn release(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            if let Ok(layout) = Self::layout(self.len) {
                // Safety: allocated by `allocate` with the same layout.
                unsafe { dealloc(ptr.as_ptr(), layout) }
            }
        }
    }
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBuffer").field("len", &self.len).finish()
    }
}

// Safety: the buffer exclusively owns its allocation; synchronization of
// writes is the handle layer's responsibility.
unsafe impl Send for MemoryBuffer {}
unsafe impl Sync for MemoryBuffer {}

/// Memory owned by some external entity, kept alive through a guard object.
/// Dropping the buffer releases the guard but never frees the memory.
pub struct ExternalBuffer {
    guard: Arc<dyn AsRef<[u8]> + Send + Sync>,
    writable: bool,
}

impl ExternalBuffer {
    pub fn new<O>(owner: Arc<O>, writable: bool) -> Self
    where
        O: AsRef<[u8]> + Send + Sync + 'static,
    {
        ExternalBuffer {
            guard: owner,
            writable,
        }
    }

    fn bytes(&self) -> &[u8] {
        (*self.guard).as_ref()
    }
}

impl BufferImpl for ExternalBuffer {
    fn data(&self) -> Result<*const u8> {
        let bytes = self.bytes();
        if bytes.is_empty() {
            Ok(std::ptr::null())
        } else {
            Ok(bytes.as_ptr())
        }
    }

    fn len(&self) -> usize {
        self.bytes().len()
    }

    fn writable(&self) -> bool {
        self.writable
    }
}

impl std::fmt::Debug for ExternalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalBuffer")
            .field("len", &self.len())
            .field("writable", &self.writable)
            .finish()
    }
}

/// A byte range `[offset, offset + len)` into a shared acquisition of a
/// parent buffer. Inherits writability and object-ness from the parent; never
/// resizable. Dropping the view releases the shared acquisition.
#[derive(Debug)]
pub struct ViewBuffer {
    parent: Buffer,
    offset: usize,
    len: usize,
}

impl ViewBuffer {
    pub(crate) fn new(parent: Buffer, offset: usize, len: usize) -> Self {
        ViewBuffer {
            parent,
            offset,
            len,
        }
    }
}

impl BufferImpl for ViewBuffer {
    fn data(&self) -> Result<*const u8> {
        if self.len == 0 {
            return Ok(std::ptr::null());
        }
        let base = self.parent.data()?;
        // Safety: `offset + len <= parent.len()` checked at construction.
        Ok(unsafe { base.add(self.offset) })
    }

    fn len(&self) -> usize {
        self.len
    }

    fn writable(&self) -> bool {
        self.parent.body().writable()
    }

    fn contains_objects(&self) -> bool {
        self.parent.body().contains_objects()
    }

    fn memory_footprint(&self) -> usize {
        // The parent owns the bytes; a view adds only itself.
        0
    }

    fn verify_impl(&self) -> Result<()> {
        if self.offset + self.len > self.parent.len() {
            return Err(Error::Integrity(format!(
                "view range [{}, {}) exceeds parent size {}",
                self.offset,
                self.offset + self.len,
                self.parent.len()
            )));
        }
        Ok(())
    }
}

/// Fixed-width array of host-object handles. Cloning the column sharing this
/// buffer bumps handle refcounts; overwriting or dropping a slot releases it.
#[derive(Debug)]
pub struct ObjectBuffer {
    slots: Vec<Option<Object>>,
}

impl ObjectBuffer {
    pub fn new(slots: Vec<Option<Object>>) -> Self {
        ObjectBuffer { slots }
    }
}

impl BufferImpl for ObjectBuffer {
    fn data(&self) -> Result<*const u8> {
        if self.slots.is_empty() {
            Ok(std::ptr::null())
        } else {
            Ok(self.slots.as_ptr() as *const u8)
        }
    }

    fn len(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Option<Object>>()
    }

    fn writable(&self) -> bool {
        true
    }

    fn contains_objects(&self) -> bool {
        true
    }

    fn as_objects(&self) -> Option<&[Option<Object>]> {
        Some(&self.slots)
    }

    fn as_objects_mut(&mut self) -> Option<&mut Vec<Option<Object>>> {
        Some(&mut self.slots)
    }

    fn verify_impl(&self) -> Result<()> {
        // `Arc` slots cannot dangle; verify the byte/slot accounting instead.
        let expected = self.slots.len() * std::mem::size_of::<Option<Object>>();
        if self.len() != expected {
            return Err(Error::Integrity(
                "object buffer slot/byte accounting mismatch".to_string(),
            ));
        }
        Ok(())
    }
}
