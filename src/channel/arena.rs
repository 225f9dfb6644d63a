use std::fs::File;
use std::io::Result;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use crate::sys;

struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if let Err(e) = unsafe { sys::munmap(self.ptr.as_ptr(), self.len) } {
            log::warn!("failed to unmap shared arena: {e}");
        }
    }
}

// The mapping is shared kernel-side; nothing here is thread-affine.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

/// A handle over a `mmap`'d region backed by a regular file, shared between
/// processes. `mmap` happens once on construction; the mapping is unmapped
/// once the last clone of the handle (an [`Arena`] and any
/// [`Arena::new_view`] taken from it) is dropped. This mirrors the RAII
/// shape used throughout this crate, extended with `Arc` so an
/// in-process reader can share a writer's mapping without a double-unmap.
#[derive(Clone)]
pub(crate) struct Arena {
    mapping: Arc<Mapping>,
}

impl Arena {
    pub(crate) fn new(file: &File, len: usize) -> Result<Self> {
        let ptr = unsafe { sys::mmap_shared(file, len, 0) }?;
        let ptr = NonNull::new(ptr).expect("mmap_shared returned null on success");
        Ok(Self {
            mapping: Arc::new(Mapping { ptr, len }),
        })
    }

    /// A cheap, shared view over an existing arena's mapping.
    pub(crate) fn new_view(other: &Arena) -> Self {
        other.clone()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.mapping.ptr.as_ptr(), self.mapping.len) }
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.mapping.ptr.as_ptr()
    }

    pub(crate) fn len(&self) -> usize {
        self.mapping.len
    }
}
