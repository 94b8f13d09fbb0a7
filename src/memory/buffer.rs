use crate::handle::Handle;
use crate::runtime::{MemFlags, RawMem};

/// A linear memory region.
#[derive(Debug, Clone)]
pub struct Buffer {
    handle: Handle<RawMem>,
    size: usize,
    flags: MemFlags,
}

impl Buffer {
    pub(crate) fn new(handle: Handle<RawMem>, size: usize, flags: MemFlags) -> Self {
        Self {
            handle,
            size,
            flags,
        }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawMem {
        self.handle.raw()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &Handle<RawMem> {
        &self.handle
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocation and access flags, as requested.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> MemFlags {
        self.flags
    }
}
