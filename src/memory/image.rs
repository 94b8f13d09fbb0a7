use crate::format::ImageFormat;
use crate::handle::Handle;
use crate::runtime::{MemFlags, RawMem};

/// A two-dimensional image.
///
/// `row_pitch` is the value the runtime settled on, so a pitch of `0` at
/// creation reads back as the computed one.
#[derive(Debug, Clone)]
pub struct Image2D {
    handle: Handle<RawMem>,
    flags: MemFlags,
    format: ImageFormat,
    width: usize,
    height: usize,
    row_pitch: usize,
}

impl Image2D {
    pub(crate) fn new(
        handle: Handle<RawMem>,
        flags: MemFlags,
        format: ImageFormat,
        width: usize,
        height: usize,
        row_pitch: usize,
    ) -> Self {
        Self {
            handle,
            flags,
            format,
            width,
            height,
            row_pitch,
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

    #[must_use]
    pub fn flags(&self) -> MemFlags {
        self.flags
    }

    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }
}

/// A three-dimensional image.
#[derive(Debug, Clone)]
pub struct Image3D {
    handle: Handle<RawMem>,
    flags: MemFlags,
    format: ImageFormat,
    width: usize,
    height: usize,
    depth: usize,
    row_pitch: usize,
    slice_pitch: usize,
}

impl Image3D {
    pub(crate) fn new(
        handle: Handle<RawMem>,
        flags: MemFlags,
        format: ImageFormat,
        (width, height, depth): (usize, usize, usize),
        row_pitch: usize,
        slice_pitch: usize,
    ) -> Self {
        Self {
            handle,
            flags,
            format,
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
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

    #[must_use]
    pub fn flags(&self) -> MemFlags {
        self.flags
    }

    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    #[must_use]
    pub fn slice_pitch(&self) -> usize {
        self.slice_pitch
    }
}
