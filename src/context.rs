//! Compute Context
//!
//! The [`Context`] binds one platform and a fixed set of its devices, and is
//! the only factory for every other resource type:
//!
//! ```text
//! Platform ──► Context ──┬─► CommandQueue
//!                        ├─► Buffer
//!                        ├─► Image2D / Image3D
//!                        ├─► Sampler
//!                        └─► Program
//! ```
//!
//! Every factory call is a single synchronous call into the runtime. A
//! non-success status is returned as the operation's [`OpalError`] variant
//! carrying the status verbatim; nothing is retried. The few preconditions
//! checked here (empty device list, zero sizes, empty program source) fail
//! with the status the native runtime defines for the same condition, before
//! any native call is made.
//!
//! Resources keep their context alive through the runtime's implicit
//! reference, so dropping the `Context` value first is fine.
//!
//! ```rust,ignore
//! let platform = Platform::first(runtime)?;
//! let context = Context::from_type(&platform, DeviceType::GPU)?;
//! let device = context.devices()?.remove(0);
//! let queue = context.create_command_queue(&device, QueueProperties::empty())?;
//! let input = context.create_buffer_from_slice(MemFlags::READ_ONLY, &[1.0f32; 256])?;
//! ```

use std::ffi::c_void;
use std::sync::Arc;

use bytemuck::Pod;
use smallvec::SmallVec;

use crate::errors::{OpalError, Operation, Result};
use crate::format::ImageFormat;
use crate::handle::Handle;
use crate::memory::{Buffer, Image2D, Image3D, Sampler};
use crate::platform::{Device, Platform};
use crate::program::Program;
use crate::queue::CommandQueue;
use crate::runtime::{
    AddressingMode, ComputeRuntime, ContextInfo, DeviceType, FilterMode, ImageDesc, ImageInfo,
    ImageType, MemFlags, QueueProperties, RawContext, RawDevice, RawMem, Status, query_list,
    query_scalar,
};

/// One execution context over a platform and a fixed device set.
///
/// Cloning retains the native context; both values then share it.
#[derive(Debug, Clone)]
pub struct Context {
    handle: Handle<RawContext>,
    platform: Platform,
}

impl Context {
    /// Creates a context over every device of `platform` matching
    /// `device_type`.
    pub fn from_type(platform: &Platform, device_type: DeviceType) -> Result<Self> {
        let raw = platform
            .runtime()
            .create_context_from_type(platform.raw(), device_type)
            .map_err(|status| OpalError::ContextCreation {
                operation: Operation::CreateContextFromType,
                status,
            })?;
        log::debug!("Created context {raw:?} for {device_type:?}");
        Ok(Self::adopt(platform, raw))
    }

    /// Creates a context over exactly `devices`, in the given order.
    ///
    /// An empty list is rejected without calling into the runtime.
    pub fn from_devices(platform: &Platform, devices: &[Device]) -> Result<Self> {
        let ids = Self::device_ids(devices)?;
        let raw = platform
            .runtime()
            .create_context(platform.raw(), &ids)
            .map_err(|status| OpalError::ContextCreation {
                operation: Operation::CreateContext,
                status,
            })?;
        log::debug!("Created context {raw:?} over {} device(s)", ids.len());
        Ok(Self::adopt(platform, raw))
    }

    fn device_ids(devices: &[Device]) -> Result<SmallVec<[RawDevice; 4]>> {
        if devices.is_empty() {
            return Err(OpalError::ContextCreation {
                operation: Operation::CreateContext,
                status: Status::INVALID_VALUE,
            });
        }
        Ok(devices.iter().map(Device::raw).collect())
    }

    fn adopt(platform: &Platform, raw: RawContext) -> Self {
        Self {
            handle: Handle::adopt(Arc::clone(platform.runtime()), raw),
            platform: platform.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawContext {
        self.handle.raw()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &Handle<RawContext> {
        &self.handle
    }

    #[inline]
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    #[inline]
    fn runtime(&self) -> &Arc<dyn ComputeRuntime> {
        self.handle.runtime()
    }

    fn info_error(status: Status) -> OpalError {
        OpalError::ContextInfoQuery {
            operation: Operation::ContextInfo,
            status,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The devices the context was created over.
    pub fn devices(&self) -> Result<Vec<Device>> {
        let ids: Vec<RawDevice> =
            query_list(|out| self.runtime().context_info(self.raw(), ContextInfo::Devices, out))
                .map_err(Self::info_error)?;
        log::trace!("Context {:?} reports {} device(s)", self.raw(), ids.len());
        Ok(ids
            .into_iter()
            .map(|raw| Device::from_raw(Arc::clone(self.runtime()), raw))
            .collect())
    }

    pub fn num_devices(&self) -> Result<u32> {
        query_scalar(|out| self.runtime().context_info(self.raw(), ContextInfo::NumDevices, out))
            .map_err(Self::info_error)
    }

    /// Native reference count, including references held by resources
    /// created from this context.
    pub fn reference_count(&self) -> Result<u32> {
        query_scalar(|out| {
            self.runtime()
                .context_info(self.raw(), ContextInfo::ReferenceCount, out)
        })
        .map_err(Self::info_error)
    }

    // ========================================================================
    // Command queues
    // ========================================================================

    /// Creates a queue on `device`.
    ///
    /// Membership of `device` in this context is left to the runtime, which
    /// rejects foreign devices.
    pub fn create_command_queue(
        &self,
        device: &Device,
        properties: QueueProperties,
    ) -> Result<CommandQueue> {
        let raw = self
            .runtime()
            .create_command_queue(self.raw(), device.raw(), properties)
            .map_err(|status| OpalError::QueueCreation {
                operation: Operation::CreateCommandQueue,
                status,
            })?;
        log::debug!("Created command queue {raw:?} on {:?}", device.raw());
        Ok(CommandQueue::new(
            Handle::adopt(Arc::clone(self.runtime()), raw),
            device.clone(),
            properties,
        ))
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    /// Allocates a buffer of `size` bytes.
    ///
    /// `host_data` is read during the call when `flags` contains
    /// `COPY_HOST_PTR` and must hold at least `size` bytes. `USE_HOST_PTR`
    /// needs a pointer that outlives the buffer; use
    /// [`Context::create_buffer_with_host_ptr`] for that.
    pub fn create_buffer(
        &self,
        flags: MemFlags,
        size: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Buffer> {
        let host_ptr = match host_data {
            _ if flags.contains(MemFlags::USE_HOST_PTR) => {
                return Err(buffer_error(Status::INVALID_HOST_PTR));
            }
            Some(data) if data.len() < size => return Err(buffer_error(Status::INVALID_HOST_PTR)),
            Some(data) => data.as_ptr().cast_mut().cast::<c_void>(),
            None => std::ptr::null_mut(),
        };
        // SAFETY: without USE_HOST_PTR the runtime only reads `size` bytes
        // from the pointer during the call, and `data` covers them.
        unsafe { self.create_buffer_with_host_ptr(flags, size, host_ptr) }
    }

    /// Allocates a buffer initialised with a copy of `data`.
    pub fn create_buffer_from_slice<T: Pod>(&self, flags: MemFlags, data: &[T]) -> Result<Buffer> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.create_buffer(flags | MemFlags::COPY_HOST_PTR, bytes.len(), Some(bytes))
    }

    /// Allocates a buffer with a raw host pointer, passed through untouched.
    ///
    /// # Safety
    ///
    /// A non-null `host_ptr` must be valid for reads of `size` bytes, and
    /// with `USE_HOST_PTR` must stay valid (and unaliased by Rust mutable
    /// borrows) for as long as the buffer or any clone of it lives.
    pub unsafe fn create_buffer_with_host_ptr(
        &self,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<Buffer> {
        if size == 0 {
            return Err(buffer_error(Status::INVALID_BUFFER_SIZE));
        }
        // SAFETY: forwarded from the caller.
        let raw = unsafe {
            self.runtime()
                .create_buffer(self.raw(), flags, size, host_ptr)
        }
        .map_err(buffer_error)?;
        log::debug!("Created buffer {raw:?}: {size} bytes, {flags:?}");
        Ok(Buffer::new(
            Handle::adopt(Arc::clone(self.runtime()), raw),
            size,
            flags,
        ))
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Allocates a 2D image. A `row_pitch` of `0` lets the runtime compute it.
    ///
    /// `host_data` follows the same rules as in [`Context::create_buffer`]
    /// and must cover `height` rows of the resolved pitch.
    pub fn create_image_2d(
        &self,
        flags: MemFlags,
        format: &ImageFormat,
        width: usize,
        height: usize,
        row_pitch: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Image2D> {
        let fail = image_error(Operation::CreateImage2D);
        if width == 0 || height == 0 {
            return Err(fail(Status::INVALID_IMAGE_SIZE));
        }
        let desc = ImageDesc {
            image_type: ImageType::Image2D,
            width,
            height,
            depth: 1,
            row_pitch,
            slice_pitch: 0,
        };
        let raw = self.allocate_image(flags, format, &desc, host_data).map_err(fail)?;
        let handle = Handle::adopt(Arc::clone(self.runtime()), raw);
        let row_pitch = self.image_pitch(raw, ImageInfo::RowPitch)?;
        log::debug!("Created image2d {raw:?}: {width}x{height} {format}, row pitch {row_pitch}");
        Ok(Image2D::new(handle, flags, *format, width, height, row_pitch))
    }

    /// Allocates a 3D image. Zero pitches let the runtime compute them.
    pub fn create_image_3d(
        &self,
        flags: MemFlags,
        format: &ImageFormat,
        width: usize,
        height: usize,
        depth: usize,
        row_pitch: usize,
        slice_pitch: usize,
        host_data: Option<&[u8]>,
    ) -> Result<Image3D> {
        let fail = image_error(Operation::CreateImage3D);
        if width == 0 || height == 0 || depth == 0 {
            return Err(fail(Status::INVALID_IMAGE_SIZE));
        }
        let desc = ImageDesc {
            image_type: ImageType::Image3D,
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
        };
        let raw = self.allocate_image(flags, format, &desc, host_data).map_err(fail)?;
        let handle = Handle::adopt(Arc::clone(self.runtime()), raw);
        let row_pitch = self.image_pitch(raw, ImageInfo::RowPitch)?;
        let slice_pitch = self.image_pitch(raw, ImageInfo::SlicePitch)?;
        log::debug!(
            "Created image3d {raw:?}: {width}x{height}x{depth} {format}, pitches {row_pitch}/{slice_pitch}"
        );
        Ok(Image3D::new(
            handle,
            flags,
            *format,
            (width, height, depth),
            row_pitch,
            slice_pitch,
        ))
    }

    fn allocate_image(
        &self,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_data: Option<&[u8]>,
    ) -> std::result::Result<RawMem, Status> {
        if flags.contains(MemFlags::USE_HOST_PTR) {
            return Err(Status::INVALID_HOST_PTR);
        }
        let host_ptr = match host_data {
            Some(data) => {
                if image_extent(format, desc)?.is_some_and(|required| data.len() < required) {
                    return Err(Status::INVALID_HOST_PTR);
                }
                data.as_ptr().cast_mut().cast::<c_void>()
            }
            None => std::ptr::null_mut(),
        };
        // SAFETY: `data` covers the resolved extent whenever the format is
        // valid; the runtime rejects an invalid format before reading, and
        // without USE_HOST_PTR it does not keep the pointer.
        unsafe {
            self.runtime()
                .create_image(self.raw(), flags, format, desc, host_ptr)
        }
    }

    fn image_pitch(&self, image: RawMem, param: ImageInfo) -> Result<usize> {
        query_scalar(|out| self.runtime().image_info(image, param, out)).map_err(|status| {
            OpalError::ImageCreation {
                operation: Operation::ImageInfo,
                status,
            }
        })
    }

    // ========================================================================
    // Samplers & programs
    // ========================================================================

    pub fn create_sampler(
        &self,
        normalized_coords: bool,
        addressing_mode: AddressingMode,
        filter_mode: FilterMode,
    ) -> Result<Sampler> {
        let raw = self
            .runtime()
            .create_sampler(self.raw(), normalized_coords, addressing_mode, filter_mode)
            .map_err(|status| OpalError::SamplerCreation {
                operation: Operation::CreateSampler,
                status,
            })?;
        log::debug!("Created sampler {raw:?}: {addressing_mode:?}/{filter_mode:?}");
        Ok(Sampler::new(
            Handle::adopt(Arc::clone(self.runtime()), raw),
            normalized_coords,
            addressing_mode,
            filter_mode,
        ))
    }

    /// Creates a program object from one source fragment. The program is
    /// not built.
    ///
    /// Empty source is rejected without calling into the runtime.
    pub fn create_program(&self, source: &str) -> Result<Program> {
        let fail = |status| OpalError::ProgramCreation {
            operation: Operation::CreateProgram,
            status,
        };
        if source.is_empty() {
            return Err(fail(Status::INVALID_VALUE));
        }
        let source: Arc<str> = Arc::from(source);
        let raw = self
            .runtime()
            .create_program_with_source(self.raw(), &[&*source])
            .map_err(fail)?;
        log::debug!("Created program {raw:?} ({} bytes of source)", source.len());
        Ok(Program::new(
            Handle::adopt(Arc::clone(self.runtime()), raw),
            source,
        ))
    }
}

fn buffer_error(status: Status) -> OpalError {
    OpalError::BufferCreation {
        operation: Operation::CreateBuffer,
        status,
    }
}

fn image_error(operation: Operation) -> impl Fn(Status) -> OpalError {
    move |status| OpalError::ImageCreation { operation, status }
}

/// Bytes a host image must provide, or `None` for an invalid format. An
/// extent that does not fit in `usize` is `INVALID_IMAGE_SIZE`.
fn image_extent(
    format: &ImageFormat,
    desc: &ImageDesc,
) -> std::result::Result<Option<usize>, Status> {
    let Some(element_size) = format.bytes_per_pixel() else {
        return Ok(None);
    };
    let row_pitch = match desc.row_pitch {
        0 => desc.width.checked_mul(element_size),
        pitch => Some(pitch),
    };
    let slice_pitch = match (desc.image_type, desc.slice_pitch) {
        (ImageType::Image3D, pitch) if pitch != 0 => row_pitch.map(|_| pitch),
        _ => row_pitch.and_then(|row| row.checked_mul(desc.height)),
    };
    slice_pitch
        .and_then(|slice| slice.checked_mul(desc.depth.max(1)))
        .map(Some)
        .ok_or(Status::INVALID_IMAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(image_type: ImageType, dims: (usize, usize, usize), pitches: (usize, usize)) -> ImageDesc {
        ImageDesc {
            image_type,
            width: dims.0,
            height: dims.1,
            depth: dims.2,
            row_pitch: pitches.0,
            slice_pitch: pitches.1,
        }
    }

    #[test]
    fn image_extent_uses_packed_pitch_by_default() {
        let d = desc(ImageType::Image2D, (4, 3, 1), (0, 0));
        assert_eq!(image_extent(&ImageFormat::RGBA8, &d), Ok(Some(48)));
    }

    #[test]
    fn image_extent_honours_explicit_pitches() {
        let d = desc(ImageType::Image3D, (4, 3, 2), (32, 128));
        assert_eq!(image_extent(&ImageFormat::R8, &d), Ok(Some(256)));
    }

    #[test]
    fn image_extent_is_none_for_invalid_format() {
        let bad = ImageFormat::new(crate::format::ChannelOrder::RGB, crate::format::ChannelType::Float);
        let d = desc(ImageType::Image2D, (4, 4, 1), (0, 0));
        assert_eq!(image_extent(&bad, &d), Ok(None));
    }

    #[test]
    fn image_extent_reports_overflow_as_invalid_size() {
        let wide = desc(ImageType::Image2D, (usize::MAX / 2, 1, 1), (0, 0));
        assert_eq!(
            image_extent(&ImageFormat::RGBA8, &wide),
            Err(Status::INVALID_IMAGE_SIZE)
        );

        let pitched = desc(ImageType::Image2D, (4, 4, 1), (1 << 62, 0));
        assert_eq!(
            image_extent(&ImageFormat::RGBA8, &pitched),
            Err(Status::INVALID_IMAGE_SIZE)
        );

        let deep = desc(ImageType::Image3D, (4, 4, 8), (16, usize::MAX / 4));
        assert_eq!(
            image_extent(&ImageFormat::RGBA8, &deep),
            Err(Status::INVALID_IMAGE_SIZE)
        );
    }

    #[test]
    fn device_ids_keep_order_and_duplicates() {
        use crate::runtime::host::HostRuntime;

        let platform = Platform::first(Arc::new(HostRuntime::new())).unwrap();
        let all = platform.devices(DeviceType::ALL).unwrap();
        let list = [all[1].clone(), all[0].clone(), all[1].clone()];

        let ids = Context::device_ids(&list).unwrap();
        assert_eq!(ids.as_slice(), &[all[1].raw(), all[0].raw(), all[1].raw()]);
    }
}
