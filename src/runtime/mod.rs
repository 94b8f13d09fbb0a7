//! Native Runtime Seam
//!
//! Everything the resource layer needs from the underlying compute driver
//! goes through the [`ComputeRuntime`] trait. Its methods are a one-to-one
//! image of the native entry points: they take raw handles, return raw
//! handles, and report failure as the native [`Status`] code untouched.
//!
//! Two implementations ship with the crate:
//! - [`host::HostRuntime`]: an in-process reference runtime with the same
//!   validation rules and status codes as a conforming driver.
//! - `opencl::OpenClRuntime` (feature `opencl`): the system OpenCL ICD.
//!
//! Info queries follow the native size-then-fill protocol. Callers should go
//! through [`query_sized`] and friends, which perform both steps and size the
//! destination exactly.

pub mod host;
#[cfg(feature = "opencl")]
pub mod opencl;

use std::ffi::c_void;
use std::fmt;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::format::ImageFormat;

// ============================================================================
// Status codes
// ============================================================================

/// A native status code.
///
/// Values follow the OpenCL numbering so that codes coming from a real
/// driver and from [`host::HostRuntime`] read the same.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Status(pub i32);

impl Status {
    pub const SUCCESS: Self = Self(0);
    pub const DEVICE_NOT_FOUND: Self = Self(-1);
    pub const DEVICE_NOT_AVAILABLE: Self = Self(-2);
    pub const MEM_OBJECT_ALLOCATION_FAILURE: Self = Self(-4);
    pub const OUT_OF_RESOURCES: Self = Self(-5);
    pub const OUT_OF_HOST_MEMORY: Self = Self(-6);
    pub const IMAGE_FORMAT_NOT_SUPPORTED: Self = Self(-10);
    pub const INVALID_VALUE: Self = Self(-30);
    pub const INVALID_DEVICE_TYPE: Self = Self(-31);
    pub const INVALID_PLATFORM: Self = Self(-32);
    pub const INVALID_DEVICE: Self = Self(-33);
    pub const INVALID_CONTEXT: Self = Self(-34);
    pub const INVALID_QUEUE_PROPERTIES: Self = Self(-35);
    pub const INVALID_COMMAND_QUEUE: Self = Self(-36);
    pub const INVALID_HOST_PTR: Self = Self(-37);
    pub const INVALID_MEM_OBJECT: Self = Self(-38);
    pub const INVALID_IMAGE_FORMAT_DESCRIPTOR: Self = Self(-39);
    pub const INVALID_IMAGE_SIZE: Self = Self(-40);
    pub const INVALID_SAMPLER: Self = Self(-41);
    pub const INVALID_PROGRAM: Self = Self(-44);
    pub const INVALID_OPERATION: Self = Self(-59);
    pub const INVALID_BUFFER_SIZE: Self = Self(-61);
    pub const PLATFORM_NOT_FOUND_KHR: Self = Self(-1001);

    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Symbolic name of a known code.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "CL_SUCCESS",
            -1 => "CL_DEVICE_NOT_FOUND",
            -2 => "CL_DEVICE_NOT_AVAILABLE",
            -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
            -5 => "CL_OUT_OF_RESOURCES",
            -6 => "CL_OUT_OF_HOST_MEMORY",
            -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
            -30 => "CL_INVALID_VALUE",
            -31 => "CL_INVALID_DEVICE_TYPE",
            -32 => "CL_INVALID_PLATFORM",
            -33 => "CL_INVALID_DEVICE",
            -34 => "CL_INVALID_CONTEXT",
            -35 => "CL_INVALID_QUEUE_PROPERTIES",
            -36 => "CL_INVALID_COMMAND_QUEUE",
            -37 => "CL_INVALID_HOST_PTR",
            -38 => "CL_INVALID_MEM_OBJECT",
            -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
            -40 => "CL_INVALID_IMAGE_SIZE",
            -41 => "CL_INVALID_SAMPLER",
            -44 => "CL_INVALID_PROGRAM",
            -59 => "CL_INVALID_OPERATION",
            -61 => "CL_INVALID_BUFFER_SIZE",
            -1001 => "CL_PLATFORM_NOT_FOUND_KHR",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "unknown status ({})", self.0),
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({self})")
    }
}

// ============================================================================
// Raw handles
// ============================================================================

macro_rules! raw_handles {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[repr(transparent)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
            pub struct $name(pub usize);

            impl $name {
                pub const NULL: Self = Self(0);

                #[inline]
                #[must_use]
                pub fn is_null(self) -> bool {
                    self.0 == 0
                }
            }
        )*
    };
}

raw_handles! {
    /// Native platform id.
    RawPlatform,
    /// Native device id.
    RawDevice,
    /// Native context handle.
    RawContext,
    /// Native command-queue handle.
    RawQueue,
    /// Native memory object handle (buffers and images).
    RawMem,
    /// Native sampler handle.
    RawSampler,
    /// Native program handle.
    RawProgram,
}

/// A reference-counted native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawObject {
    Context(RawContext),
    Queue(RawQueue),
    Mem(RawMem),
    Sampler(RawSampler),
    Program(RawProgram),
}

impl RawObject {
    /// The handle value regardless of object kind.
    #[must_use]
    pub fn raw(self) -> usize {
        match self {
            Self::Context(h) => h.0,
            Self::Queue(h) => h.0,
            Self::Mem(h) => h.0,
            Self::Sampler(h) => h.0,
            Self::Program(h) => h.0,
        }
    }
}

/// Raw handle types whose lifetime is governed by retain/release.
pub trait NativeObject: Copy + fmt::Debug + Send + Sync + 'static {
    fn to_object(self) -> RawObject;
}

macro_rules! native_object {
    ($($raw:ident => $variant:ident),* $(,)?) => {
        $(
            impl NativeObject for $raw {
                #[inline]
                fn to_object(self) -> RawObject {
                    RawObject::$variant(self)
                }
            }
        )*
    };
}

native_object! {
    RawContext => Context,
    RawQueue => Queue,
    RawMem => Mem,
    RawSampler => Sampler,
    RawProgram => Program,
}

// ============================================================================
// Parameter types
// ============================================================================

bitflags! {
    /// Device-type selector used for discovery and context creation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DeviceType: u64 {
        const DEFAULT     = 1 << 0;
        const CPU         = 1 << 1;
        const GPU         = 1 << 2;
        const ACCELERATOR = 1 << 3;
        const CUSTOM      = 1 << 4;
        const ALL         = 0xFFFF_FFFF;
    }
}

impl DeviceType {
    /// Every individually defined selector bit. `ALL` is a catch-all value,
    /// not a bit set.
    pub const SELECTORS: Self = Self::DEFAULT
        .union(Self::CPU)
        .union(Self::GPU)
        .union(Self::ACCELERATOR)
        .union(Self::CUSTOM);
}

bitflags! {
    /// Command queue properties.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct QueueProperties: u64 {
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = 1 << 0;
        const PROFILING_ENABLE              = 1 << 1;
    }
}

bitflags! {
    /// Memory object allocation and access flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MemFlags: u64 {
        const READ_WRITE      = 1 << 0;
        const WRITE_ONLY      = 1 << 1;
        const READ_ONLY       = 1 << 2;
        const USE_HOST_PTR    = 1 << 3;
        const ALLOC_HOST_PTR  = 1 << 4;
        const COPY_HOST_PTR   = 1 << 5;
        const HOST_WRITE_ONLY = 1 << 7;
        const HOST_READ_ONLY  = 1 << 8;
        const HOST_NO_ACCESS  = 1 << 9;
    }
}

impl MemFlags {
    /// Device access bits; at most one may be set.
    pub const DEVICE_ACCESS: Self = Self::READ_WRITE.union(Self::WRITE_ONLY).union(Self::READ_ONLY);
    /// Host access bits; at most one may be set.
    pub const HOST_ACCESS: Self = Self::HOST_WRITE_ONLY
        .union(Self::HOST_READ_ONLY)
        .union(Self::HOST_NO_ACCESS);

    /// Whether the flags require a host pointer to be supplied.
    #[inline]
    #[must_use]
    pub fn needs_host_ptr(self) -> bool {
        self.intersects(Self::USE_HOST_PTR | Self::COPY_HOST_PTR)
    }
}

/// Out-of-range image coordinate handling of a sampler.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressingMode {
    None = 0x1130,
    #[default]
    ClampToEdge = 0x1131,
    Clamp = 0x1132,
    Repeat = 0x1133,
    MirroredRepeat = 0x1134,
}

/// Sampler filter.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest = 0x1140,
    Linear = 0x1141,
}

/// Image dimensionality accepted by [`ComputeRuntime::create_image`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    Image2D = 0x10F1,
    Image3D = 0x10F2,
}

/// Shape and layout of an image allocation.
///
/// A pitch of `0` asks the runtime to compute it from the width and format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDesc {
    pub image_type: ImageType,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

// ============================================================================
// Info selectors
// ============================================================================

/// Platform info selector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformInfo {
    Profile = 0x0900,
    Version = 0x0901,
    Name = 0x0902,
    Vendor = 0x0903,
    Extensions = 0x0904,
}

/// Device info selector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceInfo {
    Type = 0x1000,
    MaxMemAllocSize = 0x1010,
    ImageSupport = 0x1016,
    GlobalMemSize = 0x101F,
    QueueProperties = 0x102A,
    Name = 0x102B,
    Vendor = 0x102C,
    Platform = 0x1031,
}

/// Context info selector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextInfo {
    ReferenceCount = 0x1080,
    Devices = 0x1081,
    NumDevices = 0x1083,
}

/// Image info selector.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageInfo {
    ElementSize = 0x1111,
    RowPitch = 0x1112,
    SlicePitch = 0x1113,
    Width = 0x1114,
    Height = 0x1115,
    Depth = 0x1116,
}

// ============================================================================
// The seam
// ============================================================================

/// The native compute runtime, one method per native entry point.
///
/// Enumeration methods use the count-then-fill protocol: called with `None`
/// they return the number of ids available; called with a slice they fill it
/// and return the number written. Info methods do the same over bytes, and
/// fail with [`Status::INVALID_VALUE`] when the destination is too small.
///
/// Implementations must be safe to call from several threads at once; the
/// resource layer adds no locking of its own.
pub trait ComputeRuntime: Send + Sync + fmt::Debug {
    fn platform_ids(&self, out: Option<&mut [RawPlatform]>) -> Result<usize, Status>;

    fn platform_info(
        &self,
        platform: RawPlatform,
        param: PlatformInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        out: Option<&mut [RawDevice]>,
    ) -> Result<usize, Status>;

    fn device_info(
        &self,
        device: RawDevice,
        param: DeviceInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    fn create_context_from_type(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
    ) -> Result<RawContext, Status>;

    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status>;

    fn context_info(
        &self,
        context: RawContext,
        param: ContextInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status>;

    /// # Safety
    ///
    /// A non-null `host_ptr` must be valid for reads of `size` bytes, and for
    /// as long as the buffer lives when `flags` contains `USE_HOST_PTR`.
    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status>;

    /// # Safety
    ///
    /// A non-null `host_ptr` must cover the whole image as described by
    /// `desc` (with pitches resolved), under the same lifetime rule as
    /// [`ComputeRuntime::create_buffer`].
    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status>;

    fn image_info(
        &self,
        image: RawMem,
        param: ImageInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status>;

    fn create_sampler(
        &self,
        context: RawContext,
        normalized_coords: bool,
        addressing_mode: AddressingMode,
        filter_mode: FilterMode,
    ) -> Result<RawSampler, Status>;

    fn create_program_with_source(
        &self,
        context: RawContext,
        sources: &[&str],
    ) -> Result<RawProgram, Status>;

    fn retain(&self, object: RawObject) -> Result<(), Status>;

    fn release(&self, object: RawObject) -> Result<(), Status>;
}

// ============================================================================
// Size-then-fill helpers
// ============================================================================

/// Runs a byte-oriented info query in two steps: ask for the required size,
/// then fill a buffer of exactly that size.
pub fn query_sized<F>(mut query: F) -> Result<Vec<u8>, Status>
where
    F: FnMut(Option<&mut [u8]>) -> Result<usize, Status>,
{
    let size = query(None)?;
    let mut bytes = vec![0u8; size];
    if size > 0 {
        let written = query(Some(&mut bytes))?;
        bytes.truncate(written);
    }
    Ok(bytes)
}

/// Queries a sequence of plain-old-data values, e.g. a device-handle list.
pub fn query_list<T, F>(query: F) -> Result<Vec<T>, Status>
where
    T: Pod,
    F: FnMut(Option<&mut [u8]>) -> Result<usize, Status>,
{
    let bytes = query_sized(query)?;
    if !bytes.len().is_multiple_of(size_of::<T>()) {
        return Err(Status::INVALID_VALUE);
    }
    Ok(bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

/// Queries a single plain-old-data value.
pub fn query_scalar<T, F>(query: F) -> Result<T, Status>
where
    T: Pod,
    F: FnMut(Option<&mut [u8]>) -> Result<usize, Status>,
{
    let bytes = query_sized(query)?;
    if bytes.len() != size_of::<T>() {
        return Err(Status::INVALID_VALUE);
    }
    Ok(bytemuck::pod_read_unaligned(&bytes))
}

/// Queries a NUL-terminated string.
pub fn query_string<F>(query: F) -> Result<String, Status>
where
    F: FnMut(Option<&mut [u8]>) -> Result<usize, Status>,
{
    let mut bytes = query_sized(query)?;
    if let Some(end) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(end);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Runs a count-then-fill id enumeration.
pub fn query_ids<T, F>(mut query: F) -> Result<Vec<T>, Status>
where
    T: Pod,
    F: FnMut(Option<&mut [T]>) -> Result<usize, Status>,
{
    let count = query(None)?;
    let mut ids = vec![T::zeroed(); count];
    if count > 0 {
        let written = query(Some(&mut ids))?;
        ids.truncate(written);
    }
    Ok(ids)
}

/// Answers the fill side of an info query: reports the size, and copies the
/// value when a destination is supplied.
pub(crate) fn answer_info(value: &[u8], out: Option<&mut [u8]>) -> Result<usize, Status> {
    if let Some(out) = out {
        if out.len() < value.len() {
            return Err(Status::INVALID_VALUE);
        }
        out[..value.len()].copy_from_slice(value);
    }
    Ok(value.len())
}

/// Answers the fill side of an id enumeration.
pub(crate) fn answer_ids<T: Copy>(ids: &[T], out: Option<&mut [T]>) -> Result<usize, Status> {
    match out {
        None => Ok(ids.len()),
        Some(out) => {
            if out.is_empty() {
                return Err(Status::INVALID_VALUE);
            }
            let n = out.len().min(ids.len());
            out[..n].copy_from_slice(&ids[..n]);
            Ok(n)
        }
    }
}

/// Encodes a string info value with its NUL terminator.
pub(crate) fn c_string_bytes(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len() + 1);
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_uses_symbolic_name() {
        assert_eq!(Status::INVALID_VALUE.to_string(), "CL_INVALID_VALUE (-30)");
        assert_eq!(Status(-12345).to_string(), "unknown status (-12345)");
        assert!(Status::SUCCESS.is_success());
        assert!(!Status::DEVICE_NOT_FOUND.is_success());
    }

    #[test]
    fn query_sized_sizes_buffer_exactly() {
        let value = [1u8, 2, 3, 4, 5];
        let mut calls = Vec::new();
        let bytes = query_sized(|out| {
            calls.push(out.as_ref().map(|o| o.len()));
            answer_info(&value, out)
        })
        .unwrap();
        assert_eq!(bytes, value);
        assert_eq!(calls, vec![None, Some(5)]);
    }

    #[test]
    fn query_sized_skips_fill_when_empty() {
        let mut calls = 0;
        let bytes = query_sized(|out| {
            calls += 1;
            answer_info(&[], out)
        })
        .unwrap();
        assert!(bytes.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn query_list_decodes_handles() {
        let handles = [RawDevice(7), RawDevice(9)];
        let raw: &[u8] = bytemuck::cast_slice(&handles);
        let decoded: Vec<RawDevice> = query_list(|out| answer_info(raw, out)).unwrap();
        assert_eq!(decoded, handles);
    }

    #[test]
    fn query_list_rejects_ragged_payload() {
        let result: Result<Vec<RawDevice>, _> = query_list(|out| answer_info(&[0u8; 3], out));
        assert_eq!(result, Err(Status::INVALID_VALUE));
    }

    #[test]
    fn query_string_strips_terminator() {
        let encoded = c_string_bytes("Opal Host");
        let text = query_string(|out| answer_info(&encoded, out)).unwrap();
        assert_eq!(text, "Opal Host");
    }

    #[test]
    fn answer_info_rejects_short_destination() {
        let mut small = [0u8; 2];
        assert_eq!(answer_info(&[1, 2, 3], Some(&mut small)), Err(Status::INVALID_VALUE));
    }

    #[test]
    fn mem_flag_groups() {
        assert!(MemFlags::COPY_HOST_PTR.needs_host_ptr());
        assert!(!MemFlags::ALLOC_HOST_PTR.needs_host_ptr());
        assert_eq!(MemFlags::DEVICE_ACCESS.bits(), 0b111);
    }
}
