//! [`ComputeRuntime`] over the system OpenCL ICD loader.
//!
//! Each method is one native call; status codes pass through unchanged.

use std::ffi::{c_char, c_void};
use std::ptr;

use opencl_sys::{
    CL_CONTEXT_PLATFORM, CL_SUCCESS, cl_context_properties, cl_device_id, cl_image_desc,
    cl_image_format, cl_int, cl_platform_id, cl_uint, clCreateBuffer, clCreateCommandQueue,
    clCreateContext, clCreateContextFromType, clCreateImage, clCreateProgramWithSource,
    clCreateSampler, clGetContextInfo, clGetDeviceIDs, clGetDeviceInfo, clGetImageInfo,
    clGetPlatformIDs, clGetPlatformInfo, clReleaseCommandQueue, clReleaseContext,
    clReleaseMemObject, clReleaseProgram, clReleaseSampler, clRetainCommandQueue,
    clRetainContext, clRetainMemObject, clRetainProgram, clRetainSampler,
};

use super::{
    AddressingMode, ComputeRuntime, ContextInfo, DeviceInfo, DeviceType, FilterMode, ImageDesc,
    ImageInfo, MemFlags, PlatformInfo, QueueProperties, RawContext, RawDevice, RawMem, RawObject,
    RawPlatform, RawProgram, RawQueue, RawSampler, Status,
};
use crate::format::ImageFormat;

#[inline]
fn check(status: cl_int) -> Result<(), Status> {
    if status == CL_SUCCESS {
        Ok(())
    } else {
        Err(Status(status))
    }
}

#[inline]
fn created<T>(
    handle: *mut c_void,
    status: cl_int,
    wrap: impl FnOnce(usize) -> T,
) -> Result<T, Status> {
    check(status)?;
    Ok(wrap(handle as usize))
}

/// Splits an optional destination into the (size, pointer) pair the native
/// info calls expect.
fn info_dest(out: Option<&mut [u8]>) -> (usize, *mut c_void) {
    match out {
        Some(out) => (out.len(), out.as_mut_ptr().cast()),
        None => (0, ptr::null_mut()),
    }
}

/// Id count to report: the total when sizing, otherwise how many were written.
fn filled(count: cl_uint, sizing: bool, capacity: cl_uint) -> usize {
    if sizing {
        count as usize
    } else {
        count.min(capacity) as usize
    }
}

fn platform_properties(platform: RawPlatform) -> [cl_context_properties; 3] {
    [
        CL_CONTEXT_PLATFORM as cl_context_properties,
        platform.0 as cl_context_properties,
        0,
    ]
}

/// The system OpenCL runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ComputeRuntime for OpenClRuntime {
    fn platform_ids(&self, out: Option<&mut [RawPlatform]>) -> Result<usize, Status> {
        let mut count: cl_uint = 0;
        let (len, dest): (cl_uint, *mut cl_platform_id) = match out {
            Some(out) => (out.len() as cl_uint, out.as_mut_ptr().cast()),
            None => (0, ptr::null_mut()),
        };
        // SAFETY: `dest` is either null with `len == 0` or valid for `len` ids;
        // `RawPlatform` is a transparent pointer-sized id.
        check(unsafe { clGetPlatformIDs(len, dest, &raw mut count) })?;
        Ok(filled(count, dest.is_null(), len))
    }

    fn platform_info(
        &self,
        platform: RawPlatform,
        param: PlatformInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let (len, dest) = info_dest(out);
        let mut written = 0usize;
        // SAFETY: `dest` is null or valid for `len` bytes.
        check(unsafe {
            clGetPlatformInfo(platform.0 as _, param as cl_uint, len, dest, &raw mut written)
        })?;
        Ok(written)
    }

    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        out: Option<&mut [RawDevice]>,
    ) -> Result<usize, Status> {
        let mut count: cl_uint = 0;
        let (len, dest): (cl_uint, *mut cl_device_id) = match out {
            Some(out) => (out.len() as cl_uint, out.as_mut_ptr().cast()),
            None => (0, ptr::null_mut()),
        };
        // SAFETY: as in `platform_ids`.
        check(unsafe {
            clGetDeviceIDs(platform.0 as _, device_type.bits(), len, dest, &raw mut count)
        })?;
        Ok(filled(count, dest.is_null(), len))
    }

    fn device_info(
        &self,
        device: RawDevice,
        param: DeviceInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let (len, dest) = info_dest(out);
        let mut written = 0usize;
        // SAFETY: `dest` is null or valid for `len` bytes.
        check(unsafe {
            clGetDeviceInfo(device.0 as _, param as cl_uint, len, dest, &raw mut written)
        })?;
        Ok(written)
    }

    fn create_context_from_type(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
    ) -> Result<RawContext, Status> {
        let properties = platform_properties(platform);
        let mut status = CL_SUCCESS;
        // SAFETY: `properties` is a zero-terminated list that outlives the call.
        let context = unsafe {
            clCreateContextFromType(
                properties.as_ptr(),
                device_type.bits(),
                None,
                ptr::null_mut(),
                &raw mut status,
            )
        };
        created(context.cast(), status, RawContext)
    }

    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status> {
        let properties = platform_properties(platform);
        let mut status = CL_SUCCESS;
        // SAFETY: `devices` is a contiguous array of pointer-sized device ids.
        let context = unsafe {
            clCreateContext(
                properties.as_ptr(),
                devices.len() as cl_uint,
                devices.as_ptr().cast(),
                None,
                ptr::null_mut(),
                &raw mut status,
            )
        };
        created(context.cast(), status, RawContext)
    }

    fn context_info(
        &self,
        context: RawContext,
        param: ContextInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let (len, dest) = info_dest(out);
        let mut written = 0usize;
        // SAFETY: `dest` is null or valid for `len` bytes.
        check(unsafe {
            clGetContextInfo(context.0 as _, param as cl_uint, len, dest, &raw mut written)
        })?;
        Ok(written)
    }

    #[allow(deprecated)]
    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status> {
        let mut status = CL_SUCCESS;
        // SAFETY: plain handle arguments.
        let queue = unsafe {
            clCreateCommandQueue(context.0 as _, device.0 as _, properties.bits(), &raw mut status)
        };
        created(queue.cast(), status, RawQueue)
    }

    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let mut status = CL_SUCCESS;
        // SAFETY: the host pointer contract is forwarded from the caller.
        let mem = unsafe {
            clCreateBuffer(context.0 as _, flags.bits(), size, host_ptr, &raw mut status)
        };
        created(mem.cast(), status, RawMem)
    }

    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let [order, channel_type] = format.to_raw();
        let native_format = cl_image_format {
            image_channel_order: order,
            image_channel_data_type: channel_type,
        };
        let native_desc = cl_image_desc {
            image_type: desc.image_type as cl_uint,
            image_width: desc.width,
            image_height: desc.height,
            image_depth: desc.depth,
            image_array_size: 0,
            image_row_pitch: desc.row_pitch,
            image_slice_pitch: desc.slice_pitch,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: ptr::null_mut(),
        };
        let mut status = CL_SUCCESS;
        // SAFETY: descriptors live on the stack for the call; the host
        // pointer contract is forwarded from the caller.
        let mem = unsafe {
            clCreateImage(
                context.0 as _,
                flags.bits(),
                &raw const native_format,
                &raw const native_desc,
                host_ptr,
                &raw mut status,
            )
        };
        created(mem.cast(), status, RawMem)
    }

    fn image_info(
        &self,
        image: RawMem,
        param: ImageInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let (len, dest) = info_dest(out);
        let mut written = 0usize;
        // SAFETY: `dest` is null or valid for `len` bytes.
        check(unsafe {
            clGetImageInfo(image.0 as _, param as cl_uint, len, dest, &raw mut written)
        })?;
        Ok(written)
    }

    fn create_sampler(
        &self,
        context: RawContext,
        normalized_coords: bool,
        addressing_mode: AddressingMode,
        filter_mode: FilterMode,
    ) -> Result<RawSampler, Status> {
        let mut status = CL_SUCCESS;
        // SAFETY: plain value arguments.
        let sampler = unsafe {
            clCreateSampler(
                context.0 as _,
                cl_uint::from(normalized_coords),
                addressing_mode as cl_uint,
                filter_mode as cl_uint,
                &raw mut status,
            )
        };
        created(sampler.cast(), status, RawSampler)
    }

    fn create_program_with_source(
        &self,
        context: RawContext,
        sources: &[&str],
    ) -> Result<RawProgram, Status> {
        let strings: Vec<*const c_char> = sources.iter().map(|s| s.as_ptr().cast()).collect();
        let lengths: Vec<usize> = sources.iter().map(|s| s.len()).collect();
        let mut status = CL_SUCCESS;
        // SAFETY: explicit lengths are passed, so the fragments need no NUL.
        let program = unsafe {
            clCreateProgramWithSource(
                context.0 as _,
                strings.len() as cl_uint,
                strings.as_ptr(),
                lengths.as_ptr(),
                &raw mut status,
            )
        };
        created(program.cast(), status, RawProgram)
    }

    fn retain(&self, object: RawObject) -> Result<(), Status> {
        // SAFETY: retaining an invalid handle is reported by status.
        check(unsafe {
            match object {
                RawObject::Context(h) => clRetainContext(h.0 as _),
                RawObject::Queue(h) => clRetainCommandQueue(h.0 as _),
                RawObject::Mem(h) => clRetainMemObject(h.0 as _),
                RawObject::Sampler(h) => clRetainSampler(h.0 as _),
                RawObject::Program(h) => clRetainProgram(h.0 as _),
            }
        })
    }

    fn release(&self, object: RawObject) -> Result<(), Status> {
        // SAFETY: releasing an invalid handle is reported by status.
        check(unsafe {
            match object {
                RawObject::Context(h) => clReleaseContext(h.0 as _),
                RawObject::Queue(h) => clReleaseCommandQueue(h.0 as _),
                RawObject::Mem(h) => clReleaseMemObject(h.0 as _),
                RawObject::Sampler(h) => clReleaseSampler(h.0 as _),
                RawObject::Program(h) => clReleaseProgram(h.0 as _),
            }
        })
    }
}
