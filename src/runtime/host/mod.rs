//! In-process reference runtime.
//!
//! [`HostRuntime`] implements [`ComputeRuntime`] without any driver. It keeps
//! every native object in one slotmap behind a mutex, hands out the slotmap
//! key's FFI encoding as the raw handle, and applies the same argument rules
//! (and status codes) a conforming OpenCL 1.2 implementation applies. Stale
//! and null handles are caught by the key's version.
//!
//! Dependent objects (queues, memory objects, samplers, programs) hold an
//! implicit reference on their context, so a context is only destroyed once
//! every object created from it has been released.

mod config;

pub use config::{DeviceConfig, HostConfig, HostDeviceKind, PlatformConfig};

use std::ffi::c_void;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use slotmap::{Key, KeyData, SlotMap, new_key_type};
use smallvec::SmallVec;

use super::{
    AddressingMode, ComputeRuntime, ContextInfo, DeviceInfo, DeviceType, FilterMode, ImageDesc,
    ImageInfo, ImageType, MemFlags, PlatformInfo, QueueProperties, RawContext, RawDevice, RawMem,
    RawObject, RawPlatform, RawProgram, RawQueue, RawSampler, Status, answer_ids, answer_info,
    c_string_bytes,
};
use crate::format::ImageFormat;

const IMAGE2D_MAX_DIM: usize = 16384;
const IMAGE3D_MAX_DIM: usize = 2048;

new_key_type! { struct ObjectKey; }

#[inline]
fn key_of(raw: usize) -> ObjectKey {
    KeyData::from_ffi(raw as u64).into()
}

#[inline]
fn raw_of(key: ObjectKey) -> usize {
    key.data().as_ffi() as usize
}

// ============================================================================
// Object table
// ============================================================================

#[derive(Debug)]
struct PlatformObject {
    name: String,
    vendor: String,
    version: String,
    profile: String,
    extensions: String,
    devices: Vec<ObjectKey>,
}

#[derive(Debug)]
struct DeviceObject {
    platform: ObjectKey,
    config: DeviceConfig,
    /// First device of its platform; answers `DeviceType::DEFAULT`.
    is_default: bool,
}

#[derive(Debug)]
struct ContextObject {
    refs: u32,
    devices: SmallVec<[ObjectKey; 4]>,
    allocated: u64,
    capacity: u64,
    max_alloc: u64,
    image_support: bool,
}

#[derive(Debug)]
struct QueueObject {
    refs: u32,
    context: ObjectKey,
}

#[derive(Debug)]
enum Backing {
    Unbacked,
    Copied(Vec<u8>),
    Borrowed,
}

#[derive(Debug)]
struct MemObject {
    refs: u32,
    context: ObjectKey,
    size: u64,
    image: Option<ImageLayout>,
    backing: Backing,
}

#[derive(Debug, Clone, Copy)]
struct ImageLayout {
    element_size: usize,
    desc: ImageDesc,
}

#[derive(Debug)]
struct SamplerObject {
    refs: u32,
    context: ObjectKey,
}

#[derive(Debug)]
struct ProgramObject {
    refs: u32,
    context: ObjectKey,
}

#[derive(Debug)]
enum Object {
    Platform(PlatformObject),
    Device(DeviceObject),
    Context(ContextObject),
    Queue(QueueObject),
    Mem(MemObject),
    Sampler(SamplerObject),
    Program(ProgramObject),
}

#[derive(Debug, Default)]
struct HostState {
    objects: SlotMap<ObjectKey, Object>,
    platforms: Vec<ObjectKey>,
}

impl HostState {
    fn build(config: &HostConfig) -> Self {
        let mut state = Self::default();
        for platform in &config.platforms {
            let platform_key = state.objects.insert(Object::Platform(PlatformObject {
                name: platform.name.clone(),
                vendor: platform.vendor.clone(),
                version: platform.version.clone(),
                profile: platform.profile.clone(),
                extensions: platform.extensions.join(" "),
                devices: Vec::with_capacity(platform.devices.len()),
            }));

            let device_keys: Vec<ObjectKey> = platform
                .devices
                .iter()
                .enumerate()
                .map(|(index, device)| {
                    state.objects.insert(Object::Device(DeviceObject {
                        platform: platform_key,
                        config: device.clone(),
                        is_default: index == 0,
                    }))
                })
                .collect();

            if let Some(Object::Platform(p)) = state.objects.get_mut(platform_key) {
                p.devices = device_keys;
            }
            state.platforms.push(platform_key);
        }
        state
    }

    fn platform(&self, raw: RawPlatform) -> Result<&PlatformObject, Status> {
        match self.objects.get(key_of(raw.0)) {
            Some(Object::Platform(p)) => Ok(p),
            _ => Err(Status::INVALID_PLATFORM),
        }
    }

    fn device(&self, raw: RawDevice) -> Result<&DeviceObject, Status> {
        match self.objects.get(key_of(raw.0)) {
            Some(Object::Device(d)) => Ok(d),
            _ => Err(Status::INVALID_DEVICE),
        }
    }

    fn context(&self, raw: RawContext) -> Result<&ContextObject, Status> {
        match self.objects.get(key_of(raw.0)) {
            Some(Object::Context(c)) => Ok(c),
            _ => Err(Status::INVALID_CONTEXT),
        }
    }

    fn image(&self, raw: RawMem) -> Result<&ImageLayout, Status> {
        match self.objects.get(key_of(raw.0)) {
            Some(Object::Mem(MemObject {
                image: Some(layout),
                ..
            })) => Ok(layout),
            _ => Err(Status::INVALID_MEM_OBJECT),
        }
    }

    fn matching_devices(
        &self,
        platform: &PlatformObject,
        device_type: DeviceType,
    ) -> Result<SmallVec<[ObjectKey; 4]>, Status> {
        if device_type.is_empty()
            || (device_type != DeviceType::ALL && !DeviceType::SELECTORS.contains(device_type))
        {
            return Err(Status::INVALID_DEVICE_TYPE);
        }
        let matches: SmallVec<[ObjectKey; 4]> = platform
            .devices
            .iter()
            .copied()
            .filter(|&key| match self.objects.get(key) {
                Some(Object::Device(d)) => {
                    device_type == DeviceType::ALL
                        || (device_type.contains(DeviceType::DEFAULT) && d.is_default)
                        || device_type.intersects(d.config.kind.device_type())
                }
                _ => false,
            })
            .collect();
        if matches.is_empty() {
            return Err(Status::DEVICE_NOT_FOUND);
        }
        Ok(matches)
    }

    fn insert_context(&mut self, devices: SmallVec<[ObjectKey; 4]>) -> RawContext {
        let configs = devices.iter().filter_map(|&k| match self.objects.get(k) {
            Some(Object::Device(d)) => Some(&d.config),
            _ => None,
        });

        let mut capacity = u64::MAX;
        let mut max_alloc = u64::MAX;
        let mut image_support = false;
        for config in configs {
            capacity = capacity.min(config.global_mem_size);
            max_alloc = max_alloc.min(config.max_mem_alloc_size);
            image_support |= config.image_support;
        }

        let key = self.objects.insert(Object::Context(ContextObject {
            refs: 1,
            devices,
            allocated: 0,
            capacity,
            max_alloc,
            image_support,
        }));
        RawContext(raw_of(key))
    }

    /// Inserts an object created from `context`, taking the implicit
    /// reference on it.
    fn insert_dependent(&mut self, context: ObjectKey, object: Object) -> ObjectKey {
        if let Some(Object::Context(c)) = self.objects.get_mut(context) {
            c.refs += 1;
        }
        self.objects.insert(object)
    }

    fn charge(&mut self, context: RawContext, bytes: u64) -> Result<(), Status> {
        match self.objects.get_mut(key_of(context.0)) {
            Some(Object::Context(c)) => {
                if c.allocated.saturating_add(bytes) > c.capacity {
                    return Err(Status::MEM_OBJECT_ALLOCATION_FAILURE);
                }
                c.allocated += bytes;
                Ok(())
            }
            _ => Err(Status::INVALID_CONTEXT),
        }
    }

    fn refs_mut(&mut self, object: RawObject) -> Result<(&mut u32, Option<ObjectKey>), Status> {
        match (object, self.objects.get_mut(key_of(object.raw()))) {
            (RawObject::Context(_), Some(Object::Context(c))) => Ok((&mut c.refs, None)),
            (RawObject::Queue(_), Some(Object::Queue(q))) => Ok((&mut q.refs, Some(q.context))),
            (RawObject::Mem(_), Some(Object::Mem(m))) => Ok((&mut m.refs, Some(m.context))),
            (RawObject::Sampler(_), Some(Object::Sampler(s))) => {
                Ok((&mut s.refs, Some(s.context)))
            }
            (RawObject::Program(_), Some(Object::Program(p))) => {
                Ok((&mut p.refs, Some(p.context)))
            }
            (RawObject::Context(_), _) => Err(Status::INVALID_CONTEXT),
            (RawObject::Queue(_), _) => Err(Status::INVALID_COMMAND_QUEUE),
            (RawObject::Mem(_), _) => Err(Status::INVALID_MEM_OBJECT),
            (RawObject::Sampler(_), _) => Err(Status::INVALID_SAMPLER),
            (RawObject::Program(_), _) => Err(Status::INVALID_PROGRAM),
        }
    }

    fn release(&mut self, object: RawObject) -> Result<(), Status> {
        let (refs, parent) = self.refs_mut(object)?;
        *refs -= 1;
        if *refs > 0 {
            return Ok(());
        }

        let removed = self.objects.remove(key_of(object.raw()));
        if let Some(Object::Mem(mem)) = removed
            && let Some(Object::Context(c)) = self.objects.get_mut(mem.context)
        {
            c.allocated = c.allocated.saturating_sub(mem.size);
        }
        log::trace!("host runtime destroyed {object:?}");

        match parent {
            Some(context) => self.release(RawObject::Context(RawContext(raw_of(context)))),
            None => Ok(()),
        }
    }

    fn live_objects(&self) -> usize {
        self.objects
            .values()
            .filter(|o| !matches!(o, Object::Platform(_) | Object::Device(_)))
            .count()
    }
}

fn validate_mem_flags(flags: MemFlags, host_ptr: *mut c_void) -> Result<(), Status> {
    let conflicting_access = (flags & MemFlags::DEVICE_ACCESS).bits().count_ones() > 1
        || (flags & MemFlags::HOST_ACCESS).bits().count_ones() > 1;
    let conflicting_host = flags.contains(MemFlags::USE_HOST_PTR)
        && flags.intersects(MemFlags::ALLOC_HOST_PTR | MemFlags::COPY_HOST_PTR);
    if MemFlags::from_bits(flags.bits()).is_none() || conflicting_access || conflicting_host {
        return Err(Status::INVALID_VALUE);
    }
    if flags.needs_host_ptr() == host_ptr.is_null() {
        return Err(Status::INVALID_HOST_PTR);
    }
    Ok(())
}

/// Resolves zero pitches and checks explicit ones.
fn resolve_image_layout(
    desc: &ImageDesc,
    element_size: usize,
    has_host_ptr: bool,
) -> Result<ImageDesc, Status> {
    let max_dim = match desc.image_type {
        ImageType::Image2D => IMAGE2D_MAX_DIM,
        ImageType::Image3D => IMAGE3D_MAX_DIM,
    };
    let depth = match desc.image_type {
        ImageType::Image2D => 1,
        ImageType::Image3D => desc.depth,
    };
    let dims = [desc.width, desc.height, depth];
    if dims.iter().any(|&d| d == 0 || d > max_dim) {
        return Err(Status::INVALID_IMAGE_SIZE);
    }

    let packed_row = desc
        .width
        .checked_mul(element_size)
        .ok_or(Status::INVALID_IMAGE_SIZE)?;
    let row_pitch = match desc.row_pitch {
        0 => packed_row,
        _ if !has_host_ptr => return Err(Status::INVALID_IMAGE_SIZE),
        pitch if pitch < packed_row || !pitch.is_multiple_of(element_size) => {
            return Err(Status::INVALID_IMAGE_SIZE);
        }
        pitch => pitch,
    };

    let packed_slice = row_pitch
        .checked_mul(desc.height)
        .ok_or(Status::INVALID_IMAGE_SIZE)?;
    let slice_pitch = match (desc.image_type, desc.slice_pitch) {
        (ImageType::Image2D, _) | (ImageType::Image3D, 0) => packed_slice,
        (ImageType::Image3D, _) if !has_host_ptr => return Err(Status::INVALID_IMAGE_SIZE),
        (ImageType::Image3D, pitch) if pitch < packed_slice || !pitch.is_multiple_of(row_pitch) => {
            return Err(Status::INVALID_IMAGE_SIZE);
        }
        (ImageType::Image3D, pitch) => pitch,
    };

    Ok(ImageDesc {
        depth,
        row_pitch,
        slice_pitch,
        ..*desc
    })
}

// ============================================================================
// HostRuntime
// ============================================================================

/// A driverless [`ComputeRuntime`] with conformant validation.
#[derive(Debug)]
pub struct HostRuntime {
    state: Mutex<HostState>,
    image_formats: Option<FxHashSet<ImageFormat>>,
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime {
    /// A runtime with the default topology (one GPU, one CPU).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&HostConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &HostConfig) -> Self {
        let state = HostState::build(config);
        log::debug!(
            "host runtime initialised with {} platform(s), {} object(s)",
            state.platforms.len(),
            state.objects.len()
        );
        Self {
            state: Mutex::new(state),
            image_formats: config
                .supported_image_formats
                .as_ref()
                .map(|formats| formats.iter().copied().collect()),
        }
    }

    /// Number of live reference-counted objects (contexts, queues, memory
    /// objects, samplers, programs).
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.state.lock().live_objects()
    }

    /// Current reference count of an object, or `None` once destroyed.
    #[must_use]
    pub fn reference_count(&self, object: RawObject) -> Option<u32> {
        self.state.lock().refs_mut(object).ok().map(|(refs, _)| *refs)
    }

    /// Bytes captured from the host at creation (`COPY_HOST_PTR` only).
    #[must_use]
    pub fn buffer_contents(&self, mem: RawMem) -> Option<Vec<u8>> {
        match self.state.lock().objects.get(key_of(mem.0)) {
            Some(Object::Mem(MemObject {
                backing: Backing::Copied(bytes),
                ..
            })) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn supports_format(&self, format: &ImageFormat) -> bool {
        self.image_formats
            .as_ref()
            .is_none_or(|formats| formats.contains(format))
    }
}

impl ComputeRuntime for HostRuntime {
    fn platform_ids(&self, out: Option<&mut [RawPlatform]>) -> Result<usize, Status> {
        let state = self.state.lock();
        if state.platforms.is_empty() {
            return Err(Status::PLATFORM_NOT_FOUND_KHR);
        }
        let ids: SmallVec<[RawPlatform; 4]> = state
            .platforms
            .iter()
            .map(|&k| RawPlatform(raw_of(k)))
            .collect();
        answer_ids(&ids, out)
    }

    fn platform_info(
        &self,
        platform: RawPlatform,
        param: PlatformInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let state = self.state.lock();
        let p = state.platform(platform)?;
        let value = match param {
            PlatformInfo::Profile => &p.profile,
            PlatformInfo::Version => &p.version,
            PlatformInfo::Name => &p.name,
            PlatformInfo::Vendor => &p.vendor,
            PlatformInfo::Extensions => &p.extensions,
        };
        answer_info(&c_string_bytes(value), out)
    }

    fn device_ids(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
        out: Option<&mut [RawDevice]>,
    ) -> Result<usize, Status> {
        let state = self.state.lock();
        let p = state.platform(platform)?;
        let ids: SmallVec<[RawDevice; 4]> = state
            .matching_devices(p, device_type)?
            .iter()
            .map(|&k| RawDevice(raw_of(k)))
            .collect();
        answer_ids(&ids, out)
    }

    fn device_info(
        &self,
        device: RawDevice,
        param: DeviceInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let state = self.state.lock();
        let d = state.device(device)?;
        let config = &d.config;
        match param {
            DeviceInfo::Type => answer_info(bytemuck::bytes_of(&config.kind.device_type().bits()), out),
            DeviceInfo::MaxMemAllocSize => answer_info(bytemuck::bytes_of(&config.max_mem_alloc_size), out),
            DeviceInfo::GlobalMemSize => answer_info(bytemuck::bytes_of(&config.global_mem_size), out),
            DeviceInfo::ImageSupport => answer_info(bytemuck::bytes_of(&u32::from(config.image_support)), out),
            DeviceInfo::QueueProperties => {
                let mut props = QueueProperties::empty();
                props.set(QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE, config.out_of_order_queues);
                props.set(QueueProperties::PROFILING_ENABLE, config.profiling);
                answer_info(bytemuck::bytes_of(&props.bits()), out)
            }
            DeviceInfo::Name => answer_info(&c_string_bytes(&config.name), out),
            DeviceInfo::Vendor => answer_info(&c_string_bytes(&config.vendor), out),
            DeviceInfo::Platform => answer_info(bytemuck::bytes_of(&RawPlatform(raw_of(d.platform))), out),
        }
    }

    fn create_context_from_type(
        &self,
        platform: RawPlatform,
        device_type: DeviceType,
    ) -> Result<RawContext, Status> {
        let mut state = self.state.lock();
        let p = state.platform(platform)?;
        let devices = state.matching_devices(p, device_type)?;
        let raw = state.insert_context(devices);
        log::trace!("host runtime created {raw:?} from {device_type:?}");
        Ok(raw)
    }

    fn create_context(
        &self,
        platform: RawPlatform,
        devices: &[RawDevice],
    ) -> Result<RawContext, Status> {
        let mut state = self.state.lock();
        let platform_key = key_of(platform.0);
        state.platform(platform)?;
        if devices.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        let mut keys = SmallVec::with_capacity(devices.len());
        for &raw in devices {
            let device = state.device(raw)?;
            if device.platform != platform_key {
                return Err(Status::INVALID_DEVICE);
            }
            // Repeated devices are ignored, first occurrence wins.
            let key = key_of(raw.0);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        let raw = state.insert_context(keys);
        log::trace!("host runtime created {raw:?} over {} device(s)", devices.len());
        Ok(raw)
    }

    fn context_info(
        &self,
        context: RawContext,
        param: ContextInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let state = self.state.lock();
        let c = state.context(context)?;
        match param {
            ContextInfo::ReferenceCount => answer_info(bytemuck::bytes_of(&c.refs), out),
            ContextInfo::NumDevices => {
                let count = c.devices.len() as u32;
                answer_info(bytemuck::bytes_of(&count), out)
            }
            ContextInfo::Devices => {
                let ids: SmallVec<[RawDevice; 4]> =
                    c.devices.iter().map(|&k| RawDevice(raw_of(k))).collect();
                answer_info(bytemuck::cast_slice(&ids), out)
            }
        }
    }

    fn create_command_queue(
        &self,
        context: RawContext,
        device: RawDevice,
        properties: QueueProperties,
    ) -> Result<RawQueue, Status> {
        let mut state = self.state.lock();
        let context_key = key_of(context.0);
        let device_key = key_of(device.0);
        let c = state.context(context)?;
        let d = state.device(device)?;
        if !c.devices.contains(&device_key) {
            return Err(Status::INVALID_DEVICE);
        }
        if QueueProperties::from_bits(properties.bits()).is_none() {
            return Err(Status::INVALID_VALUE);
        }
        let unsupported = (properties.contains(QueueProperties::OUT_OF_ORDER_EXEC_MODE_ENABLE)
            && !d.config.out_of_order_queues)
            || (properties.contains(QueueProperties::PROFILING_ENABLE) && !d.config.profiling);
        if unsupported {
            return Err(Status::INVALID_QUEUE_PROPERTIES);
        }

        let key = state.insert_dependent(
            context_key,
            Object::Queue(QueueObject {
                refs: 1,
                context: context_key,
            }),
        );
        Ok(RawQueue(raw_of(key)))
    }

    unsafe fn create_buffer(
        &self,
        context: RawContext,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let mut state = self.state.lock();
        let context_key = key_of(context.0);
        let max_alloc = state.context(context)?.max_alloc;
        validate_mem_flags(flags, host_ptr)?;
        if size == 0 || size as u64 > max_alloc {
            return Err(Status::INVALID_BUFFER_SIZE);
        }
        state.charge(context, size as u64)?;

        let backing = if flags.contains(MemFlags::COPY_HOST_PTR) {
            // SAFETY: the caller guarantees `host_ptr` is readable for `size` bytes.
            let bytes = unsafe { std::slice::from_raw_parts(host_ptr.cast::<u8>(), size) };
            Backing::Copied(bytes.to_vec())
        } else if flags.contains(MemFlags::USE_HOST_PTR) {
            Backing::Borrowed
        } else {
            Backing::Unbacked
        };

        let key = state.insert_dependent(
            context_key,
            Object::Mem(MemObject {
                refs: 1,
                context: context_key,
                size: size as u64,
                image: None,
                backing,
            }),
        );
        log::trace!("host runtime allocated {size} byte buffer");
        Ok(RawMem(raw_of(key)))
    }

    unsafe fn create_image(
        &self,
        context: RawContext,
        flags: MemFlags,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<RawMem, Status> {
        let mut state = self.state.lock();
        let context_key = key_of(context.0);
        let image_support = state.context(context)?.image_support;
        validate_mem_flags(flags, host_ptr)?;
        let element_size = format
            .bytes_per_pixel()
            .ok_or(Status::INVALID_IMAGE_FORMAT_DESCRIPTOR)?;
        if !self.supports_format(format) {
            return Err(Status::IMAGE_FORMAT_NOT_SUPPORTED);
        }
        if !image_support {
            return Err(Status::INVALID_OPERATION);
        }
        let resolved = resolve_image_layout(desc, element_size, !host_ptr.is_null())?;
        let total = resolved
            .slice_pitch
            .checked_mul(resolved.depth)
            .ok_or(Status::INVALID_IMAGE_SIZE)?;
        state.charge(context, total as u64)?;

        let backing = if flags.contains(MemFlags::COPY_HOST_PTR) {
            // SAFETY: the caller guarantees `host_ptr` covers the resolved image extent.
            let bytes = unsafe { std::slice::from_raw_parts(host_ptr.cast::<u8>(), total) };
            Backing::Copied(bytes.to_vec())
        } else if flags.contains(MemFlags::USE_HOST_PTR) {
            Backing::Borrowed
        } else {
            Backing::Unbacked
        };

        let key = state.insert_dependent(
            context_key,
            Object::Mem(MemObject {
                refs: 1,
                context: context_key,
                size: total as u64,
                image: Some(ImageLayout {
                    element_size,
                    desc: resolved,
                }),
                backing,
            }),
        );
        log::trace!(
            "host runtime allocated {:?} {}x{}x{} ({format})",
            desc.image_type,
            resolved.width,
            resolved.height,
            resolved.depth
        );
        Ok(RawMem(raw_of(key)))
    }

    fn image_info(
        &self,
        image: RawMem,
        param: ImageInfo,
        out: Option<&mut [u8]>,
    ) -> Result<usize, Status> {
        let state = self.state.lock();
        let layout = state.image(image)?;
        let value: usize = match param {
            ImageInfo::ElementSize => layout.element_size,
            ImageInfo::RowPitch => layout.desc.row_pitch,
            ImageInfo::SlicePitch => match layout.desc.image_type {
                ImageType::Image2D => 0,
                ImageType::Image3D => layout.desc.slice_pitch,
            },
            ImageInfo::Width => layout.desc.width,
            ImageInfo::Height => layout.desc.height,
            ImageInfo::Depth => match layout.desc.image_type {
                ImageType::Image2D => 0,
                ImageType::Image3D => layout.desc.depth,
            },
        };
        answer_info(bytemuck::bytes_of(&value), out)
    }

    fn create_sampler(
        &self,
        context: RawContext,
        normalized_coords: bool,
        addressing_mode: AddressingMode,
        _filter_mode: FilterMode,
    ) -> Result<RawSampler, Status> {
        let mut state = self.state.lock();
        let context_key = key_of(context.0);
        if !state.context(context)?.image_support {
            return Err(Status::INVALID_OPERATION);
        }
        let wraps = matches!(
            addressing_mode,
            AddressingMode::Repeat | AddressingMode::MirroredRepeat
        );
        if wraps && !normalized_coords {
            return Err(Status::INVALID_VALUE);
        }
        let key = state.insert_dependent(
            context_key,
            Object::Sampler(SamplerObject {
                refs: 1,
                context: context_key,
            }),
        );
        Ok(RawSampler(raw_of(key)))
    }

    fn create_program_with_source(
        &self,
        context: RawContext,
        sources: &[&str],
    ) -> Result<RawProgram, Status> {
        let mut state = self.state.lock();
        let context_key = key_of(context.0);
        state.context(context)?;
        if sources.is_empty() || sources.iter().any(|s| s.is_empty()) {
            return Err(Status::INVALID_VALUE);
        }
        let key = state.insert_dependent(
            context_key,
            Object::Program(ProgramObject {
                refs: 1,
                context: context_key,
            }),
        );
        Ok(RawProgram(raw_of(key)))
    }

    fn retain(&self, object: RawObject) -> Result<(), Status> {
        let mut state = self.state.lock();
        let (refs, _) = state.refs_mut(object)?;
        *refs += 1;
        Ok(())
    }

    fn release(&self, object: RawObject) -> Result<(), Status> {
        self.state.lock().release(object)
    }
}
