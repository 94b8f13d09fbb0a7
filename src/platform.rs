//! Platform and device discovery.
//!
//! Platforms and devices are root objects of the runtime: they are
//! discovered, never created, and carry no reference count. Both are plain
//! values around their native id, compared by that id.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::errors::{OpalError, Operation, Result};
use crate::runtime::{
    ComputeRuntime, DeviceInfo, DeviceType, PlatformInfo, QueueProperties, RawDevice, RawPlatform,
    Status, query_ids, query_scalar, query_string,
};

fn platform_error(operation: Operation) -> impl FnOnce(Status) -> OpalError {
    move |status| OpalError::PlatformQuery { operation, status }
}

fn device_error(operation: Operation) -> impl FnOnce(Status) -> OpalError {
    move |status| OpalError::DeviceInfoQuery { operation, status }
}

// ============================================================================
// Platform
// ============================================================================

/// One native compute provider.
#[derive(Clone)]
pub struct Platform {
    raw: RawPlatform,
    runtime: Arc<dyn ComputeRuntime>,
}

impl Platform {
    /// Lists every platform the runtime exposes.
    pub fn all(runtime: Arc<dyn ComputeRuntime>) -> Result<Vec<Self>> {
        let ids = query_ids(|out| runtime.platform_ids(out))
            .map_err(platform_error(Operation::ListPlatforms))?;
        log::trace!("Discovered {} platform(s)", ids.len());
        Ok(ids
            .into_iter()
            .map(|raw| Self::from_raw(Arc::clone(&runtime), raw))
            .collect())
    }

    /// The first platform the runtime exposes.
    pub fn first(runtime: Arc<dyn ComputeRuntime>) -> Result<Self> {
        Self::all(runtime)?
            .into_iter()
            .next()
            .ok_or(OpalError::PlatformQuery {
                operation: Operation::ListPlatforms,
                status: Status::PLATFORM_NOT_FOUND_KHR,
            })
    }

    #[must_use]
    pub fn from_raw(runtime: Arc<dyn ComputeRuntime>, raw: RawPlatform) -> Self {
        Self { raw, runtime }
    }

    /// The native provider handle.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawPlatform {
        self.raw
    }

    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ComputeRuntime> {
        &self.runtime
    }

    /// Devices of the given type on this platform. An empty list means no
    /// device matched.
    pub fn devices(&self, device_type: DeviceType) -> Result<Vec<Device>> {
        let ids = match query_ids(|out| self.runtime.device_ids(self.raw, device_type, out)) {
            Ok(ids) => ids,
            Err(Status::DEVICE_NOT_FOUND) => Vec::new(),
            Err(status) => return Err(device_error(Operation::ListDevices)(status)),
        };
        Ok(ids
            .into_iter()
            .map(|raw| Device::from_raw(Arc::clone(&self.runtime), raw))
            .collect())
    }

    fn info(&self, param: PlatformInfo) -> Result<String> {
        query_string(|out| self.runtime.platform_info(self.raw, param, out))
            .map_err(platform_error(Operation::PlatformInfo))
    }

    pub fn name(&self) -> Result<String> {
        self.info(PlatformInfo::Name)
    }

    pub fn vendor(&self) -> Result<String> {
        self.info(PlatformInfo::Vendor)
    }

    pub fn version(&self) -> Result<String> {
        self.info(PlatformInfo::Version)
    }

    pub fn profile(&self) -> Result<String> {
        self.info(PlatformInfo::Profile)
    }

    /// Space-separated extension names.
    pub fn extensions(&self) -> Result<String> {
        self.info(PlatformInfo::Extensions)
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Platform").field(&self.raw).finish()
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Platform {}

impl Hash for Platform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

// ============================================================================
// Device
// ============================================================================

/// One compute unit within a platform.
#[derive(Clone)]
pub struct Device {
    raw: RawDevice,
    runtime: Arc<dyn ComputeRuntime>,
}

impl Device {
    #[must_use]
    pub fn from_raw(runtime: Arc<dyn ComputeRuntime>, raw: RawDevice) -> Self {
        Self { raw, runtime }
    }

    /// The native device handle.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawDevice {
        self.raw
    }

    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ComputeRuntime> {
        &self.runtime
    }

    fn string_info(&self, param: DeviceInfo) -> Result<String> {
        query_string(|out| self.runtime.device_info(self.raw, param, out))
            .map_err(device_error(Operation::DeviceInfo))
    }

    fn scalar_info<T: bytemuck::Pod>(&self, param: DeviceInfo) -> Result<T> {
        query_scalar(|out| self.runtime.device_info(self.raw, param, out))
            .map_err(device_error(Operation::DeviceInfo))
    }

    pub fn name(&self) -> Result<String> {
        self.string_info(DeviceInfo::Name)
    }

    pub fn vendor(&self) -> Result<String> {
        self.string_info(DeviceInfo::Vendor)
    }

    pub fn device_type(&self) -> Result<DeviceType> {
        self.scalar_info::<u64>(DeviceInfo::Type)
            .map(DeviceType::from_bits_retain)
    }

    pub fn global_mem_size(&self) -> Result<u64> {
        self.scalar_info(DeviceInfo::GlobalMemSize)
    }

    pub fn max_mem_alloc_size(&self) -> Result<u64> {
        self.scalar_info(DeviceInfo::MaxMemAllocSize)
    }

    pub fn image_support(&self) -> Result<bool> {
        self.scalar_info::<u32>(DeviceInfo::ImageSupport)
            .map(|flag| flag != 0)
    }

    /// Queue properties the device can honour.
    pub fn queue_properties(&self) -> Result<QueueProperties> {
        self.scalar_info::<u64>(DeviceInfo::QueueProperties)
            .map(QueueProperties::from_bits_retain)
    }

    /// The platform this device belongs to.
    pub fn platform(&self) -> Result<Platform> {
        let raw: RawPlatform = self.scalar_info(DeviceInfo::Platform)?;
        Ok(Platform::from_raw(Arc::clone(&self.runtime), raw))
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Device").field(&self.raw).finish()
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
