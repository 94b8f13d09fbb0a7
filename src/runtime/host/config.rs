//! Topology configuration for the host runtime.
//!
//! ```rust,ignore
//! use opal::runtime::host::{DeviceConfig, HostConfig, PlatformConfig};
//!
//! let config = HostConfig::empty().with_platform(
//!     PlatformConfig::new("Lab Platform")
//!         .with_device(DeviceConfig::gpu("Lab GPU").with_global_mem_size(1 << 30))
//!         .with_device(DeviceConfig::cpu("Lab CPU")),
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::format::ImageFormat;
use crate::runtime::DeviceType;

const GIB: u64 = 1 << 30;

/// Kind of a simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostDeviceKind {
    Cpu,
    Gpu,
    Accelerator,
    Custom,
}

impl HostDeviceKind {
    #[must_use]
    pub fn device_type(self) -> DeviceType {
        match self {
            Self::Cpu => DeviceType::CPU,
            Self::Gpu => DeviceType::GPU,
            Self::Accelerator => DeviceType::ACCELERATOR,
            Self::Custom => DeviceType::CUSTOM,
        }
    }
}

/// One simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub vendor: String,
    pub kind: HostDeviceKind,
    /// Total memory; allocations in a context share the smallest device pool.
    pub global_mem_size: u64,
    /// Largest single allocation.
    pub max_mem_alloc_size: u64,
    pub image_support: bool,
    pub out_of_order_queues: bool,
    pub profiling: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::gpu("Opal Host GPU")
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn gpu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: "Opal".to_string(),
            kind: HostDeviceKind::Gpu,
            global_mem_size: 4 * GIB,
            max_mem_alloc_size: GIB,
            image_support: true,
            out_of_order_queues: true,
            profiling: true,
        }
    }

    #[must_use]
    pub fn cpu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: "Opal".to_string(),
            kind: HostDeviceKind::Cpu,
            global_mem_size: 8 * GIB,
            max_mem_alloc_size: 2 * GIB,
            image_support: true,
            out_of_order_queues: false,
            profiling: true,
        }
    }

    #[must_use]
    pub fn accelerator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: "Opal".to_string(),
            kind: HostDeviceKind::Accelerator,
            global_mem_size: 2 * GIB,
            max_mem_alloc_size: GIB / 2,
            image_support: false,
            out_of_order_queues: false,
            profiling: false,
        }
    }

    #[must_use]
    pub fn with_global_mem_size(mut self, bytes: u64) -> Self {
        self.global_mem_size = bytes;
        self
    }

    #[must_use]
    pub fn with_max_mem_alloc_size(mut self, bytes: u64) -> Self {
        self.max_mem_alloc_size = bytes;
        self
    }

    #[must_use]
    pub fn without_image_support(mut self) -> Self {
        self.image_support = false;
        self
    }

    #[must_use]
    pub fn without_out_of_order_queues(mut self) -> Self {
        self.out_of_order_queues = false;
        self
    }
}

/// One simulated platform and its devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub profile: String,
    pub extensions: Vec<String>,
    pub devices: Vec<DeviceConfig>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::new("Opal Host Platform")
    }
}

impl PlatformConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: "Opal".to_string(),
            version: "OpenCL 1.2 opal-host".to_string(),
            profile: "FULL_PROFILE".to_string(),
            extensions: Vec::new(),
            devices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }
}

/// Full topology of a [`HostRuntime`](super::HostRuntime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub platforms: Vec<PlatformConfig>,
    /// Restricts image allocations to these formats. `None` accepts every
    /// valid format.
    pub supported_image_formats: Option<Vec<ImageFormat>>,
}

impl Default for HostConfig {
    /// One platform with a GPU followed by a CPU.
    fn default() -> Self {
        Self {
            platforms: vec![
                PlatformConfig::default()
                    .with_device(DeviceConfig::gpu("Opal Host GPU"))
                    .with_device(DeviceConfig::cpu("Opal Host CPU")),
            ],
            supported_image_formats: None,
        }
    }
}

impl HostConfig {
    /// A topology with no platforms.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
            supported_image_formats: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: PlatformConfig) -> Self {
        self.platforms.push(platform);
        self
    }

    #[must_use]
    pub fn with_supported_image_formats(mut self, formats: Vec<ImageFormat>) -> Self {
        self.supported_image_formats = Some(formats);
        self
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
