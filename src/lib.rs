#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_arguments)]

//! Typed resource layer over a native GPU compute runtime.
//!
//! Raw, refcounted native handles become owned Rust values: a [`Platform`]
//! yields [`Device`]s, a [`Context`] binds a platform to a device set, and the
//! context is the factory for [`CommandQueue`], [`Buffer`], [`Image2D`],
//! [`Image3D`], [`Sampler`] and [`Program`]. Every fallible call returns an
//! [`OpalError`] that carries the native status code verbatim.
//!
//! The native side is abstracted by [`runtime::ComputeRuntime`];
//! [`runtime::host::HostRuntime`] is a driverless implementation, and the
//! `opencl` feature adds one over the system OpenCL library.

pub mod context;
pub mod errors;
pub mod format;
pub mod handle;
pub mod memory;
pub mod platform;
pub mod program;
pub mod queue;
pub mod runtime;

pub use context::Context;
pub use errors::{OpalError, Operation, Result};
pub use format::{ChannelOrder, ChannelType, ImageFormat};
pub use handle::Handle;
pub use memory::{AddressingMode, Buffer, FilterMode, Image2D, Image3D, MemFlags, Sampler};
pub use platform::{Device, Platform};
pub use program::Program;
pub use queue::CommandQueue;
pub use runtime::host::{HostConfig, HostRuntime};
pub use runtime::{ComputeRuntime, DeviceType, QueueProperties, Status};

#[cfg(feature = "opencl")]
pub use runtime::opencl::OpenClRuntime;
