//! Error Types
//!
//! This module defines the error type returned by every fallible operation
//! of the resource layer.
//!
//! # Overview
//!
//! Each factory or query operation maps to exactly one [`OpalError`] variant.
//! Every variant carries the [`Operation`] that failed and the native
//! [`Status`] code verbatim. Nothing is retried or substituted: a non-success
//! status from the runtime always surfaces to the caller unchanged.
//!
//! # Usage
//!
//! ```rust,ignore
//! use opal::errors::{OpalError, Result};
//!
//! fn make_scratch(ctx: &opal::Context) -> Result<opal::Buffer> {
//!     ctx.create_buffer(opal::MemFlags::READ_WRITE, 4096, None)
//! }
//! ```

use std::fmt;

use thiserror::Error;

use crate::runtime::Status;

/// The native call an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPlatforms,
    PlatformInfo,
    ListDevices,
    DeviceInfo,
    CreateContextFromType,
    CreateContext,
    ContextInfo,
    CreateCommandQueue,
    CreateBuffer,
    CreateImage2D,
    CreateImage3D,
    ImageInfo,
    CreateSampler,
    CreateProgram,
}

impl Operation {
    /// The name of the native entry point behind this operation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ListPlatforms => "clGetPlatformIDs",
            Self::PlatformInfo => "clGetPlatformInfo",
            Self::ListDevices => "clGetDeviceIDs",
            Self::DeviceInfo => "clGetDeviceInfo",
            Self::CreateContextFromType => "clCreateContextFromType",
            Self::CreateContext => "clCreateContext",
            Self::ContextInfo => "clGetContextInfo",
            Self::CreateCommandQueue => "clCreateCommandQueue",
            Self::CreateBuffer => "clCreateBuffer",
            Self::CreateImage2D => "clCreateImage2D",
            Self::CreateImage3D => "clCreateImage3D",
            Self::ImageInfo => "clGetImageInfo",
            Self::CreateSampler => "clCreateSampler",
            Self::CreateProgram => "clCreateProgramWithSource",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The main error type of the resource layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpalError {
    // ========================================================================
    // Discovery
    // ========================================================================
    /// Enumerating platforms or querying platform info failed.
    #[error("Platform query failed in {operation}: {status}")]
    PlatformQuery { operation: Operation, status: Status },

    /// Enumerating devices or querying device info failed.
    #[error("Device info query failed in {operation}: {status}")]
    DeviceInfoQuery { operation: Operation, status: Status },

    // ========================================================================
    // Context
    // ========================================================================
    /// The runtime refused to create a context.
    #[error("Context creation failed in {operation}: {status}")]
    ContextCreation { operation: Operation, status: Status },

    /// A context info query (e.g. the bound device list) failed.
    #[error("Context info query failed in {operation}: {status}")]
    ContextInfoQuery { operation: Operation, status: Status },

    // ========================================================================
    // Resource factories
    // ========================================================================
    /// Command queue creation failed.
    #[error("Command queue creation failed in {operation}: {status}")]
    QueueCreation { operation: Operation, status: Status },

    /// Buffer allocation failed.
    #[error("Buffer creation failed in {operation}: {status}")]
    BufferCreation { operation: Operation, status: Status },

    /// Image allocation or image info query failed.
    #[error("Image creation failed in {operation}: {status}")]
    ImageCreation { operation: Operation, status: Status },

    /// Sampler creation failed.
    #[error("Sampler creation failed in {operation}: {status}")]
    SamplerCreation { operation: Operation, status: Status },

    /// Program object creation failed.
    #[error("Program creation failed in {operation}: {status}")]
    ProgramCreation { operation: Operation, status: Status },
}

impl OpalError {
    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::PlatformQuery { operation, .. }
            | Self::DeviceInfoQuery { operation, .. }
            | Self::ContextCreation { operation, .. }
            | Self::ContextInfoQuery { operation, .. }
            | Self::QueueCreation { operation, .. }
            | Self::BufferCreation { operation, .. }
            | Self::ImageCreation { operation, .. }
            | Self::SamplerCreation { operation, .. }
            | Self::ProgramCreation { operation, .. } => *operation,
        }
    }

    /// The native status code, exactly as the runtime reported it.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::PlatformQuery { status, .. }
            | Self::DeviceInfoQuery { status, .. }
            | Self::ContextCreation { status, .. }
            | Self::ContextInfoQuery { status, .. }
            | Self::QueueCreation { status, .. }
            | Self::BufferCreation { status, .. }
            | Self::ImageCreation { status, .. }
            | Self::SamplerCreation { status, .. }
            | Self::ProgramCreation { status, .. } => *status,
        }
    }
}

/// Alias for `Result<T, OpalError>`.
pub type Result<T> = std::result::Result<T, OpalError>;
