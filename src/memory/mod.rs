//! GPU-addressable resources allocated from a [`Context`](crate::Context).
//!
//! - [`Buffer`]: linear memory region
//! - [`Image2D`] / [`Image3D`]: formatted, pitched memory regions
//! - [`Sampler`]: immutable image-sampling state
//!
//! These are inert records: they hold one owned native handle plus what was
//! fixed at creation, and are consumed by later stages through their handle.

mod buffer;
mod image;
mod sampler;

pub use buffer::Buffer;
pub use image::{Image2D, Image3D};
pub use sampler::Sampler;

pub use crate::runtime::{AddressingMode, FilterMode, MemFlags};
