use crate::handle::Handle;
use crate::runtime::{AddressingMode, FilterMode, RawSampler};

/// Immutable image-sampling configuration.
#[derive(Debug, Clone)]
pub struct Sampler {
    handle: Handle<RawSampler>,
    normalized_coords: bool,
    addressing_mode: AddressingMode,
    filter_mode: FilterMode,
}

impl Sampler {
    pub(crate) fn new(
        handle: Handle<RawSampler>,
        normalized_coords: bool,
        addressing_mode: AddressingMode,
        filter_mode: FilterMode,
    ) -> Self {
        Self {
            handle,
            normalized_coords,
            addressing_mode,
            filter_mode,
        }
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> RawSampler {
        self.handle.raw()
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> &Handle<RawSampler> {
        &self.handle
    }

    #[must_use]
    pub fn normalized_coords(&self) -> bool {
        self.normalized_coords
    }

    #[must_use]
    pub fn addressing_mode(&self) -> AddressingMode {
        self.addressing_mode
    }

    #[must_use]
    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }
}
