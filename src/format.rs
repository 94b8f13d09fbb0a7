//! Pixel format descriptors for image allocations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Channel layout of an image element.
#[allow(clippy::upper_case_acronyms)]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelOrder {
    R = 0x10B0,
    A = 0x10B1,
    RG = 0x10B2,
    RA = 0x10B3,
    RGB = 0x10B4,
    RGBA = 0x10B5,
    BGRA = 0x10B6,
    ARGB = 0x10B7,
    Intensity = 0x10B8,
    Luminance = 0x10B9,
}

impl ChannelOrder {
    #[must_use]
    pub fn channel_count(self) -> usize {
        match self {
            Self::R | Self::A | Self::Intensity | Self::Luminance => 1,
            Self::RG | Self::RA => 2,
            Self::RGB => 3,
            Self::RGBA | Self::BGRA | Self::ARGB => 4,
        }
    }
}

/// Storage type of each channel.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    SnormInt8 = 0x10D0,
    SnormInt16 = 0x10D1,
    UnormInt8 = 0x10D2,
    UnormInt16 = 0x10D3,
    UnormShort565 = 0x10D4,
    UnormShort555 = 0x10D5,
    UnormInt101010 = 0x10D6,
    SignedInt8 = 0x10D7,
    SignedInt16 = 0x10D8,
    SignedInt32 = 0x10D9,
    UnsignedInt8 = 0x10DA,
    UnsignedInt16 = 0x10DB,
    UnsignedInt32 = 0x10DC,
    HalfFloat = 0x10DD,
    Float = 0x10DE,
}

impl ChannelType {
    /// Size of one channel, or of the whole element for packed types.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::SnormInt8 | Self::UnormInt8 | Self::SignedInt8 | Self::UnsignedInt8 => 1,
            Self::SnormInt16
            | Self::UnormInt16
            | Self::SignedInt16
            | Self::UnsignedInt16
            | Self::HalfFloat
            | Self::UnormShort565
            | Self::UnormShort555 => 2,
            Self::SignedInt32 | Self::UnsignedInt32 | Self::Float | Self::UnormInt101010 => 4,
        }
    }

    #[must_use]
    pub fn is_packed(self) -> bool {
        matches!(
            self,
            Self::UnormShort565 | Self::UnormShort555 | Self::UnormInt101010
        )
    }

    #[must_use]
    pub fn is_8bit(self) -> bool {
        self.size() == 1
    }
}

/// An image element format: channel order plus channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageFormat {
    pub order: ChannelOrder,
    pub channel_type: ChannelType,
}

impl ImageFormat {
    /// Single-channel 8-bit normalized.
    pub const R8: Self = Self::new(ChannelOrder::R, ChannelType::UnormInt8);
    /// Single-channel 32-bit float.
    pub const R32F: Self = Self::new(ChannelOrder::R, ChannelType::Float);
    /// Four-channel 8-bit normalized.
    pub const RGBA8: Self = Self::new(ChannelOrder::RGBA, ChannelType::UnormInt8);
    /// Four-channel 8-bit normalized, BGRA order.
    pub const BGRA8: Self = Self::new(ChannelOrder::BGRA, ChannelType::UnormInt8);
    /// Four-channel 32-bit float.
    pub const RGBA32F: Self = Self::new(ChannelOrder::RGBA, ChannelType::Float);

    #[must_use]
    pub const fn new(order: ChannelOrder, channel_type: ChannelType) -> Self {
        Self {
            order,
            channel_type,
        }
    }

    /// Bytes per element, or `None` for combinations no runtime accepts.
    ///
    /// Packed channel types are only valid with `RGB`, `RGB` only with packed
    /// types, and `BGRA`/`ARGB` only with 8-bit channels. `Intensity` and
    /// `Luminance` exclude integer channel types.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        let ty = self.channel_type;
        let valid = match self.order {
            ChannelOrder::RGB => ty.is_packed(),
            ChannelOrder::BGRA | ChannelOrder::ARGB => ty.is_8bit(),
            ChannelOrder::Intensity | ChannelOrder::Luminance => matches!(
                ty,
                ChannelType::UnormInt8
                    | ChannelType::UnormInt16
                    | ChannelType::SnormInt8
                    | ChannelType::SnormInt16
                    | ChannelType::HalfFloat
                    | ChannelType::Float
            ),
            _ => !ty.is_packed(),
        };
        if !valid {
            return None;
        }
        if ty.is_packed() {
            Some(ty.size())
        } else {
            Some(ty.size() * self.order.channel_count())
        }
    }

    /// The `(order, type)` pair in its native encoding.
    #[must_use]
    pub fn to_raw(&self) -> [u32; 2] {
        [self.order as u32, self.channel_type as u32]
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.order, self.channel_type)
    }
}
