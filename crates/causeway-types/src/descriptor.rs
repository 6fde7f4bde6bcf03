//! Descriptor structs and their guest wire layouts.
//!
//! The guest passes every descriptor by offset into its linear memory. Each
//! type here carries a `SIZE_BYTES` constant and a `decode` over exactly that
//! many bytes. Variable-length fields (strings, blob arrays) appear on the
//! wire as [`GuestSlice`]s and are resolved by the marshaling layer, never
//! here — decoding must not touch guest memory.
//!
//! The bridge does not validate descriptor *semantics* (usage combinations,
//! format/dimension compatibility, ...); that is the backend's concern.
//! Unknown enum discriminants are still wire errors: they cannot be
//! represented host-side at all.

use bitflags::bitflags;

use crate::wire::{read_u32_le, read_u64_le, GuestSlice, WireError};

bitflags! {
    /// Buffer usage mask, forwarded to the backend uninterpreted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsages: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
        const INDIRECT = 1 << 8;
        const QUERY_RESOLVE = 1 << 9;
    }
}

bitflags! {
    /// Texture usage mask, forwarded to the backend uninterpreted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsages: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PowerPreference {
    LowPower = 0,
    HighPerformance = 1,
}

impl PowerPreference {
    pub fn from_raw(raw: u32) -> Result<Self, WireError> {
        match raw {
            0 => Ok(Self::LowPower),
            1 => Ok(Self::HighPerformance),
            value => Err(WireError::InvalidEnum {
                field: "power_preference",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TextureFormat {
    R8Unorm = 0,
    R8Snorm = 1,
    R8Uint = 2,
    R8Sint = 3,
    R16Uint = 4,
    R16Sint = 5,
    R16Float = 6,
    Rg8Unorm = 7,
    Rg8Snorm = 8,
    Rg16Float = 9,
    Rgba8Unorm = 10,
    Rgba8UnormSrgb = 11,
    Rgba8Snorm = 12,
    Rgba16Float = 13,
    Rgba32Float = 14,
}

impl TextureFormat {
    pub fn from_raw(raw: u32) -> Result<Self, WireError> {
        Ok(match raw {
            0 => Self::R8Unorm,
            1 => Self::R8Snorm,
            2 => Self::R8Uint,
            3 => Self::R8Sint,
            4 => Self::R16Uint,
            5 => Self::R16Sint,
            6 => Self::R16Float,
            7 => Self::Rg8Unorm,
            8 => Self::Rg8Snorm,
            9 => Self::Rg16Float,
            10 => Self::Rgba8Unorm,
            11 => Self::Rgba8UnormSrgb,
            12 => Self::Rgba8Snorm,
            13 => Self::Rgba16Float,
            14 => Self::Rgba32Float,
            value => {
                return Err(WireError::InvalidEnum {
                    field: "texture_format",
                    value,
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TextureDimension {
    D1 = 0,
    D2 = 1,
    D3 = 2,
}

impl TextureDimension {
    pub fn from_raw(raw: u32) -> Result<Self, WireError> {
        match raw {
            0 => Ok(Self::D1),
            1 => Ok(Self::D2),
            2 => Ok(Self::D3),
            value => Err(WireError::InvalidEnum {
                field: "texture_dimension",
                value,
            }),
        }
    }
}

/// Optional device feature, reported by `adapter_enumerate_features`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FeatureName {
    DepthClipControl = 0,
    Depth32FloatStencil8 = 1,
    TextureCompressionBc = 2,
    TextureCompressionBcSliced3d = 3,
    TextureCompressionEtc2 = 4,
    TextureCompressionAstc = 5,
    TimestampQuery = 6,
    IndirectFirstInstance = 7,
    ShaderF16 = 8,
    Rg11b10UfloatRenderable = 9,
    Bgra8UnormStorage = 10,
    Float32Filterable = 11,
    ClipDistances = 12,
    DualSourceBlending = 13,
}

impl FeatureName {
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Decode a feature reported by a backend; features this host does not
    /// know are dropped, not errors.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::DepthClipControl,
            1 => Self::Depth32FloatStencil8,
            2 => Self::TextureCompressionBc,
            3 => Self::TextureCompressionBcSliced3d,
            4 => Self::TextureCompressionEtc2,
            5 => Self::TextureCompressionAstc,
            6 => Self::TimestampQuery,
            7 => Self::IndirectFirstInstance,
            8 => Self::ShaderF16,
            9 => Self::Rg11b10UfloatRenderable,
            10 => Self::Bgra8UnormStorage,
            11 => Self::Float32Filterable,
            12 => Self::ClipDistances,
            13 => Self::DualSourceBlending,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

/// Adapter selection options (`instance_request_adapter`).
///
/// Wire layout: `power_preference: u32`, `force_fallback_adapter: u32` (0/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAdapterOptions {
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
}

impl RequestAdapterOptions {
    pub const SIZE_BYTES: usize = 8;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(WireError::TooShort {
                want: Self::SIZE_BYTES,
                got: bytes.len(),
            });
        }
        Ok(Self {
            power_preference: PowerPreference::from_raw(read_u32_le(bytes, 0)?)?,
            force_fallback_adapter: read_u32_le(bytes, 4)? != 0,
        })
    }
}

/// Buffer creation descriptor (`device_create_buffer`).
///
/// Wire layout: `size: u64`, `usage: u32`, `mapped_at_creation: u32` (0/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub size: u64,
    pub usage: BufferUsages,
    pub mapped_at_creation: bool,
}

impl BufferDescriptor {
    pub const SIZE_BYTES: usize = 16;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(WireError::TooShort {
                want: Self::SIZE_BYTES,
                got: bytes.len(),
            });
        }
        Ok(Self {
            size: read_u64_le(bytes, 0)?,
            // Usage bits are opaque to the bridge; unknown bits are kept, not
            // rejected.
            usage: BufferUsages::from_bits_retain(read_u32_le(bytes, 8)?),
            mapped_at_creation: read_u32_le(bytes, 12)? != 0,
        })
    }
}

/// Texture creation descriptor (`device_create_texture`).
///
/// Wire layout: `format: u32`, `size: 3 x u32`, `mip_level_count: u32`,
/// `sample_count: u32`, `dimension: u32`, `usage: u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub format: TextureFormat,
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub usage: TextureUsages,
}

impl TextureDescriptor {
    pub const SIZE_BYTES: usize = 32;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(WireError::TooShort {
                want: Self::SIZE_BYTES,
                got: bytes.len(),
            });
        }
        Ok(Self {
            format: TextureFormat::from_raw(read_u32_le(bytes, 0)?)?,
            size: Extent3d {
                width: read_u32_le(bytes, 4)?,
                height: read_u32_le(bytes, 8)?,
                depth_or_array_layers: read_u32_le(bytes, 12)?,
            },
            mip_level_count: read_u32_le(bytes, 16)?,
            sample_count: read_u32_le(bytes, 20)?,
            dimension: TextureDimension::from_raw(read_u32_le(bytes, 24)?)?,
            usage: TextureUsages::from_bits_retain(read_u32_le(bytes, 28)?),
        })
    }
}

/// Wire form of the shader module descriptor (`device_create_shader_module`).
///
/// The string and blob fields are guest locations; the marshaling layer turns
/// this into a [`ShaderModuleDescriptor`] by copying them out of guest
/// memory.
///
/// Wire layout: `label: GuestSlice`, `code: GuestSlice`,
/// `defines_offset: u64`, `defines_count: u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderModuleDescriptorWire {
    pub label: GuestSlice,
    pub code: GuestSlice,
    /// Offset of a `defines_count`-element [`GuestSlice`] array, or 0.
    pub defines_offset: u64,
    pub defines_count: u32,
}

impl ShaderModuleDescriptorWire {
    pub const SIZE_BYTES: usize = 36;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(WireError::TooShort {
                want: Self::SIZE_BYTES,
                got: bytes.len(),
            });
        }
        Ok(Self {
            label: GuestSlice::decode(&bytes[0..12])?,
            code: GuestSlice::decode(&bytes[12..24])?,
            defines_offset: read_u64_le(bytes, 24)?,
            defines_count: read_u32_le(bytes, 32)?,
        })
    }
}

/// Host-owned shader module descriptor handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModuleDescriptor {
    pub label: Option<String>,
    pub code: String,
    /// Preprocessor define blobs, in guest order. `None` marks an element
    /// whose copy out of guest memory failed; backends must skip those.
    pub defines: Vec<Option<Vec<u8>>>,
}

/// Render bundle encoder descriptor (`device_create_render_bundle_encoder`).
///
/// Wire layout: `format: u32`, `sample_count: u32`, `usage: u32`,
/// `view_dimension: u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBundleEncoderDescriptor {
    pub format: TextureFormat,
    pub sample_count: u32,
    pub usage: TextureUsages,
    /// Forwarded raw; the bridge does not interpret view dimensions.
    pub view_dimension: u32,
}

impl RenderBundleEncoderDescriptor {
    pub const SIZE_BYTES: usize = 16;

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < Self::SIZE_BYTES {
            return Err(WireError::TooShort {
                want: Self::SIZE_BYTES,
                got: bytes.len(),
            });
        }
        Ok(Self {
            format: TextureFormat::from_raw(read_u32_le(bytes, 0)?)?,
            sample_count: read_u32_le(bytes, 4)?,
            usage: TextureUsages::from_bits_retain(read_u32_le(bytes, 8)?),
            view_dimension: read_u32_le(bytes, 12)?,
        })
    }
}
