//! Guest-visible WebGPU bridge schema.
//!
//! This crate is the frozen contract between sandboxed guest programs and the
//! host bridge: status codes, opaque object handles, and the wire layout of
//! every descriptor the guest passes by offset. Backends come and go at
//! runtime; nothing in here may change shape when they do.
//!
//! All guest-side layouts are little-endian and decoded field-by-field with
//! explicit size constants — the guest ABI is byte-oriented, not a Rust
//! in-memory layout.

mod descriptor;
mod handle;
mod status;
mod wire;

pub use descriptor::{
    BufferDescriptor, BufferUsages, Extent3d, FeatureName, PowerPreference,
    RenderBundleEncoderDescriptor, RequestAdapterOptions, ShaderModuleDescriptor,
    ShaderModuleDescriptorWire, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};
pub use handle::{
    AdapterHandle, BufferHandle, CommandEncoderHandle, DeviceHandle, GpuHandle,
    RenderBundleEncoderHandle, ShaderModuleHandle, TextureHandle,
};
pub use status::WebGpuStatus;
pub use wire::{read_u32_le, read_u64_le, GuestSlice, WireError};
