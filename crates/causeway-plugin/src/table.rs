//! The backend module ABI: export names, `#[repr(C)]` argument mirrors, and
//! the resolved function table.
//!
//! A module implements one backend kind by exporting every symbol in
//! [`REQUIRED_SYMBOLS`] with these exact signatures. Status codes cross the
//! boundary as raw `u32`s matching `causeway_types::WebGpuStatus`; sessions
//! and object handles cross as raw `u64`s.

/// Backend module export names. Fixed contract; absence of any of these is a
/// load-time failure.
pub const SYMBOL_INIT: &str = "wasi_webgpu_backend_init";
pub const SYMBOL_DEINIT: &str = "wasi_webgpu_backend_deinit";
pub const SYMBOL_GET_GPU: &str = "wasi_webgpu_backend_get_gpu";
pub const SYMBOL_REQUEST_ADAPTER: &str = "wasi_webgpu_backend_request_adapter";
pub const SYMBOL_REQUEST_DEVICE: &str = "wasi_webgpu_backend_request_device";
pub const SYMBOL_ENUMERATE_FEATURES: &str = "wasi_webgpu_backend_enumerate_features";
pub const SYMBOL_CREATE_BUFFER: &str = "wasi_webgpu_backend_create_buffer";
pub const SYMBOL_CREATE_TEXTURE: &str = "wasi_webgpu_backend_create_texture";
pub const SYMBOL_CREATE_SHADER_MODULE: &str = "wasi_webgpu_backend_create_shader_module";
pub const SYMBOL_CREATE_COMMAND_ENCODER: &str = "wasi_webgpu_backend_create_command_encoder";
pub const SYMBOL_CREATE_RENDER_BUNDLE_ENCODER: &str =
    "wasi_webgpu_backend_create_render_bundle_encoder";

pub const REQUIRED_SYMBOLS: [&str; 11] = [
    SYMBOL_INIT,
    SYMBOL_DEINIT,
    SYMBOL_GET_GPU,
    SYMBOL_REQUEST_ADAPTER,
    SYMBOL_REQUEST_DEVICE,
    SYMBOL_ENUMERATE_FEATURES,
    SYMBOL_CREATE_BUFFER,
    SYMBOL_CREATE_TEXTURE,
    SYMBOL_CREATE_SHADER_MODULE,
    SYMBOL_CREATE_COMMAND_ENCODER,
    SYMBOL_CREATE_RENDER_BUNDLE_ENCODER,
];

/// `{ptr, len}` view of host bytes. Null `ptr` marks an absent value; the
/// pointer is only valid for the duration of the call it is passed to.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawByteSlice {
    pub ptr: *const u8,
    pub len: u32,
}

impl RawByteSlice {
    pub const NULL: Self = Self {
        ptr: std::ptr::null(),
        len: 0,
    };

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: bytes.len() as u32,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawRequestAdapterOptions {
    pub power_preference: u32,
    pub force_fallback_adapter: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawBufferDescriptor {
    pub size: u64,
    pub usage: u32,
    pub mapped_at_creation: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawTextureDescriptor {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: u32,
    pub usage: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawShaderModuleDescriptor {
    pub label: RawByteSlice,
    pub code: RawByteSlice,
    /// Array of define blobs; null-`ptr` entries are defines whose marshal
    /// failed and must be skipped.
    pub defines: *const RawByteSlice,
    pub defines_len: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawRenderBundleEncoderDescriptor {
    pub format: u32,
    pub sample_count: u32,
    pub usage: u32,
    pub view_dimension: u32,
}

pub type BackendInitFn = unsafe extern "C" fn(out_session: *mut u64) -> u32;
pub type BackendDeinitFn = unsafe extern "C" fn(session: u64) -> u32;
pub type GetGpuFn = unsafe extern "C" fn(session: u64, out_gpu: *mut u64) -> u32;
pub type RequestAdapterFn = unsafe extern "C" fn(
    session: u64,
    gpu: u64,
    options: *const RawRequestAdapterOptions,
    out_adapter: *mut u64,
) -> u32;
pub type RequestDeviceFn =
    unsafe extern "C" fn(session: u64, adapter: u64, out_device: *mut u64) -> u32;
/// `count` is in/out: capacity of `features` on entry, total feature count on
/// return. The callee writes at most the entry capacity.
pub type EnumerateFeaturesFn =
    unsafe extern "C" fn(session: u64, adapter: u64, features: *mut u32, count: *mut u32) -> u32;
pub type CreateBufferFn = unsafe extern "C" fn(
    session: u64,
    device: u64,
    desc: *const RawBufferDescriptor,
    out_buffer: *mut u64,
) -> u32;
pub type CreateTextureFn = unsafe extern "C" fn(
    session: u64,
    device: u64,
    desc: *const RawTextureDescriptor,
    out_texture: *mut u64,
) -> u32;
pub type CreateShaderModuleFn = unsafe extern "C" fn(
    session: u64,
    device: u64,
    desc: *const RawShaderModuleDescriptor,
    out_shader: *mut u64,
) -> u32;
pub type CreateCommandEncoderFn = unsafe extern "C" fn(
    session: u64,
    device: u64,
    label: *const u8,
    label_len: u32,
    out_encoder: *mut u64,
) -> u32;
pub type CreateRenderBundleEncoderFn = unsafe extern "C" fn(
    session: u64,
    device: u64,
    desc: *const RawRenderBundleEncoderDescriptor,
    out_encoder: *mut u64,
) -> u32;

/// Fully-resolved entry points of one loaded backend module.
///
/// Only constructed by the loader, and only with every slot resolved — a
/// partially-valid table is unrepresentable. Immutable after load; safe to
/// read concurrently.
#[derive(Debug, Clone, Copy)]
pub struct BackendTable {
    pub(crate) init: BackendInitFn,
    pub(crate) deinit: BackendDeinitFn,
    pub(crate) get_gpu: GetGpuFn,
    pub(crate) request_adapter: RequestAdapterFn,
    pub(crate) request_device: RequestDeviceFn,
    pub(crate) enumerate_features: EnumerateFeaturesFn,
    pub(crate) create_buffer: CreateBufferFn,
    pub(crate) create_texture: CreateTextureFn,
    pub(crate) create_shader_module: CreateShaderModuleFn,
    pub(crate) create_command_encoder: CreateCommandEncoderFn,
    pub(crate) create_render_bundle_encoder: CreateRenderBundleEncoderFn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_symbols_are_unique() {
        let mut names: Vec<&str> = REQUIRED_SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REQUIRED_SYMBOLS.len());
    }

    #[test]
    fn required_symbols_share_the_contract_prefix() {
        for symbol in REQUIRED_SYMBOLS {
            assert!(symbol.starts_with("wasi_webgpu_backend_"), "{symbol}");
        }
    }
}
