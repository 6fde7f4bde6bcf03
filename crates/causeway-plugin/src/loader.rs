//! Shared-module loading and symbol resolution.
//!
//! Loading walks `Unloaded -> Loading -> Loaded`: [`LoadedBackend::load`]
//! is the transient `Loading` step, a live [`LoadedBackend`] value is
//! `Loaded`, and dropping it unloads the module. Because the table is only
//! built once every symbol resolves, there is no observable partially-loaded
//! state. The owning registry must keep a `LoadedBackend` alive until every
//! context bound to it has been destroyed (holding it in an `Arc` does this).

use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;
use tracing::debug;

use causeway_types::{
    AdapterHandle, BufferDescriptor, BufferHandle, CommandEncoderHandle, DeviceHandle, FeatureName,
    GpuHandle, RenderBundleEncoderDescriptor, RenderBundleEncoderHandle, RequestAdapterOptions,
    ShaderModuleDescriptor, ShaderModuleHandle, TextureDescriptor, TextureHandle, WebGpuStatus,
};

use crate::backend::{BackendSession, WebGpuBackend};
use crate::kind::BackendKind;
use crate::table::{
    BackendDeinitFn, BackendInitFn, BackendTable, CreateBufferFn, CreateCommandEncoderFn,
    CreateRenderBundleEncoderFn, CreateShaderModuleFn, CreateTextureFn, EnumerateFeaturesFn,
    GetGpuFn, RawBufferDescriptor, RawByteSlice, RawRenderBundleEncoderDescriptor,
    RawRequestAdapterOptions, RawShaderModuleDescriptor, RawTextureDescriptor, RequestAdapterFn,
    RequestDeviceFn, SYMBOL_CREATE_BUFFER, SYMBOL_CREATE_COMMAND_ENCODER, SYMBOL_CREATE_RENDER_BUNDLE_ENCODER,
    SYMBOL_CREATE_SHADER_MODULE, SYMBOL_CREATE_TEXTURE, SYMBOL_DEINIT, SYMBOL_ENUMERATE_FEATURES,
    SYMBOL_GET_GPU, SYMBOL_INIT, SYMBOL_REQUEST_ADAPTER, SYMBOL_REQUEST_DEVICE,
};

/// Largest feature list a backend can report in one call; matches the size
/// of the frozen feature enumeration.
const FEATURE_CAPACITY: usize = 14;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open backend module {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("backend module {} is missing required symbol `{symbol}`", path.display())]
    MissingSymbol { path: PathBuf, symbol: &'static str },
}

/// Map a backend kind to its platform module file name.
///
/// Pure string transform; no filesystem probing happens until the load
/// attempt itself.
pub fn module_file_name(kind: BackendKind) -> String {
    let base = kind.module_base_name();
    if cfg!(target_os = "windows") {
        format!("{base}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{base}.dylib")
    } else {
        format!("lib{base}.so")
    }
}

/// One loaded backend module: the library handle plus its resolved table.
///
/// The `Library` is kept alive for as long as the table's function pointers
/// can be called; dropping the value unloads the module.
#[derive(Debug)]
pub struct LoadedBackend {
    kind: BackendKind,
    table: BackendTable,
    _lib: Library,
}

impl LoadedBackend {
    /// Load `kind`'s module from `dir`, resolving the platform file name.
    pub fn load(kind: BackendKind, dir: &Path) -> Result<Self, LoadError> {
        Self::load_from(kind, &dir.join(module_file_name(kind)))
    }

    /// Load a backend module from an explicit path.
    pub fn load_from(kind: BackendKind, path: &Path) -> Result<Self, LoadError> {
        let lib = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let table = resolve_table(&lib, path)?;
        debug!(?kind, path = %path.display(), "loaded webgpu backend module");
        Ok(Self {
            kind,
            table,
            _lib: lib,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

fn resolve<T: Copy>(lib: &Library, path: &Path, symbol: &'static str) -> Result<T, LoadError> {
    unsafe {
        lib.get::<T>(symbol.as_bytes())
            .map(|s| *s)
            .map_err(|_| LoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol,
            })
    }
}

fn resolve_table(lib: &Library, path: &Path) -> Result<BackendTable, LoadError> {
    Ok(BackendTable {
        init: resolve::<BackendInitFn>(lib, path, SYMBOL_INIT)?,
        deinit: resolve::<BackendDeinitFn>(lib, path, SYMBOL_DEINIT)?,
        get_gpu: resolve::<GetGpuFn>(lib, path, SYMBOL_GET_GPU)?,
        request_adapter: resolve::<RequestAdapterFn>(lib, path, SYMBOL_REQUEST_ADAPTER)?,
        request_device: resolve::<RequestDeviceFn>(lib, path, SYMBOL_REQUEST_DEVICE)?,
        enumerate_features: resolve::<EnumerateFeaturesFn>(lib, path, SYMBOL_ENUMERATE_FEATURES)?,
        create_buffer: resolve::<CreateBufferFn>(lib, path, SYMBOL_CREATE_BUFFER)?,
        create_texture: resolve::<CreateTextureFn>(lib, path, SYMBOL_CREATE_TEXTURE)?,
        create_shader_module: resolve::<CreateShaderModuleFn>(
            lib,
            path,
            SYMBOL_CREATE_SHADER_MODULE,
        )?,
        create_command_encoder: resolve::<CreateCommandEncoderFn>(
            lib,
            path,
            SYMBOL_CREATE_COMMAND_ENCODER,
        )?,
        create_render_bundle_encoder: resolve::<CreateRenderBundleEncoderFn>(
            lib,
            path,
            SYMBOL_CREATE_RENDER_BUNDLE_ENCODER,
        )?,
    })
}

impl WebGpuBackend for LoadedBackend {
    fn initialize(&self) -> Result<BackendSession, WebGpuStatus> {
        let mut session = 0u64;
        let raw = unsafe { (self.table.init)(&mut session) };
        WebGpuStatus::check_raw(raw)?;
        Ok(BackendSession::from_raw(session))
    }

    fn deinitialize(&self, session: BackendSession) -> WebGpuStatus {
        let raw = unsafe { (self.table.deinit)(session.to_raw()) };
        WebGpuStatus::from_raw(raw)
    }

    fn get_gpu(&self, session: BackendSession) -> Result<GpuHandle, WebGpuStatus> {
        let mut out = 0u64;
        let raw = unsafe { (self.table.get_gpu)(session.to_raw(), &mut out) };
        WebGpuStatus::check_raw(raw)?;
        Ok(GpuHandle::from_raw(out))
    }

    fn request_adapter(
        &self,
        session: BackendSession,
        gpu: GpuHandle,
        options: &RequestAdapterOptions,
    ) -> Result<AdapterHandle, WebGpuStatus> {
        let raw_options = RawRequestAdapterOptions {
            power_preference: options.power_preference as u32,
            force_fallback_adapter: options.force_fallback_adapter as u32,
        };
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.request_adapter)(session.to_raw(), gpu.to_raw(), &raw_options, &mut out)
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(AdapterHandle::from_raw(out))
    }

    fn request_device(
        &self,
        session: BackendSession,
        adapter: AdapterHandle,
    ) -> Result<DeviceHandle, WebGpuStatus> {
        let mut out = 0u64;
        let raw =
            unsafe { (self.table.request_device)(session.to_raw(), adapter.to_raw(), &mut out) };
        WebGpuStatus::check_raw(raw)?;
        Ok(DeviceHandle::from_raw(out))
    }

    fn enumerate_features(
        &self,
        session: BackendSession,
        adapter: AdapterHandle,
    ) -> Result<Vec<FeatureName>, WebGpuStatus> {
        let mut features = [0u32; FEATURE_CAPACITY];
        let mut count = FEATURE_CAPACITY as u32;
        let raw = unsafe {
            (self.table.enumerate_features)(
                session.to_raw(),
                adapter.to_raw(),
                features.as_mut_ptr(),
                &mut count,
            )
        };
        WebGpuStatus::check_raw(raw)?;
        let written = (count as usize).min(FEATURE_CAPACITY);
        Ok(features[..written]
            .iter()
            .filter_map(|&f| FeatureName::from_raw(f))
            .collect())
    }

    fn create_buffer(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &BufferDescriptor,
    ) -> Result<BufferHandle, WebGpuStatus> {
        let raw_desc = RawBufferDescriptor {
            size: desc.size,
            usage: desc.usage.bits(),
            mapped_at_creation: desc.mapped_at_creation as u32,
        };
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.create_buffer)(session.to_raw(), device.to_raw(), &raw_desc, &mut out)
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(BufferHandle::from_raw(out))
    }

    fn create_texture(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &TextureDescriptor,
    ) -> Result<TextureHandle, WebGpuStatus> {
        let raw_desc = RawTextureDescriptor {
            format: desc.format as u32,
            width: desc.size.width,
            height: desc.size.height,
            depth_or_array_layers: desc.size.depth_or_array_layers,
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            dimension: desc.dimension as u32,
            usage: desc.usage.bits(),
        };
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.create_texture)(session.to_raw(), device.to_raw(), &raw_desc, &mut out)
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(TextureHandle::from_raw(out))
    }

    fn create_shader_module(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleHandle, WebGpuStatus> {
        let defines: Vec<RawByteSlice> = desc
            .defines
            .iter()
            .map(|d| match d {
                Some(bytes) => RawByteSlice::from_bytes(bytes),
                None => RawByteSlice::NULL,
            })
            .collect();
        let raw_desc = RawShaderModuleDescriptor {
            label: desc
                .label
                .as_deref()
                .map(|l| RawByteSlice::from_bytes(l.as_bytes()))
                .unwrap_or(RawByteSlice::NULL),
            code: RawByteSlice::from_bytes(desc.code.as_bytes()),
            defines: if defines.is_empty() {
                std::ptr::null()
            } else {
                defines.as_ptr()
            },
            defines_len: defines.len() as u32,
        };
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.create_shader_module)(
                session.to_raw(),
                device.to_raw(),
                &raw_desc,
                &mut out,
            )
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(ShaderModuleHandle::from_raw(out))
    }

    fn create_command_encoder(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        label: Option<&str>,
    ) -> Result<CommandEncoderHandle, WebGpuStatus> {
        let label_slice = label
            .map(|l| RawByteSlice::from_bytes(l.as_bytes()))
            .unwrap_or(RawByteSlice::NULL);
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.create_command_encoder)(
                session.to_raw(),
                device.to_raw(),
                label_slice.ptr,
                label_slice.len,
                &mut out,
            )
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(CommandEncoderHandle::from_raw(out))
    }

    fn create_render_bundle_encoder(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Result<RenderBundleEncoderHandle, WebGpuStatus> {
        let raw_desc = RawRenderBundleEncoderDescriptor {
            format: desc.format as u32,
            sample_count: desc.sample_count,
            usage: desc.usage.bits(),
            view_dimension: desc.view_dimension,
        };
        let mut out = 0u64;
        let raw = unsafe {
            (self.table.create_render_bundle_encoder)(
                session.to_raw(),
                device.to_raw(),
                &raw_desc,
                &mut out,
            )
        };
        WebGpuStatus::check_raw(raw)?;
        Ok(RenderBundleEncoderHandle::from_raw(out))
    }
}
