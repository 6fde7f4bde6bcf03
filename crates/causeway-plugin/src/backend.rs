//! The backend seam: the trait dispatch programs against, plus a stub
//! implementation for tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use causeway_types::{
    AdapterHandle, BufferDescriptor, BufferHandle, CommandEncoderHandle, DeviceHandle, FeatureName,
    GpuHandle, RenderBundleEncoderDescriptor, RenderBundleEncoderHandle, RequestAdapterOptions,
    ShaderModuleDescriptor, ShaderModuleHandle, TextureDescriptor, TextureHandle, WebGpuStatus,
};

/// Opaque per-context backend state (`void *` on the module ABI).
///
/// Minted by [`WebGpuBackend::initialize`], released by `deinitialize`, and
/// never interpreted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSession(u64);

impl BackendSession {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Boundary between the dispatch layer and a native backend implementation.
///
/// All calls are synchronous and return before control goes back to the
/// guest. Failures are [`WebGpuStatus`] values surfaced verbatim; the bridge
/// neither retries nor reinterprets them. Serialization of same-object
/// mutation is the backend's responsibility — implementations must tolerate
/// concurrent calls on distinct sessions.
pub trait WebGpuBackend: Send + Sync {
    fn initialize(&self) -> Result<BackendSession, WebGpuStatus>;
    fn deinitialize(&self, session: BackendSession) -> WebGpuStatus;

    fn get_gpu(&self, session: BackendSession) -> Result<GpuHandle, WebGpuStatus>;
    fn request_adapter(
        &self,
        session: BackendSession,
        gpu: GpuHandle,
        options: &RequestAdapterOptions,
    ) -> Result<AdapterHandle, WebGpuStatus>;
    fn request_device(
        &self,
        session: BackendSession,
        adapter: AdapterHandle,
    ) -> Result<DeviceHandle, WebGpuStatus>;
    fn enumerate_features(
        &self,
        session: BackendSession,
        adapter: AdapterHandle,
    ) -> Result<Vec<FeatureName>, WebGpuStatus>;
    fn create_buffer(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &BufferDescriptor,
    ) -> Result<BufferHandle, WebGpuStatus>;
    fn create_texture(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &TextureDescriptor,
    ) -> Result<TextureHandle, WebGpuStatus>;
    fn create_shader_module(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleHandle, WebGpuStatus>;
    fn create_command_encoder(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        label: Option<&str>,
    ) -> Result<CommandEncoderHandle, WebGpuStatus>;
    fn create_render_bundle_encoder(
        &self,
        session: BackendSession,
        device: DeviceHandle,
        desc: &RenderBundleEncoderDescriptor,
    ) -> Result<RenderBundleEncoderHandle, WebGpuStatus>;
}

/// Test backend: mints sequential handles and counts lifecycle calls.
///
/// This is a test double, not a reference implementation — real semantics
/// live in backend modules. It can be primed with [`StubWebGpuBackend::fail_with`]
/// to make every subsequent operation fail with a given status.
#[derive(Debug, Default)]
pub struct StubWebGpuBackend {
    next_value: AtomicU64,
    init_calls: AtomicUsize,
    deinit_calls: AtomicUsize,
    op_calls: AtomicUsize,
    fail_with: Mutex<Option<WebGpuStatus>>,
    last_shader_module: Mutex<Option<ShaderModuleDescriptor>>,
}

impl StubWebGpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation (not `initialize`/`deinitialize`)
    /// fail with `status`. `None` restores success.
    pub fn fail_with(&self, status: Option<WebGpuStatus>) {
        *self.fail_with.lock().unwrap() = status;
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::Relaxed)
    }

    pub fn deinit_calls(&self) -> usize {
        self.deinit_calls.load(Ordering::Relaxed)
    }

    /// Operations forwarded past validation, across all sessions.
    pub fn op_calls(&self) -> usize {
        self.op_calls.load(Ordering::Relaxed)
    }

    /// The descriptor received by the most recent `create_shader_module`.
    pub fn last_shader_module(&self) -> Option<ShaderModuleDescriptor> {
        self.last_shader_module.lock().unwrap().clone()
    }

    fn mint(&self) -> u64 {
        self.next_value.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn op(&self) -> Result<u64, WebGpuStatus> {
        self.op_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(status) = *self.fail_with.lock().unwrap() {
            return Err(status);
        }
        Ok(self.mint())
    }
}

impl WebGpuBackend for StubWebGpuBackend {
    fn initialize(&self) -> Result<BackendSession, WebGpuStatus> {
        self.init_calls.fetch_add(1, Ordering::Relaxed);
        Ok(BackendSession::from_raw(self.mint()))
    }

    fn deinitialize(&self, _session: BackendSession) -> WebGpuStatus {
        self.deinit_calls.fetch_add(1, Ordering::Relaxed);
        WebGpuStatus::Success
    }

    fn get_gpu(&self, _session: BackendSession) -> Result<GpuHandle, WebGpuStatus> {
        self.op().map(GpuHandle::from_raw)
    }

    fn request_adapter(
        &self,
        _session: BackendSession,
        _gpu: GpuHandle,
        _options: &RequestAdapterOptions,
    ) -> Result<AdapterHandle, WebGpuStatus> {
        self.op().map(AdapterHandle::from_raw)
    }

    fn request_device(
        &self,
        _session: BackendSession,
        _adapter: AdapterHandle,
    ) -> Result<DeviceHandle, WebGpuStatus> {
        self.op().map(DeviceHandle::from_raw)
    }

    fn enumerate_features(
        &self,
        _session: BackendSession,
        _adapter: AdapterHandle,
    ) -> Result<Vec<FeatureName>, WebGpuStatus> {
        self.op()?;
        Ok(vec![
            FeatureName::TimestampQuery,
            FeatureName::ShaderF16,
            FeatureName::Float32Filterable,
        ])
    }

    fn create_buffer(
        &self,
        _session: BackendSession,
        _device: DeviceHandle,
        _desc: &BufferDescriptor,
    ) -> Result<BufferHandle, WebGpuStatus> {
        self.op().map(BufferHandle::from_raw)
    }

    fn create_texture(
        &self,
        _session: BackendSession,
        _device: DeviceHandle,
        _desc: &TextureDescriptor,
    ) -> Result<TextureHandle, WebGpuStatus> {
        self.op().map(TextureHandle::from_raw)
    }

    fn create_shader_module(
        &self,
        _session: BackendSession,
        _device: DeviceHandle,
        desc: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleHandle, WebGpuStatus> {
        let handle = self.op().map(ShaderModuleHandle::from_raw)?;
        *self.last_shader_module.lock().unwrap() = Some(desc.clone());
        Ok(handle)
    }

    fn create_command_encoder(
        &self,
        _session: BackendSession,
        _device: DeviceHandle,
        _label: Option<&str>,
    ) -> Result<CommandEncoderHandle, WebGpuStatus> {
        self.op().map(CommandEncoderHandle::from_raw)
    }

    fn create_render_bundle_encoder(
        &self,
        _session: BackendSession,
        _device: DeviceHandle,
        _desc: &RenderBundleEncoderDescriptor,
    ) -> Result<RenderBundleEncoderHandle, WebGpuStatus> {
        self.op().map(RenderBundleEncoderHandle::from_raw)
    }
}
