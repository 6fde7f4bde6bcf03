//! Dispatch layer: one entry point per imported operation.
//!
//! Every operation follows the same shape: resolve the calling instance's
//! context (creating it on first use), validate arguments before invoking
//! the operation's backend entry point, marshal inputs out of guest memory,
//! invoke the backend, and marshal outputs back. Backend failures are logged
//! and propagated verbatim; no guest memory is written when validation
//! fails. Once the backend call has been made its side effects are
//! committed, even if writing results back to the guest subsequently fails.

use causeway_guest_mem::{
    copy_buffer_array_to_host, read_guest_string, GuestMemory, GuestMemoryError,
};
use causeway_plugin::BackendKind;
use causeway_types::{
    AdapterHandle, BufferDescriptor, DeviceHandle, GpuHandle, GuestSlice,
    RenderBundleEncoderDescriptor, RequestAdapterOptions, ShaderModuleDescriptor,
    ShaderModuleDescriptorWire, TextureDescriptor, WebGpuStatus,
};
use tracing::debug;

use crate::backend_set::BackendSet;
use crate::error::BridgeError;
use crate::registry::{BridgeContext, InstanceId, InstanceRegistry};

/// The guest/host WebGPU bridge.
///
/// Owns the published backends and the per-instance registry; the embedding
/// runtime constructs one per sandbox subsystem and routes every imported
/// call through it. There is deliberately no global instance.
pub struct WebGpuBridge {
    backends: BackendSet,
    default_kind: BackendKind,
    registry: InstanceRegistry,
}

impl WebGpuBridge {
    pub fn new(backends: BackendSet, default_kind: BackendKind) -> Self {
        Self {
            backends,
            default_kind,
            registry: InstanceRegistry::new(),
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Tear down one guest instance's context (invoked by the runtime when
    /// the instance is destroyed). A no-op for instances that never called
    /// into the bridge.
    pub fn destroy_instance(&self, instance: InstanceId) {
        self.registry.destroy(instance);
    }

    /// Subsystem teardown: release every context's backend session.
    pub fn destroy_all(&self) {
        self.registry.destroy_all();
    }

    fn context(
        &self,
        instance: InstanceId,
    ) -> Result<std::sync::Arc<BridgeContext>, BridgeError> {
        self.registry.get_or_create(instance, || {
            let backend = self
                .backends
                .get(self.default_kind)
                .ok_or(BridgeError::InvalidState)?;
            let session = backend.initialize().map_err(BridgeError::Backend)?;
            Ok(BridgeContext::new(self.default_kind, backend, session))
        })
    }

    fn dispatch(
        &self,
        op: &'static str,
        f: impl FnOnce() -> Result<(), BridgeError>,
    ) -> WebGpuStatus {
        match f() {
            Ok(()) => WebGpuStatus::Success,
            Err(err) => {
                let status = err.status();
                debug!(op, ?status, error = %err, "bridge operation failed");
                status
            }
        }
    }

    pub fn get_gpu(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        out_gpu: u64,
    ) -> WebGpuStatus {
        self.dispatch("get_gpu", || {
            let ctx = self.context(instance)?;
            require_nonzero(out_gpu)?;
            let gpu = ctx
                .backend()
                .get_gpu(ctx.session())
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_gpu, gpu.to_raw())?;
            Ok(())
        })
    }

    pub fn instance_request_adapter(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        gpu: u64,
        options_offset: u64,
        out_adapter: u64,
    ) -> WebGpuStatus {
        self.dispatch("instance_request_adapter", || {
            let ctx = self.context(instance)?;
            require_nonzero(gpu)?;
            require_nonzero(options_offset)?;
            require_nonzero(out_adapter)?;
            let options = RequestAdapterOptions::decode(&read_exact(
                mem,
                options_offset,
                RequestAdapterOptions::SIZE_BYTES,
            )?)?;
            let adapter = ctx
                .backend()
                .request_adapter(ctx.session(), GpuHandle::from_raw(gpu), &options)
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_adapter, adapter.to_raw())?;
            Ok(())
        })
    }

    pub fn adapter_request_device(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        adapter: u64,
        out_device: u64,
    ) -> WebGpuStatus {
        self.dispatch("adapter_request_device", || {
            let ctx = self.context(instance)?;
            require_nonzero(adapter)?;
            require_nonzero(out_device)?;
            let device = ctx
                .backend()
                .request_device(ctx.session(), AdapterHandle::from_raw(adapter))
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_device, device.to_raw())?;
            Ok(())
        })
    }

    /// Writes up to `*out_count` feature codes at `out_features` and stores
    /// the adapter's total feature count back through `out_count`.
    pub fn adapter_enumerate_features(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        adapter: u64,
        out_features: u64,
        out_count: u64,
    ) -> WebGpuStatus {
        self.dispatch("adapter_enumerate_features", || {
            let ctx = self.context(instance)?;
            require_nonzero(adapter)?;
            require_nonzero(out_features)?;
            require_nonzero(out_count)?;
            let capacity = mem.read_u32(out_count)?;
            let features = ctx
                .backend()
                .enumerate_features(ctx.session(), AdapterHandle::from_raw(adapter))
                .map_err(BridgeError::Backend)?;
            for (i, feature) in features.iter().take(capacity as usize).enumerate() {
                let slot = out_features
                    .checked_add(i as u64 * 4)
                    .ok_or(GuestMemoryError::OutOfBounds {
                        offset: out_features,
                        len: 4,
                    })?;
                mem.write_u32(slot, feature.to_raw())?;
            }
            mem.write_u32(out_count, features.len() as u32)?;
            Ok(())
        })
    }

    pub fn device_create_buffer(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        device: u64,
        desc_offset: u64,
        out_buffer: u64,
    ) -> WebGpuStatus {
        self.dispatch("device_create_buffer", || {
            let ctx = self.context(instance)?;
            require_nonzero(device)?;
            require_nonzero(desc_offset)?;
            require_nonzero(out_buffer)?;
            let desc = BufferDescriptor::decode(&read_exact(
                mem,
                desc_offset,
                BufferDescriptor::SIZE_BYTES,
            )?)?;
            let buffer = ctx
                .backend()
                .create_buffer(ctx.session(), DeviceHandle::from_raw(device), &desc)
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_buffer, buffer.to_raw())?;
            Ok(())
        })
    }

    pub fn device_create_texture(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        device: u64,
        desc_offset: u64,
        out_texture: u64,
    ) -> WebGpuStatus {
        self.dispatch("device_create_texture", || {
            let ctx = self.context(instance)?;
            require_nonzero(device)?;
            require_nonzero(desc_offset)?;
            require_nonzero(out_texture)?;
            let desc = TextureDescriptor::decode(&read_exact(
                mem,
                desc_offset,
                TextureDescriptor::SIZE_BYTES,
            )?)?;
            let texture = ctx
                .backend()
                .create_texture(ctx.session(), DeviceHandle::from_raw(device), &desc)
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_texture, texture.to_raw())?;
            Ok(())
        })
    }

    pub fn device_create_shader_module(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        device: u64,
        desc_offset: u64,
        out_shader: u64,
    ) -> WebGpuStatus {
        self.dispatch("device_create_shader_module", || {
            let ctx = self.context(instance)?;
            require_nonzero(device)?;
            require_nonzero(desc_offset)?;
            require_nonzero(out_shader)?;
            let wire = ShaderModuleDescriptorWire::decode(&read_exact(
                mem,
                desc_offset,
                ShaderModuleDescriptorWire::SIZE_BYTES,
            )?)?;
            if wire.code.is_null() {
                return Err(BridgeError::InvalidArgument);
            }
            let label = if wire.label.is_null() {
                None
            } else {
                Some(read_guest_string(mem, wire.label)?)
            };
            let code = read_guest_string(mem, wire.code)?;
            // The defines array is optional; when present it deep-copies
            // through the buffer-array marshaler.
            let defines = if wire.defines_offset != 0 && wire.defines_count > 0 {
                copy_buffer_array_to_host(mem, wire.defines_offset, wire.defines_count)?
                    .into_payloads()
            } else {
                Vec::new()
            };
            let desc = ShaderModuleDescriptor {
                label,
                code,
                defines,
            };
            let shader = ctx
                .backend()
                .create_shader_module(ctx.session(), DeviceHandle::from_raw(device), &desc)
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_shader, shader.to_raw())?;
            Ok(())
        })
    }

    pub fn device_create_command_encoder(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        device: u64,
        label_offset: u64,
        label_len: u32,
        out_encoder: u64,
    ) -> WebGpuStatus {
        self.dispatch("device_create_command_encoder", || {
            let ctx = self.context(instance)?;
            require_nonzero(device)?;
            require_nonzero(out_encoder)?;
            // The label is optional: a null offset means no label.
            let label = if label_offset == 0 {
                None
            } else {
                Some(read_guest_string(
                    mem,
                    GuestSlice {
                        offset: label_offset,
                        len: label_len,
                    },
                )?)
            };
            let encoder = ctx
                .backend()
                .create_command_encoder(
                    ctx.session(),
                    DeviceHandle::from_raw(device),
                    label.as_deref(),
                )
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_encoder, encoder.to_raw())?;
            Ok(())
        })
    }

    pub fn device_create_render_bundle_encoder(
        &self,
        mem: &dyn GuestMemory,
        instance: InstanceId,
        device: u64,
        desc_offset: u64,
        out_encoder: u64,
    ) -> WebGpuStatus {
        self.dispatch("device_create_render_bundle_encoder", || {
            let ctx = self.context(instance)?;
            require_nonzero(device)?;
            require_nonzero(desc_offset)?;
            require_nonzero(out_encoder)?;
            let desc = RenderBundleEncoderDescriptor::decode(&read_exact(
                mem,
                desc_offset,
                RenderBundleEncoderDescriptor::SIZE_BYTES,
            )?)?;
            let encoder = ctx
                .backend()
                .create_render_bundle_encoder(
                    ctx.session(),
                    DeviceHandle::from_raw(device),
                    &desc,
                )
                .map_err(BridgeError::Backend)?;
            mem.write_u64(out_encoder, encoder.to_raw())?;
            Ok(())
        })
    }
}

fn require_nonzero(value: u64) -> Result<(), BridgeError> {
    if value == 0 {
        return Err(BridgeError::InvalidArgument);
    }
    Ok(())
}

fn read_exact(mem: &dyn GuestMemory, offset: u64, len: usize) -> Result<Vec<u8>, BridgeError> {
    let mut bytes = vec![0u8; len];
    mem.read(offset, &mut bytes)?;
    Ok(bytes)
}
