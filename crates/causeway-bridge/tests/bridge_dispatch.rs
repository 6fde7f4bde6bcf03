//! End-to-end dispatch tests against a stub backend and in-memory guest.

use std::sync::Arc;

use causeway_bridge::{BackendSet, InstanceId, WebGpuBridge};
use causeway_guest_mem::{GuestMemory, VecGuestMemory};
use causeway_plugin::{BackendKind, StubWebGpuBackend};
use causeway_types::{BufferUsages, GuestSlice, WebGpuStatus};
use pretty_assertions::assert_eq;

fn stub_bridge() -> (WebGpuBridge, Arc<StubWebGpuBackend>) {
    let backend = Arc::new(StubWebGpuBackend::new());
    let mut backends = BackendSet::new();
    backends.insert(
        BackendKind::WgpuNative,
        Arc::clone(&backend) as Arc<dyn causeway_plugin::WebGpuBackend>,
    );
    (
        WebGpuBridge::new(backends, BackendKind::WgpuNative),
        backend,
    )
}

fn write_buffer_descriptor(mem: &VecGuestMemory, offset: u64, size: u64, usage: BufferUsages) {
    mem.write_u64(offset, size).unwrap();
    mem.write_u32(offset + 8, usage.bits()).unwrap();
    mem.write_u32(offset + 12, 0).unwrap();
}

#[test]
fn create_buffer_lazily_creates_then_reuses_the_context() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(0x1000);

    write_buffer_descriptor(&mem, 64, 256, BufferUsages::VERTEX);

    let status = bridge.device_create_buffer(&mem, instance, 1, 64, 128);
    assert_eq!(status, WebGpuStatus::Success);
    let first = mem.read_u64(128).unwrap();
    assert_ne!(first, 0);

    let status = bridge.device_create_buffer(&mem, instance, 1, 64, 136);
    assert_eq!(status, WebGpuStatus::Success);
    let second = mem.read_u64(136).unwrap();
    assert_ne!(second, first);

    // One context, one backend session, despite two operations.
    assert_eq!(backend.init_calls(), 1);
    assert_eq!(backend.op_calls(), 2);
}

#[test]
fn distinct_instances_do_not_share_sessions() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    write_buffer_descriptor(&mem, 64, 16, BufferUsages::UNIFORM);
    assert_eq!(
        bridge.device_create_buffer(&mem, InstanceId::from_raw(1), 1, 64, 128),
        WebGpuStatus::Success
    );
    assert_eq!(
        bridge.device_create_buffer(&mem, InstanceId::from_raw(2), 1, 64, 136),
        WebGpuStatus::Success
    );
    assert_eq!(backend.init_calls(), 2);
}

#[test]
fn null_arguments_fail_before_the_backend_is_called() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(5);

    assert_eq!(
        bridge.device_create_buffer(&mem, instance, 0, 64, 128),
        WebGpuStatus::InvalidArgument
    );
    assert_eq!(
        bridge.device_create_buffer(&mem, instance, 1, 0, 128),
        WebGpuStatus::InvalidArgument
    );
    assert_eq!(
        bridge.device_create_buffer(&mem, instance, 1, 64, 0),
        WebGpuStatus::InvalidArgument
    );
    assert_eq!(backend.op_calls(), 0);
    // Validation failures leave guest memory untouched.
    assert_eq!(mem.read_u64(128).unwrap(), 0);
}

#[test]
fn dispatch_without_a_published_backend_fails_cleanly() {
    let bridge = WebGpuBridge::new(BackendSet::new(), BackendKind::WgpuNative);
    let mem = VecGuestMemory::new(4096);

    write_buffer_descriptor(&mem, 64, 16, BufferUsages::COPY_DST);
    assert_eq!(
        bridge.device_create_buffer(&mem, InstanceId::from_raw(1), 1, 64, 128),
        WebGpuStatus::InvalidOperation
    );
    assert!(bridge.registry().is_empty());
}

#[test]
fn backend_failures_propagate_verbatim() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(3);

    write_buffer_descriptor(&mem, 64, 16, BufferUsages::COPY_SRC);
    backend.fail_with(Some(WebGpuStatus::DeviceLost));
    assert_eq!(
        bridge.device_create_buffer(&mem, instance, 1, 64, 128),
        WebGpuStatus::DeviceLost
    );

    backend.fail_with(Some(WebGpuStatus::ValidationError));
    assert_eq!(
        bridge.get_gpu(&mem, instance, 128),
        WebGpuStatus::ValidationError
    );
}

#[test]
fn malformed_descriptor_is_an_invalid_argument() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    // Texture descriptor with an out-of-contract format discriminant.
    mem.write_u32(64, 999).unwrap();
    assert_eq!(
        bridge.device_create_texture(&mem, InstanceId::from_raw(1), 1, 64, 128),
        WebGpuStatus::InvalidArgument
    );
    assert_eq!(backend.op_calls(), 0);
}

#[test]
fn get_gpu_round_trips_a_handle() {
    let (bridge, _backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    assert_eq!(
        bridge.get_gpu(&mem, InstanceId::from_raw(1), 200),
        WebGpuStatus::Success
    );
    assert_ne!(mem.read_u64(200).unwrap(), 0);
}

#[test]
fn request_adapter_then_device() {
    let (bridge, _backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(11);

    // RequestAdapterOptions { HighPerformance, no fallback }.
    mem.write_u32(32, 1).unwrap();
    mem.write_u32(36, 0).unwrap();

    assert_eq!(
        bridge.get_gpu(&mem, instance, 100),
        WebGpuStatus::Success
    );
    let gpu = mem.read_u64(100).unwrap();

    assert_eq!(
        bridge.instance_request_adapter(&mem, instance, gpu, 32, 108),
        WebGpuStatus::Success
    );
    let adapter = mem.read_u64(108).unwrap();
    assert_ne!(adapter, 0);

    assert_eq!(
        bridge.adapter_request_device(&mem, instance, adapter, 116),
        WebGpuStatus::Success
    );
    assert_ne!(mem.read_u64(116).unwrap(), 0);
}

#[test]
fn enumerate_features_respects_guest_capacity() {
    let (bridge, _backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(4);

    // Capacity 2; the stub reports 3 features.
    mem.write_u32(300, 2).unwrap();
    assert_eq!(
        bridge.adapter_enumerate_features(&mem, instance, 7, 200, 300),
        WebGpuStatus::Success
    );
    assert_eq!(mem.read_u32(300).unwrap(), 3);
    assert_eq!(
        mem.read_u32(200).unwrap(),
        causeway_types::FeatureName::TimestampQuery.to_raw()
    );
    assert_eq!(
        mem.read_u32(204).unwrap(),
        causeway_types::FeatureName::ShaderF16.to_raw()
    );
    // Only the first two slots were written.
    assert_eq!(mem.read_u32(208).unwrap(), 0);
}

#[test]
fn shader_module_marshals_code_label_and_defines() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(21);

    // Strings and define payloads.
    mem.write(0x100, b"main shader").unwrap();
    mem.write(0x120, b"@compute fn main() {}").unwrap();
    mem.write(0x150, b"FAST_MATH=1").unwrap();
    mem.write(0x170, b"DEBUG=0").unwrap();

    // Defines descriptor array: one valid entry, one zero-length, one valid.
    let defines_offset = 0x200u64;
    let descs = [
        GuestSlice {
            offset: 0x150,
            len: 11,
        },
        GuestSlice { offset: 0, len: 0 },
        GuestSlice {
            offset: 0x170,
            len: 7,
        },
    ];
    for (i, desc) in descs.iter().enumerate() {
        mem.write(
            defines_offset + (i * GuestSlice::SIZE_BYTES) as u64,
            &desc.encode(),
        )
        .unwrap();
    }

    // Shader module wire descriptor.
    let desc_offset = 0x300u64;
    mem.write(
        desc_offset,
        &GuestSlice {
            offset: 0x100,
            len: 11,
        }
        .encode(),
    )
    .unwrap();
    mem.write(
        desc_offset + 12,
        &GuestSlice {
            offset: 0x120,
            len: 21,
        }
        .encode(),
    )
    .unwrap();
    mem.write_u64(desc_offset + 24, defines_offset).unwrap();
    mem.write_u32(desc_offset + 32, 3).unwrap();

    assert_eq!(
        bridge.device_create_shader_module(&mem, instance, 1, desc_offset, 0x400),
        WebGpuStatus::Success
    );
    assert_ne!(mem.read_u64(0x400).unwrap(), 0);

    let received = backend.last_shader_module().unwrap();
    assert_eq!(received.label.as_deref(), Some("main shader"));
    assert_eq!(received.code, "@compute fn main() {}");
    assert_eq!(
        received.defines,
        vec![
            Some(b"FAST_MATH=1".to_vec()),
            Some(Vec::new()),
            Some(b"DEBUG=0".to_vec()),
        ]
    );
}

#[test]
fn shader_module_requires_code() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    // Wire descriptor with a null code slice.
    let desc_offset = 0x300u64;
    mem.write(desc_offset, &GuestSlice { offset: 0, len: 0 }.encode())
        .unwrap();
    mem.write(
        desc_offset + 12,
        &GuestSlice { offset: 0, len: 8 }.encode(),
    )
    .unwrap();

    assert_eq!(
        bridge.device_create_shader_module(&mem, InstanceId::from_raw(1), 1, desc_offset, 0x400),
        WebGpuStatus::InvalidArgument
    );
    assert_eq!(backend.op_calls(), 0);
}

#[test]
fn command_encoder_label_is_optional() {
    let (bridge, _backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let instance = InstanceId::from_raw(31);

    assert_eq!(
        bridge.device_create_command_encoder(&mem, instance, 1, 0, 0, 128),
        WebGpuStatus::Success
    );

    mem.write(0x80, b"frame").unwrap();
    assert_eq!(
        bridge.device_create_command_encoder(&mem, instance, 1, 0x80, 5, 136),
        WebGpuStatus::Success
    );
    assert_ne!(mem.read_u64(136).unwrap(), 0);
}

#[test]
fn render_bundle_encoder_descriptor_round_trips() {
    let (bridge, _backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    // format=Rgba8Unorm, sample_count=4, usage=RENDER_ATTACHMENT, view_dim=1.
    mem.write_u32(64, 10).unwrap();
    mem.write_u32(68, 4).unwrap();
    mem.write_u32(72, 1 << 4).unwrap();
    mem.write_u32(76, 1).unwrap();

    assert_eq!(
        bridge.device_create_render_bundle_encoder(&mem, InstanceId::from_raw(1), 1, 64, 128),
        WebGpuStatus::Success
    );
    assert_ne!(mem.read_u64(128).unwrap(), 0);
}

#[test]
fn instance_teardown_releases_the_session_exactly_once() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);
    let used = InstanceId::from_raw(1);
    let unused = InstanceId::from_raw(2);

    assert_eq!(bridge.get_gpu(&mem, used, 128), WebGpuStatus::Success);

    bridge.destroy_instance(used);
    bridge.destroy_instance(used);
    // Tearing down an instance that never called in fabricates nothing.
    bridge.destroy_instance(unused);

    assert_eq!(backend.init_calls(), 1);
    assert_eq!(backend.deinit_calls(), 1);
}

#[test]
fn subsystem_teardown_covers_all_instances() {
    let (bridge, backend) = stub_bridge();
    let mem = VecGuestMemory::new(4096);

    for raw in 1..=3 {
        assert_eq!(
            bridge.get_gpu(&mem, InstanceId::from_raw(raw), 128),
            WebGpuStatus::Success
        );
    }
    bridge.destroy_all();
    assert_eq!(backend.deinit_calls(), 3);
    assert!(bridge.registry().is_empty());
}
