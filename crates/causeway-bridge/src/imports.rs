//! The frozen guest import surface.
//!
//! The embedding runtime registers these with its linker; the names, arity,
//! and signature strings do not change when backends are swapped. Signature
//! strings use the runtime's notation: parameter list in parentheses, then
//! the result — `I` for 64-bit integers (offsets and handles), `i` for
//! 32-bit integers and the status result.

/// One imported native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFunction {
    pub module: &'static str,
    pub name: &'static str,
    pub signature: &'static str,
}

/// Import module name all operations are registered under.
pub const IMPORT_MODULE: &str = "wasi_webgpu";

static IMPORT_SURFACE: [ImportFunction; 9] = [
    ImportFunction {
        module: IMPORT_MODULE,
        name: "get_gpu",
        signature: "(I)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "instance_request_adapter",
        signature: "(III)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "adapter_request_device",
        signature: "(II)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "adapter_enumerate_features",
        signature: "(III)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "device_create_buffer",
        signature: "(III)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "device_create_texture",
        signature: "(III)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "device_create_shader_module",
        signature: "(III)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "device_create_command_encoder",
        signature: "(IIiI)i",
    },
    ImportFunction {
        module: IMPORT_MODULE,
        name: "device_create_render_bundle_encoder",
        signature: "(III)i",
    },
];

/// Every operation the bridge exposes to guests.
pub fn import_surface() -> &'static [ImportFunction] {
    &IMPORT_SURFACE
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The surface is a frozen contract; this pins it.
    #[test]
    fn surface_shape_is_pinned() {
        let names: Vec<&str> = import_surface().iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [
                "get_gpu",
                "instance_request_adapter",
                "adapter_request_device",
                "adapter_enumerate_features",
                "device_create_buffer",
                "device_create_texture",
                "device_create_shader_module",
                "device_create_command_encoder",
                "device_create_render_bundle_encoder",
            ]
        );
        for import in import_surface() {
            assert_eq!(import.module, IMPORT_MODULE);
            assert!(import.signature.starts_with('('));
            assert!(import.signature.ends_with(")i"));
        }
    }
}
