/// Compile-time-known backend kinds.
///
/// Sealed on purpose: a kind only exists once its module contract is part of
/// this enum, and every kind in scope holds (via [`crate::LoadedBackend`]) a
/// fully-resolved function table or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The wgpu-native binding module.
    WgpuNative,
}

impl BackendKind {
    /// Resolve a logical backend name. `autodetect` picks the only kind
    /// currently supported.
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "wgpu-native" | "wgpu_native" | "autodetect" => Some(Self::WgpuNative),
            _ => None,
        }
    }

    /// Platform-independent module base name; see
    /// [`crate::module_file_name`] for the platform file name.
    pub fn module_base_name(self) -> &'static str {
        match self {
            Self::WgpuNative => "causeway_wgpu_native",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(
            BackendKind::resolve("wgpu-native"),
            Some(BackendKind::WgpuNative)
        );
        assert_eq!(
            BackendKind::resolve("wgpu_native"),
            Some(BackendKind::WgpuNative)
        );
        assert_eq!(
            BackendKind::resolve("autodetect"),
            Some(BackendKind::WgpuNative)
        );
        assert_eq!(BackendKind::resolve("vulkan"), None);
    }
}
