//! Opaque handles for backend-owned objects.
//!
//! A handle is an uninterpreted `u64` minted by the active backend. The
//! bridge only stores and forwards these; it never dereferences them or
//! assumes anything about their encoding. Zero is the null handle on the
//! guest ABI.

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub fn to_raw(self) -> u64 {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

opaque_handle!(
    /// The backend's top-level GPU entry object.
    GpuHandle
);
opaque_handle!(AdapterHandle);
opaque_handle!(DeviceHandle);
opaque_handle!(BufferHandle);
opaque_handle!(TextureHandle);
opaque_handle!(ShaderModuleHandle);
opaque_handle!(CommandEncoderHandle);
opaque_handle!(RenderBundleEncoderHandle);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_null() {
        assert!(DeviceHandle::from_raw(0).is_null());
        assert!(!DeviceHandle::from_raw(1).is_null());
    }

    #[test]
    fn raw_round_trip() {
        let h = BufferHandle::from_raw(0xdead_beef_cafe_f00d);
        assert_eq!(h.to_raw(), 0xdead_beef_cafe_f00d);
    }
}
