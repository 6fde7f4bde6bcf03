/// Status code returned to the guest by every bridge operation.
///
/// The numeric values are part of the guest ABI and also cross the backend
/// plugin boundary as raw `u32`s, so the discriminants are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WebGpuStatus {
    Success = 0,
    InvalidArgument = 1,
    InvalidOperation = 2,
    OutOfMemory = 3,
    DeviceLost = 4,
    ValidationError = 5,
    UnsupportedFeature = 6,
    Unknown = 7,
}

impl WebGpuStatus {
    /// Decode a raw status as returned by a backend module.
    ///
    /// Backends are opaque native code; a discriminant outside the contract
    /// decodes as [`WebGpuStatus::Unknown`] rather than being trusted.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Success,
            1 => Self::InvalidArgument,
            2 => Self::InvalidOperation,
            3 => Self::OutOfMemory,
            4 => Self::DeviceLost,
            5 => Self::ValidationError,
            6 => Self::UnsupportedFeature,
            _ => Self::Unknown,
        }
    }

    pub fn to_raw(self) -> u32 {
        self as u32
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Convert a raw backend status into a `Result`, keeping the original
    /// status verbatim on failure.
    pub fn check_raw(raw: u32) -> Result<(), WebGpuStatus> {
        let status = Self::from_raw(raw);
        if status.is_success() {
            Ok(())
        } else {
            Err(status)
        }
    }
}
