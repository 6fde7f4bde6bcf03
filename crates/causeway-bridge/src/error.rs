use causeway_guest_mem::{GuestMemoryError, MarshalError};
use causeway_plugin::LoadError;
use causeway_types::{WebGpuStatus, WireError};
use thiserror::Error;

/// Internal bridge failure.
///
/// Every variant maps onto the frozen guest status enum via
/// [`BridgeError::status`]; backend statuses pass through verbatim, never
/// reinterpreted. The wire enum has no `InvalidState`/`LoadFailure`
/// discriminants, so those surface as `InvalidOperation` and
/// `UnsupportedFeature` respectively.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("required argument is null or zero")]
    InvalidArgument,

    #[error("no backend context available for the calling instance")]
    InvalidState,

    #[error("bridge allocation failed")]
    OutOfMemory,

    #[error("backend returned {0:?}")]
    Backend(WebGpuStatus),

    #[error("malformed guest descriptor: {0}")]
    Wire(#[from] WireError),

    #[error("guest memory access failed: {0}")]
    Memory(#[from] GuestMemoryError),

    #[error("marshaling failed: {0}")]
    Marshal(MarshalError),

    #[error("backend load failed: {0}")]
    Load(#[from] LoadError),
}

impl From<MarshalError> for BridgeError {
    fn from(err: MarshalError) -> Self {
        match err {
            // Keep allocation failures distinguishable from bad arguments.
            MarshalError::Memory(mem) => BridgeError::Memory(mem),
            other => BridgeError::Marshal(other),
        }
    }
}

impl BridgeError {
    /// The status code this failure surfaces to the guest.
    pub fn status(&self) -> WebGpuStatus {
        match self {
            BridgeError::InvalidArgument | BridgeError::Wire(_) => WebGpuStatus::InvalidArgument,
            BridgeError::InvalidState => WebGpuStatus::InvalidOperation,
            BridgeError::OutOfMemory => WebGpuStatus::OutOfMemory,
            BridgeError::Backend(status) => *status,
            BridgeError::Memory(GuestMemoryError::OutOfBounds { .. }) => {
                WebGpuStatus::InvalidArgument
            }
            BridgeError::Memory(GuestMemoryError::OutOfGuestMemory { .. }) => {
                WebGpuStatus::OutOfMemory
            }
            BridgeError::Marshal(err) => match err {
                MarshalError::ArrayTooLarge { .. } => WebGpuStatus::OutOfMemory,
                _ => WebGpuStatus::InvalidArgument,
            },
            BridgeError::Load(_) => WebGpuStatus::UnsupportedFeature,
        }
    }
}
