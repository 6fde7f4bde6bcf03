//! The guest-facing WebGPU bridge.
//!
//! This crate ties the pieces together: per-instance contexts held in a
//! concurrent registry, a dispatch layer that validates and marshals every
//! imported operation, and the frozen import-surface table the embedding
//! runtime registers with its linker.
//!
//! The bridge is invoked synchronously and reentrantly from guest call
//! sites. It spawns no threads of its own; the registry's mutex is the only
//! cross-instance mutable state. Every entry point returns a
//! [`causeway_types::WebGpuStatus`] — failures are return values, never
//! panics across the boundary.

mod backend_set;
mod bridge;
mod error;
mod imports;
mod registry;

pub use backend_set::BackendSet;
pub use bridge::WebGpuBridge;
pub use error::BridgeError;
pub use imports::{import_surface, ImportFunction, IMPORT_MODULE};
pub use registry::{BridgeContext, InstanceId, InstanceRegistry};
