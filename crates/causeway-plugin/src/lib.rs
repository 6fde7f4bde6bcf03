//! Pluggable native WebGPU backends.
//!
//! A backend is a shared module exporting a fixed set of `extern "C"` entry
//! points. This crate owns the boundary: the sealed [`BackendKind`]
//! enumeration, the fully-resolved [`table::BackendTable`], the
//! `libloading`-based loader, and the [`WebGpuBackend`] trait the dispatch
//! layer programs against.
//!
//! The loader never publishes a partially-valid table — either every required
//! symbol resolves and a [`LoadedBackend`] exists, or loading fails and
//! nothing is observable. A load failure for one backend kind leaves other
//! kinds unaffected.

mod backend;
mod kind;
mod loader;
pub mod table;

pub use backend::{BackendSession, StubWebGpuBackend, WebGpuBackend};
pub use kind::BackendKind;
pub use loader::{module_file_name, LoadError, LoadedBackend};
