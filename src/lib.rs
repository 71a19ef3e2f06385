//! Workspace-level integration tests live in `tests/`; this package only
//! re-exports the core crate for them.
pub use contractgen_core::*;
