//! Watch mode: incremental regeneration driven by filesystem events

pub mod coordinator;
pub mod debounce;
pub mod event;
mod session;

pub use coordinator::{WatchCoordinator, WatchHandle, WatchOptions};
pub use debounce::Debounce;
pub use event::{DEBOUNCE_MS, FsEventKind, WatchEvent, WatchState};
pub use session::{PassSummary, ShutdownReport};
