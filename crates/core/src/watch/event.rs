use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use std::path::{Path, PathBuf};

/// Default delay between the last mutation and the regeneration it triggers
pub const DEBOUNCE_MS: u64 = 100;

/// The filesystem changes the coordinator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Changed,
    Removed,
}

impl FsEventKind {
    /// Map a raw notify event kind for one of its paths, dropping everything
    /// that is not a create, content change or removal.
    ///
    /// A rename counts as a creation of its destination and a removal of its
    /// source. When the backend does not say which side `path` is, the
    /// side is taken from whether `path` still exists.
    pub fn classify(kind: &EventKind, path: &Path) -> Option<Self> {
        match kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => None,
            EventKind::Create(_) => Some(FsEventKind::Created),
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(FsEventKind::Changed),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsEventKind::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FsEventKind::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both | RenameMode::Any)) => {
                if path.is_dir() {
                    None
                } else if path.exists() {
                    Some(FsEventKind::Created)
                } else {
                    Some(FsEventKind::Removed)
                }
            }
            EventKind::Remove(_) => Some(FsEventKind::Removed),
            _ => None,
        }
    }
}

/// A filtered filesystem event tagged with the descriptor that watches it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Index of the owning watch descriptor
    pub source: usize,
    pub kind: FsEventKind,
    pub path: PathBuf,
}

/// Lifecycle of one target's watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Mutating,
    DebouncePending,
    Regenerating,
    ShuttingDown,
}
