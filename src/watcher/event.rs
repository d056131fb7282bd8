use std::path::PathBuf;

/// A filesystem change after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A source file was created or its content changed.
    Modified(PathBuf),
    /// A source file was deleted.
    Deleted(PathBuf),
    /// A manifest or config file changed; projects must be re-registered.
    ConfigChanged,
}
