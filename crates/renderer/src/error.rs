use std::path::PathBuf;

use thiserror::Error;

/// Shader source failed to compile or link.
///
/// Recoverable once an initial program has linked: the previous pipeline
/// stays active and the diagnostic is reported. Fatal only at start-up.
#[derive(Debug, Error)]
#[error("shader compilation failed: {diagnostic}")]
pub struct CompileError {
    pub diagnostic: String,
}

impl CompileError {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Filesystem watch could not be established.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to create filesystem watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
