use std::io;
use std::path::PathBuf;

use lockstep_cpu::{ConfigError, ImageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("program image: {0}")]
    Image(#[from] ImageError),
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("register preset {0:?}: expected rN=VALUE with N in 0..=15")]
    BadPreset(String),
    #[error("program of {words} words does not fit in {capacity} words of memory")]
    ImageTooLarge { words: usize, capacity: usize },
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
