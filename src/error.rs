use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the field renderer and its file-based collaborators
#[derive(Debug, Error)]
pub enum FieldError {
    /// The drawing surface could not be allocated at the requested size
    #[error("drawing surface unavailable: {width}x{height} exceeds {max}px per side")]
    SurfaceUnavailable { width: u32, height: u32, max: u32 },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("GIF encoding failed: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

impl FieldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FieldError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;
