use thiserror::Error;

/// Errors surfaced by the map core.
///
/// Per-record problems in the dataset never show up here; they are logged and
/// the offending record simply contributes no geometry.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown basemap theme '{0}'")]
    UnknownTheme(String),

    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    #[error("Unknown layer '{0}'")]
    UnknownLayer(String),

    /// The rendering context could not be created.
    #[error("Map initialization failed: {0}")]
    InitFailed(String),

    #[error("Failed to update source '{source_id}': {reason}")]
    SourceUpdate { source_id: String, reason: String },

    /// The owning controller was disposed while work was pending.
    #[error("Map controller disposed")]
    Disposed,

    #[error("Style load signal closed")]
    LoadSignalClosed,
}

pub type Result<T> = std::result::Result<T, MapError>;
