//! Error type shared by the storage, history and frame-decoding layers.
//!
//! Display strings follow the `snake_code:detail` form the router stores in
//! `AppState::last_error`, so an error can be surfaced without extra mapping.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The key-value database could not be opened.
    #[error("store_open_failed:{}: {source}", .path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: sqlite::Error,
    },

    /// A statement against the key-value table failed.
    #[error("store_query_failed:{0}")]
    StoreQuery(#[from] sqlite::Error),

    /// Another thread panicked while holding the store lock.
    #[error("store_poisoned")]
    StorePoisoned,

    #[error("store_dir_failed:{}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history_json_invalid:{0}")]
    Json(#[from] serde_json::Error),

    /// The stored history value parsed, but is not an array.
    #[error("history_not_array:{found}")]
    NotAnArray { found: &'static str },

    #[error("frame_too_small:need {needed} bytes, got {actual}")]
    FrameTooSmall { needed: usize, actual: usize },

    #[error("frame_invalid_dimensions:{width}x{height} stride {row_stride}")]
    FrameDimensions {
        width: u32,
        height: u32,
        row_stride: u32,
    },

    #[error("frame_decode_failed:{0}")]
    FrameDecode(String),

    #[error("worker_send_failed:{0}")]
    WorkerSend(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short JSON type name used by [`Error::NotAnArray`].
    pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
        match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        }
    }
}
