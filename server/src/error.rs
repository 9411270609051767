use std::io;

use thiserror::Error;

/// Failures of the metadata store and of the blob directories.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Metadata file is not a JSON array of upload records
    #[error("metadata file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No record matches both the stored file name and the owner name
    #[error("no matching record")]
    NotFound,
}

/// Failures while receiving an uploaded file.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file exceeds the {0} bytes limit")]
    TooLarge(usize),

    #[error("upload read error: {0}")]
    Read(#[from] io::Error),
}
