#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const VIDEO: &str = "video";
const PHOTO: &str = "photo";

/// Kind of an uploaded media file.
///
/// The kind is decided once, at upload time, from the mimetype the client declared
/// and selects the directory the blob lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    /// Classifies a declared mimetype. Anything that does not start with `video`
    /// is a photo, including types like `application/octet-stream`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with(VIDEO) {
            Self::Video
        } else {
            Self::Photo
        }
    }

    /// Classifies the type segment of a media URL. Only the literal `video` selects videos.
    #[must_use]
    pub fn from_segment(segment: &str) -> Self {
        if segment == VIDEO {
            Self::Video
        } else {
            Self::Photo
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => PHOTO,
            Self::Video => VIDEO,
        }
    }

    /// Name of the directory holding blobs of this kind.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Photo => "photos",
            Self::Video => "videos",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of a single uploaded file.
///
/// Records are created by a successful upload and never changed afterwards.
/// The owner name is the only credential required to delete the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadRecord {
    /// Generated on-disk file name (`{timestamp}-{original}`)
    pub file: String,
    /// File name as sent by the client
    #[serde(default)]
    pub original: String,
    /// Photo or video, derived from the declared mimetype
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Owner name given at upload time. Records written without one read back with an empty name.
    #[serde(default)]
    pub name: String,
    /// Upload time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Body of a delete request. Both fields must match a record exactly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteRequest {
    /// Stored file name
    pub file: String,
    /// Owner name
    pub name: String,
}
