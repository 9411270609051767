#![allow(clippy::unused_async)]
use crate::domain::Storage;
use crate::error::{StoreError, UploadError};
use crate::file_reply::FileReply;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{Stream, TryStreamExt};
use kernel::{DeleteRequest, MediaType, UploadRecord};
use std::io;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

use axum::{
    extract::{Multipart, Path},
    http::{header, StatusCode},
};

const FILE_FIELD: &str = "file";
const NAME_FIELD: &str = "name";
const DEFAULT_MIME: &str = "application/octet-stream";

/// Answer to a delete that matches no record owned by the given name.
pub const PERMISSION_DENIED: &str = "Brak uprawnień.";

struct IncomingFile {
    original: String,
    mime: String,
    data: Vec<u8>,
}

/// Uploads a photo or a video together with its owner name.
#[utoipa::path(
    post,
    path = "/upload",
    responses(
        (status = 302, description = "File stored, redirect to the start page"),
        (status = 400, description = "Missing or malformed form field", body = String),
        (status = 413, description = "File is too large", body = String),
        (status = 500, description = "Server error", body = String)
    ),
    tag = "media",
)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut owner: Option<String> = None;
    let mut incoming: Option<IncomingFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("multipart error: {e}");
                return (e.status(), e.body_text()).into_response();
            }
        };
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            NAME_FIELD => match field.text().await {
                Ok(text) => owner = Some(text),
                Err(e) => {
                    tracing::error!("name field not read: {e}");
                    return (e.status(), e.body_text()).into_response();
                }
            },
            FILE_FIELD => {
                let original = field.file_name().unwrap_or_default().to_owned();
                let mime = field.content_type().unwrap_or(DEFAULT_MIME).to_owned();
                match read_from_stream(field, state.max_file_size).await {
                    Ok((data, read_bytes)) => {
                        tracing::info!("file: {original} ({mime}) read: {read_bytes}");
                        incoming = Some(IncomingFile {
                            original,
                            mime,
                            data,
                        });
                    }
                    Err(e) => return upload_failure(&e),
                }
            }
            other => tracing::debug!("unexpected form field '{other}' skipped"),
        }
    }

    let Some(incoming) = incoming else {
        return bad_request(&"form field 'file' is required");
    };
    let Some(owner) = owner else {
        return bad_request(&"form field 'name' is required");
    };

    let media_type = MediaType::from_mime(&incoming.mime);
    let stored = match state
        .blobs
        .store(media_type, &incoming.data, &incoming.original)
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!("file '{}' not stored. Error: {e}", incoming.original);
            return internal_server_error(&e);
        }
    };

    let record = UploadRecord {
        file: stored.clone(),
        original: incoming.original,
        media_type,
        name: owner,
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    let start = Instant::now();
    let mut metadata = state.metadata.lock().await;
    if let Err(e) = metadata.append(record).await {
        // the blob is already on disk and stays there without a record
        tracing::error!("file '{stored}' stored but not recorded. Error: {e}");
        return internal_server_error(&e);
    }
    tracing::info!(
        "{media_type} '{stored}' recorded in {:?}",
        start.elapsed()
    );

    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// Lists metadata of all uploaded files in upload order.
#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "All upload records", body = [UploadRecord]),
        (status = 500, description = "Metadata cannot be read", body = String)
    ),
    tag = "media",
)]
pub async fn get_files(State(state): State<AppState>) -> Response {
    let metadata = state.metadata.lock().await;
    match metadata.load_all().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("metadata not loaded. Error: {e}");
            internal_server_error(&e)
        }
    }
}

/// Deletes a file and its record. Both the stored file name and the owner name must match.
#[utoipa::path(
    post,
    path = "/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "File and record deleted"),
        (status = 403, description = "No record with this file and owner", body = String),
        (status = 500, description = "Server error", body = String)
    ),
    tag = "media",
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> Response {
    let removed = {
        let mut metadata = state.metadata.lock().await;
        metadata.remove(&request.file, &request.name).await
    };

    let record = match removed {
        Ok(record) => record,
        Err(StoreError::NotFound) => {
            tracing::warn!(
                "file '{}' not deleted: no record owned by '{}'",
                request.file,
                request.name
            );
            return (StatusCode::FORBIDDEN, PERMISSION_DENIED).into_response();
        }
        Err(e) => {
            tracing::error!("file '{}' not deleted. Error: {e}", request.file);
            return internal_server_error(&e);
        }
    };

    // the record is gone at this point even if the blob cannot be removed
    match state.blobs.delete(record.media_type, &record.file).await {
        Ok(()) => {
            tracing::info!("{} '{}' deleted", record.media_type, record.file);
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::error!(
                "record of '{}' removed but blob not deleted. Error: {e}",
                record.file
            );
            internal_server_error(&e)
        }
    }
}

/// Streams file content. Any type segment other than `video` means photo.
#[utoipa::path(
    get,
    path = "/media/{type}/{filename}",
    responses(
        (status = 200, description = "Raw file content, content type follows the extension"),
        (status = 404, description = "File not found", body = String)
    ),
    tag = "media",
    params(
        ("type" = String, Path, description = "Media type: video or photo"),
        ("filename" = String, Path, description = "Stored file name")
    ),
)]
pub async fn get_media(
    Path((media_type, filename)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let media_type = MediaType::from_segment(&media_type);
    match state.blobs.open(media_type, &filename).await {
        Ok(Some((file, len))) => {
            tracing::info!("{media_type} '{filename}' size {len}");
            FileReply::new(file, len, filename).into_response()
        }
        Ok(None) => {
            tracing::error!("{media_type} '{filename}' not found");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
        Err(e) => {
            tracing::error!("{media_type} '{filename}' not read. Error: {e}");
            internal_server_error(&e)
        }
    }
}

fn upload_failure(e: &UploadError) -> Response {
    tracing::error!("{e}");
    let status = match e {
        UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Read(e) => e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
            .map_or(StatusCode::BAD_REQUEST, MultipartError::status),
    };
    (status, e.to_string()).into_response()
}

fn bad_request<E: ToString>(e: &E) -> Response {
    (StatusCode::BAD_REQUEST, e.to_string()).into_response()
}

fn internal_server_error<E: ToString>(e: &E) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

/// Reads the whole stream into memory, failing as soon as it grows past `limit` bytes.
async fn read_from_stream<S, E>(stream: S, limit: usize) -> Result<(Vec<u8>, usize), UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Sync + std::error::Error + Send + 'static,
{
    // Convert the stream into an `AsyncRead`.
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);
    let mut buffer = Vec::new();

    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut limited = body_reader.take(cap);
    let copied_bytes = tokio::io::copy(&mut limited, &mut buffer).await?;
    let copied_bytes = usize::try_from(copied_bytes).unwrap_or(usize::MAX);
    if copied_bytes > limit {
        return Err(UploadError::TooLarge(limit));
    }
    Ok((buffer, copied_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chunks(sizes: &[usize]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        let items: Vec<Result<Bytes, io::Error>> = sizes
            .iter()
            .map(|s| Ok(Bytes::from(vec![7u8; *s])))
            .collect();
        futures::stream::iter(items)
    }

    #[rstest]
    #[case(&[], 10, Some(0))]
    #[case(&[10], 10, Some(10))]
    #[case(&[4, 6], 10, Some(10))]
    #[case(&[11], 10, None)]
    #[case(&[5, 5, 1], 10, None)]
    #[trace]
    #[tokio::test]
    async fn read_from_stream_limit(
        #[case] sizes: &[usize],
        #[case] limit: usize,
        #[case] expected: Option<usize>,
    ) {
        // Act
        let result = read_from_stream(chunks(sizes), limit).await;

        // Assert
        match (result, expected) {
            (Ok((data, read)), Some(len)) => {
                assert_eq!(read, len);
                assert_eq!(data.len(), len);
            }
            (Err(UploadError::TooLarge(l)), None) => assert_eq!(l, limit),
            (other, _) => panic!("unexpected result {:?}", other.map(|(_, r)| r)),
        }
    }

    #[tokio::test]
    async fn read_from_stream_propagates_errors() {
        // Arrange
        let items: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];

        // Act
        let result = read_from_stream(futures::stream::iter(items), 100).await;

        // Assert
        assert!(matches!(result, Err(UploadError::Read(_))));
    }

    #[test]
    fn too_large_maps_to_413() {
        // Act
        let response = upload_failure(&UploadError::TooLarge(1));

        // Assert
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
