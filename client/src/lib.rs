use std::path::PathBuf;

use chrono::DateTime;
use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::{DeleteRequest, UploadRecord};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid service URI: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server answered {0}: {1}")]
    Status(StatusCode, String),
}

pub struct UploadParams {
    pub uri: String,
    pub file: String,
    pub name: String,
}

/// Joins a route onto the service base URI.
pub fn endpoint(uri: &str, route: &str) -> Result<Url, ClientError> {
    let mut base = Url::parse(uri)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(route.trim_start_matches('/'))?)
}

/// Uploads a local file. The service answers a successful upload with a redirect,
/// which is not followed.
pub async fn upload_file(params: UploadParams) -> Result<StatusCode, ClientError> {
    let path = PathBuf::from(&params.file);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    let f = File::open(&path).await?;
    let len = f.metadata().await?.len();
    let stream = reqwest::Body::wrap_stream(ReaderStream::new(f));
    let part = Part::stream_with_length(stream, len)
        .file_name(file_name)
        .mime_str(mime.as_ref())?;
    let form = Form::new().text("name", params.name).part("file", part);

    let client = Client::builder().redirect(Policy::none()).build()?;
    let response = client
        .post(endpoint(&params.uri, "upload")?)
        .multipart(form)
        .send()
        .await?;
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        Ok(status)
    } else {
        Err(ClientError::Status(status, response.text().await?))
    }
}

pub async fn list_files(uri: &str) -> Result<Vec<UploadRecord>, ClientError> {
    let response = Client::new().get(endpoint(uri, "files")?).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status(status, response.text().await?));
    }
    Ok(response.json().await?)
}

/// Deletes a stored file. Fails with a 403 status when `name` does not own `file`.
pub async fn delete_file(uri: &str, file: &str, name: &str) -> Result<StatusCode, ClientError> {
    let request = DeleteRequest {
        file: file.to_owned(),
        name: name.to_owned(),
    };
    let response = Client::new()
        .post(endpoint(uri, "delete")?)
        .json(&request)
        .send()
        .await?;
    let status = response.status();
    if status.is_success() {
        Ok(status)
    } else {
        Err(ClientError::Status(status, response.text().await?))
    }
}

/// Renders an upload time in milliseconds as UTC date and time.
#[must_use]
pub fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[must_use]
pub fn render_table(records: &[UploadRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Original").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Owner").add_attribute(Attribute::Bold),
            Cell::new("Uploaded").add_attribute(Attribute::Bold),
        ]);

    for r in records {
        table.add_row(vec![
            Cell::new(&r.file),
            Cell::new(&r.original),
            Cell::new(r.media_type),
            Cell::new(&r.name),
            Cell::new(format_timestamp(r.timestamp)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::MediaType;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:3000", "upload", "http://localhost:3000/upload")]
    #[case("http://localhost:3000/", "files", "http://localhost:3000/files")]
    #[case("http://localhost:3000/", "/delete", "http://localhost:3000/delete")]
    #[case("http://host/mediabox", "files", "http://host/mediabox/files")]
    #[case("http://host/mediabox/", "/files", "http://host/mediabox/files")]
    #[trace]
    fn endpoint_tests(#[case] base: &str, #[case] route: &str, #[case] expected: &str) {
        // Act
        let url = endpoint(base, route).unwrap();

        // Assert
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn endpoint_incorrect_uri() {
        // Act
        let result = endpoint("http/localhost", "files");

        // Assert
        assert!(matches!(result, Err(ClientError::Url(_))));
    }

    #[rstest]
    #[case(0, "1970-01-01 00:00:00")]
    #[case(1_700_000_000_123, "2023-11-14 22:13:20")]
    #[case(i64::MAX, "9223372036854775807")]
    #[trace]
    fn format_timestamp_tests(#[case] millis: i64, #[case] expected: &str) {
        // Act
        let actual = format_timestamp(millis);

        // Assert
        assert_eq!(actual, expected);
    }

    #[test]
    fn table_has_row_per_record() {
        // Arrange
        let records = vec![
            UploadRecord {
                file: "1-cat.png".to_owned(),
                original: "cat.png".to_owned(),
                media_type: MediaType::Photo,
                name: "ala".to_owned(),
                timestamp: 0,
            },
            UploadRecord {
                file: "2-clip.mp4".to_owned(),
                original: "clip.mp4".to_owned(),
                media_type: MediaType::Video,
                name: "ola".to_owned(),
                timestamp: 0,
            },
        ];

        // Act
        let table = render_table(&records);

        // Assert
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("1-cat.png"));
        assert!(rendered.contains("video"));
        assert!(rendered.contains("ola"));
    }
}
