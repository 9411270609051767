use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Streams a stored blob back to the client.
pub struct FileReply {
    file: File,
    len: u64,
    name: String,
}

impl FileReply {
    #[must_use]
    pub fn new(file: File, len: u64, name: String) -> Self {
        Self { file, len, name }
    }

    /// Content type guessed from the file extension.
    fn content_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .to_string()
    }
}

impl IntoResponse for FileReply {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        let mut res = Body::from_stream(ReaderStream::new(self.file)).into_response();
        if let Ok(val) = HeaderValue::from_str(&content_type) {
            res.headers_mut().insert(header::CONTENT_TYPE, val);
        }
        res.headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.len));

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1-cat.png", "image/png")]
    #[case("1-cat.JPG", "image/jpeg")]
    #[case("1-clip.mp4", "video/mp4")]
    #[case("1-clip.webm", "video/webm")]
    #[case("1-notes", "application/octet-stream")]
    #[case("1-archive.unknownext", "application/octet-stream")]
    #[trace]
    #[tokio::test]
    async fn content_type(#[case] name: &str, #[case] expected: &str) {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        tokio::fs::write(&path, b"x").await.unwrap();
        let file = File::open(&path).await.unwrap();
        let reply = FileReply::new(file, 1, name.to_owned());

        // Act
        let response = reply.into_response();

        // Assert
        assert_eq!(response.headers()[header::CONTENT_TYPE], expected);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "1");
    }
}
