use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use kernel::MediaType;
use tokio::fs;

/// Upper bound for a single uploaded file.
pub const MAX_FILE_SIZE: usize = 200 * 1024 * 1024; /* 200MB */

/// Raw media files kept in one directory per media type.
#[derive(Clone)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Creates photo and video directories when missing.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.dir(MediaType::Photo)).await?;
        fs::create_dir_all(self.dir(MediaType::Video)).await
    }

    #[must_use]
    pub fn dir(&self, media_type: MediaType) -> PathBuf {
        self.root.join(media_type.dir_name())
    }

    /// Builds the on-disk name of an upload: millisecond timestamp followed by the client's file name.
    /// Two uploads of the same name within one millisecond get the same stored name.
    #[must_use]
    pub fn stored_name(timestamp: i64, original: &str) -> String {
        let original = original.replace(['/', '\\'], "_");
        format!("{timestamp}-{original}")
    }

    pub async fn store(
        &self,
        media_type: MediaType,
        data: &[u8],
        original: &str,
    ) -> io::Result<String> {
        self.store_at(media_type, data, original, Utc::now().timestamp_millis())
            .await
    }

    /// Writes the blob under the name derived from `timestamp`, overwriting any file with the same name.
    pub async fn store_at(
        &self,
        media_type: MediaType,
        data: &[u8],
        original: &str,
        timestamp: i64,
    ) -> io::Result<String> {
        let stored = Self::stored_name(timestamp, original);
        fs::write(self.dir(media_type).join(&stored), data).await?;
        Ok(stored)
    }

    /// Removes the blob. A missing file is an error.
    pub async fn delete(&self, media_type: MediaType, stored: &str) -> io::Result<()> {
        let path = self
            .resolve(media_type, stored)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, stored.to_owned()))?;
        fs::remove_file(path).await
    }

    /// Opens the blob for streaming. Returns the file with its length or `None` when there is no such blob.
    pub async fn open(
        &self,
        media_type: MediaType,
        stored: &str,
    ) -> io::Result<Option<(fs::File, u64)>> {
        let Some(path) = self.resolve(media_type, stored) else {
            return Ok(None);
        };
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Ok(None);
        }
        Ok(Some((file, meta.len())))
    }

    /// Joins a stored name onto the type directory. Names that could leave the directory resolve to nothing.
    fn resolve(&self, media_type: MediaType, stored: &str) -> Option<PathBuf> {
        if stored.is_empty() || stored == "." || stored == ".." || stored.contains(['/', '\\']) {
            return None;
        }
        Some(self.dir(media_type).join(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn storage() -> (tempfile::TempDir, BlobStorage) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStorage::new(dir.path().join("uploads"));
        blobs.ensure_dirs().await.unwrap();
        (dir, blobs)
    }

    #[rstest]
    #[case(1, "cat.png", "1-cat.png")]
    #[case(1_700_000_000_123, "clip.mp4", "1700000000123-clip.mp4")]
    #[case(5, "", "5-")]
    #[case(5, "dir/cat.png", "5-dir_cat.png")]
    #[case(5, "..\\..\\cat.png", "5-.._.._cat.png")]
    #[trace]
    fn stored_name(#[case] timestamp: i64, #[case] original: &str, #[case] expected: &str) {
        // Act
        let actual = BlobStorage::stored_name(timestamp, original);

        // Assert
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../metadata.json")]
    #[case("a/b")]
    #[case("..\\a")]
    #[trace]
    fn resolve_rejects_escaping_names(#[case] stored: &str) {
        // Arrange
        let blobs = BlobStorage::new("uploads");

        // Act
        let resolved = blobs.resolve(MediaType::Photo, stored);

        // Assert
        assert!(resolved.is_none());
    }

    #[rstest]
    #[case(MediaType::Photo, "photos")]
    #[case(MediaType::Video, "videos")]
    #[trace]
    #[tokio::test]
    async fn store_writes_into_type_dir(#[case] media_type: MediaType, #[case] dir: &str) {
        // Arrange
        let (tmp, blobs) = storage().await;

        // Act
        let stored = blobs.store(media_type, b"content", "a.bin").await.unwrap();

        // Assert
        let path = tmp.path().join("uploads").join(dir).join(&stored);
        assert_eq!(std::fs::read(path).unwrap(), b"content");
        assert!(stored.ends_with("-a.bin"));
    }

    #[tokio::test]
    async fn same_millisecond_same_name_overwrites() {
        // Arrange
        let (_tmp, blobs) = storage().await;

        // Act
        let first = blobs
            .store_at(MediaType::Photo, b"first", "a.png", 42)
            .await
            .unwrap();
        let second = blobs
            .store_at(MediaType::Photo, b"second", "a.png", 42)
            .await
            .unwrap();

        // Assert
        assert_eq!(first, second);
        let (mut file, len) = blobs.open(MediaType::Photo, &first).await.unwrap().unwrap();
        let mut content = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut content)
            .await
            .unwrap();
        assert_eq!(content, b"second");
        assert_eq!(len, 6);
        let entries = std::fs::read_dir(blobs.dir(MediaType::Photo)).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn open_missing_is_none() {
        // Arrange
        let (_tmp, blobs) = storage().await;

        // Act
        let result = blobs.open(MediaType::Video, "1-none.mp4").await.unwrap();

        // Assert
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn open_looks_only_into_type_dir() {
        // Arrange
        let (_tmp, blobs) = storage().await;
        let stored = blobs
            .store_at(MediaType::Video, b"v", "clip.mp4", 7)
            .await
            .unwrap();

        // Act
        let as_photo = blobs.open(MediaType::Photo, &stored).await.unwrap();
        let as_video = blobs.open(MediaType::Video, &stored).await.unwrap();

        // Assert
        assert!(as_photo.is_none());
        assert!(as_video.is_some());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        // Arrange
        let (_tmp, blobs) = storage().await;
        let stored = blobs
            .store_at(MediaType::Photo, b"p", "a.png", 7)
            .await
            .unwrap();

        // Act
        blobs.delete(MediaType::Photo, &stored).await.unwrap();

        // Assert
        assert!(!blobs.dir(MediaType::Photo).join(stored).exists());
    }

    #[tokio::test]
    async fn delete_missing_fails() {
        // Arrange
        let (_tmp, blobs) = storage().await;

        // Act
        let result = blobs.delete(MediaType::Photo, "1-none.png").await;

        // Assert
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
