use std::env;
use std::path::PathBuf;

use crate::blobs::MAX_FILE_SIZE;

const PORT: &str = "3000";
const DATA_DIR: &str = "data";
const UPLOAD_DIR: &str = "uploads";
const PUBLIC_DIR: &str = "public";
const METADATA_FILE: &str = "metadata.json";

/// Service settings. Every value has a fixed default and may be overridden from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory of the metadata file
    pub data_dir: PathBuf,
    /// Root of the `photos` and `videos` directories
    pub upload_dir: PathBuf,
    /// Static assets of the browser UI
    pub public_dir: PathBuf,
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from(DATA_DIR),
            upload_dir: PathBuf::from(UPLOAD_DIR),
            public_dir: PathBuf::from(PUBLIC_DIR),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let port = env::var("MEDIABOX_PORT").unwrap_or_else(|_| String::from(PORT));
        let port = port.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid MEDIABOX_PORT '{port}', using {PORT}");
            3000
        });
        let data_dir = env::var("MEDIABOX_DATA_DIR").unwrap_or_else(|_| String::from(DATA_DIR));
        let upload_dir =
            env::var("MEDIABOX_UPLOAD_DIR").unwrap_or_else(|_| String::from(UPLOAD_DIR));
        let public_dir =
            env::var("MEDIABOX_PUBLIC_DIR").unwrap_or_else(|_| String::from(PUBLIC_DIR));

        Self {
            port,
            data_dir: PathBuf::from(data_dir),
            upload_dir: PathBuf::from(upload_dir),
            public_dir: PathBuf::from(public_dir),
            max_file_size: MAX_FILE_SIZE,
        }
    }

    #[must_use]
    pub fn metadata_file(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        // Act
        let config = Config::default();

        // Assert
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_file_size, 209_715_200);
        assert_eq!(config.metadata_file(), PathBuf::from("data/metadata.json"));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.public_dir, PathBuf::from("public"));
    }
}
