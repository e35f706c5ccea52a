//! Size-limited UTF-8 file reader.

use async_trait::async_trait;
use sift_indexer::{FileReader, ReadOptions};
use tracing::debug;

use crate::error::{FsError, Result};

/// Default upper bound on file size.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Reads whole files with `tokio::fs`, refusing oversize or non-UTF-8 input.
#[derive(Debug, Clone)]
pub struct FsFileReader {
    max_file_size: u64,
}

impl FsFileReader {
    /// Create a reader with the default size limit.
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the size limit in bytes.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// The size limit in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Read `path` as a string.
    pub async fn read_to_string(&self, path: &str, encoding: &str) -> Result<String> {
        if !is_utf8(encoding) {
            return Err(FsError::UnsupportedEncoding(encoding.to_string()));
        }

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::FileNotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.len() > self.max_file_size {
            return Err(FsError::FileTooLarge {
                path: path.to_string(),
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        debug!("Read {} bytes from {path}", bytes.len());
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_string()))
    }
}

impl Default for FsFileReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileReader for FsFileReader {
    async fn read(&self, path: &str, options: &ReadOptions) -> anyhow::Result<String> {
        Ok(self.read_to_string(path, &options.encoding).await?)
    }
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}
