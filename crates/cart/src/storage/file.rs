//! Directory-backed storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{debug, instrument};

use super::{CartStorage, StorageError};

/// Stores each key as a file inside a directory.
///
/// Keys like `@GoMarketplace:products` are not safe file names, so the file
/// name is the URL-safe base64 of the key. Writes go to a temporary file that
/// is renamed over the old one, so a crash mid-write leaves the previous
/// value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Longest key, in bytes, whose encoded temp file name fits in 255 bytes.
    pub const MAX_KEY_LEN: usize = 184;

    /// Create storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the stored values.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the value for `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(key.as_bytes())))
    }

    fn checked_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.len() > Self::MAX_KEY_LEN {
            return Err(StorageError::Rejected(format!(
                "key is {} bytes, limit is {}",
                key.len(),
                Self::MAX_KEY_LEN
            )));
        }
        Ok(self.path_for(key))
    }
}

impl CartStorage for FileStorage {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.checked_path(key)?).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored value");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.checked_path(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), "Stored value");
        Ok(())
    }
}
