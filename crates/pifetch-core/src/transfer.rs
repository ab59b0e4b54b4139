// ── TransferSpec – one remote file to one local path ────────────────────────

use crate::error::{FetchError, FetchResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl TransferSpec {
    pub fn new(remote_path: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_path: local_path.into(),
        }
    }

    /// Save the remote file under its own name in the working directory.
    pub fn into_working_dir(remote_path: impl Into<String>) -> FetchResult<Self> {
        let remote_path = remote_path.into();
        let name = Path::new(&remote_path)
            .file_name()
            .ok_or_else(|| {
                FetchError::config(format!(
                    "Remote path '{}' has no file name to save locally",
                    remote_path
                ))
            })?
            .to_owned();
        Ok(Self {
            remote_path,
            local_path: PathBuf::from(name),
        })
    }

    /// Local destination, anchored at the working directory when relative.
    pub fn resolved_local_path(&self) -> FetchResult<PathBuf> {
        if self.local_path.is_absolute() {
            return Ok(self.local_path.clone());
        }
        let cwd = std::env::current_dir()
            .map_err(|e| FetchError::local_write(self.local_path.display(), e))?;
        Ok(cwd.join(&self.local_path))
    }
}
