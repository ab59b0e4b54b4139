// ── File fetcher – whole-file download over an open transfer channel ────────

use log::{debug, info};
use pifetch_core::{FetchError, FetchResult, TransferSpec};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 64 * 1024;

/// Something remote files can be read from, e.g. an SFTP channel.
pub trait RemoteFileSource {
    /// Open `path` for reading. A missing path is `RemoteFileNotFound`.
    fn open_remote(&self, path: &str) -> FetchResult<Box<dyn Read + '_>>;
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub local_path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the bytes written.
    pub sha256: String,
}

/// Copy `spec.remote_path` to `spec.local_path`, replacing any existing file.
///
/// The remote file is opened before anything local is touched, and the
/// content lands in a temporary sibling that is renamed into place only
/// after the last byte is written. A failed download therefore leaves the
/// destination exactly as it was.
pub fn fetch_file<S>(source: &S, spec: &TransferSpec) -> FetchResult<FetchOutcome>
where
    S: RemoteFileSource + ?Sized,
{
    let local_path = spec.resolved_local_path()?;
    debug!("Fetching '{}' -> '{}'", spec.remote_path, local_path.display());

    let mut remote = source.open_remote(&spec.remote_path)?;

    let dir = parent_dir(&local_path);
    let mut tmp = tempfile::Builder::new()
        .prefix(".pifetch-")
        .suffix(".part")
        .tempfile_in(&dir)
        .map_err(|e| FetchError::local_write(local_path.display(), e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes: u64 = 0;
    loop {
        let n = remote.read(&mut buf).map_err(|e| {
            FetchError::connection(format!("Read error on remote '{}'", spec.remote_path))
                .with_detail(e.to_string())
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        tmp.write_all(&buf[..n])
            .map_err(|e| FetchError::local_write(local_path.display(), e))?;
        bytes += n as u64;
    }
    drop(remote);

    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| FetchError::local_write(local_path.display(), e))?;
    tmp.persist(&local_path)
        .map_err(|e| FetchError::local_write(local_path.display(), e.error))?;

    let sha256 = hex::encode(hasher.finalize());
    info!(
        "Downloaded '{}' to '{}' ({} bytes, sha256 {})",
        spec.remote_path,
        local_path.display(),
        bytes,
        sha256
    );
    Ok(FetchOutcome {
        local_path,
        bytes,
        sha256,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
