//! Local staging of quarantined files.

use std::io;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const COPY_CHUNK: usize = 64 * 1024;
const MAX_HINT_LEN: usize = 64;

/// A decompressed copy of a quarantined file on local disk.
///
/// The file is deleted when this value is dropped; [`StagedFile::remove`]
/// does the same but reports failures.
#[derive(Debug)]
pub(crate) struct StagedFile {
    path: TempPath,
    size: u64,
    digest: blake3::Hash,
}

impl StagedFile {
    /// Path of the staged copy.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes staged.
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// BLAKE3 digest of the staged bytes.
    pub(crate) fn digest(&self) -> &blake3::Hash {
        &self.digest
    }

    /// Deletes the staged copy.
    pub(crate) fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Turns a quarantine name into a safe temp file prefix.
fn prefix_for(hint: &str) -> String {
    let mut prefix: String = hint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_HINT_LEN)
        .collect();
    if prefix.is_empty() || prefix.starts_with('.') {
        prefix.insert_str(0, "scan");
    }
    prefix.push('.');
    prefix
}

/// Copies `reader` into a new uniquely named file in `dir`.
///
/// On error the partially written file is closed and removed before
/// returning.
pub(crate) async fn stage<R>(dir: &Path, hint: &str, reader: &mut R) -> io::Result<StagedFile>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let (file, path) = tempfile::Builder::new()
        .prefix(&prefix_for(hint))
        .tempfile_in(dir)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).await?;
        size += n as u64;
    }
    file.flush().await?;
    drop(file);

    Ok(StagedFile {
        path,
        size,
        digest: hasher.finalize(),
    })
}
