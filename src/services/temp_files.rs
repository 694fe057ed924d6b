use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Mode of the scratch directory.
pub const DIR_MODE: u32 = 0o770;

/// Mode of staged object files.
pub const FILE_MODE: u32 = 0o660;

const DIR_PREFIX: &str = "object_scanner_";

/// A freshly created scratch file, opened for writing.
#[derive(Debug)]
pub struct TempFile {
    pub path: PathBuf,
    pub file: File,
}

/// Owns the process-wide scratch directory objects are staged in before scanning.
///
/// The directory is created once, when the manager is built at startup, and its
/// path never changes afterwards. Staged files are left in place after a scan.
#[derive(Debug)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    /// Create a randomly named scratch directory under `root`.
    pub fn new(root: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)?
            .keep();
        set_dir_permissions(&dir)?;

        tracing::info!(dir = %dir.display(), "📂 Scratch directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a unique path in the scratch directory. `ext` should include the dot.
    ///
    /// If the directory was removed or replaced from under us it is re-created at
    /// the same path, so concurrent callers always agree on where files go.
    pub async fn allocate(&self, ext: &str) -> std::io::Result<PathBuf> {
        // symlink_metadata so a link to some other directory is not followed
        let existing = match tokio::fs::symlink_metadata(&self.dir).await {
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        match existing {
            Some(meta) if meta.is_dir() => {}
            Some(_) => {
                tracing::warn!(dir = %self.dir.display(), "Scratch directory replaced, re-creating");
                remove_entry(&self.dir).await?;
                self.recreate_dir().await?;
            }
            None => {
                tracing::warn!(dir = %self.dir.display(), "Scratch directory missing, re-creating");
                self.recreate_dir().await?;
            }
        }

        Ok(self.dir.join(format!("{}{}", Uuid::new_v4().simple(), ext)))
    }

    async fn recreate_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.inspect_err(|e| {
            tracing::error!(error = %e, "failed to re-create scratch directory");
        })?;
        set_dir_permissions(&self.dir)
    }

    /// Allocate a path and create the file with restrictive permissions.
    pub async fn create(&self, ext: &str) -> std::io::Result<TempFile> {
        let path = self.allocate(ext).await?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let file = options.open(&path).await.inspect_err(|e| {
            tracing::error!(error = %e, path = %path.display(), "failed to create temporary file");
        })?;

        Ok(TempFile { path, file })
    }
}

/// Remove whatever non-directory sits at `path`. Another task may have already
/// removed it, or even put the directory back.
async fn remove_entry(path: &Path) -> std::io::Result<()> {
    let Err(e) = tokio::fs::remove_file(path).await else {
        return Ok(());
    };
    if e.kind() == ErrorKind::NotFound {
        return Ok(());
    }

    let restored = tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir());
    if restored {
        return Ok(());
    }

    tracing::error!(error = %e, path = %path.display(), "failed to remove entry at scratch path");
    Err(e)
}

#[cfg(unix)]
fn set_dir_permissions(dir: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
}

#[cfg(not(unix))]
fn set_dir_permissions(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
