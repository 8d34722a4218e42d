use eyre::{Context, ContextCompat, Result};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

/// Files may carry API keys, keep them private to the user
const FILE_MODE: u32 = 0o600;

/// A file written next to its target, waiting to be renamed over it
///
/// Renaming within one directory is atomic, so readers of the target see
/// either the old contents or the new ones, never a truncated file.
pub struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
    previous: Option<Vec<u8>>,
}

impl StagedFile {
    /// Write `contents` to a temp file beside `target`
    ///
    /// `previous` is what the target held before, `None` if it didn't exist.
    /// It is put back by [`StagedFile::rollback`].
    pub async fn stage(target: &Path, contents: &[u8], previous: Option<Vec<u8>>) -> Result<Self> {
        let file_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .wrap_err_with(|| format!("Invalid file name: {:?}", target))?;
        let parent = target
            .parent()
            .wrap_err_with(|| format!("No parent directory for {:?}", target))?;

        fs::create_dir_all(parent)
            .await
            .wrap_err_with(|| format!("Failed to create directory: {:?}", parent))?;

        let tmp = parent.join(format!(".{file_name}.tmp"));
        if let Err(e) = write_synced(&tmp, contents).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        Ok(Self {
            tmp,
            target: target.to_path_buf(),
            previous,
        })
    }

    /// The file this staged file replaces
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged contents over the target
    pub async fn commit(&self) -> Result<()> {
        fs::rename(&self.tmp, &self.target)
            .await
            .wrap_err_with(|| format!("Failed to move {:?} into place", self.target))
    }

    /// Remove the temp file if it is still around
    pub async fn discard(&self) {
        let _ = fs::remove_file(&self.tmp).await;
    }

    /// Put back what the target held before a successful [`StagedFile::commit`]
    pub async fn rollback(&self) -> Result<()> {
        match &self.previous {
            Some(previous) => {
                write_synced(&self.tmp, previous).await?;
                self.commit().await
            }
            None => match fs::remove_file(&self.target).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e).wrap_err_with(|| format!("Failed to remove {:?}", self.target)),
            },
        }
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
        .await
        .wrap_err_with(|| format!("Failed to open temp file: {:?}", path))?;

    file.write_all(contents)
        .await
        .wrap_err_with(|| format!("Failed to write temp file: {:?}", path))?;
    file.sync_all()
        .await
        .wrap_err_with(|| format!("Failed to sync temp file: {:?}", path))
}

/// Current contents of `path`, `None` if it doesn't exist
pub async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(existing) => Ok(Some(existing)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {:?}", path)),
    }
}
