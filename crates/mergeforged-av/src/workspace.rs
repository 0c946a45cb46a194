//! Scratch space and file finalization for a merge job.
//!
//! A [`Workspace`] is a hidden temporary directory inside the job's working
//! directory. Remuxed and standardized intermediates and concat lists live
//! there and are removed when the workspace is dropped, whether the job
//! succeeded or not. Keeping it on the same filesystem as the output lets
//! finished files be moved into place with a rename.

use std::path::{Path, PathBuf};

use mergeforged_common::JobId;
use tempfile::TempDir;

use crate::args::concat_list_entry;
use crate::{Error, Result};

/// Scratch directory for one merge job.
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a scratch directory inside `work_dir`.
    pub fn new(work_dir: &Path, job: &JobId) -> Result<Self> {
        std::fs::create_dir_all(work_dir)
            .map_err(|e| Error::filesystem("create", work_dir, e))?;

        let temp_dir = tempfile::Builder::new()
            .prefix(&format!(".mergeforged-{}-", job.short()))
            .tempdir_in(work_dir)
            .map_err(|e| Error::filesystem("create scratch dir in", work_dir, e))?;

        Ok(Self { temp_dir })
    }

    /// Create a scratch directory next to `output`.
    pub fn beside(output: &Path, job: &JobId) -> Result<Self> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir, job)
    }

    /// Path to the scratch directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a path for a named temporary file inside the workspace.
    pub fn temp_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write a concat demuxer list naming `files` by absolute path.
    pub fn write_concat_list(&self, name: &str, files: &[PathBuf]) -> Result<PathBuf> {
        let mut contents = String::new();
        for file in files {
            let absolute = std::path::absolute(file)
                .map_err(|e| Error::filesystem("resolve", file, e))?;
            contents.push_str(&concat_list_entry(&absolute));
            contents.push('\n');
        }

        let list = self.temp_file(name);
        std::fs::write(&list, contents).map_err(|e| Error::filesystem("write", &list, e))?;
        Ok(list)
    }
}

/// Check that a tool produced a non-empty file; returns its size.
pub fn verify_nonempty(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        Ok(_) => Err(Error::verification(path, "output file is empty")),
        Err(_) => Err(Error::verification(path, "output file was not created")),
    }
}

/// Move `new` over `original`.
///
/// A rename replaces the original in one step; across filesystems the file
/// is copied and the source removed. On any error `original` is untouched
/// unless the copy itself fails midway.
pub fn replace_file(new: &Path, original: &Path) -> Result<()> {
    if std::fs::rename(new, original).is_ok() {
        return Ok(());
    }

    std::fs::copy(new, original).map_err(|e| Error::filesystem("replace", original, e))?;
    let _ = std::fs::remove_file(new);
    Ok(())
}

/// Move a finished file from scratch space to its destination.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to).map_err(|e| Error::filesystem("move", to, e))?;
    let _ = std::fs::remove_file(from);
    Ok(())
}
