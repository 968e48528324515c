//! Offset writer for `.part` archive files.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Writer for a temp archive file. Cheap to clone; the curl write callback
/// owns one clone while the caller keeps another to finalize.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    fn open(temp_path: &Path, fresh: bool) -> Result<Self> {
        let mut opts = File::options();
        opts.read(true).write(true);
        if fresh {
            opts.create(true).truncate(true);
        }
        let file = opts
            .open(temp_path)
            .with_context(|| format!("open {}", temp_path.display()))?;
        Ok(StorageWriter {
            file: Arc::new(file),
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Start a transfer from scratch; an existing file is truncated.
    pub fn create(temp_path: &Path) -> Result<Self> {
        Self::open(temp_path, true)
    }

    /// Reopen a partial file to continue it. The file must exist.
    pub fn open_existing(temp_path: &Path) -> Result<Self> {
        Self::open(temp_path, false)
    }

    /// Current size on disk; the resume offset of a sequential download.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata().context("stat temp file")?.len())
    }

    /// Cut the file to `len` bytes (drops the tail of an abandoned transfer).
    pub fn truncate(&self, len: u64) -> Result<()> {
        self.file.set_len(len).context("truncate temp file")?;
        Ok(())
    }

    /// Write `data` at `offset`. Does not touch the file cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.file
            .write_all_at(data, offset)
            .with_context(|| format!("write {} at {}", self.temp_path.display(), offset))?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    /// Sync file data to disk. Call before `finalize`.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().with_context(|| format!("sync {}", self.temp_path.display()))?;
        Ok(())
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Close the file and move it to `final_path` (same filesystem).
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let StorageWriter { file, temp_path } = self;
        drop(file);
        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!("rename {} to {}", temp_path.display(), final_path.display())
        })
    }
}
