//! A staged output file bound to the checksum it had when it was written.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::checksum;

use super::RasterInfo;

/// Handle to a GeoTIFF produced by the pipeline.
///
/// The handle stops being valid as soon as the file is removed or its
/// content changes; readers check this before touching the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDataset {
    path: PathBuf,
    sha256: String,
}

impl StagedDataset {
    /// Hash `path` and bind to it. Blocking.
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sha256 = checksum::sha256_path(&path)?;
        Ok(Self { path, sha256 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// True while the file exists with the content it was bound to. Blocking (rehashes).
    pub fn is_valid(&self) -> bool {
        checksum::matches(&self.path, &self.sha256).unwrap_or(false)
    }

    fn ensure_valid(&self) -> Result<()> {
        if !self.is_valid() {
            anyhow::bail!(
                "staged dataset {} was removed or modified",
                self.path.display()
            );
        }
        Ok(())
    }

    /// Raster summary; refuses invalidated datasets.
    pub fn info(&self) -> Result<RasterInfo> {
        self.ensure_valid()?;
        super::describe(&self.path)
    }

    /// Band pixels; refuses invalidated datasets.
    #[cfg(feature = "gdal")]
    pub fn read_band(&self, band: usize) -> Result<ndarray::Array2<f64>> {
        self.ensure_valid()?;
        super::read_band(&self.path, band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidated_by_change_or_removal() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("POP_2020_54009_1000.tif");
        std::fs::write(&p, b"original").unwrap();

        let ds = StagedDataset::bind(&p).unwrap();
        assert!(ds.is_valid());
        assert_eq!(ds.path(), p.as_path());
        assert_eq!(ds.sha256().len(), 64);

        std::fs::write(&p, b"modified").unwrap();
        assert!(!ds.is_valid());
        assert!(ds.info().is_err());

        std::fs::write(&p, b"original").unwrap();
        assert!(ds.is_valid());

        std::fs::remove_file(&p).unwrap();
        assert!(!ds.is_valid());
        let err = ds.info().unwrap_err();
        assert!(err.to_string().contains("removed or modified"));
    }

    #[test]
    fn bind_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StagedDataset::bind(dir.path().join("nope.tif")).is_err());
    }
}
