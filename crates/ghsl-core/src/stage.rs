//! Stage tile archives: pull the GeoTIFF out of each downloaded zip.
//!
//! A GHSL archive holds one raster plus documentation (PDF, metadata
//! sheets). Exactly one `.tif` member is expected; it is written flat into
//! the work dir under its own file name.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::read::ZipArchive;

use crate::storage::temp_path;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{}: cannot read zip: {source}", .archive.display())]
    Zip {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{}: archive contains no .tif file", .0.display())]
    NoTif(PathBuf),
    #[error("{}: archive contains {count} .tif files, expected one", .archive.display())]
    MultipleTifs { archive: PathBuf, count: usize },
    #[error("{}: unsafe member path {member:?}", .archive.display())]
    UnsafePath { archive: PathBuf, member: String },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn is_tif(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".tif")
}

/// Extract the single `.tif` member of `archive` into `dest_dir` and return its path.
///
/// Blocking; an existing file with the same name is replaced.
pub fn extract_tif(archive: &Path, dest_dir: &Path) -> Result<PathBuf, StageError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StageError::Io { path, source }
    };
    let zip_err = |source| StageError::Zip {
        archive: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(io_err(archive))?;
    let mut zip = ZipArchive::new(file).map_err(zip_err)?;

    let mut tifs = Vec::new();
    for i in 0..zip.len() {
        let member = zip.by_index_raw(i).map_err(zip_err)?;
        if !member.is_dir() && is_tif(member.name()) {
            tifs.push(i);
        }
    }
    let index = match tifs.as_slice() {
        [] => return Err(StageError::NoTif(archive.to_path_buf())),
        [one] => *one,
        many => {
            return Err(StageError::MultipleTifs {
                archive: archive.to_path_buf(),
                count: many.len(),
            })
        }
    };

    let mut member = zip.by_index(index).map_err(zip_err)?;
    let unsafe_path = || StageError::UnsafePath {
        archive: archive.to_path_buf(),
        member: member.name().to_string(),
    };
    let name = member
        .enclosed_name()
        .and_then(|p| p.file_name().map(PathBuf::from))
        .ok_or_else(unsafe_path)?;

    std::fs::create_dir_all(dest_dir).map_err(io_err(dest_dir))?;
    let dest = dest_dir.join(name);
    let tmp = temp_path(&dest);
    {
        let mut out = File::create(&tmp).map_err(io_err(&tmp))?;
        io::copy(&mut member, &mut out).map_err(io_err(&tmp))?;
        out.sync_all().map_err(io_err(&tmp))?;
    }
    std::fs::rename(&tmp, &dest).map_err(io_err(&dest))?;
    tracing::debug!(archive = %archive.display(), tif = %dest.display(), "staged");
    Ok(dest)
}
