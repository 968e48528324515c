//! Archive files on disk.
//!
//! Downloads land in `<name>.part` next to their final path, are written at
//! explicit offsets so an interrupted transfer can continue where it stopped,
//! and are renamed into place only once complete.

mod writer;

pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `POP_2020_54009_1000_global.zip` → `POP_2020_54009_1000_global.zip.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("tile.zip"));
        assert_eq!(p.to_string_lossy(), "tile.zip.part");
        let p2 = temp_path(Path::new("/cache/archives/POP_2020_54009_1000_R4_C19.zip"));
        assert_eq!(
            p2.to_string_lossy(),
            "/cache/archives/POP_2020_54009_1000_R4_C19.zip.part"
        );
    }

    #[test]
    fn write_resume_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("archive.zip");
        let tp = temp_path(&final_path);

        let writer = StorageWriter::create(&tp).unwrap();
        writer.write_at(0, b"hello ").unwrap();
        writer.sync().unwrap();
        drop(writer);

        let writer = StorageWriter::open_existing(&tp).unwrap();
        let offset = writer.len().unwrap();
        assert_eq!(offset, 6);
        writer.write_at(offset, b"world").unwrap();
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
    }

    #[test]
    fn truncate_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("a.zip.part");
        let writer = StorageWriter::create(&tp).unwrap();
        writer.write_at(0, b"stale-bytes-from-old-file").unwrap();
        writer.write_at(0, b"fresh").unwrap();
        writer.truncate(5).unwrap();
        assert_eq!(writer.len().unwrap(), 5);
        assert_eq!(std::fs::read(&tp).unwrap(), b"fresh");
    }

    #[test]
    fn create_discards_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("b.zip.part");
        std::fs::write(&tp, b"leftover").unwrap();
        let writer = StorageWriter::create(&tp).unwrap();
        assert_eq!(writer.len().unwrap(), 0);
        assert_eq!(writer.temp_path(), tp.as_path());
    }
}
