//! Gzipped tar snapshots used for vendoring.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use crate::error::{IoResultExt, Result, SourceError};

/// Extract a `.tar.gz` into `dest_dir`, keeping paths as they are stored.
///
/// Entries that would land outside `dest_dir` are rejected.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).at_path("open", archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    extract_tar(decoder, archive_path, dest_dir)
}

fn extract_tar<R: Read>(reader: R, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir).at_path("create", dest_dir)?;
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries().at_path("read", archive_path)? {
        let mut entry = entry.at_path("read", archive_path)?;
        let path = entry.path().at_path("read", archive_path)?.into_owned();

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(SourceError::Filesystem {
                action: "extract",
                path: archive_path.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("path traversal in entry {}", path.display()),
                ),
            });
        }

        // Skips entries `unpack_in` considers unsafe, already rejected above.
        entry.unpack_in(dest_dir).at_path("extract into", dest_dir)?;
    }

    Ok(())
}

/// Gzip an uncompressed tar stream into `dest`, atomically.
pub fn write_tar_gz(tar_bytes: &[u8], dest: &Path) -> Result<()> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).at_path("create", parent)?;

    let tmp = NamedTempFile::new_in(parent).at_path("create a temporary file in", parent)?;
    let mut encoder = GzEncoder::new(tmp, Compression::default());
    encoder.write_all(tar_bytes).at_path("write", dest)?;
    let tmp = encoder.finish().at_path("write", dest)?;
    tmp.persist(dest).map_err(|e| e.error).at_path("write", dest)?;

    Ok(())
}
