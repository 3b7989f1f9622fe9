//! Filesystem and naming helpers shared by the backends.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Directory name a module is installed under.
///
/// `puppetlabs/stdlib` and `puppetlabs-stdlib` both install as `stdlib`.
pub fn module_short_name(name: &str) -> &str {
    if let Some((_, short)) = name.rsplit_once('/') {
        return short;
    }
    match name.split_once('-') {
        Some((_, short)) if !short.is_empty() => short,
        _ => name,
    }
}

/// Remove a file or directory tree; a missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Recursively copy `src` into `dest`, skipping any entry whose file name is
/// in `skip` (and everything below it).
pub fn copy_dir_all(src: &Path, dest: &Path, skip: &[&str]) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    let walker = WalkDir::new(src).min_depth(1).into_iter().filter_entry(|entry| {
        entry
            .file_name()
            .to_str()
            .map(|name| !skip.contains(&name))
            .unwrap_or(true)
    });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    fs::copy(src, target).map(|_| ())
}
