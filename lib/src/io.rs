extern crate log;
extern crate walkdir;

use std::io::Write;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use self::log::{debug, warn};
use self::walkdir::WalkDir;
use tempfile::NamedTempFile;

use crate::error::{BackupError, Result};
use crate::model::{ImageRef, LocalFile, OutputFormat};
use crate::util;

/// Lists the backed up notes inside `dir`.
///
/// Only regular files directly inside `dir` that carry the extension of
/// `format` are returned, sorted by file name. Subdirectories (and with them
/// the image folders of notes) are not visited.
pub fn scan_backup_dir(dir: &Path, format: OutputFormat) -> Result<Vec<LocalFile>> {
    let extension = format!(".{}", format.extension());
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                warn!("Ignoring {}: {}", e.path().map(|p| p.display().to_string()).unwrap_or_default(), e);
                continue;
            }
            Err(e) => return Err(std::io::Error::from(e).into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => {
                warn!("Ignoring {}, file name is not valid unicode", entry.path().display());
                continue;
            }
        };

        let name = match file_name.strip_suffix(&extension) {
            Some(name) => name.to_string(),
            None => {
                debug!("Ignoring {}, not a {} file", file_name, extension);
                continue;
            }
        };

        let modified = match entry.metadata().map_err(std::io::Error::from).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Ignoring {}: {}", entry.path().display(), e);
                continue;
            }
        };

        files.push(LocalFile {
            path: entry.path().to_path_buf(),
            name,
            mtime: util::system_time_to_millis(modified),
        });
    }

    Ok(files.into_iter().sorted_by(|a, b| a.path.cmp(&b.path)).collect())
}

pub fn note_path(dir: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", stem, format.extension()))
}

pub fn image_path(dir: &Path, base_filename: &str, image: &ImageRef) -> PathBuf {
    dir.join(format!("{}-{}.{}", base_filename, image.hash, image.extension))
}

/// Replaces the content of `path` and sets its modification time to `updated`.
///
/// The next run compares the modification time with the remote one, so the
/// file has to carry the exact remote timestamp. Content and timestamp go to
/// a temporary file next to `path` first, which then replaces `path`; a
/// failed write leaves the previous file untouched.
pub fn write_note(path: &Path, content: &str, updated: i64) -> Result<()> {
    let write_error = |e| BackupError::write(path, e);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)?;
    file.as_file().set_modified(util::millis_to_system_time(updated)).map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Writes the payload of an image verbatim, missing parent folders get created
pub fn write_image(path: &Path, data: &[u8]) -> Result<()> {
    let write_error = |e| BackupError::write(path, e);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, data).map_err(write_error)
}

pub fn delete_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| BackupError::write(path, e))
}
