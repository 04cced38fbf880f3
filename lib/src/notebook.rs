use std::path::Path;

use log::debug;

use crate::error::{BackupError, Result};
use crate::model::Notebook;
use crate::source::NoteSource;

/// Picks the notebook a backup directory belongs to.
///
/// Without an explicit name the base name of `path` is used, so a directory
/// `~/backup/Work` backs up the notebook `Work`. Names are compared case
/// sensitive.
pub fn resolve_notebook(source: &dyn NoteSource, requested: Option<&str>, path: &Path) -> Result<Notebook> {
    let name = match requested {
        Some(name) => name.to_string(),
        None => notebook_name_from_path(path)?,
    };
    debug!("Looking up notebook \"{}\"", name);

    source.list_notebooks()?
        .into_iter()
        .find(|notebook| notebook.name == name)
        .ok_or(BackupError::NotFound(name))
}

fn notebook_name_from_path(path: &Path) -> Result<String> {
    let path = std::fs::canonicalize(path).map_err(|e| {
        BackupError::Configuration(format!("Invalid backup directory {}: {}", path.display(), e))
    })?;
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BackupError::Configuration(
            format!("Could not derive a notebook name from {}", path.display())
        ))
}
