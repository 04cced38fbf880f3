#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate walkdir;
extern crate chrono;

pub mod builder;
pub mod converter;
pub mod error;
pub mod io;
pub mod model;
pub mod notebook;
pub mod profile;
pub mod source;
pub mod sync;
pub mod util;

use std::path::{Path, PathBuf};

use log::{error, info};

use converter::MarkupConverter;
use error::{BackupError, Result};
use model::{BackupOptions, Notebook};
use source::NoteSource;
use sync::BackupReport;

/// Backs up notebooks of a note service into local directories
pub struct NoteBackup {
    source: Box<dyn NoteSource>,
    converter: Box<dyn MarkupConverter>,
    options: BackupOptions,
}

impl NoteBackup {
    pub fn new(source: Box<dyn NoteSource>,
               converter: Box<dyn MarkupConverter>,
               options: BackupOptions) -> NoteBackup {
        NoteBackup {
            source,
            converter,
            options,
        }
    }

    /// Backs up a single notebook into `path`.
    ///
    /// Without a notebook name the base name of `path` selects the notebook.
    /// Fails if the directory can not be prepared or the notebook does not
    /// exist; failing notes are only counted in the report.
    pub fn backup(&self, notebook_name: Option<&str>, path: &Path) -> Result<BackupReport> {
        prepare_directory(path)?;
        let notebook = notebook::resolve_notebook(self.source.as_ref(), notebook_name, path)?;
        self.backup_notebook(&notebook, path)
    }

    /// Backs up every notebook into its own subdirectory of `path`.
    ///
    /// Notebooks are independent of each other, a notebook that fails is
    /// logged and the next one is processed. Only listing the notebooks
    /// fails the whole run.
    pub fn backup_all(&self, path: &Path) -> Result<Vec<(String, Result<BackupReport>)>> {
        prepare_directory(path)?;
        let notebooks = self.source.list_notebooks()?;

        Ok(notebooks.into_iter().map(|notebook| {
            info!("Backing up notebook {}", notebook.name);
            let notebook_path = notebook_directory(path, &notebook);
            let result = prepare_directory(&notebook_path)
                .and_then(|_| self.backup_notebook(&notebook, &notebook_path));
            if let Err(e) = &result {
                error!("Backup of notebook {} failed: {}", notebook.name, e);
            }
            (notebook.name, result)
        }).collect())
    }

    fn backup_notebook(&self, notebook: &Notebook, path: &Path) -> Result<BackupReport> {
        info!("Backup Start: notebook {} into {}", notebook.name, path.display());

        let files = io::scan_backup_dir(path, self.options.format)?;
        let notes = self.source.list_notes(notebook, self.options.max_notes)?;
        let actions = sync::get_backup_actions(&files, &notes, self.options.delete);
        let report = sync::process_actions(
            self.source.as_ref(),
            self.converter.as_ref(),
            path,
            &self.options,
            &actions,
        );

        info!("Backup Complete: {}", report);
        Ok(report)
    }
}

pub fn notebook_directory(root: &Path, notebook: &Notebook) -> PathBuf {
    root.join(util::file_stem_for_title(&notebook.name))
}

/// Creates the backup directory if it does not exist yet
fn prepare_directory(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(BackupError::Configuration("Path to backup directory not defined.".to_string()));
    }
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| BackupError::Configuration(
            format!("Could not create backup directory {}: {}", path.display(), e)
        ))?;
    }
    if !path.is_dir() {
        return Err(BackupError::Configuration(format!("{} is not a directory", path.display())));
    }
    Ok(())
}

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::builder::{NotebookBuilder, RemoteNoteBuilder};
    use crate::converter::EnmlConverter;
    use crate::model::RemoteNote;
    use crate::source::MockNoteSource;

    fn notebooks() -> Vec<Notebook> {
        vec![
            NotebookBuilder::new("Personal").with_guid("personal").build(),
            NotebookBuilder::new("Work").with_guid("work").build(),
        ]
    }

    /// Every notebook holds one note named after the notebook
    fn service() -> MockNoteSource {
        let mut source = MockNoteSource::new();
        source.expect_list_notebooks().returning(|| Ok(notebooks()));
        source.expect_list_notes()
            .returning(|notebook, _| {
                if notebook.guid == "work" {
                    return Err(BackupError::fetch("notes of Work", "service unavailable"));
                }
                Ok(vec![RemoteNoteBuilder::new()
                    .with_title(&format!("{} note", notebook.name))
                    .in_notebook(notebook)
                    .updated_at(1000)
                    .build()])
            });
        source.expect_load_content()
            .returning(|note| Ok(RemoteNote {
                content: Some("<en-note>body</en-note>".to_string()),
                ..note.clone()
            }));
        source
    }

    fn backup(source: MockNoteSource) -> NoteBackup {
        NoteBackup::new(
            Box::new(source),
            Box::new(EnmlConverter::new().unwrap()),
            BackupOptions::default(),
        )
    }

    #[test]
    fn creates_missing_directory_and_backs_up_named_notebook() {
        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("backup");

        let report = backup(service()).backup(Some("Personal"), &dest).unwrap();

        assert_eq!(report.created, 1);
        assert!(dest.join("Personal note.txt").exists());
    }

    #[test]
    fn unknown_notebook_fails_before_touching_files() {
        let root = tempfile::tempdir().unwrap();

        match backup(service()).backup(Some("Archive"), root.path()) {
            Err(BackupError::NotFound(name)) => assert_eq!(name, "Archive"),
            other => panic!("expected not found, got {:?}", other),
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn backup_all_continues_after_failing_notebook() {
        let root = tempfile::tempdir().unwrap();

        let results = backup(service()).backup_all(root.path()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "Personal");
        assert_eq!(results[0].1.as_ref().unwrap().created, 1);
        assert!(matches!(results[1].1, Err(BackupError::Fetch { .. })));
        assert!(root.path().join("Personal").join("Personal note.txt").exists());
        assert!(root.path().join("Work").is_dir());
    }

    #[test]
    fn file_instead_of_directory_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("notes.txt");
        fs::write(&file, "").unwrap();

        assert!(matches!(
            backup(MockNoteSource::new()).backup(Some("Personal"), &file),
            Err(BackupError::Configuration(_))
        ));
    }
}
