extern crate log;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use self::log::*;

use crate::converter::MarkupConverter;
use crate::error::Result;
use crate::io;
use crate::model::{BackupOptions, LocalFile, RemoteNote};
use crate::source::NoteSource;
use crate::util;

/// Defines what has to happen to a single file of the backup directory
#[derive(Debug, PartialEq)]
pub enum BackupAction<'a> {
    /// Remote note has no file yet
    Create(&'a RemoteNote),
    /// Remote note changed after the file got written
    Update(&'a LocalFile, &'a RemoteNote),
    /// File is as new as the remote note or newer
    Skip(&'a LocalFile, &'a RemoteNote),
    /// Remote note has the same title as a note listed before it, the
    /// earlier one owns the file
    Duplicate(&'a RemoteNote),
    /// File has no remote counterpart, only generated if deletion is enabled
    Delete(&'a LocalFile),
}

/// Outcome of a backup run, failed actions were logged
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl BackupReport {
    /// Number of files that got written or removed
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

impl fmt::Display for BackupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} deleted, {} duplicate titles, {} failed",
            self.created, self.updated, self.skipped, self.deleted, self.duplicates, self.failed
        )
    }
}

/// Matches remote notes with the local files by name.
///
/// Every remote note yields exactly one action, in the order the notes were
/// listed. A file that is older than its note gets updated, equal timestamps
/// count as up to date. The first file with a given name is the match; the
/// first remote note with a given title owns that name, later ones are
/// reported as [`BackupAction::Duplicate`].
///
/// If `delete` is set, every file whose name matches no remote note at all
/// is appended as [`BackupAction::Delete`].
pub fn get_backup_actions<'a>(local_files: &'a [LocalFile],
                              remote_notes: &'a [RemoteNote],
                              delete: bool) -> Vec<BackupAction<'a>> {
    info!("Found {} local notes", local_files.len());
    info!("Found {} remote notes", remote_notes.len());

    let mut files_by_name: HashMap<&str, &LocalFile> = HashMap::new();
    for file in local_files {
        files_by_name.entry(file.name.as_str()).or_insert(file);
    }

    let mut claimed_names: HashSet<String> = HashSet::new();
    let mut actions: Vec<BackupAction> = remote_notes.iter().map(|note| {
        let stem = note.file_stem();
        if claimed_names.contains(&stem) {
            return BackupAction::Duplicate(note);
        }
        let action = match files_by_name.get(stem.as_str()).copied() {
            Some(file) if file.mtime < note.updated => BackupAction::Update(file, note),
            Some(file) => BackupAction::Skip(file, note),
            None => BackupAction::Create(note),
        };
        claimed_names.insert(stem);
        action
    }).collect();

    if delete {
        actions.extend(local_files.iter()
            .filter(|file| !claimed_names.contains(&file.name))
            .map(BackupAction::Delete));
    }

    actions
}

/// Executes the actions one after another.
///
/// A failing action is logged and counted, it does not stop the actions
/// after it.
pub fn process_actions(source: &dyn NoteSource,
                       converter: &dyn MarkupConverter,
                       dir: &Path,
                       options: &BackupOptions,
                       actions: &[BackupAction]) -> BackupReport {
    let mut report = BackupReport::default();

    for action in actions {
        let result = match action {
            BackupAction::Create(note) => {
                let path = io::note_path(dir, &note.file_stem(), options.format);
                info!("Creating {}", path.display());
                materialize(source, converter, dir, options, note, &path)
                    .map(|_| report.created += 1)
            }
            BackupAction::Update(file, note) => {
                info!("Updating {} (changed {})", file.path.display(), util::display_millis(note.updated));
                materialize(source, converter, dir, options, note, &file.path)
                    .map(|_| report.updated += 1)
            }
            BackupAction::Skip(file, _) => {
                debug!("{} is up to date", file.path.display());
                report.skipped += 1;
                Ok(())
            }
            BackupAction::Duplicate(note) => {
                warn!("Skipping note \"{}\" ({}), an earlier note has the same title", note.title, note.guid);
                report.duplicates += 1;
                Ok(())
            }
            BackupAction::Delete(file) => {
                info!("Deleting extraneous file {}", file.path.display());
                io::delete_file(&file.path)
                    .map(|_| report.deleted += 1)
            }
        };

        if let Err(e) = result {
            error!("{}", e);
            report.failed += 1;
        }
    }

    report
}

/// Fetches the content of `note` and writes it to `path`, images first
fn materialize(source: &dyn NoteSource,
               converter: &dyn MarkupConverter,
               dir: &Path,
               options: &BackupOptions,
               note: &RemoteNote,
               path: &Path) -> Result<()> {
    let note = source.load_content(note)?;
    let markup = note.content.as_deref().unwrap_or_default();
    let image_base = options.images.base_filename(&note.file_stem());

    if let Some(base) = &image_base {
        let saved = save_images(source, converter, dir, &note, markup, base);
        debug!("Saved {} images of \"{}\"", saved, note.title);
    }

    let text = converter.to_text(markup, options.format, image_base.as_deref());
    io::write_note(path, &text, note.updated)
}

/// Stores all images of a note, returns how many got written.
/// Failing images are logged and left out.
fn save_images(source: &dyn NoteSource,
               converter: &dyn MarkupConverter,
               dir: &Path,
               note: &RemoteNote,
               markup: &str,
               base_filename: &str) -> usize {
    let mut saved = 0;
    for image in converter.extract_images(markup) {
        let path = io::image_path(dir, base_filename, &image);
        info!("Saving image to {}", path.display());
        match source.fetch_binary(&note.guid, &image.hash)
            .and_then(|data| io::write_image(&path, &data)) {
            Ok(()) => saved += 1,
            Err(e) => warn!("Could not save image {} of \"{}\": {}", image.hash, note.title, e),
        }
    }
    saved
}

#[cfg(test)]
mod sync_tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use crate::builder::RemoteNoteBuilder;
    use crate::converter::EnmlConverter;
    use crate::error::BackupError;
    use crate::model::{ImageOptions, OutputFormat};
    use crate::source::MockNoteSource;

    fn local(name: &str, mtime: i64) -> LocalFile {
        LocalFile {
            path: PathBuf::from(format!("/backup/{}.txt", name)),
            name: name.to_string(),
            mtime,
        }
    }

    fn mtime_millis(path: &Path) -> i64 {
        util::system_time_to_millis(fs::metadata(path).unwrap().modified().unwrap())
    }

    /// Source that hands out `content` for every note
    fn source_with_content(content: &'static str) -> MockNoteSource {
        let mut source = MockNoteSource::new();
        source.expect_load_content()
            .returning(move |note| Ok(RemoteNote { content: Some(content.to_string()), ..note.clone() }));
        source
    }

    fn run(source: &MockNoteSource, dir: &Path, options: &BackupOptions, notes: &[RemoteNote]) -> BackupReport {
        let converter = EnmlConverter::new().unwrap();
        let files = io::scan_backup_dir(dir, options.format).unwrap();
        let actions = get_backup_actions(&files, notes, options.delete);
        process_actions(source, &converter, dir, options, &actions)
    }

    #[test]
    fn create_for_unknown_note() {
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").build()];
        let actions = get_backup_actions(&[], &notes, false);

        assert_eq!(actions, vec![BackupAction::Create(&notes[0])]);
    }

    #[test]
    fn update_only_if_file_is_older() {
        let notes = vec![
            RemoteNoteBuilder::new().with_title("Old").updated_at(2000).build(),
            RemoteNoteBuilder::new().with_title("Same").updated_at(2000).build(),
            RemoteNoteBuilder::new().with_title("Newer").updated_at(1000).build(),
        ];
        let files = vec![local("Old", 1999), local("Same", 2000), local("Newer", 2000)];

        let actions = get_backup_actions(&files, &notes, false);

        assert_eq!(actions, vec![
            BackupAction::Update(&files[0], &notes[0]),
            BackupAction::Skip(&files[1], &notes[1]),
            BackupAction::Skip(&files[2], &notes[2]),
        ]);
    }

    #[test]
    fn delete_only_if_enabled() {
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").updated_at(1).build()];
        let files = vec![local("Ideas", 1), local("Old", 1)];

        let keep = get_backup_actions(&files, &notes, false);
        assert!(keep.iter().all(|action| !matches!(action, BackupAction::Delete(_))));

        let delete = get_backup_actions(&files, &notes, true);
        assert_eq!(delete.len(), 2);
        assert_eq!(delete[1], BackupAction::Delete(&files[1]));
    }

    #[test]
    fn later_duplicate_titles_are_skipped() {
        let notes = vec![
            RemoteNoteBuilder::new().with_title("Ideas").with_guid("first").updated_at(5).build(),
            RemoteNoteBuilder::new().with_title("Ideas").with_guid("second").updated_at(9).build(),
        ];
        let files = vec![local("Ideas", 1)];

        let actions = get_backup_actions(&files, &notes, true);

        assert_eq!(actions, vec![
            BackupAction::Update(&files[0], &notes[0]),
            BackupAction::Duplicate(&notes[1]),
        ]);
    }

    #[test]
    fn titles_are_matched_by_escaped_name() {
        let notes = vec![RemoteNoteBuilder::new().with_title("2020/21").updated_at(1).build()];
        let files = vec![local("2020_21", 1)];

        let actions = get_backup_actions(&files, &notes, true);

        assert_eq!(actions, vec![BackupAction::Skip(&files[0], &notes[0])]);
    }

    #[test]
    fn creates_file_with_remote_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_with_content("<en-note><div>first idea</div></en-note>");
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").updated_at(1000).build()];

        let report = run(&source, dir.path(), &BackupOptions::default(), &notes);

        let path = dir.path().join("Ideas.txt");
        assert_eq!(report.created, 1);
        assert!(fs::read_to_string(&path).unwrap().contains("first idea"));
        assert_eq!(mtime_millis(&path), 1000);
        let seconds = fs::metadata(&path).unwrap().modified().unwrap()
            .duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(seconds, 1);
    }

    #[test]
    fn newer_local_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ideas.txt");
        io::write_note(&path, "local version", 2000).unwrap();

        let mut source = MockNoteSource::new();
        source.expect_load_content().never();
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").updated_at(1000).build()];

        let report = run(&source, dir.path(), &BackupOptions::default(), &notes);

        assert_eq!(report.skipped, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "local version");
        assert_eq!(mtime_millis(&path), 2000);
    }

    #[test]
    fn stale_local_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ideas.txt");
        io::write_note(&path, "stale", 1000).unwrap();

        let source = source_with_content("<en-note>fresh</en-note>");
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").updated_at(1500).build()];

        let report = run(&source, dir.path(), &BackupOptions::default(), &notes);

        assert_eq!(report.updated, 1);
        assert!(fs::read_to_string(&path).unwrap().contains("fresh"));
        assert_eq!(mtime_millis(&path), 1500);
    }

    #[test]
    fn extraneous_file_removed_only_with_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Old.txt");
        fs::write(&path, "old").unwrap();
        let source = MockNoteSource::new();

        let keep = BackupOptions::default();
        for _ in 0..2 {
            let report = run(&source, dir.path(), &keep, &[]);
            assert_eq!(report.deleted, 0);
            assert!(path.exists());
        }

        let delete = BackupOptions { delete: true, ..BackupOptions::default() };
        let report = run(&source, dir.path(), &delete, &[]);
        assert_eq!(report.deleted, 1);
        assert!(!path.exists());
    }

    #[test]
    fn second_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_with_content("<en-note>text</en-note>");
        let notes = vec![
            RemoteNoteBuilder::new().with_title("Ideas").updated_at(1_600_000_000_001).build(),
            RemoteNoteBuilder::new().with_title("Groceries").updated_at(1_600_000_000_999).build(),
        ];
        let options = BackupOptions { delete: true, ..BackupOptions::default() };

        let first = run(&source, dir.path(), &options, &notes);
        assert_eq!(first.created, 2);

        let second = run(&source, dir.path(), &options, &notes);
        assert_eq!(second.changes(), 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn failing_note_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockNoteSource::new();
        source.expect_load_content()
            .returning(|note| {
                if note.title == "Broken" {
                    Err(BackupError::fetch("Broken", "connection reset"))
                } else {
                    Ok(RemoteNote { content: Some("<en-note>ok</en-note>".to_string()), ..note.clone() })
                }
            });
        let notes = vec![
            RemoteNoteBuilder::new().with_title("Broken").build(),
            RemoteNoteBuilder::new().with_title("Fine").build(),
        ];

        let report = run(&source, dir.path(), &BackupOptions::default(), &notes);

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert!(!dir.path().join("Broken.txt").exists());
        assert!(dir.path().join("Fine.txt").exists());
    }

    #[test]
    fn unwritable_note_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockNoteSource::new();
        source.expect_load_content().returning(|note| Ok(note.clone()));
        let notes = vec![
            RemoteNoteBuilder::new().with_title(&"x".repeat(300)).with_content("<en-note>long</en-note>").build(),
            RemoteNoteBuilder::new().with_title("Fine").with_content("<en-note>ok</en-note>").build(),
        ];

        let report = run(&source, dir.path(), &BackupOptions::default(), &notes);

        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        assert!(fs::read_to_string(dir.path().join("Fine.txt")).unwrap().contains("ok"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failing_delete_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_with_content("<en-note>text</en-note>");
        let vanished = LocalFile {
            path: dir.path().join("Vanished.txt"),
            name: "Vanished".to_string(),
            mtime: 0,
        };
        let files = vec![vanished];
        let notes = vec![RemoteNoteBuilder::new().with_title("Ideas").build()];
        let actions = get_backup_actions(&files, &notes, true);
        let options = BackupOptions { delete: true, ..BackupOptions::default() };

        let report = process_actions(&source, &EnmlConverter::new().unwrap(), dir.path(), &options, &actions);

        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.created, 1);
        assert!(dir.path().join("Ideas.txt").exists());
    }

    #[test]
    fn images_are_saved_into_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = source_with_content(r#"<en-note><en-media type="image/png" hash="abcd"/></en-note>"#);
        source.expect_fetch_binary()
            .withf(|guid, hash| guid == "trip" && hash == "abcd")
            .times(1)
            .returning(|_, _| Ok(vec![137, 80, 78, 71]));
        let notes = vec![RemoteNoteBuilder::new().with_title("Trip").with_guid("trip").build()];
        let options = BackupOptions {
            format: OutputFormat::Html,
            images: ImageOptions { save_images: true, images_in_subdir: true },
            ..BackupOptions::default()
        };

        let report = run(&source, dir.path(), &options, &notes);

        assert_eq!(report.created, 1);
        let image = dir.path().join("Trip_images").join("Trip-abcd.png");
        assert_eq!(fs::read(image).unwrap(), vec![137, 80, 78, 71]);
        let html = fs::read_to_string(dir.path().join("Trip.html")).unwrap();
        assert!(html.contains("Trip_images/Trip-abcd.png"));
    }

    #[test]
    fn images_flat_layout_are_not_matched_as_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = source_with_content(r#"<en-note><en-media type="image/jpeg" hash="0f"/></en-note>"#);
        source.expect_fetch_binary().returning(|_, _| Ok(vec![1]));
        let notes = vec![RemoteNoteBuilder::new().with_title("Trip").updated_at(10).build()];
        let options = BackupOptions {
            delete: true,
            images: ImageOptions { save_images: true, images_in_subdir: false },
            ..BackupOptions::default()
        };

        run(&source, dir.path(), &options, &notes);
        let second = run(&source, dir.path(), &options, &notes);

        assert_eq!(second.deleted, 0);
        assert!(dir.path().join("Trip-0f.jpeg").exists());
    }

    #[test]
    fn failing_image_keeps_note_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = source_with_content(r#"<en-note>caption<en-media type="image/png" hash="dead"/></en-note>"#);
        source.expect_fetch_binary()
            .returning(|_, hash| Err(BackupError::fetch(hash, "not found")));
        let notes = vec![RemoteNoteBuilder::new().with_title("Trip").build()];
        let options = BackupOptions {
            images: ImageOptions { save_images: true, images_in_subdir: true },
            ..BackupOptions::default()
        };

        let report = run(&source, dir.path(), &options, &notes);

        assert_eq!(report.failed, 0);
        assert!(fs::read_to_string(dir.path().join("Trip.txt")).unwrap().contains("caption"));
    }
}
