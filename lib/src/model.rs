use std::path::PathBuf;
use std::str::FromStr;

use crate::util;

/// A notebook of the remote service, notes are backed up one notebook
/// at a time
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Notebook {
    pub guid: String,
    pub name: String,
}

/// Snapshot of a remote note
///
/// `content` stays `None` until the note got loaded via
/// [`NoteSource::load_content`](crate::source::NoteSource::load_content)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNote {
    pub guid: String,
    pub title: String,
    pub notebook_guid: String,
    #[serde(default)]
    pub content: Option<String>,
    /// milliseconds since epoch
    pub updated: i64,
}

impl RemoteNote {
    /// Key used to match this note against local files
    pub fn file_stem(&self) -> String {
        util::file_stem_for_title(&self.title)
    }
}

/// A file that got found inside the backup directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// filename without the output format extension
    pub name: String,
    /// milliseconds since epoch
    pub mtime: i64,
}

/// Image referenced by a note's markup
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// hex encoded content hash
    pub hash: String,
    pub extension: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "txt",
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Plain
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "plain" => Ok(OutputFormat::Plain),
            "markdown" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(format!("unknown format \"{}\", valid values are plain, markdown and html", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub save_images: bool,
    pub images_in_subdir: bool,
}

impl ImageOptions {
    /// Base filename of the images of a note, relative to the backup directory.
    ///
    /// `<stem>` for the flat layout, `<stem>_images/<stem>` if images are grouped
    /// into a subdirectory. `None` if images are not saved at all.
    pub fn base_filename(&self, stem: &str) -> Option<String> {
        if !self.save_images {
            None
        } else if self.images_in_subdir {
            Some(format!("{}/{}", image_dir_name(stem), stem))
        } else {
            Some(stem.to_string())
        }
    }
}

pub fn image_dir_name(stem: &str) -> String {
    format!("{}_images", stem)
}

/// Immutable settings of a backup run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupOptions {
    pub format: OutputFormat,
    pub delete: bool,
    pub images: ImageOptions,
    pub max_notes: usize,
}

impl Default for BackupOptions {
    fn default() -> Self {
        BackupOptions {
            format: OutputFormat::Plain,
            delete: false,
            images: ImageOptions::default(),
            max_notes: crate::profile::DEFAULT_MAX_NOTES,
        }
    }
}
