use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Missing credentials, unusable destination path, broken config file
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Requested notebook is not present remotely
    #[error("Notebook \"{0}\" does not exist")]
    NotFound(String),
    /// Remote listing, content or attachment could not be fetched
    #[error("could not fetch {what}: {reason}")]
    Fetch { what: String, reason: String },
    /// A note or image could not be written to disk
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackupError {
    pub fn fetch(what: impl Into<String>, reason: impl ToString) -> Self {
        BackupError::Fetch {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Write {
            path: path.into(),
            source,
        }
    }

    /// Exit code of the process if this error ends the run
    pub fn error_code(&self) -> i32 {
        match self {
            BackupError::Configuration(_) => 2,
            BackupError::NotFound(_) => 3,
            BackupError::Fetch { .. } => 4,
            BackupError::Write { .. } => 5,
            BackupError::Io(_) => 6,
        }
    }

    pub fn human_readable_error_message(&self) -> String {
        match self {
            BackupError::Configuration(_) =>
                "Check the config file and the destination path".to_string(),
            BackupError::NotFound(name) =>
                format!("There is no notebook named \"{}\", names are case sensitive", name),
            BackupError::Fetch { .. } =>
                "The note service could not be reached or refused the request".to_string(),
            BackupError::Write { path, .. } =>
                format!("Could not write to {}, check permissions and free space", path.display()),
            BackupError::Io(_) =>
                "Could not read the backup directory".to_string(),
        }
    }
}
