#[cfg(target_family = "unix")]
extern crate xdg;

extern crate regex;
extern crate log;

use self::regex::Regex;
use std::fs::File;
use self::log::{warn, trace};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BackupError, Result};

#[cfg(target_family = "unix")]
use self::xdg::BaseDirectories;

/// Upper bound of notes a single account may hold, used as page size when
/// listing the notes of a notebook
pub const DEFAULT_MAX_NOTES: usize = 100_000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const TOKEN_ENV: &str = "NBACKUP_AUTH_TOKEN";
const API_URL_ENV: &str = "NBACKUP_API_URL";

#[derive(Debug, Clone)]
pub struct Profile {
    pub(crate) auth_token: String,
    pub(crate) api_url: String,
    pub(crate) timeout: Duration,
    pub(crate) max_notes: usize,
}

impl Profile {
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn max_notes(&self) -> usize {
        self.max_notes
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn config_error(e: impl ToString) -> BackupError {
    BackupError::Configuration(e.to_string())
}

#[cfg(target_family = "unix")]
pub fn get_config_path() -> Result<PathBuf> {
    let xdg_dir = BaseDirectories::new().map_err(config_error)?;
    match xdg_dir.find_config_file("nbackup/config") {
        Some(path) => Ok(path),
        None => {
            warn!("Could not detect config file, gonna create empty one");
            let mut path = xdg_dir.create_config_directory("nbackup")?;
            path.push("config");
            File::create(&path)?;
            Ok(path)
        }
    }
}

#[cfg(target_family = "windows")]
pub fn get_config_path() -> Result<PathBuf> {
    let app_data = std::env::var("APPDATA").map_err(config_error)?;
    let config_file_path = PathBuf::from(app_data).join("nbackup").join("config");
    if !config_file_path.exists() {
        warn!("Could not detect config file, gonna create empty one");
        if let Some(parent) = config_file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        File::create(&config_file_path)?;
    }
    Ok(config_file_path)
}

/// Default location of the log file if none got passed on the command line
#[cfg(target_family = "unix")]
pub fn get_log_path() -> Result<PathBuf> {
    let xdg_dir = BaseDirectories::new().map_err(config_error)?;
    Ok(xdg_dir.place_data_file("nbackup/nbackup.log")?)
}

#[cfg(target_family = "windows")]
pub fn get_log_path() -> Result<PathBuf> {
    let app_data = std::env::var("APPDATA").map_err(config_error)?;
    let dir = PathBuf::from(app_data).join("nbackup");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("nbackup.log"))
}

pub fn load_profile() -> Result<Profile> {
    let path = get_config_path()?;
    trace!("Read config file from {}", path.display());
    let creds = std::fs::read_to_string(&path)?;
    parse_profile(
        &creds,
        std::env::var(TOKEN_ENV).ok(),
        std::env::var(API_URL_ENV).ok(),
    )
}

/// Builds the profile from the content of a config file, values from the
/// environment win over the ones in the file
pub(crate) fn parse_profile(creds: &str, env_token: Option<String>, env_api_url: Option<String>) -> Result<Profile> {
    let token_regex = Regex::new(r"auth_token=(.*)").map_err(config_error)?;
    let api_url_regex = Regex::new(r"api_url=(.*)").map_err(config_error)?;
    let timeout_regex = Regex::new(r"timeout_secs=(.*)").map_err(config_error)?;
    let max_notes_regex = Regex::new(r"max_notes=(.*)").map_err(config_error)?;

    let auth_token = match env_token.or_else(|| get_with_regex(&token_regex, creds)) {
        Some(token) => token,
        None => return Err(BackupError::Configuration("Auth error. There is not any auth token.".to_string())),
    };

    let api_url = match env_api_url.or_else(|| get_with_regex(&api_url_regex, creds)) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => return Err(missing_entry(&api_url_regex)),
    };

    let timeout = match get_with_regex(&timeout_regex, creds) {
        Some(secs) => Duration::from_secs(secs.parse::<u64>().map_err(|e| {
            config_error(format!("timeout_secs \"{}\" is not a number: {}", secs, e))
        })?),
        None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    };

    let max_notes = match get_with_regex(&max_notes_regex, creds) {
        Some(max) => max.parse::<usize>().map_err(|e| {
            config_error(format!("max_notes \"{}\" is not a number: {}", max, e))
        })?,
        None => DEFAULT_MAX_NOTES,
    };

    Ok(
        Profile {
            auth_token,
            api_url,
            timeout,
            max_notes,
        }
    )
}

fn get_with_regex(regex: &Regex, creds: &str) -> Option<String> {
    regex.captures(creds)
        .and_then(|captured| captured.get(1))
        .map(|result| result.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn missing_entry(regex: &Regex) -> BackupError {
    let config_entry_name = regex.to_string().replace("=(.*)", "");
    BackupError::Configuration(
        format!("Could not find entry in config file for key: \"{}\"", config_entry_name)
    )
}
