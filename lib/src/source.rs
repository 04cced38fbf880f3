extern crate curl;
extern crate log;

use self::curl::easy::{Easy, List};
use self::log::{debug, info};

use crate::error::{BackupError, Result};
use crate::model::{Notebook, RemoteNote};
use crate::profile::Profile;

#[cfg(test)]
use mockall::automock;

/// Remote side of a backup run
#[cfg_attr(test, automock)]
pub trait NoteSource {
    fn list_notebooks(&self) -> Result<Vec<Notebook>>;
    /// Metadata of at most `max_count` notes of a notebook, content is not loaded
    fn list_notes(&self, notebook: &Notebook, max_count: usize) -> Result<Vec<RemoteNote>>;
    /// Returns the note with its markup content populated
    fn load_content(&self, note: &RemoteNote) -> Result<RemoteNote>;
    fn fetch_binary(&self, note_guid: &str, content_hash: &str) -> Result<Vec<u8>>;
}

/// Talks to the note service via its REST interface
pub struct HttpNoteSource {
    profile: Profile,
}

impl HttpNoteSource {
    pub fn new(profile: Profile) -> HttpNoteSource {
        info!("Using note service at {}", profile.api_url());
        HttpNoteSource { profile }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.profile.api_url(), path)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        debug!("GET {}", url);

        let mut easy = Easy::new();
        let mut headers = List::new();
        let fetch_error = |e: curl::Error| BackupError::fetch(url.clone(), e);

        headers.append(&format!("Authorization: Bearer {}", self.profile.auth_token))
            .map_err(fetch_error)?;
        easy.url(&url).map_err(fetch_error)?;
        easy.http_headers(headers).map_err(fetch_error)?;
        easy.timeout(self.profile.timeout()).map_err(fetch_error)?;
        easy.follow_location(true).map_err(fetch_error)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            }).map_err(fetch_error)?;
            transfer.perform().map_err(fetch_error)?;
        }

        let status = easy.response_code().map_err(fetch_error)?;
        if status >= 400 {
            return Err(BackupError::fetch(url, format!("server responded with status {}", status)));
        }
        Ok(body)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path)?;
        serde_json::from_slice(&body).map_err(|e| BackupError::fetch(self.url(path), e))
    }

    fn escape(&self, segment: &str) -> String {
        Easy::new().url_encode(segment.as_bytes())
    }
}

impl NoteSource for HttpNoteSource {
    fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.get_json("notebooks")
    }

    fn list_notes(&self, notebook: &Notebook, max_count: usize) -> Result<Vec<RemoteNote>> {
        let path = format!("notebooks/{}/notes?max={}", self.escape(&notebook.guid), max_count);
        let notes: Vec<RemoteNote> = self.get_json(&path)?;
        Ok(notes.into_iter()
            .filter(|note| note.notebook_guid == notebook.guid)
            .take(max_count)
            .collect())
    }

    fn load_content(&self, note: &RemoteNote) -> Result<RemoteNote> {
        let path = format!("notes/{}/content", self.escape(&note.guid));
        let body = self.get(&path)?;
        let content = String::from_utf8(body)
            .map_err(|e| BackupError::fetch(format!("content of \"{}\"", note.title), e))?;
        Ok(RemoteNote {
            content: Some(content),
            ..note.clone()
        })
    }

    fn fetch_binary(&self, note_guid: &str, content_hash: &str) -> Result<Vec<u8>> {
        let path = format!("notes/{}/resources/{}", self.escape(note_guid), self.escape(content_hash));
        self.get(&path)
    }
}
