use crate::model::{Notebook, RemoteNote};
use crate::util::generate_uuid;

pub struct RemoteNoteBuilder {
    note: RemoteNote
}

/// Builder for remote notes, mostly for
/// testing purposes
///
/// If no own guid gets provided it gets randomly
/// generated
impl RemoteNoteBuilder {
    pub fn new() -> RemoteNoteBuilder {
        RemoteNoteBuilder {
            note: RemoteNote {
                guid: generate_uuid(),
                title: "".to_string(),
                notebook_guid: "".to_string(),
                content: None,
                updated: 0
            }
        }
    }

    pub fn with_guid(mut self, guid: &str) -> Self {
        self.note.guid = guid.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.note.title = title.to_string();
        self
    }

    pub fn in_notebook(mut self, notebook: &Notebook) -> Self {
        self.note.notebook_guid = notebook.guid.clone();
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.note.content = Some(content.to_string());
        self
    }

    pub fn updated_at(mut self, millis: i64) -> Self {
        self.note.updated = millis;
        self
    }

    pub fn build(self) -> RemoteNote {
        self.note
    }
}

pub struct NotebookBuilder {
    notebook: Notebook
}

impl NotebookBuilder {
    pub fn new(name: &str) -> NotebookBuilder {
        NotebookBuilder {
            notebook: Notebook {
                guid: generate_uuid(),
                name: name.to_string()
            }
        }
    }

    pub fn with_guid(mut self, guid: &str) -> Self {
        self.notebook.guid = guid.to_string();
        self
    }

    pub fn build(self) -> Notebook {
        self.notebook
    }
}
