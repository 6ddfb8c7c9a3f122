use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::note::Note;
use crate::types::notebook::Notebook;

/// Frames a client sends over the realtime socket. The `userId` inside a
/// change payload names the broadcast group, which is trusted as asserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(String),
    NotebookChange(NotebookChange),
    NoteChange(NoteChange),
}

/// Frames the relay fans out to the other sessions of the same group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    NotebookSync(NotebookChange),
    NotesSync(NoteChange),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookChange {
    pub user_id: String,
    pub notebook_id: Uuid,
    pub notebook: Notebook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteChange {
    pub user_id: String,
    pub note: Note,
}

impl ServerEvent {
    /// The broadcast group this event is addressed to.
    pub fn user_id(&self) -> &str {
        match self {
            ServerEvent::NotebookSync(change) => &change.user_id,
            ServerEvent::NotesSync(change) => &change.user_id,
        }
    }
}
