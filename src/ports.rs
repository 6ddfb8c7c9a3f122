use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::note::{Note, NoteKind};
use crate::types::notebook::{Notebook, Page};
use crate::types::user::User;
use crate::uploads::{StoredPdf, UploadError};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug)]
pub enum StoreError {
    Duplicate,
    NotFound,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Duplicate => f.write_str("duplicate field value"),
            StoreError::NotFound => f.write_str("document not found"),
        }
    }
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub kind: NoteKind,
    pub filename: Option<String>,
    pub original_name: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Default)]
pub struct NotebookPatch {
    pub name: Option<String>,
    pub pages: Option<Vec<Page>>,
}

#[derive(Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
}

#[derive(Default)]
pub struct NoteFilter {
    pub kind: Option<NoteKind>,
    pub archived: Option<bool>,
}

/// The authoritative document store. Every read and write is scoped by the
/// owning user; a document owned by somebody else is indistinguishable from a
/// missing one. Implementations are injected once at startup and shared by
/// every handler.
pub trait Store: Send + Sync + 'static {
    fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
    fn user_by_email(&self, email: &str) -> Option<User>;
    fn user_by_id(&self, id: Uuid) -> Option<User>;
    fn record_login(&self, id: Uuid) -> Result<User, StoreError>;

    fn create_notebook(&self, user_id: Uuid, name: String) -> Notebook;
    /// Sorted by `last_modified`, newest first.
    fn notebooks_for_user(&self, user_id: Uuid) -> Vec<Notebook>;
    fn notebook(&self, user_id: Uuid, id: Uuid) -> Option<Notebook>;
    fn update_notebook(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: NotebookPatch,
    ) -> Result<Notebook, StoreError>;
    fn delete_notebook(&self, user_id: Uuid, id: Uuid) -> Result<Notebook, StoreError>;

    fn create_note(&self, new_note: NewNote) -> Note;
    /// Sorted by `created_at`, newest first.
    fn notes_for_user(&self, user_id: Uuid, filter: &NoteFilter) -> Vec<Note>;
    fn update_note(&self, user_id: Uuid, id: Uuid, patch: NotePatch) -> Result<Note, StoreError>;
    fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<Note, StoreError>;
    fn note_by_filename(&self, user_id: Uuid, filename: &str) -> Option<Note>;
}

/// Storage for uploaded PDF bytes, addressed by generated filename.
pub trait BlobStore: Send + Sync + 'static {
    fn store_pdf(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StoredPdf, UploadError>;
    fn read(&self, filename: &str) -> Result<Vec<u8>, UploadError>;
    fn remove(&self, filename: &str) -> Result<(), UploadError>;
}
