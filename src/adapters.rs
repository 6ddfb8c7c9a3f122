use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::ports::{
    BlobStore, Clock, NewNote, NewUser, NoteFilter, NotebookPatch, NotePatch, Store, StoreError,
};
use crate::types::note::Note;
use crate::types::notebook::{Notebook, Page};
use crate::types::user::User;
use crate::uploads;
use crate::uploads::{StoredPdf, UploadError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Process-memory document store. Last write wins; concurrent writers to the
/// same document race exactly as they would against the storage layer's
/// default semantics.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    notebooks: HashMap<Uuid, Notebook>,
    notes: HashMap<Uuid, Note>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }
}

/// Timestamps must move forward on every accepted mutation, even if the wall
/// clock stalls or steps backwards.
fn bump(clock: &dyn Clock, previous: OffsetDateTime) -> OffsetDateTime {
    let now = clock.now();
    if now > previous {
        now
    } else {
        previous + time::Duration::milliseconds(1)
    }
}

impl Store for MemoryStore {
    fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let duplicate = inner
            .users
            .values()
            .any(|user| user.email == new_user.email || user.username == new_user.username);
        if duplicate {
            return Err(StoreError::Duplicate);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            is_active: true,
            last_login: None,
            created_at: self.clock.now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.lock().expect("store lock");
        inner.users.values().find(|user| user.email == email).cloned()
    }

    fn user_by_id(&self, id: Uuid) -> Option<User> {
        let inner = self.inner.lock().expect("store lock");
        inner.users.get(&id).cloned()
    }

    fn record_login(&self, id: Uuid) -> Result<User, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().expect("store lock");
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.last_login = Some(now);
        Ok(user.clone())
    }

    fn create_notebook(&self, user_id: Uuid, name: String) -> Notebook {
        let now = self.clock.now();
        let notebook = Notebook {
            id: Uuid::new_v4(),
            user_id,
            name,
            pages: vec![Page::blank(1)],
            texts: Vec::new(),
            is_shared: false,
            shared_with: Vec::new(),
            last_modified: now,
            created_at: now,
        };
        let mut inner = self.inner.lock().expect("store lock");
        inner.notebooks.insert(notebook.id, notebook.clone());
        notebook
    }

    fn notebooks_for_user(&self, user_id: Uuid) -> Vec<Notebook> {
        let inner = self.inner.lock().expect("store lock");
        let mut notebooks: Vec<Notebook> = inner
            .notebooks
            .values()
            .filter(|notebook| notebook.user_id == user_id)
            .cloned()
            .collect();
        notebooks.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        notebooks
    }

    fn notebook(&self, user_id: Uuid, id: Uuid) -> Option<Notebook> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .notebooks
            .get(&id)
            .filter(|notebook| notebook.user_id == user_id)
            .cloned()
    }

    fn update_notebook(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: NotebookPatch,
    ) -> Result<Notebook, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let notebook = inner
            .notebooks
            .get_mut(&id)
            .filter(|notebook| notebook.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            notebook.name = name;
        }
        if let Some(pages) = patch.pages {
            notebook.pages = pages;
        }
        notebook.last_modified = bump(&*self.clock, notebook.last_modified);
        Ok(notebook.clone())
    }

    fn delete_notebook(&self, user_id: Uuid, id: Uuid) -> Result<Notebook, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        match inner.notebooks.get(&id) {
            Some(notebook) if notebook.user_id == user_id => {}
            _ => return Err(StoreError::NotFound),
        }
        Ok(inner.notebooks.remove(&id).expect("checked above"))
    }

    fn create_note(&self, new_note: NewNote) -> Note {
        let now = self.clock.now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: new_note.user_id,
            title: new_note.title,
            content: new_note.content,
            tags: new_note.tags,
            kind: new_note.kind,
            is_archived: false,
            filename: new_note.filename,
            original_name: new_note.original_name,
            file_size: new_note.file_size,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().expect("store lock");
        inner.notes.insert(note.id, note.clone());
        note
    }

    fn notes_for_user(&self, user_id: Uuid, filter: &NoteFilter) -> Vec<Note> {
        let inner = self.inner.lock().expect("store lock");
        let mut notes: Vec<Note> = inner
            .notes
            .values()
            .filter(|note| note.user_id == user_id)
            .filter(|note| filter.kind.is_none_or(|kind| note.kind == kind))
            .filter(|note| filter.archived.is_none_or(|archived| note.is_archived == archived))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }

    fn update_note(&self, user_id: Uuid, id: Uuid, patch: NotePatch) -> Result<Note, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let note = inner
            .notes
            .get_mut(&id)
            .filter(|note| note.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = tags;
        }
        if let Some(is_archived) = patch.is_archived {
            note.is_archived = is_archived;
        }
        note.updated_at = bump(&*self.clock, note.updated_at);
        Ok(note.clone())
    }

    fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<Note, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        match inner.notes.get(&id) {
            Some(note) if note.user_id == user_id => {}
            _ => return Err(StoreError::NotFound),
        }
        Ok(inner.notes.remove(&id).expect("checked above"))
    }

    fn note_by_filename(&self, user_id: Uuid, filename: &str) -> Option<Note> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .notes
            .values()
            .find(|note| {
                note.user_id == user_id && note.filename.as_deref() == Some(filename)
            })
            .cloned()
    }
}

/// Uploaded PDFs on the local filesystem, one flat directory.
#[derive(Clone)]
pub struct DiskBlobStore {
    dir: PathBuf,
}

impl DiskBlobStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl BlobStore for DiskBlobStore {
    fn store_pdf(
        &self,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<StoredPdf, UploadError> {
        uploads::store_pdf(&self.dir, bytes, content_type)
    }

    fn read(&self, filename: &str) -> Result<Vec<u8>, UploadError> {
        uploads::read_pdf(&self.dir, filename)
    }

    fn remove(&self, filename: &str) -> Result<(), UploadError> {
        uploads::remove_pdf(&self.dir, filename)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::types::note::NoteKind;

    /// A clock that returns the same instant until told to advance.
    #[derive(Clone)]
    pub(crate) struct FrozenClock {
        now: Arc<Mutex<OffsetDateTime>>,
    }

    impl FrozenClock {
        pub(crate) fn at(now: OffsetDateTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub(crate) fn advance(&self, by: time::Duration) {
            let mut now = self.now.lock().expect("clock lock");
            *now += by;
        }
    }

    impl Clock for FrozenClock {
        fn now(&self) -> OffsetDateTime {
            *self.now.lock().expect("clock lock")
        }
    }

    fn store_with_frozen_clock() -> (MemoryStore, FrozenClock) {
        let clock = FrozenClock::at(OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000));
        (MemoryStore::new(Arc::new(clock.clone())), clock)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn create_user__should_reject_duplicate_email_or_username() {
        // Given
        let (store, _) = store_with_frozen_clock();
        store
            .create_user(new_user("alice", "a@x.com"))
            .expect("create alice");

        // When / Then
        assert!(matches!(
            store.create_user(new_user("alice2", "a@x.com")),
            Err(StoreError::Duplicate)
        ));
        assert!(matches!(
            store.create_user(new_user("alice", "other@x.com")),
            Err(StoreError::Duplicate)
        ));
    }

    #[test]
    fn create_notebook__should_seed_one_blank_page() {
        // Given
        let (store, _) = store_with_frozen_clock();
        let user_id = Uuid::new_v4();

        // When
        let notebook = store.create_notebook(user_id, "Physics".to_string());

        // Then
        assert_eq!(notebook.pages, vec![Page::blank(1)]);
        assert_eq!(notebook.created_at, notebook.last_modified);
    }

    #[test]
    fn update_notebook__should_advance_last_modified_with_a_stalled_clock() {
        // Given
        let (store, _) = store_with_frozen_clock();
        let user_id = Uuid::new_v4();
        let notebook = store.create_notebook(user_id, "Physics".to_string());

        // When: the clock never moves between mutations
        let first = store
            .update_notebook(user_id, notebook.id, NotebookPatch::default())
            .expect("first update");
        let second = store
            .update_notebook(user_id, notebook.id, NotebookPatch::default())
            .expect("second update");

        // Then
        assert!(first.last_modified > notebook.last_modified);
        assert!(second.last_modified > first.last_modified);
    }

    #[test]
    fn notebook__should_hide_documents_owned_by_other_users() {
        // Given
        let (store, _) = store_with_frozen_clock();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let notebook = store.create_notebook(alice, "Physics".to_string());

        // When / Then
        assert!(store.notebook(bob, notebook.id).is_none());
        assert!(matches!(
            store.update_notebook(bob, notebook.id, NotebookPatch::default()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_notebook(bob, notebook.id),
            Err(StoreError::NotFound)
        ));
        assert!(store.notebook(alice, notebook.id).is_some());
    }

    #[test]
    fn notebooks_for_user__should_sort_by_last_modified_desc() {
        // Given
        let (store, clock) = store_with_frozen_clock();
        let user_id = Uuid::new_v4();
        let older = store.create_notebook(user_id, "Older".to_string());
        clock.advance(time::Duration::seconds(5));
        let newer = store.create_notebook(user_id, "Newer".to_string());
        clock.advance(time::Duration::seconds(5));
        store
            .update_notebook(user_id, older.id, NotebookPatch {
                name: Some("Touched".to_string()),
                pages: None,
            })
            .expect("touch older");

        // When
        let notebooks = store.notebooks_for_user(user_id);

        // Then
        assert_eq!(notebooks[0].name, "Touched");
        assert_eq!(notebooks[1].id, newer.id);
    }

    #[test]
    fn notes_for_user__should_apply_kind_and_archived_filters() {
        // Given
        let (store, _) = store_with_frozen_clock();
        let user_id = Uuid::new_v4();
        let text = store.create_note(text_note(user_id, "Text"));
        let pdf = store.create_note(NewNote {
            kind: NoteKind::Pdf,
            filename: Some("1-aa.pdf".to_string()),
            original_name: Some("paper.pdf".to_string()),
            file_size: Some(10),
            ..text_note(user_id, "Pdf")
        });
        store
            .update_note(user_id, text.id, NotePatch {
                is_archived: Some(true),
                ..NotePatch::default()
            })
            .expect("archive text note");

        // When / Then
        let pdfs = store.notes_for_user(
            user_id,
            &NoteFilter {
                kind: Some(NoteKind::Pdf),
                archived: None,
            },
        );
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].id, pdf.id);

        let archived = store.notes_for_user(
            user_id,
            &NoteFilter {
                kind: None,
                archived: Some(true),
            },
        );
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, text.id);
    }

    #[test]
    fn note_by_filename__should_scope_to_owner() {
        // Given
        let (store, _) = store_with_frozen_clock();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create_note(NewNote {
            kind: NoteKind::Pdf,
            filename: Some("1-aa.pdf".to_string()),
            original_name: Some("paper.pdf".to_string()),
            file_size: Some(10),
            ..text_note(alice, "Pdf")
        });

        // When / Then
        assert!(store.note_by_filename(alice, "1-aa.pdf").is_some());
        assert!(store.note_by_filename(bob, "1-aa.pdf").is_none());
    }

    fn text_note(user_id: Uuid, title: &str) -> NewNote {
        NewNote {
            user_id,
            title: title.to_string(),
            content: "content".to_string(),
            tags: Vec::new(),
            kind: NoteKind::Text,
            filename: None,
            original_name: None,
            file_size: None,
        }
    }
}
