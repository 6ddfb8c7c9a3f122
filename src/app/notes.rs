use crate::ports::{NewNote, NoteFilter, NotePatch};
use crate::state;
use crate::types::note::{self, Note, NoteKind};
use crate::uploads::UploadError;

use axum::Json;
use axum::extract::{Extension, Multipart, Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::{CurrentUser, bearer_token};
use super::notebooks::DeletedResponse;
use super::{ApiError, api_error, internal_error};

#[derive(Debug, Deserialize)]
pub(crate) struct NotesQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    archived: Option<String>,
}

pub(crate) async fn note_list(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let kind = match query.kind.as_deref() {
        None => None,
        Some("text") => Some(NoteKind::Text),
        Some("pdf") => Some(NoteKind::Pdf),
        Some(_) => return Err(api_error(StatusCode::BAD_REQUEST, "type must be text or pdf")),
    };
    let filter = NoteFilter {
        kind,
        archived: query.archived.as_deref().map(|value| value == "true"),
    };
    Ok(Json(state.store.notes_for_user(user.id, &filter)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateNoteBody {
    title: String,
    content: String,
    tags: Option<Vec<String>>,
}

pub(crate) async fn note_create(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<CreateNoteBody>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let title = body.title.trim().to_string();
    note::validate_title(&title)
        .and_then(|_| note::validate_content(&body.content))
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let created = state.store.create_note(NewNote {
        user_id: user.id,
        title,
        content: body.content,
        tags: body.tags.unwrap_or_default(),
        kind: NoteKind::Text,
        filename: None,
        original_name: None,
        file_size: None,
    });
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateNoteBody {
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    is_archived: Option<bool>,
}

pub(crate) async fn note_update(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<Uuid>,
    Json(body): Json<UpdateNoteBody>,
) -> Result<Json<Note>, ApiError> {
    let title = match body.title {
        Some(title) => {
            let title = title.trim().to_string();
            note::validate_title(&title)
                .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;
            Some(title)
        }
        None => None,
    };
    if let Some(content) = body.content.as_deref() {
        note::validate_content(content)
            .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;
    }

    state
        .store
        .update_note(
            user.id,
            id,
            NotePatch {
                title,
                content: body.content,
                tags: body.tags,
                is_archived: body.is_archived,
            },
        )
        .map(Json)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Note not found"))
}

pub(crate) async fn note_delete(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let note = state
        .store
        .delete_note(user.id, id)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Note not found"))?;

    // The note record is gone either way; losing the blob only leaks disk.
    if note.kind == NoteKind::Pdf
        && let Some(filename) = note.filename.as_deref()
        && let Err(err) = state.blobs.remove(filename)
    {
        eprintln!("failed to delete file {filename}: {err:?}");
    }

    Ok(Json(DeletedResponse {
        message: "Note deleted successfully",
    }))
}

pub(crate) async fn upload_pdf(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let mut upload: Option<(Option<String>, Option<String>, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("invalid multipart body: {err}"),
        )
    })? {
        if field.name() != Some("pdf") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        if content_type.as_deref() != Some("application/pdf") {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Only PDF files are allowed",
            ));
        }
        let original_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|err| {
            api_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("failed to read upload: {err}"),
            )
        })?;
        upload = Some((content_type, original_name, bytes));
        break;
    }

    let Some((content_type, original_name, bytes)) = upload else {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file uploaded"));
    };

    let stored = state
        .blobs
        .store_pdf(&bytes, content_type.as_deref())
        .map_err(|err| match err {
            UploadError::EmptyBody => api_error(StatusCode::BAD_REQUEST, "No file uploaded"),
            UploadError::UnsupportedType => {
                api_error(StatusCode::BAD_REQUEST, "Only PDF files are allowed")
            }
            err => {
                eprintln!("failed to store upload: {err:?}");
                internal_error()
            }
        })?;

    let original_name = original_name.unwrap_or_else(|| stored.filename.clone());
    let note = state.store.create_note(NewNote {
        user_id: user.id,
        title: original_name.clone(),
        content: format!("PDF file: {original_name}"),
        tags: Vec::new(),
        kind: NoteKind::Pdf,
        filename: Some(stored.filename),
        original_name: Some(original_name),
        file_size: Some(stored.size),
    });
    Ok((StatusCode::CREATED, Json(note)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PdfQuery {
    token: Option<String>,
}

/// Serves a stored PDF inline. The token rides in the query string or the
/// `Authorization` header; query acceptance exists so the URL can be handed
/// to a browser-native viewer, it is not a separate security boundary.
pub(crate) async fn serve_pdf(
    State(state): State<state::AppState>,
    AxumPath(filename): AxumPath<String>,
    Query(query): Query<PdfQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "Access denied. No token provided.",
            )
        })?;

    let user = state
        .auth
        .verify_token(token)
        .ok()
        .and_then(|user_id| state.store.user_by_id(user_id))
        .filter(|user| user.is_active)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Invalid token."))?;

    let note = state
        .store
        .note_by_filename(user.id, &filename)
        .filter(|note| note.kind == NoteKind::Pdf)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "PDF not found"))?;

    let bytes = state.blobs.read(&filename).map_err(|err| match err {
        UploadError::NotFound | UploadError::BadName => {
            api_error(StatusCode::NOT_FOUND, "PDF not found")
        }
        err => {
            eprintln!("failed to read file {filename}: {err:?}");
            internal_error()
        }
    })?;

    let display_name = note.original_name.as_deref().unwrap_or(&filename);
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/pdf")
        .header(
            "content-disposition",
            format!("inline; filename=\"{display_name}\""),
        )
        .body(bytes.into())
        .unwrap())
}
