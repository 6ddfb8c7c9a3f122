use crate::ports::NotebookPatch;
use crate::state;
use crate::types::notebook::{self, Notebook, Page};

use axum::Json;
use axum::extract::{Extension, Path as AxumPath, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::CurrentUser;
use super::{ApiError, api_error};

#[derive(Serialize)]
pub(crate) struct DeletedResponse {
    pub(crate) message: &'static str,
}

pub(crate) async fn notebook_list(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<Vec<Notebook>> {
    Json(state.store.notebooks_for_user(user.id))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateNotebookBody {
    name: String,
}

pub(crate) async fn notebook_create(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<CreateNotebookBody>,
) -> Result<(StatusCode, Json<Notebook>), ApiError> {
    let name = body.name.trim().to_string();
    notebook::validate_name(&name).map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let notebook = state.store.create_notebook(user.id, name);
    Ok((StatusCode::CREATED, Json(notebook)))
}

pub(crate) async fn notebook_get(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<Notebook>, ApiError> {
    state
        .store
        .notebook(user.id, id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Notebook not found"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateNotebookBody {
    name: Option<String>,
    pages: Option<Vec<Page>>,
}

pub(crate) async fn notebook_update(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<Uuid>,
    Json(body): Json<UpdateNotebookBody>,
) -> Result<Json<Notebook>, ApiError> {
    let name = match body.name {
        Some(name) => {
            let name = name.trim().to_string();
            notebook::validate_name(&name)
                .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;
            Some(name)
        }
        None => None,
    };
    if let Some(pages) = body.pages.as_deref() {
        notebook::validate_pages(pages)
            .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;
    }

    state
        .store
        .update_notebook(
            user.id,
            id,
            NotebookPatch {
                name,
                pages: body.pages,
            },
        )
        .map(Json)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Notebook not found"))
}

pub(crate) async fn notebook_delete(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state
        .store
        .delete_notebook(user.id, id)
        .map(|_| {
            Json(DeletedResponse {
                message: "Notebook deleted successfully",
            })
        })
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Notebook not found"))
}
