use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::db::Person;
use crate::error::PersistError;
use crate::registry::session::PendingView;
use crate::registry::{ConfirmationToken, ViewSession, ViewSnapshot};
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Raw form fields; `age` is text exactly as typed.
#[derive(Debug, Deserialize)]
pub struct PersonForm {
    pub name: String,
    pub age: String,
}

/// Result of an action plus the view to re-render.
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    pub result: T,
    pub view: ViewSnapshot,
}

/// GET /people[?page=N] -> current view, navigating first when `page` is given.
pub async fn view(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Outcome<bool>>, PersistError> {
    let mut session = state.people_view.lock().await;
    let moved = match query.page {
        Some(page) => state.registry.change_page(&mut session, page).await?,
        None => false,
    };
    Ok(Json(Outcome {
        result: moved,
        view: session.snapshot(),
    }))
}

/// POST /people/refresh
pub async fn refresh(State(state): State<AppState>) -> Result<Json<ViewSnapshot>, PersistError> {
    let mut session = state.people_view.lock().await;
    state.registry.refresh(&mut session).await?;
    Ok(Json(session.snapshot()))
}

/// POST /people -> 201 with the new row, view reset to page 1.
pub async fn insert(
    State(state): State<AppState>,
    Json(form): Json<PersonForm>,
) -> Result<(StatusCode, Json<Outcome<Person>>), PersistError> {
    let mut session = state.people_view.lock().await;
    let person = state
        .registry
        .insert(&mut session, &form.name, &form.age)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Outcome {
            result: person,
            view: session.snapshot(),
        }),
    ))
}

/// POST /people/{id}/edit -> start editing a row listed on the current page.
pub async fn begin_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ViewSnapshot>, PersistError> {
    let mut session = state.people_view.lock().await;
    let person = session.listed(id).cloned().ok_or(PersistError::NotFound(id))?;
    state.registry.begin_edit(&mut session, &person);
    Ok(Json(session.snapshot()))
}

/// PUT /people/edit -> write the submitted scratch fields.
pub async fn commit_edit(
    State(state): State<AppState>,
    Json(form): Json<PersonForm>,
) -> Result<Json<Outcome<Person>>, PersistError> {
    let mut session = state.people_view.lock().await;
    state
        .registry
        .set_scratch(&mut session, form.name, form.age)?;
    let person = state.registry.commit_edit(&mut session).await?;
    Ok(Json(Outcome {
        result: person,
        view: session.snapshot(),
    }))
}

/// DELETE /people/edit
pub async fn cancel_edit(State(state): State<AppState>) -> Json<Outcome<bool>> {
    let mut session = state.people_view.lock().await;
    let was_editing = state.registry.cancel_edit(&mut session);
    Json(Outcome {
        result: was_editing,
        view: session.snapshot(),
    })
}

/// POST /people/{id}/delete -> open a confirmation for one row.
pub async fn request_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<PendingView> {
    let mut session = state.people_view.lock().await;
    let token = state.registry.request_delete(id);
    Json(open_prompt(&mut session, token))
}

/// POST /people/delete -> open a confirmation for the whole table.
pub async fn request_delete_all(State(state): State<AppState>) -> Json<PendingView> {
    let mut session = state.people_view.lock().await;
    let token = state.registry.request_delete_all();
    Json(open_prompt(&mut session, token))
}

fn open_prompt(session: &mut ViewSession, token: ConfirmationToken) -> PendingView {
    let view = PendingView {
        token: token.id(),
        target: token.target(),
    };
    // A new prompt replaces one left open.
    session.pending = Some(token);
    view
}

/// POST /confirmations/{token} -> run the pending deletion.
pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<u64>,
) -> Result<Json<Outcome<u64>>, PersistError> {
    let mut session = state.people_view.lock().await;
    let pending = session
        .take_pending(token)
        .ok_or(PersistError::UnknownConfirmation(token))?;
    let removed = state.registry.confirm(&mut session, pending).await?;
    Ok(Json(Outcome {
        result: removed,
        view: session.snapshot(),
    }))
}

/// DELETE /confirmations/{token} -> dismiss the prompt; nothing is deleted.
pub async fn dismiss(
    State(state): State<AppState>,
    Path(token): Path<u64>,
) -> Result<Json<ViewSnapshot>, PersistError> {
    let mut session = state.people_view.lock().await;
    session
        .take_pending(token)
        .ok_or(PersistError::UnknownConfirmation(token))?;
    Ok(Json(session.snapshot()))
}
