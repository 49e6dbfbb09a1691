use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::router::AppState;
use crate::secure::ClearOutcome;
use crate::secure::store::SecureSnapshot;

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SecureOutcome<T> {
    pub result: T,
    pub view: SecureSnapshot,
}

/// GET /secure -> read the slot; `result` is false when nothing is stored.
pub async fn load(
    State(state): State<AppState>,
) -> Result<Json<SecureOutcome<bool>>, PersistError> {
    let mut view = state.secure_view.lock().await;
    let found = view.load(&state.secure).await?;
    Ok(Json(SecureOutcome {
        result: found,
        view: view.snapshot(),
    }))
}

/// PUT /secure
pub async fn save(
    State(state): State<AppState>,
    Json(form): Json<SaveForm>,
) -> Result<Json<SecureSnapshot>, PersistError> {
    let mut view = state.secure_view.lock().await;
    view.draft = form.value;
    view.save(&state.secure).await?;
    Ok(Json(view.snapshot()))
}

/// DELETE /secure
pub async fn clear(
    State(state): State<AppState>,
) -> Result<Json<SecureOutcome<ClearOutcome>>, PersistError> {
    let mut view = state.secure_view.lock().await;
    let outcome = view.clear(&state.secure).await?;
    Ok(Json(SecureOutcome {
        result: outcome,
        view: view.snapshot(),
    }))
}

/// POST /secure/reveal
pub async fn toggle_reveal(State(state): State<AppState>) -> Json<SecureSnapshot> {
    let mut view = state.secure_view.lock().await;
    view.toggle_reveal();
    Json(view.snapshot())
}
