use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::PersistError;
use crate::handlers::{people, secure};
use crate::registry::{PersonRegistry, ViewSession};
use crate::secure::{SecureValueStore, SecureView};

/// Shared state for both screens.
///
/// Each view sits behind an async mutex held for the whole operation, which
/// stands in for the screen's loading gate: one action per screen at a time.
#[derive(Clone)]
pub struct AppState {
    pub registry: PersonRegistry,
    pub people_view: Arc<Mutex<ViewSession>>,
    pub secure: SecureValueStore,
    pub secure_view: Arc<Mutex<SecureView>>,
}

impl AppState {
    /// Build the state and perform the initial loads both screens do when opened.
    ///
    /// A secure store that cannot be read leaves that screen empty; the
    /// failure is logged and the people screen still comes up.
    pub async fn new(
        registry: PersonRegistry,
        secure: SecureValueStore,
    ) -> Result<Self, PersistError> {
        let mut session = ViewSession::new();
        registry.refresh(&mut session).await?;

        let mut secure_view = SecureView::new();
        let found = match secure_view.load(&secure).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "initial secure load failed");
                false
            }
        };
        info!(
            rows_on_first_page = session.people.len(),
            total_pages = session.total_pages(),
            secure_value_present = found,
            "screens loaded"
        );

        Ok(Self {
            registry,
            people_view: Arc::new(Mutex::new(session)),
            secure,
            secure_view: Arc::new(Mutex::new(secure_view)),
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/people", get(people::view).post(people::insert))
        .route("/people/refresh", post(people::refresh))
        .route(
            "/people/edit",
            put(people::commit_edit).delete(people::cancel_edit),
        )
        .route("/people/{id}/edit", post(people::begin_edit))
        .route("/people/delete", post(people::request_delete_all))
        .route("/people/{id}/delete", post(people::request_delete))
        .route(
            "/confirmations/{token}",
            post(people::confirm).delete(people::dismiss),
        )
        .route(
            "/secure",
            get(secure::load).put(secure::save).delete(secure::clear),
        )
        .route("/secure/reveal", post(secure::toggle_reveal))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure::EncryptedFileBackend;
    use crate::secure::cipher::SlotKey;

    #[tokio::test]
    async fn unreadable_secure_slot_does_not_block_startup() {
        let dir = tempfile::tempdir().unwrap();
        let old = SecureValueStore::new(Arc::new(
            EncryptedFileBackend::open(dir.path(), SlotKey::generate()).unwrap(),
        ));
        old.save("sealed with the old key").await.unwrap();

        let registry = PersonRegistry::open("sqlite::memory:").await.unwrap();
        let mut session = ViewSession::new();
        registry.insert(&mut session, "Ana", "30").await.unwrap();

        let secure = SecureValueStore::new(Arc::new(
            EncryptedFileBackend::open(dir.path(), SlotKey::generate()).unwrap(),
        ));
        let state = AppState::new(registry, secure).await.unwrap();

        let view = state.secure_view.lock().await;
        assert_eq!(view.stored, None);
        assert!(!view.snapshot().has_stored);
        let people = state.people_view.lock().await;
        assert_eq!(people.people.len(), 1);
        assert_eq!(people.people[0].name, "Ana");
    }
}
