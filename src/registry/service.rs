use crate::db::{self, DbHandle, Person};
use crate::error::PersistError;
use crate::registry::pagination::{ITEMS_PER_PAGE, page_offset, total_pages};
use crate::registry::session::{ConfirmationToken, DeleteTarget, EditState, ViewSession};
use crate::registry::validation::validate_person;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// CRUD and paging over the `people` table.
///
/// Holds nothing but the database handle and a token sequence; all view state
/// lives in the caller's [`ViewSession`].
#[derive(Clone)]
pub struct PersonRegistry {
    db: DbHandle,
    next_token: Arc<AtomicU64>,
}

impl PersonRegistry {
    /// Bootstrap the table behind `database_url` and return a ready registry.
    pub async fn open(database_url: &str) -> Result<Self, PersistError> {
        let db = db::spawn(database_url).await?;
        Ok(Self::new(db))
    }

    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    /// Rows of `page`, newest first. Pages past the end are empty, not errors.
    pub async fn list(&self, page: i64) -> Result<Vec<Person>, PersistError> {
        self.db.list_page(ITEMS_PER_PAGE, page_offset(page)).await
    }

    pub async fn count_pages(&self) -> Result<i64, PersistError> {
        let rows = self.db.count_rows().await?;
        Ok(total_pages(rows))
    }

    /// Re-read the current page and the page total.
    pub async fn refresh(&self, session: &mut ViewSession) -> Result<(), PersistError> {
        session.people = self.list(session.current_page()).await?;
        let rows = self.db.count_rows().await?;
        session.pagination.recount(rows);
        Ok(())
    }

    /// Move to `page` if it is within `1..=total_pages`; otherwise nothing happens.
    pub async fn change_page(
        &self,
        session: &mut ViewSession,
        page: i64,
    ) -> Result<bool, PersistError> {
        if !session.pagination.can_show(page) {
            debug!(page, total = session.total_pages(), "page out of range; ignored");
            return Ok(false);
        }
        session.people = self.list(page).await?;
        session.pagination.current_page = page;
        Ok(true)
    }

    /// Insert a row and jump back to page 1, where the new row is listed first.
    pub async fn insert(
        &self,
        session: &mut ViewSession,
        name: &str,
        age: &str,
    ) -> Result<Person, PersistError> {
        if session.is_editing() {
            return Err(PersistError::EditInProgress);
        }
        let person = validate_person(name, age)?;
        let id = self.db.insert(person.clone()).await?;
        info!(id, "person inserted");

        session.pagination.reset();
        self.refresh(session).await?;
        Ok(person.into_person(id))
    }

    /// Overwrite row `id`. The current page stays put even if the row moves.
    pub async fn update(
        &self,
        session: &mut ViewSession,
        id: i64,
        name: &str,
        age: &str,
    ) -> Result<Person, PersistError> {
        let person = validate_person(name, age)?;
        if self.db.update(id, person.clone()).await? == 0 {
            return Err(PersistError::NotFound(id));
        }
        info!(id, "person updated");

        session.people = self.list(session.current_page()).await?;
        Ok(person.into_person(id))
    }

    /// Enter editing with scratch fields copied from `person`.
    pub fn begin_edit(&self, session: &mut ViewSession, person: &Person) {
        session.edit = EditState::Editing {
            id: person.id,
            name: person.name.clone(),
            age: person.age.to_string(),
        };
    }

    pub fn set_scratch(
        &self,
        session: &mut ViewSession,
        name: impl Into<String>,
        age: impl Into<String>,
    ) -> Result<(), PersistError> {
        match &mut session.edit {
            EditState::Editing {
                name: scratch_name,
                age: scratch_age,
                ..
            } => {
                *scratch_name = name.into();
                *scratch_age = age.into();
                Ok(())
            }
            EditState::Idle => Err(PersistError::NotEditing),
        }
    }

    /// Discard the scratch fields. Returns whether an edit was open.
    pub fn cancel_edit(&self, session: &mut ViewSession) -> bool {
        let was_editing = session.is_editing();
        session.edit = EditState::Idle;
        was_editing
    }

    /// Write the scratch fields. On failure the session stays in editing.
    pub async fn commit_edit(&self, session: &mut ViewSession) -> Result<Person, PersistError> {
        let EditState::Editing { id, name, age } = session.edit.clone() else {
            return Err(PersistError::NotEditing);
        };
        let person = self.update(session, id, &name, &age).await?;
        session.edit = EditState::Idle;
        Ok(person)
    }

    pub fn request_delete(&self, id: i64) -> ConfirmationToken {
        self.issue(DeleteTarget::One(id))
    }

    pub fn request_delete_all(&self) -> ConfirmationToken {
        self.issue(DeleteTarget::All)
    }

    fn issue(&self, target: DeleteTarget) -> ConfirmationToken {
        let id = self.next_token.fetch_add(1, Ordering::Relaxed);
        debug!(token = id, ?target, "confirmation requested");
        ConfirmationToken::new(id, target)
    }

    /// Run a confirmed deletion. Returns the number of rows removed.
    ///
    /// Deleting one row keeps the current page, which may now lie past the
    /// last page; the listing for it is then simply empty.
    pub async fn confirm(
        &self,
        session: &mut ViewSession,
        token: ConfirmationToken,
    ) -> Result<u64, PersistError> {
        match token.target() {
            DeleteTarget::One(id) => {
                if self.db.delete_one(id).await? == 0 {
                    return Err(PersistError::NotFound(id));
                }
                info!(id, "person deleted");
                self.refresh(session).await?;
                Ok(1)
            }
            DeleteTarget::All => {
                let removed = self.db.delete_all().await?;
                info!(removed, "people table cleared");
                session.pagination.reset();
                self.refresh(session).await?;
                Ok(removed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> PersonRegistry {
        PersonRegistry::open("sqlite::memory:")
            .await
            .expect("open registry")
    }

    async fn seed(registry: &PersonRegistry, session: &mut ViewSession, n: usize) -> Vec<Person> {
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let p = registry
                .insert(session, &format!("p{i}"), &(20 + i).to_string())
                .await
                .expect("insert");
            out.push(p);
        }
        out
    }

    #[tokio::test]
    async fn scenario_one_five_six_rows() {
        let registry = registry().await;
        let mut session = ViewSession::new();

        let ana = registry.insert(&mut session, "Ana", "30").await.unwrap();
        assert_eq!(
            registry.list(1).await.unwrap(),
            vec![Person { id: 1, name: "Ana".into(), age: 30 }]
        );
        assert_eq!(ana.id, 1);
        assert_eq!(registry.count_pages().await.unwrap(), 1);

        seed(&registry, &mut session, 4).await;
        assert_eq!(registry.count_pages().await.unwrap(), 1);

        seed(&registry, &mut session, 1).await;
        assert_eq!(registry.count_pages().await.unwrap(), 2);
        assert_eq!(session.total_pages(), 2);

        let first: Vec<i64> = registry.list(1).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(first, vec![6, 5, 4, 3, 2]);
        let second = registry.list(2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "Ana");
    }

    #[tokio::test]
    async fn insert_resets_to_first_page() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 7).await;

        assert!(registry.change_page(&mut session, 2).await.unwrap());
        assert_eq!(session.current_page(), 2);

        let new = registry.insert(&mut session, "Zoe", "19").await.unwrap();
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.people[0], new);
        assert_eq!(session.total_pages(), 2);
    }

    #[tokio::test]
    async fn update_preserves_page() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let rows = seed(&registry, &mut session, 8).await;
        registry.change_page(&mut session, 2).await.unwrap();

        let oldest = &rows[0];
        let updated = registry
            .update(&mut session, oldest.id, "renamed", "50")
            .await
            .unwrap();
        assert_eq!(session.current_page(), 2);
        assert!(session.people.contains(&updated));
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let err = registry.update(&mut session, 42, "x", "1").await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(42)));
    }

    #[tokio::test]
    async fn validation_runs_no_statements() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let before = registry.db().statements_executed();

        let err = registry.insert(&mut session, "", "30").await.unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)));
        let err = registry.insert(&mut session, "Ana", "abc").await.unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)));
        let err = registry.update(&mut session, 1, "Ana", "abc").await.unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)));

        assert_eq!(registry.db().statements_executed(), before);
    }

    #[tokio::test]
    async fn deleting_last_row_of_last_page_leaves_stale_page() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let rows = seed(&registry, &mut session, 6).await;
        registry.change_page(&mut session, 2).await.unwrap();
        assert_eq!(session.people.len(), 1);

        let token = registry.request_delete(rows[0].id);
        assert_eq!(registry.confirm(&mut session, token).await.unwrap(), 1);

        assert_eq!(session.total_pages(), 1);
        assert_eq!(session.current_page(), 2);
        assert!(session.people.is_empty());
        assert!(registry.list(session.current_page()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropping_token_touches_nothing() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 2).await;
        let before = registry.db().statements_executed();

        let token = registry.request_delete_all();
        drop(token);

        assert_eq!(registry.db().statements_executed(), before);
        assert_eq!(registry.list(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_row_is_not_found() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let token = registry.request_delete(9);
        let err = registry.confirm(&mut session, token).await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound(9)));
    }

    #[tokio::test]
    async fn delete_all_resets_to_single_empty_page() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 11).await;
        registry.change_page(&mut session, 3).await.unwrap();

        let token = registry.request_delete_all();
        assert_eq!(registry.confirm(&mut session, token).await.unwrap(), 11);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.total_pages(), 1);
        assert!(session.people.is_empty());
    }

    #[tokio::test]
    async fn change_page_ignores_out_of_range() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 3).await;

        assert!(!registry.change_page(&mut session, 0).await.unwrap());
        assert!(!registry.change_page(&mut session, 2).await.unwrap());
        assert_eq!(session.current_page(), 1);
    }

    #[tokio::test]
    async fn edit_workflow() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let ana = registry.insert(&mut session, "Ana", "30").await.unwrap();

        registry.begin_edit(&mut session, &ana);
        assert_eq!(
            session.edit,
            EditState::Editing { id: ana.id, name: "Ana".into(), age: "30".into() }
        );

        let err = registry.insert(&mut session, "Luis", "40").await.unwrap_err();
        assert!(matches!(err, PersistError::EditInProgress));

        registry.set_scratch(&mut session, "Ana", "nope").unwrap();
        let err = registry.commit_edit(&mut session).await.unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)));
        assert!(session.is_editing());

        registry.set_scratch(&mut session, "Ana Maria", "31").unwrap();
        let saved = registry.commit_edit(&mut session).await.unwrap();
        assert_eq!(saved.name, "Ana Maria");
        assert_eq!(session.edit, EditState::Idle);
        assert_eq!(session.people, vec![saved]);
    }

    #[tokio::test]
    async fn cancel_edit_discards_scratch() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let ana = registry.insert(&mut session, "Ana", "30").await.unwrap();
        let before = registry.db().statements_executed();

        registry.begin_edit(&mut session, &ana);
        registry.set_scratch(&mut session, "Other", "99").unwrap();
        assert!(registry.cancel_edit(&mut session));
        assert!(!registry.cancel_edit(&mut session));

        assert_eq!(registry.db().statements_executed(), before);
        assert_eq!(registry.list(1).await.unwrap(), vec![ana]);
        assert!(matches!(
            registry.set_scratch(&mut session, "x", "1"),
            Err(PersistError::NotEditing)
        ));
        assert!(matches!(
            registry.commit_edit(&mut session).await,
            Err(PersistError::NotEditing)
        ));
    }

    #[tokio::test]
    async fn ids_never_reused() {
        let registry = registry().await;
        let mut session = ViewSession::new();
        let rows = seed(&registry, &mut session, 2).await;
        let token = registry.request_delete(rows[1].id);
        registry.confirm(&mut session, token).await.unwrap();

        let next = registry.insert(&mut session, "new", "1").await.unwrap();
        assert_eq!(next.id, rows[1].id + 1);
    }

    /// File-backed registry plus a second connection for arranging failures.
    async fn file_registry(dir: &tempfile::TempDir) -> (PersonRegistry, sqlx::SqlitePool) {
        let url = format!("sqlite:{}", dir.path().join("people.sqlite").display());
        let registry = PersonRegistry::open(&url).await.expect("open registry");
        let admin = sqlx::SqlitePool::connect(&url).await.expect("second connection");
        (registry, admin)
    }

    async fn block(admin: &sqlx::SqlitePool, event: &str) {
        let ddl = format!(
            "CREATE TRIGGER block_{event} BEFORE {event} ON people \
             BEGIN SELECT RAISE(ABORT, '{event} blocked'); END;"
        );
        sqlx::query(&ddl).execute(admin).await.expect("create trigger");
    }

    #[tokio::test]
    async fn failed_insert_leaves_table_and_view_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, admin) = file_registry(&dir).await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 6).await;
        assert!(registry.change_page(&mut session, 2).await.unwrap());
        block(&admin, "INSERT").await;

        let err = registry.insert(&mut session, "late", "1").await.unwrap_err();
        assert!(matches!(err, PersistError::Database(_)), "{err:?}");

        assert_eq!(session.current_page(), 2);
        assert_eq!(session.total_pages(), 2);
        assert_eq!(registry.db().count_rows().await.unwrap(), 6);
        admin.close().await;
    }

    #[tokio::test]
    async fn failed_commit_keeps_editing_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, admin) = file_registry(&dir).await;
        let mut session = ViewSession::new();
        let ana = registry.insert(&mut session, "Ana", "30").await.unwrap();
        registry.begin_edit(&mut session, &ana);
        registry.set_scratch(&mut session, "Bea", "31").unwrap();
        block(&admin, "UPDATE").await;

        let err = registry.commit_edit(&mut session).await.unwrap_err();
        assert!(matches!(err, PersistError::Database(_)), "{err:?}");
        assert!(session.is_editing());
        assert_eq!(registry.list(1).await.unwrap(), vec![ana]);
        admin.close().await;
    }

    #[tokio::test]
    async fn failed_delete_all_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, admin) = file_registry(&dir).await;
        let mut session = ViewSession::new();
        seed(&registry, &mut session, 3).await;
        block(&admin, "DELETE").await;

        let token = registry.request_delete_all();
        let err = registry.confirm(&mut session, token).await.unwrap_err();
        assert!(matches!(err, PersistError::Database(_)), "{err:?}");
        assert_eq!(registry.db().count_rows().await.unwrap(), 3);
        assert_eq!(session.people.len(), 3);
        admin.close().await;
    }
}
