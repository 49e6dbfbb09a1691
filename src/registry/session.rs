//! Presentation-owned state for the people screen.
//!
//! The registry never keeps any of this itself; callers hand a `&mut ViewSession`
//! to each operation and render from it afterwards.

use serde::Serialize;

use crate::db::models::Person;
use crate::registry::pagination::PaginationState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    #[default]
    Idle,
    /// Scratch fields hold raw text; they are only validated on commit.
    Editing { id: i64, name: String, age: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DeleteTarget {
    One(i64),
    All,
}

/// Proof that a deletion was requested. Confirming consumes it; dropping it
/// cancels the deletion without touching storage.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfirmationToken {
    id: u64,
    target: DeleteTarget,
}

impl ConfirmationToken {
    pub(crate) fn new(id: u64, target: DeleteTarget) -> Self {
        Self { id, target }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> DeleteTarget {
        self.target
    }
}

#[derive(Debug, Default)]
pub struct ViewSession {
    pub pagination: PaginationState,
    /// Rows of `pagination.current_page` as of the last refresh.
    pub people: Vec<Person>,
    pub edit: EditState,
    /// At most one confirmation prompt is open at a time.
    pub pending: Option<ConfirmationToken>,
}

impl ViewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> i64 {
        self.pagination.current_page
    }

    pub fn total_pages(&self) -> i64 {
        self.pagination.total_pages
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.edit, EditState::Editing { .. })
    }

    /// Row currently listed with this id, if any.
    pub fn listed(&self, id: i64) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    /// Take the pending token if it matches `id`.
    pub fn take_pending(&mut self, id: u64) -> Option<ConfirmationToken> {
        match &self.pending {
            Some(token) if token.id() == id => self.pending.take(),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            pagination: self.pagination,
            has_previous: self.pagination.has_previous(),
            has_next: self.pagination.has_next(),
            people: self.people.clone(),
            edit: self.edit.clone(),
            pending: self.pending.as_ref().map(|t| PendingView {
                token: t.id(),
                target: t.target(),
            }),
        }
    }
}

/// Serializable copy of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub pagination: PaginationState,
    pub has_previous: bool,
    pub has_next: bool,
    pub people: Vec<Person>,
    pub edit: EditState,
    pub pending: Option<PendingView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingView {
    pub token: u64,
    pub target: DeleteTarget,
}
