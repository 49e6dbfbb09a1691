//! People registry: validation, paging and the edit/delete workflow on top of
//! the database actor.

pub mod pagination;
pub mod service;
pub mod session;
pub mod validation;

pub use pagination::{ITEMS_PER_PAGE, PaginationState, total_pages};
pub use service::PersonRegistry;
pub use session::{ConfirmationToken, DeleteTarget, EditState, ViewSession, ViewSnapshot};
pub use validation::validate_person;
