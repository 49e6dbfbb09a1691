//! Database module: the `people` table and the actor that owns it.
//!
//! Layout:
//! - `models.rs`: row struct and validated input
//! - `schema.rs`: SQL DDL run at bootstrap
//! - `sqlite.rs`: parameter-bound statements over a single-connection pool
//! - `actor.rs`: ractor actor serializing every statement through one mailbox

pub mod actor;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use actor::{DbHandle, spawn};
pub use models::{NewPerson, Person};
pub use schema::SQLITE_INIT;
pub use sqlite::{PeopleStorage, SqlitePool};
