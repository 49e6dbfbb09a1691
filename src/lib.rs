pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod secure;

pub use error::PersistError;
pub use registry::PersonRegistry;
pub use secure::SecureValueStore;
