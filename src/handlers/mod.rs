pub mod people;
pub mod secure;
