use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

/// Name and age that already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub age: i64,
}

impl NewPerson {
    pub fn into_person(self, id: i64) -> Person {
        Person {
            id,
            name: self.name,
            age: self.age,
        }
    }
}
