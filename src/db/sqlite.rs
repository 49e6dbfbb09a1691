use crate::db::models::{NewPerson, Person};
use crate::db::schema::SQLITE_INIT;
use crate::error::PersistError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct PeopleStorage {
    pool: SqlitePool,
    statements: Arc<AtomicU64>,
}

impl PeopleStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            statements: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open (creating if missing) the database behind `database_url`.
    ///
    /// The pool holds a single connection that never expires: every statement
    /// runs on the same handle, which also keeps `sqlite::memory:` databases
    /// alive for the lifetime of the storage.
    pub async fn connect(database_url: &str) -> Result<Self, PersistError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;
        Ok(Self::new(pool))
    }

    /// Shared counter of statements sent to the engine, schema included.
    pub fn statement_counter(&self) -> Arc<AtomicU64> {
        self.statements.clone()
    }

    fn tick(&self) {
        self.statements.fetch_add(1, Ordering::Relaxed);
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), PersistError> {
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            self.tick();
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, PersistError> {
        self.tick();
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    /// Newest first, `limit` rows starting at `offset`.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Person>, PersistError> {
        self.tick();
        let rows = sqlx::query_as::<_, Person>(
            "SELECT id, name, age FROM people ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns the row id assigned by AUTOINCREMENT.
    pub async fn insert(&self, person: &NewPerson) -> Result<i64, PersistError> {
        self.tick();
        let res = sqlx::query("INSERT INTO people (name, age) VALUES (?, ?)")
            .bind(&person.name)
            .bind(person.age)
            .execute(&self.pool)
            .await?;
        Ok(res.last_insert_rowid())
    }

    /// Returns the number of rows matched.
    pub async fn update_by_id(&self, id: i64, person: &NewPerson) -> Result<u64, PersistError> {
        self.tick();
        let res = sqlx::query("UPDATE people SET name = ?, age = ? WHERE id = ?")
            .bind(&person.name)
            .bind(person.age)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<u64, PersistError> {
        self.tick();
        let res = sqlx::query("DELETE FROM people WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn delete_all(&self) -> Result<u64, PersistError> {
        self.tick();
        let res = sqlx::query("DELETE FROM people")
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
