//! SQL DDL for the people table.

/// SQLite schema with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT, so ids are never handed out twice
///   even after the highest row is deleted
/// - `name` TEXT and `age` INTEGER, both nullable at the SQL level; the
///   registry validates before writing
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    age INTEGER
);
"#;
