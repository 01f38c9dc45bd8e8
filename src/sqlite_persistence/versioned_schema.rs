use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to every schema version before it is written to `PRAGMA user_version`,
/// so that a database created by something else is never mistaken for version 0.
pub const BASE_DB_VERSION: usize = 77000;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

/// Every row referencing an athlete belongs to that athlete, so deletes cascade.
pub enum ForeignKeyOnChange {
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

/// Column as reported by `PRAGMA table_info`.
struct ActualColumn {
    name: String,
    sql_type: Option<&'static SqlType>,
    non_null: bool,
    default_value: Option<String>,
    is_primary_key: bool,
}

fn strip_parentheses(s: &str) -> &str {
    if s.starts_with('(') && s.ends_with(')') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.as_sql()));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if column.is_unique {
                create_sql.push_str(" UNIQUE");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
            if let Some(foreign_key) = column.foreign_key {
                create_sql.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    foreign_key.foreign_table,
                    foreign_key.foreign_column,
                    foreign_key.on_delete.as_sql()
                ));
            }
        }
        for unique_constraint in self.unique_constraints {
            create_sql.push_str(&format!(", UNIQUE ({})", unique_constraint.join(", ")));
        }
        create_sql.push_str(");");
        conn.execute(&create_sql, params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: SqlType::from_sql(&row.get::<_, String>(2)?),
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found column names: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} Column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != Some(expected.sql_type) {
                bail!(
                    "Table {} Column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} Column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.default_value.as_deref().map(strip_parentheses)
                != expected.default_value.map(strip_parentheses)
            {
                bail!(
                    "Table {} Column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} Column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (index_name, _column) in self.indices {
            let index_exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        if !self.unique_constraints.is_empty() {
            let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
            let unique_indices: Vec<String> = stmt
                .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
                .filter_map(|r| r.ok())
                .filter(|(_, is_unique)| *is_unique == 1)
                .map(|(name, _)| name)
                .collect();

            let mut unique_index_columns: Vec<Vec<String>> = Vec::new();
            for index_name in &unique_indices {
                let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
                let mut cols: Vec<String> = idx_stmt
                    .query_map([], |row| row.get::<_, String>(2))?
                    .filter_map(|r| r.ok())
                    .collect();
                cols.sort();
                unique_index_columns.push(cols);
            }

            for expected_columns in self.unique_constraints {
                let mut expected_sorted: Vec<&str> = expected_columns.to_vec();
                expected_sorted.sort();
                let found = unique_index_columns
                    .iter()
                    .any(|actual| actual.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
                if !found {
                    bail!(
                        "Table {} is missing unique constraint on columns ({})",
                        self.name,
                        expected_columns.join(", ")
                    );
                }
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Opens (or creates) the database at `db_path`, validates it against the schema
/// it declares and runs any pending migrations up to the last entry of `schemas`.
pub fn open_versioned<P: AsRef<Path>>(db_path: P, schemas: &[VersionedSchema]) -> Result<Connection> {
    let latest = schemas.last().context("No schema versions declared")?;
    let conn = if db_path.as_ref().exists() {
        Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    } else {
        let conn = Connection::open(db_path)?;
        latest.create(&conn)?;
        conn
    };
    conn.execute("PRAGMA foreign_keys = ON;", [])?;

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    if version >= schemas.len() {
        bail!("Database version {} is too new", version);
    }
    schemas[version].validate(&conn)?;

    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(&conn)?;
        }
        latest_from = schema.version;
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
        [],
    )?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE_TABLE: Table = Table {
        name: "score",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("athlete", &SqlType::Text, non_null = true),
            sqlite_column!("value", &SqlType::Real, non_null = true),
        ],
        indices: &[("idx_score_athlete", "athlete")],
        unique_constraints: &[&["athlete", "value"]],
    };

    const SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
        version: 0,
        tables: &[SCORE_TABLE],
        migration: None,
    }];

    #[test]
    fn creates_and_validates_fresh_schema() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMAS[0].create(&conn).unwrap();
        SCHEMAS[0].validate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version as usize, BASE_DB_VERSION);
    }

    #[test]
    fn validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE score (id INTEGER PRIMARY KEY, athlete TEXT NOT NULL, value REAL NOT NULL, UNIQUE (athlete, value))",
            [],
        )
        .unwrap();

        let err = SCHEMAS[0].validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_score_athlete"));
    }

    #[test]
    fn validate_detects_type_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE score (id INTEGER PRIMARY KEY, athlete TEXT NOT NULL, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let err = SCHEMAS[0].validate(&conn).unwrap_err().to_string();
        assert!(err.contains("type mismatch"));
    }

    #[test]
    fn validate_detects_missing_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE score (id INTEGER PRIMARY KEY, athlete TEXT NOT NULL, value REAL NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute("CREATE INDEX idx_score_athlete ON score(athlete)", [])
            .unwrap();

        let err = SCHEMAS[0].validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing unique constraint"));
    }

    #[test]
    fn open_versioned_reopens_existing_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("scores.db");

        {
            let conn = open_versioned(&path, SCHEMAS).unwrap();
            conn.execute(
                "INSERT INTO score (athlete, value) VALUES ('a', 1.5)",
                [],
            )
            .unwrap();
        }

        let conn = open_versioned(&path, SCHEMAS).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM score", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    const OWNER_FOREIGN_KEY: ForeignKey = ForeignKey {
        foreign_table: "owner",
        foreign_column: "id",
        on_delete: ForeignKeyOnChange::Cascade,
    };

    const OWNER_TABLE: Table = Table {
        name: "owner",
        columns: &[sqlite_column!("id", &SqlType::Text, is_primary_key = true)],
        indices: &[],
        unique_constraints: &[],
    };

    const OWNED_TABLE: Table = Table {
        name: "owned",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!(
                "owner_id",
                &SqlType::Text,
                non_null = true,
                foreign_key = Some(&OWNER_FOREIGN_KEY)
            ),
        ],
        indices: &[],
        unique_constraints: &[],
    };

    const OWNED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
        version: 0,
        tables: &[OWNER_TABLE, OWNED_TABLE],
        migration: None,
    }];

    #[test]
    fn deleting_a_referenced_row_cascades() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let conn = open_versioned(temp_dir.path().join("owned.db"), OWNED_SCHEMAS).unwrap();
        conn.execute("INSERT INTO owner (id) VALUES ('a'), ('b')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO owned (owner_id) VALUES ('a'), ('a'), ('b')",
            [],
        )
        .unwrap();
        assert!(conn
            .execute("INSERT INTO owned (owner_id) VALUES ('ghost')", [])
            .is_err());

        conn.execute("DELETE FROM owner WHERE id = 'a'", []).unwrap();
        let remaining: Vec<String> = conn
            .prepare("SELECT owner_id FROM owned")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(remaining, vec!["b".to_string()]);
    }

    #[test]
    fn open_versioned_rejects_foreign_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE unrelated (id INTEGER)", []).unwrap();
        }

        let err = open_versioned(&path, SCHEMAS).unwrap_err().to_string();
        assert!(err.contains("too old"));
    }
}
