//! SQLite implementation of the counter store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Counter, CounterError, CounterStore, NewCounter, UpdateCounterRequest};
use crate::storage::{format_timestamp, parse_optional_timestamp, parse_timestamp};

const COUNTER_COLUMNS: &str = "id, name, description, is_active, current_queue_number, \
    current_queue_id, estimated_service_time, max_queue, created_at, updated_at, deleted_at";

/// SQLite-backed counter store.
pub struct SqliteCounterStore {
    conn: Mutex<Connection>,
}

impl SqliteCounterStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CounterError> {
        let conn = crate::storage::open(path).map_err(|e| CounterError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, CounterError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CounterError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CounterError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                current_queue_number INTEGER,
                current_queue_id INTEGER,
                estimated_service_time INTEGER NOT NULL,
                max_queue INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_counters_live ON counters(deleted_at, is_active);
            "#,
        )
        .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CounterError> {
        self.conn
            .lock()
            .map_err(|_| CounterError::Database("counter store lock poisoned".to_string()))
    }

    fn row_to_counter(row: &rusqlite::Row) -> rusqlite::Result<Counter> {
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(Counter {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            is_active: row.get(3)?,
            current_queue_number: row.get(4)?,
            current_queue_id: row.get(5)?,
            estimated_service_time: row.get(6)?,
            max_queue: row.get(7)?,
            created_at: parse_timestamp(8, &created_at)?,
            updated_at: parse_timestamp(9, &updated_at)?,
            deleted_at: parse_optional_timestamp(10, row.get(10)?)?,
        })
    }

    fn fetch_live(conn: &Connection, id: i64) -> Result<Option<Counter>, CounterError> {
        let sql = format!(
            "SELECT {} FROM counters WHERE id = ? AND deleted_at IS NULL",
            COUNTER_COLUMNS
        );
        conn.query_row(&sql, params![id], Self::row_to_counter)
            .optional()
            .map_err(|e| CounterError::Database(e.to_string()))
    }

    fn fetch_any(conn: &Connection, id: i64) -> Result<Counter, CounterError> {
        let sql = format!("SELECT {} FROM counters WHERE id = ?", COUNTER_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_counter)
            .optional()
            .map_err(|e| CounterError::Database(e.to_string()))?
            .ok_or(CounterError::NotFound(id))
    }
}

impl CounterStore for SqliteCounterStore {
    fn create(&self, counter: NewCounter) -> Result<Counter, CounterError> {
        let conn = self.lock()?;
        let now = format_timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO counters (name, description, is_active, estimated_service_time, max_queue, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                counter.name,
                counter.description,
                counter.is_active,
                counter.estimated_service_time,
                counter.max_queue,
                now,
            ],
        )
        .map_err(|e| CounterError::Database(e.to_string()))?;

        Self::fetch_any(&conn, conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<Counter>, CounterError> {
        let conn = self.lock()?;
        Self::fetch_live(&conn, id)
    }

    fn list(&self) -> Result<Vec<Counter>, CounterError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM counters WHERE deleted_at IS NULL ORDER BY id ASC",
            COUNTER_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CounterError::Database(e.to_string()))?;

        let counters = stmt
            .query_map([], Self::row_to_counter)
            .map_err(|e| CounterError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(counters)
    }

    fn update(&self, id: i64, update: &UpdateCounterRequest) -> Result<Counter, CounterError> {
        let conn = self.lock()?;

        let mut sets = vec!["updated_at = ?"];
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(format_timestamp(&Utc::now()))];

        if let Some(ref name) = update.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(ref description) = update.description {
            sets.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(active) = update.is_active {
            sets.push("is_active = ?");
            values.push(Box::new(active));
        }
        if let Some(minutes) = update.estimated_service_time {
            sets.push("estimated_service_time = ?");
            values.push(Box::new(minutes));
        }
        if let Some(max_queue) = update.max_queue {
            sets.push("max_queue = ?");
            values.push(Box::new(max_queue));
        }

        values.push(Box::new(id));
        let sql = format!(
            "UPDATE counters SET {} WHERE id = ? AND deleted_at IS NULL",
            sets.join(", ")
        );
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let changed = conn
            .execute(&sql, refs.as_slice())
            .map_err(|e| CounterError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(CounterError::NotFound(id));
        }

        Self::fetch_any(&conn, id)
    }

    fn soft_delete(&self, id: i64) -> Result<Counter, CounterError> {
        let conn = self.lock()?;
        let now = format_timestamp(&Utc::now());

        let changed = conn
            .execute(
                "UPDATE counters SET deleted_at = ?1, updated_at = ?1, current_queue_id = NULL, current_queue_number = NULL
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, id],
            )
            .map_err(|e| CounterError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(CounterError::NotFound(id));
        }

        Self::fetch_any(&conn, id)
    }

    fn set_active(&self, id: i64, active: bool) -> Result<Counter, CounterError> {
        self.update(
            id,
            &UpdateCounterRequest {
                is_active: Some(active),
                ..Default::default()
            },
        )
    }

    fn assign(&self, id: i64, ticket_id: i64, queue_number: i64) -> Result<bool, CounterError> {
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "UPDATE counters SET current_queue_id = ?1, current_queue_number = ?2, updated_at = ?3
                 WHERE id = ?4 AND is_active = 1 AND deleted_at IS NULL AND current_queue_id IS NULL",
                params![ticket_id, queue_number, format_timestamp(&Utc::now()), id],
            )
            .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(changed > 0)
    }

    fn release(&self, id: i64, ticket_id: i64) -> Result<bool, CounterError> {
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "UPDATE counters SET current_queue_id = NULL, current_queue_number = NULL, updated_at = ?1
                 WHERE id = ?2 AND current_queue_id = ?3",
                params![format_timestamp(&Utc::now()), id, ticket_id],
            )
            .map_err(|e| CounterError::Database(e.to_string()))?;

        Ok(changed > 0)
    }

    fn clear_all(&self) -> Result<usize, CounterError> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE counters SET current_queue_id = NULL, current_queue_number = NULL, updated_at = ?1
             WHERE current_queue_id IS NOT NULL OR current_queue_number IS NOT NULL",
            params![format_timestamp(&Utc::now())],
        )
        .map_err(|e| CounterError::Database(e.to_string()))
    }
}
