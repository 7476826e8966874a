//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    CreateTicketRequest, Ticket, TicketError, TicketFilter, TicketOrder, TicketPriority,
    TicketStatus, TicketStore,
};
use crate::storage::{
    format_date, format_timestamp, parse_date, parse_optional_timestamp, parse_timestamp,
};

const TICKET_COLUMNS: &str = "id, queue_number, queue_date, status, priority, counter_id, \
    customer_name, customer_contact, notes, estimated_wait_time, actual_service_time, \
    called_at, finished_at, expired_at, created_at, updated_at";

impl From<rusqlite::Error> for TicketError {
    fn from(e: rusqlite::Error) -> Self {
        TicketError::Database(e.to_string())
    }
}

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = crate::storage::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue_number INTEGER NOT NULL,
                queue_date TEXT NOT NULL,
                status TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 1,
                counter_id INTEGER,
                customer_name TEXT,
                customer_contact TEXT,
                notes TEXT,
                estimated_wait_time INTEGER,
                actual_service_time INTEGER,
                called_at TEXT,
                finished_at TEXT,
                expired_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ticket_sequence (
                queue_date TEXT PRIMARY KEY,
                last_number INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_day_status ON tickets(queue_date, status);
            CREATE INDEX IF NOT EXISTS idx_tickets_dispatch ON tickets(priority DESC, created_at ASC);
            CREATE INDEX IF NOT EXISTS idx_tickets_number ON tickets(queue_date, queue_number);
            CREATE INDEX IF NOT EXISTS idx_tickets_updated_at ON tickets(updated_at);
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("ticket store lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref day) = filter.queue_date {
            conditions.push("queue_date = ?");
            params.push(Box::new(format_date(day)));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(counter_id) = filter.counter_id {
            conditions.push("counter_id = ?");
            params.push(Box::new(counter_id));
        }

        if let Some(priority) = filter.min_priority {
            conditions.push("priority >= ?");
            params.push(Box::new(priority.rank()));
        }

        if filter.live_only {
            conditions.push("expired_at IS NULL");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn order_clause(order: TicketOrder) -> &'static str {
        match order {
            TicketOrder::QueueNumber => "ORDER BY queue_date ASC, queue_number ASC, id ASC",
            TicketOrder::Dispatch => "ORDER BY priority DESC, created_at ASC, id ASC",
            TicketOrder::RecentlyCalled => "ORDER BY called_at DESC, id DESC",
        }
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let queue_date: String = row.get(2)?;
        let status: String = row.get(3)?;
        let created_at: String = row.get(14)?;
        let updated_at: String = row.get(15)?;

        let status = status.parse::<TicketStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?;

        Ok(Ticket {
            id: row.get(0)?,
            queue_number: row.get(1)?,
            queue_date: parse_date(2, &queue_date)?,
            status,
            priority: TicketPriority::from_rank(row.get(4)?),
            counter_id: row.get(5)?,
            customer_name: row.get(6)?,
            customer_contact: row.get(7)?,
            notes: row.get(8)?,
            estimated_wait_time: row.get(9)?,
            actual_service_time: row.get(10)?,
            called_at: parse_optional_timestamp(11, row.get(11)?)?,
            finished_at: parse_optional_timestamp(12, row.get(12)?)?,
            expired_at: parse_optional_timestamp(13, row.get(13)?)?,
            created_at: parse_timestamp(14, &created_at)?,
            updated_at: parse_timestamp(15, &updated_at)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<Ticket>, TicketError> {
        let sql = format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_ticket)
            .optional()?)
    }

    fn fetch_existing(conn: &Connection, id: i64) -> Result<Ticket, TicketError> {
        Self::fetch(conn, id)?.ok_or(TicketError::NotFound(id))
    }
}

impl TicketStore for SqliteTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let mut conn = self.conn()?;
        let now = format_timestamp(&Utc::now());
        let day = format_date(&request.queue_date);

        let tx = conn.transaction()?;

        let queue_number: i64 = tx.query_row(
            "INSERT INTO ticket_sequence (queue_date, last_number) VALUES (?1, ?2)
             ON CONFLICT(queue_date) DO UPDATE SET last_number = last_number + 1
             RETURNING last_number",
            params![day, request.start_number],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO tickets (queue_number, queue_date, status, priority, customer_name, customer_contact, notes, estimated_wait_time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                queue_number,
                day,
                TicketStatus::Waiting.as_str(),
                request.priority.rank(),
                request.customer_name,
                request.customer_contact,
                request.notes,
                request.estimated_wait_time,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Self::fetch_existing(&conn, id)
    }

    fn get(&self, id: i64) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} {} LIMIT ? OFFSET ?",
            TICKET_COLUMNS,
            where_clause,
            Self::order_clause(filter.order)
        );

        let mut stmt = conn.prepare(&sql)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        // SQLite treats a negative LIMIT as no limit
        all_params.push(Box::new(filter.limit.unwrap_or(-1)));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_ticket)?;
        let tickets = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn find_by_number(&self, day: NaiveDate, number: i64) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM tickets WHERE queue_date = ? AND queue_number = ? AND expired_at IS NULL ORDER BY id DESC LIMIT 1",
            TICKET_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![format_date(&day), number], Self::row_to_ticket)
            .optional()?)
    }

    fn next_waiting(&self, day: NaiveDate) -> Result<Option<Ticket>, TicketError> {
        let filter = TicketFilter::live_on(day)
            .with_status(TicketStatus::Waiting)
            .ordered_by(TicketOrder::Dispatch)
            .with_limit(1);
        Ok(self.list(&filter)?.into_iter().next())
    }

    fn claim(
        &self,
        id: i64,
        counter_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE tickets SET status = ?1, counter_id = ?2, called_at = ?3, updated_at = ?3
             WHERE id = ?4 AND status = ?5 AND expired_at IS NULL",
            params![
                TicketStatus::BeingServed.as_str(),
                counter_id,
                format_timestamp(&at),
                id,
                TicketStatus::Waiting.as_str(),
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }

        Self::fetch(&conn, id)
    }

    fn release(&self, id: i64) -> Result<bool, TicketError> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE tickets SET status = ?1, counter_id = NULL, called_at = NULL, updated_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                TicketStatus::Waiting.as_str(),
                format_timestamp(&Utc::now()),
                id,
                TicketStatus::BeingServed.as_str(),
            ],
        )?;

        Ok(changed > 0)
    }

    fn finish(
        &self,
        id: i64,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn()?;

        let current = Self::fetch_existing(&conn, id)?;

        let operation = match status {
            TicketStatus::Completed => "complete",
            TicketStatus::Skipped => "skip",
            _ => "finish",
        };

        if current.status != TicketStatus::BeingServed || !status.is_finished() {
            return Err(TicketError::InvalidState {
                ticket_id: id,
                current_status: current.status,
                operation: operation.to_string(),
            });
        }

        let service_secs = current
            .called_at
            .map(|called_at| (at - called_at).num_seconds().max(0));

        let changed = conn.execute(
            "UPDATE tickets SET status = ?1, finished_at = ?2, actual_service_time = ?3, updated_at = ?2
             WHERE id = ?4 AND status = ?5",
            params![
                status.as_str(),
                format_timestamp(&at),
                service_secs,
                id,
                TicketStatus::BeingServed.as_str(),
            ],
        )?;

        if changed == 0 {
            let latest = Self::fetch_existing(&conn, id)?;
            return Err(TicketError::InvalidState {
                ticket_id: id,
                current_status: latest.status,
                operation: operation.to_string(),
            });
        }

        Self::fetch_existing(&conn, id)
    }

    fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, TicketError> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM tickets WHERE status IN (?1, ?2) AND updated_at < ?3",
            params![
                TicketStatus::Completed.as_str(),
                TicketStatus::Skipped.as_str(),
                format_timestamp(&cutoff),
            ],
        )?;

        Ok(deleted)
    }

    fn start_new_day(&self, at: DateTime<Utc>) -> Result<usize, TicketError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // updated_at is left alone so cleanup retention still counts from the last transition
        let expired = tx.execute(
            "UPDATE tickets SET expired_at = ?1 WHERE expired_at IS NULL",
            params![format_timestamp(&at)],
        )?;
        tx.execute("DELETE FROM ticket_sequence", [])?;
        tx.commit()?;

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_store() -> SqliteTicketStore {
        SqliteTicketStore::in_memory().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn request(priority: TicketPriority) -> CreateTicketRequest {
        CreateTicketRequest {
            queue_date: today(),
            start_number: 1,
            priority,
            customer_name: None,
            customer_contact: None,
            notes: None,
            estimated_wait_time: Some(5),
        }
    }

    #[test]
    fn test_create_ticket() {
        let store = create_test_store();

        let mut req = request(TicketPriority::High);
        req.customer_name = Some("Budi".to_string());
        let ticket = store.create(req).unwrap();

        assert!(ticket.id > 0);
        assert_eq!(ticket.queue_number, 1);
        assert_eq!(ticket.queue_date, today());
        assert_eq!(ticket.status, TicketStatus::Waiting);
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.customer_name.as_deref(), Some("Budi"));
        assert_eq!(ticket.estimated_wait_time, Some(5));
        assert!(ticket.counter_id.is_none());
    }

    #[test]
    fn test_numbers_are_sequential_per_day() {
        let store = create_test_store();

        let numbers: Vec<i64> = (0..4)
            .map(|_| store.create(request(TicketPriority::Normal)).unwrap().queue_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);

        let mut tomorrow = request(TicketPriority::Normal);
        tomorrow.queue_date = today().succ_opt().unwrap();
        assert_eq!(store.create(tomorrow).unwrap().queue_number, 1);
    }

    #[test]
    fn test_custom_start_number() {
        let store = create_test_store();
        let mut req = request(TicketPriority::Normal);
        req.start_number = 100;
        assert_eq!(store.create(req.clone()).unwrap().queue_number, 100);
        assert_eq!(store.create(req).unwrap().queue_number, 101);
    }

    #[test]
    fn test_get_nonexistent_ticket() {
        let store = create_test_store();
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_next_waiting_prefers_priority_then_age() {
        let store = create_test_store();

        let first_normal = store.create(request(TicketPriority::Normal)).unwrap();
        store.create(request(TicketPriority::Low)).unwrap();
        let first_high = store.create(request(TicketPriority::High)).unwrap();
        store.create(request(TicketPriority::High)).unwrap();

        let next = store.next_waiting(today()).unwrap().unwrap();
        assert_eq!(next.id, first_high.id);

        let filter = TicketFilter::live_on(today()).ordered_by(TicketOrder::Dispatch);
        let ordered: Vec<TicketPriority> =
            store.list(&filter).unwrap().iter().map(|t| t.priority).collect();
        assert_eq!(
            ordered,
            vec![
                TicketPriority::High,
                TicketPriority::High,
                TicketPriority::Normal,
                TicketPriority::Low
            ]
        );
        assert_eq!(store.list(&filter).unwrap()[2].id, first_normal.id);
    }

    #[test]
    fn test_claim_is_guarded_by_status() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();

        let claimed = store.claim(ticket.id, 1, Utc::now()).unwrap().unwrap();
        assert_eq!(claimed.status, TicketStatus::BeingServed);
        assert_eq!(claimed.counter_id, Some(1));
        assert!(claimed.called_at.is_some());

        // A second counter loses the race
        assert!(store.claim(ticket.id, 2, Utc::now()).unwrap().is_none());
        let fetched = store.get(ticket.id).unwrap().unwrap();
        assert_eq!(fetched.counter_id, Some(1));
    }

    #[test]
    fn test_release_returns_ticket_to_waiting() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();
        store.claim(ticket.id, 1, Utc::now()).unwrap();

        assert!(store.release(ticket.id).unwrap());
        let fetched = store.get(ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Waiting);
        assert!(fetched.counter_id.is_none());

        // Releasing a WAITING ticket is a no-op
        assert!(!store.release(ticket.id).unwrap());
    }

    #[test]
    fn test_finish_records_service_time() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();
        let called_at = Utc::now();
        store.claim(ticket.id, 3, called_at).unwrap();

        let finished = store
            .finish(ticket.id, TicketStatus::Completed, called_at + Duration::seconds(90))
            .unwrap();

        assert_eq!(finished.status, TicketStatus::Completed);
        assert_eq!(finished.counter_id, Some(3));
        assert_eq!(finished.actual_service_time, Some(90));
        assert!(finished.finished_at.is_some());
    }

    #[test]
    fn test_finish_waiting_ticket_is_invalid() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();

        let result = store.finish(ticket.id, TicketStatus::Skipped, Utc::now());
        assert!(matches!(
            result,
            Err(TicketError::InvalidState {
                current_status: TicketStatus::Waiting,
                ..
            })
        ));

        let fetched = store.get(ticket.id).unwrap().unwrap();
        assert_eq!(fetched.status, TicketStatus::Waiting);
    }

    #[test]
    fn test_finish_twice_is_invalid() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();
        store.claim(ticket.id, 1, Utc::now()).unwrap();
        store
            .finish(ticket.id, TicketStatus::Skipped, Utc::now())
            .unwrap();

        let result = store.finish(ticket.id, TicketStatus::Completed, Utc::now());
        assert!(matches!(result, Err(TicketError::InvalidState { .. })));
    }

    #[test]
    fn test_finish_nonexistent_ticket() {
        let store = create_test_store();
        let result = store.finish(99, TicketStatus::Completed, Utc::now());
        assert!(matches!(result, Err(TicketError::NotFound(99))));
    }

    #[test]
    fn test_count_with_filters() {
        let store = create_test_store();
        let a = store.create(request(TicketPriority::Normal)).unwrap();
        store.create(request(TicketPriority::High)).unwrap();
        store.create(request(TicketPriority::Low)).unwrap();
        store.claim(a.id, 1, Utc::now()).unwrap();

        let waiting = TicketFilter::live_on(today()).with_status(TicketStatus::Waiting);
        assert_eq!(store.count(&waiting).unwrap(), 2);
        assert_eq!(
            store
                .count(&waiting.clone().with_min_priority(TicketPriority::Normal))
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count(&TicketFilter::new().with_counter(1))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_find_by_number_ignores_expired() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();

        let found = store.find_by_number(today(), 1).unwrap().unwrap();
        assert_eq!(found.id, ticket.id);

        store.start_new_day(Utc::now()).unwrap();
        assert!(store.find_by_number(today(), 1).unwrap().is_none());
    }

    #[test]
    fn test_start_new_day_expires_and_restarts_numbering() {
        let store = create_test_store();
        store.create(request(TicketPriority::Normal)).unwrap();
        store.create(request(TicketPriority::Normal)).unwrap();

        assert_eq!(store.start_new_day(Utc::now()).unwrap(), 2);
        assert_eq!(store.start_new_day(Utc::now()).unwrap(), 0);

        let fresh = store.create(request(TicketPriority::Normal)).unwrap();
        assert_eq!(fresh.queue_number, 1);
        assert_eq!(
            store.count(&TicketFilter::live_on(today())).unwrap(),
            1
        );
        assert!(store.next_waiting(today()).unwrap().is_some());
    }

    #[test]
    fn test_expired_ticket_cannot_be_claimed() {
        let store = create_test_store();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();
        store.start_new_day(Utc::now()).unwrap();

        assert!(store.next_waiting(today()).unwrap().is_none());
        assert!(store.claim(ticket.id, 1, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_delete_finished_before() {
        let store = create_test_store();
        let done = store.create(request(TicketPriority::Normal)).unwrap();
        let waiting = store.create(request(TicketPriority::Normal)).unwrap();
        store.claim(done.id, 1, Utc::now()).unwrap();
        store
            .finish(done.id, TicketStatus::Completed, Utc::now())
            .unwrap();

        // Nothing is old enough yet
        let removed = store
            .delete_finished_before(Utc::now() - Duration::hours(24))
            .unwrap();
        assert_eq!(removed, 0);

        let removed = store
            .delete_finished_before(Utc::now() + Duration::hours(1))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(done.id).unwrap().is_none());
        assert!(store.get(waiting.id).unwrap().is_some());
    }

    #[test]
    fn test_list_pagination() {
        let store = create_test_store();
        for _ in 0..5 {
            store.create(request(TicketPriority::Normal)).unwrap();
        }

        let page = store
            .list(&TicketFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].queue_number, 5);
    }

    #[test]
    fn test_list_without_limit_returns_every_ticket() {
        let store = create_test_store();
        for _ in 0..620 {
            store.create(request(TicketPriority::Normal)).unwrap();
        }

        let all = store.list(&TicketFilter::live_on(today())).unwrap();
        assert_eq!(all.len(), 620);
        assert_eq!(all.last().unwrap().queue_number, 620);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("queue.db");

        let store = SqliteTicketStore::new(&db_path).unwrap();
        let ticket = store.create(request(TicketPriority::Normal)).unwrap();
        assert!(db_path.exists());
        drop(store);

        // Numbering survives a restart
        let store = SqliteTicketStore::new(&db_path).unwrap();
        assert!(store.get(ticket.id).unwrap().is_some());
        assert_eq!(
            store.create(request(TicketPriority::Normal)).unwrap().queue_number,
            2
        );
    }
}
