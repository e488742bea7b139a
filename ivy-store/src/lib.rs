//! The persistent status store (spec.md §4.6).
//!
//! A single `rusqlite`-backed table keyed on `(name, solver)`, written only
//! through transactions, with write-ahead logging enabled and a
//! retry-once-on-contention wrapper around every public method — the same
//! shape as `task_manager::adv_sqlite::TaskDb` (`Connection::open_with_flags`,
//! WAL pragma, prepared-statement cache behind an exclusive lock), adapted
//! from a multi-table task-metadata schema to the orchestrator's much
//! simpler `(name, solver) -> status` mapping.

mod error;

use std::path::Path;
use std::sync::Mutex;

use ivy_graph::{status_or_equivalent, Name, Status, Task};
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::collections::HashMap;

pub use error::StoreError;

/// Persistent store of per-task status, surviving process restarts. Not
/// `Sync`: per spec.md §5 all orchestration runs on one logical thread, so
/// the store is only ever accessed from there.
#[derive(Debug)]
pub struct StatusStore {
    conn: Mutex<Connection>,
}

impl StatusStore {
    fn open(path: &Path) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Opens (creating if necessary) the status store at `path` and ensures
    /// its schema exists. Idempotent: calling this against an
    /// already-initialized database is a no-op beyond opening the
    /// connection, matching the `setup` command's requirement to be safe to
    /// re-run (spec.md §4.9 step 2).
    pub fn open_or_create(path: &Path) -> Result<Self, StoreError> {
        let conn = Self::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS proof_status (
                name    TEXT NOT NULL,
                solver  TEXT NOT NULL,
                status  TEXT NOT NULL,
                PRIMARY KEY (name, solver)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `body` inside a transaction; on a contention-class error
    /// (`SQLITE_BUSY`/`SQLITE_LOCKED`) rolls back and retries exactly once
    /// in `BEGIN IMMEDIATE` mode. Any other error rolls back and
    /// propagates without retrying (spec.md §4.6 durability contract, §7
    /// error kind 6).
    fn transact<T>(
        &self,
        mut body: impl FnMut(&rusqlite::Transaction) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().expect("status store mutex poisoned");

        let txn = conn.transaction()?;
        match body(&txn) {
            Ok(value) => {
                txn.commit()?;
                return Ok(value);
            }
            Err(e) if is_contention(&e) => {
                tracing::debug!("store transaction contended, retrying once in immediate mode");
                txn.rollback().ok();
            }
            Err(e) => {
                txn.rollback().ok();
                return Err(e.into());
            }
        }

        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match body(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.rollback().ok();
                Err(e.into())
            }
        }
    }

    /// Bulk-inserts `tasks` with `status = pending`. Spec.md §4.6
    /// `initialize_status`.
    pub fn initialize_status(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.transact(|txn| {
            let mut stmt = txn.prepare_cached(
                "INSERT OR IGNORE INTO proof_status (name, solver, status) VALUES (?1, ?2, ?3)",
            )?;
            for task in tasks {
                stmt.execute(rusqlite::params![
                    task.name.db_key(),
                    task.solver,
                    Status::Pending.as_str_code()
                ])?;
            }
            Ok(())
        })
    }

    /// The full `(name, solver) -> status` map. Spec.md §4.6 `full_status`.
    pub fn full_status(&self) -> Result<HashMap<Task, Status>, StoreError> {
        self.transact(|txn| {
            let mut stmt = txn.prepare_cached("SELECT name, solver, status FROM proof_status")?;
            let rows = stmt.query_map([], |row| {
                let name: String = row.get(0)?;
                let solver: String = row.get(1)?;
                let status: String = row.get(2)?;
                Ok((name, solver, status))
            })?;
            let mut out = HashMap::new();
            for row in rows {
                let (name, solver, status) = row?;
                let name = Name::from_db_key(&name).map_err(to_sql_err)?;
                let status = Status::from_str_code(&status).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "status".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?;
                out.insert(Task::new(name, solver), status);
            }
            Ok(out)
        })
    }

    /// `full_status`, grouped by name and reduced with `status_or_equivalent`
    /// (fail-dominant max). Spec.md §4.6 `reduced_status`.
    pub fn reduced_status(&self) -> Result<HashMap<Name, Status>, StoreError> {
        let full = self.full_status()?;
        let mut by_name: HashMap<Name, Vec<Status>> = HashMap::new();
        for (task, status) in full {
            by_name.entry(task.name).or_default().push(status);
        }
        Ok(by_name
            .into_iter()
            .map(|(name, statuses)| (name, status_or_equivalent(statuses)))
            .collect())
    }

    /// The status of every task whose entity name is in `names`. Spec.md
    /// §4.6 `status(names)`.
    pub fn status(&self, names: &[Name]) -> Result<HashMap<Task, Status>, StoreError> {
        let keys: std::collections::HashSet<String> = names.iter().map(Name::db_key).collect();
        let full = self.full_status()?;
        Ok(full
            .into_iter()
            .filter(|(task, _)| keys.contains(&task.name.db_key()))
            .collect())
    }

    /// Transitions `task` to `new`, unless `require` is given and the
    /// current status isn't in it, in which case the current status is
    /// returned and nothing is written. Spec.md §4.6 `change_status`.
    pub fn change_status(
        &self,
        task: &Task,
        new: Status,
        require: Option<&[Status]>,
    ) -> Result<Option<Status>, StoreError> {
        self.transact(|txn| {
            let current: String = txn.query_row(
                "SELECT status FROM proof_status WHERE name = ?1 AND solver = ?2",
                rusqlite::params![task.name.db_key(), task.solver],
                |row| row.get(0),
            )?;
            let current = Status::from_str_code(&current).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(0, "status".to_string(), rusqlite::types::Type::Text)
            })?;
            if let Some(require) = require {
                if !require.contains(&current) {
                    return Ok(Some(current));
                }
            }
            txn.execute(
                "UPDATE proof_status SET status = ?1 WHERE name = ?2 AND solver = ?3",
                rusqlite::params![new.as_str_code(), task.name.db_key(), task.solver],
            )?;
            Ok(None)
        })
    }

    /// Atomically applies `change_status` semantics to every task in
    /// `tasks`, all within a single transaction. A require-mismatch on one
    /// task does not abort the others; the returned map carries the
    /// previous status for every task that was rejected. Spec.md §4.6
    /// `change_status_many`.
    pub fn change_status_many(
        &self,
        tasks: &[Task],
        new: Status,
        require: Option<&[Status]>,
    ) -> Result<HashMap<Task, Status>, StoreError> {
        self.transact(|txn| {
            let mut rejected = HashMap::new();
            for task in tasks {
                let current: String = txn.query_row(
                    "SELECT status FROM proof_status WHERE name = ?1 AND solver = ?2",
                    rusqlite::params![task.name.db_key(), task.solver],
                    |row| row.get(0),
                )?;
                let current = Status::from_str_code(&current).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "status".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?;
                if let Some(require) = require {
                    if !require.contains(&current) {
                        rejected.insert(task.clone(), current);
                        continue;
                    }
                }
                txn.execute(
                    "UPDATE proof_status SET status = ?1 WHERE name = ?2 AND solver = ?3",
                    rusqlite::params![new.as_str_code(), task.name.db_key(), task.solver],
                )?;
            }
            Ok(rejected)
        })
    }
}

fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

fn to_sql_err(e: ivy_graph::name::NameParseError) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, e.to_string(), rusqlite::types::Type::Text)
}
