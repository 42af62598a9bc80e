use anyhow::{anyhow, Context, Result};
use hacknet_execution::{State, Status};
use hacknet_types::{Key, KeyKind, Value};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{debug, warn};

/// [`State`] backed by a single SQLite table.
///
/// Every record is one row keyed by [`Key::encode`]. `apply` runs inside one transaction, so a
/// change set lands completely or not at all. Calls run on the blocking pool.
#[derive(Clone)]
pub struct SqliteState {
    conn: Arc<Mutex<Connection>>,
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS records (
             key TEXT PRIMARY KEY,
             kind TEXT NOT NULL,
             value BLOB NOT NULL
         );
         CREATE INDEX IF NOT EXISTS records_by_kind ON records (kind);",
    )
    .context("init hacknet schema")?;
    Ok(())
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    match conn.lock() {
        Ok(conn) => conn,
        Err(poisoned) => {
            warn!("SQLite connection lock poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

fn upsert(conn: &Connection, key: &Key, value: &Value) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO records (key, kind, value) VALUES (?1, ?2, ?3)",
        params![key.encode(), key.kind().as_str(), value.encode()?],
    )
    .with_context(|| format!("write {}", key.encode()))?;
    Ok(())
}

fn remove(conn: &Connection, key: &Key) -> Result<()> {
    conn.execute(
        "DELETE FROM records WHERE key = ?1",
        params![key.encode()],
    )
    .with_context(|| format!("delete {}", key.encode()))?;
    Ok(())
}

impl SqliteState {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&mut lock(&conn)))
            .await
            .map_err(|err| anyhow!("sqlite task failed: {err}"))?
    }
}

impl State for SqliteState {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let encoded = key.encode();
        self.blocking(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT value FROM records WHERE key = ?1",
                    params![encoded],
                    |row| row.get(0),
                )
                .optional()
                .with_context(|| format!("read {encoded}"))?;
            bytes.map(|bytes| Value::decode(&bytes)).transpose()
        })
        .await
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.blocking(move |conn| upsert(conn, &key, &value)).await
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let key = key.clone();
        self.blocking(move |conn| remove(conn, &key)).await
    }

    async fn scan(&self, kind: KeyKind) -> Result<Vec<(Key, Value)>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM records WHERE kind = ?1")?;
            let rows = stmt.query_map(params![kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (key, bytes) = row.with_context(|| format!("scan {kind}"))?;
                records.push((Key::decode(&key)?, Value::decode(&bytes)?));
            }
            Ok(records)
        })
        .await
    }

    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        self.blocking(move |conn| {
            let count = changes.len();
            let tx = conn.transaction().context("begin transaction")?;
            for (key, status) in &changes {
                match status {
                    Status::Update(value) => upsert(&tx, key, value)?,
                    Status::Delete => remove(&tx, key)?,
                }
            }
            tx.commit().context("commit transaction")?;
            debug!(count, "applied change set");
            Ok(())
        })
        .await
    }
}
