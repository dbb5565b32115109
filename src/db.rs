use crate::config::App;
use crate::error::{StoreError, StoreResult};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

const SYSTEM_MIGRATION: (&str, &str) =
    ("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"));

const MIGRATIONS: &[(&str, &str)] = &[("001_markers.sql", include_str!("migrations/001_markers.sql"))];

#[derive(Debug, Clone)]
struct Replica {
    url: String,
    auth_token: String,
    sync_interval: Duration,
}

struct Handle {
    db: LibsqlDatabase,
    conn: Connection,
}

/// Process-wide datastore handle.
///
/// Nothing is opened until the first call to [`Database::connection`]. Concurrent
/// first callers wait on the same initialization; an initialization that fails is
/// not cached, so the next caller tries again.
pub struct Database {
    path: PathBuf,
    replica: Option<Replica>,
    handle: OnceCell<Handle>,
    opened: AtomicUsize,
    closed: AtomicBool,
}

impl Database {
    pub fn new(cfg: &App, data_dir: &Path) -> Self {
        let replica = if cfg.is_replica() {
            Some(Replica {
                url: cfg.turso_url.clone().unwrap_or_default(),
                auth_token: cfg.turso_auth_token.clone().unwrap_or_default(),
                sync_interval: Duration::from_secs(cfg.sync_interval_seconds),
            })
        } else {
            None
        };

        Database {
            path: cfg.database_path(data_dir),
            replica,
            handle: OnceCell::new(),
            opened: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn in_memory() -> Self {
        Database::new(&App::in_memory(), Path::new("."))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    /// How many times a connection has been successfully established.
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::Acquire)
    }

    pub async fn connection(&self) -> StoreResult<&Connection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let handle = self.handle.get_or_try_init(|| self.open()).await?;
        Ok(&handle.conn)
    }

    async fn open(&self) -> StoreResult<Handle> {
        tracing::info!(path = ?self.path, "[db] establishing connection");

        let db = match &self.replica {
            Some(replica) => {
                tracing::info!("[db] running in synced database mode");
                Builder::new_synced_database(&self.path, replica.url.clone(), replica.auth_token.clone())
                    .sync_interval(replica.sync_interval)
                    .build()
                    .await
                    .map_err(StoreError::Connect)?
            }
            None => Builder::new_local(&self.path).build().await.map_err(StoreError::Connect)?,
        };

        let conn = db.connect().map_err(StoreError::Connect)?;
        conn.query("SELECT 1", ()).await.map_err(StoreError::Connect)?;

        Self::run_migrations(&conn).await?;

        self.opened.fetch_add(1, Ordering::AcqRel);
        tracing::info!("[db] connection established");
        Ok(Handle { db, conn })
    }

    async fn run_migrations(conn: &Connection) -> StoreResult<()> {
        let (name, sql) = SYSTEM_MIGRATION;
        conn.execute_batch(sql).await.map_err(|source| StoreError::Migration {
            name: name.to_owned(),
            source,
        })?;

        for (name, sql) in MIGRATIONS {
            Self::run_migration(conn, name, sql).await?;
        }
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> StoreResult<()> {
        let migration_error = |source| StoreError::Migration {
            name: name.to_owned(),
            source,
        };

        let mut rows = conn
            .query("SELECT 1 FROM _migrations WHERE name = ?", libsql::params![name])
            .await
            .map_err(migration_error)?;
        if rows.next().await.map_err(migration_error)?.is_some() {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql).await.map_err(migration_error)?;
        conn.execute(
            "INSERT INTO _migrations (name, applied_at) VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            libsql::params![name],
        )
        .await
        .map_err(migration_error)?;
        Ok(())
    }

    /// Flushes a synced replica one last time and refuses further work.
    pub async fn shutdown(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let (Some(_), Some(handle)) = (&self.replica, self.handle.get()) {
            tracing::info!("[db] final replica sync before shutdown");
            handle.db.sync().await?;
        }
        tracing::info!("[db] store closed");
        Ok(())
    }
}
