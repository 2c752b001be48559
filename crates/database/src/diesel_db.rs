use std::fmt;

use diesel::{Connection, RunQueryDsl, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use error_stack::{Result, ResultExt};
use tracing::error;
use utils::{ComponentError, ContextExt, IntoReportFromString};

pub type DieselConnection = diesel::SqliteConnection;
pub type DieselPool = deadpool::unmanaged::Pool<DieselConnection>;
pub type PoolObject = deadpool::unmanaged::Object<DieselConnection>;

pub const DIESEL_MIGRATIONS: EmbeddedMigrations = embed_migrations!();

mod sqlite_version {
    use diesel::define_sql_function;
    define_sql_function! { fn sqlite_version() -> Text }
}

impl ComponentError for DieselDatabaseError {
    const COMPONENT_NAME: &'static str = "Diesel";
}

#[derive(thiserror::Error, Debug)]
pub enum DieselDatabaseError {
    #[error("Connecting to SQLite database failed")]
    Connect,
    #[error("SQLite connection setup failed")]
    Setup,
    #[error("Executing SQL query failed")]
    Execute,
    #[error("Running diesel database migrations failed")]
    Migrate,

    #[error("Running an action failed")]
    RunAction,
    #[error("Add connection to pool failed")]
    AddConnection,
    #[error("Connection get failed from connection pool")]
    GetConnection,

    #[error("SQLite version query failed")]
    SqliteVersionQuery,

    #[error("File operation failed")]
    File,
}

/// Location of the SQLite database.
#[derive(Debug, Clone)]
pub enum DatabaseLocation {
    File(std::path::PathBuf),
    /// Shared cache in RAM database. Data exists as long as at least one
    /// connection is open.
    InRam { name: String },
}

impl DatabaseLocation {
    fn connection_string(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().to_string(),
            Self::InRam { name } => format!("file:{}?mode=memory&cache=shared", name),
        }
    }
}

async fn close_connections(pool: &DieselPool, connections: usize) {
    for _ in 0..connections {
        let result = pool.remove().await;
        match result {
            Ok(conn) => drop(conn),
            Err(_) => error!("Failed to remove connection from pool"),
        }
    }
}

pub struct DieselCloseHandle {
    pool: DieselPool,
    connections: usize,
}

impl DieselCloseHandle {
    /// Call this before closing the program.
    pub async fn close(self) {
        close_connections(&self.pool, self.connections).await;
        self.pool.close()
    }
}

pub trait ObjectExtensions<T>: Sized {
    fn interact<F: FnOnce(&mut SqliteConnection) -> R + Send + 'static, R: Send + 'static>(
        self,
        action: F,
    ) -> impl std::future::Future<Output = Result<R, DieselDatabaseError>> + Send;
}

impl ObjectExtensions<SqliteConnection> for PoolObject {
    async fn interact<F: FnOnce(&mut SqliteConnection) -> R + Send + 'static, R: Send + 'static>(
        mut self,
        action: F,
    ) -> Result<R, DieselDatabaseError> {
        let handle = tokio::task::spawn_blocking(move || {
            let conn = self.as_mut();
            action(conn)
        });
        match handle.await {
            Ok(value) => Ok(value),
            Err(e) => Err(e.report()).change_context(DieselDatabaseError::RunAction),
        }
    }
}

async fn create_pool(
    location: &DatabaseLocation,
    connection_count: usize,
) -> Result<DieselPool, DieselDatabaseError> {
    let db_str = location.connection_string();

    let pool = deadpool::unmanaged::Pool::new(connection_count);
    for _ in 0..connection_count {
        let mut conn =
            SqliteConnection::establish(&db_str).change_context(DieselDatabaseError::Connect)?;
        sqlite_setup_connection(&mut conn)?;
        pool.add(conn)
            .await
            .map_err(|(_, e)| e)
            .change_context(DieselDatabaseError::AddConnection)?;
    }

    Ok(pool)
}

pub fn sqlite_setup_connection(conn: &mut SqliteConnection) -> Result<(), DieselDatabaseError> {
    let pragmas = &[
        "PRAGMA journal_mode=WAL;",
        "PRAGMA synchronous=NORMAL;",
        "PRAGMA foreign_keys=ON;",
        "PRAGMA busy_timeout=5000;",
    ];

    for pragma_str in pragmas {
        diesel::sql_query(*pragma_str)
            .execute(conn)
            .change_context(DieselDatabaseError::Setup)?;
    }

    Ok(())
}

/// Connection pool with a single connection. Only this handle writes
/// to the database.
#[derive(Clone)]
pub struct DieselWriteHandle {
    pool: DieselPool,
}

impl fmt::Debug for DieselWriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DieselWriteHandle").finish()
    }
}

impl DieselWriteHandle {
    /// Create new connection pool and run migrations.
    pub async fn new(
        location: &DatabaseLocation,
    ) -> Result<(Self, DieselCloseHandle), DieselDatabaseError> {
        let connections = 1;
        let pool = create_pool(location, connections).await?;

        let conn = pool
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)?;
        conn.interact(|conn| conn.run_pending_migrations(DIESEL_MIGRATIONS).map(|_| ()))
            .await?
            .into_error_string(DieselDatabaseError::Migrate)?;

        let write_handle = DieselWriteHandle { pool: pool.clone() };

        let close_handle = DieselCloseHandle { pool, connections };

        Ok((write_handle, close_handle))
    }

    pub fn pool(&self) -> &DieselPool {
        &self.pool
    }

    pub async fn sqlite_version(&self) -> Result<String, DieselDatabaseError> {
        let conn = self
            .pool
            .get()
            .await
            .change_context(DieselDatabaseError::GetConnection)?;

        let sqlite_version: Vec<String> = conn
            .interact(move |conn| diesel::select(sqlite_version::sqlite_version()).load::<String>(conn))
            .await?
            .change_context(DieselDatabaseError::Execute)?;

        sqlite_version
            .first()
            .ok_or(DieselDatabaseError::SqliteVersionQuery.report())
            .cloned()
    }

    /// Read handle which shares the write connection.
    pub fn to_read_handle(&self) -> DieselReadHandle {
        DieselReadHandle {
            pool: self.pool.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DieselReadHandle {
    pool: DieselPool,
}

impl fmt::Debug for DieselReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DieselReadHandle").finish()
    }
}

impl DieselReadHandle {
    /// Create the write handle first. Only that runs migrations.
    pub async fn new(
        location: &DatabaseLocation,
        connections: usize,
    ) -> Result<(Self, DieselCloseHandle), DieselDatabaseError> {
        let pool = create_pool(location, connections).await?;

        let handle = DieselReadHandle { pool: pool.clone() };

        let close_handle = DieselCloseHandle { pool, connections };

        Ok((handle, close_handle))
    }

    pub fn pool(&self) -> &DieselPool {
        &self.pool
    }
}
