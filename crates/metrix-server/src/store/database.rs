//! Persistent metric store over a relational backend.
//!
//! Each backend runs on its native `sqlx` pool ([`DbPool`]) so values are
//! decoded with the driver's own types; statements are shared between
//! PostgreSQL and SQLite. Every statement except `ping` and the schema
//! bootstrap goes through the retry policy; a batch is retried as a whole,
//! each attempt in a fresh transaction.
//!
//! Note: a retried upsert is not idempotent. If a commit lands but the
//! acknowledgment is lost, the retry applies a counter delta twice.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;
use tracing::{debug, info, instrument};

use metrix_core::error::{MetrixError, Result};
use metrix_core::metric::{Metric, MetricKind, MetricUpdate};

use super::Store;
use crate::config::StorageConfig;
use crate::retry::RetryPolicy;

type SqlResult<T> = std::result::Result<T, sqlx::Error>;

const CREATE_GAUGES: &str = "
    CREATE TABLE gauges (
        name VARCHAR(150) PRIMARY KEY,
        value DOUBLE PRECISION NOT NULL
    )";

const CREATE_COUNTERS: &str = "
    CREATE TABLE counters (
        name VARCHAR(150) PRIMARY KEY,
        delta BIGINT NOT NULL
    )";

const UPSERT_GAUGE: &str = "
    INSERT INTO gauges (name, value) VALUES ($1, $2)
    ON CONFLICT (name) DO UPDATE SET value = excluded.value
    RETURNING value";

// An overflowing sum becomes NULL and trips NOT NULL, so the statement fails
// instead of SQLite silently widening it to REAL.
const UPSERT_COUNTER: &str = "
    INSERT INTO counters (name, delta) VALUES ($1, $2)
    ON CONFLICT (name) DO UPDATE SET delta = CASE
        WHEN excluded.delta >= 0 THEN CASE
            WHEN counters.delta > 9223372036854775807 - excluded.delta THEN NULL
            ELSE counters.delta + excluded.delta
        END
        ELSE CASE
            WHEN counters.delta < (-9223372036854775807 - 1) - excluded.delta THEN NULL
            ELSE counters.delta + excluded.delta
        END
    END
    RETURNING delta";

const SELECT_GAUGE: &str = "SELECT value FROM gauges WHERE name = $1";
const SELECT_COUNTER: &str = "SELECT delta FROM counters WHERE name = $1";
const SELECT_GAUGES: &str = "SELECT name, value FROM gauges";
const SELECT_COUNTERS: &str = "SELECT name, delta FROM counters";

/// SQL dialect behind the pool; only schema introspection differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(MetrixError::Config(
                "storage.database_url must be a postgres:// or sqlite: url".into(),
            ))
        }
    }

    fn table_exists_query(self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
            Dialect::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1"
            }
        }
    }
}

/// Native connection pool for the configured backend.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    pub fn dialect(&self) -> Dialect {
        match self {
            DbPool::Postgres(_) => Dialect::Postgres,
            DbPool::Sqlite(_) => Dialect::Sqlite,
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::Postgres(p) => p.close().await,
            DbPool::Sqlite(p) => p.close().await,
        }
    }
}

/// Run the same statements against whichever pool is configured.
macro_rules! on_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool {
            DbPool::Postgres($p) => $body,
            DbPool::Sqlite($p) => $body,
        }
    };
}

/// Connection-class failures (I/O, pool exhaustion, TLS, SQLSTATE class 08).
pub fn is_connection_exception(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => true,
        sqlx::Error::Database(db) => db.code().map_or(false, |c| c.starts_with("08")),
        _ => false,
    }
}

/// Ensure both relations exist, creating only the missing ones.
/// Returns the tables that were created.
pub async fn ensure_schema(pool: &DbPool) -> Result<Vec<&'static str>> {
    let dialect = pool.dialect();
    let bootstrap =
        |step: &str, e: sqlx::Error| MetrixError::SchemaBootstrap(format!("{step}: {e}"));

    on_pool!(pool, p => {
        let mut tx = p.begin().await.map_err(|e| bootstrap("begin", e))?;
        let mut created = Vec::new();

        for (table, ddl) in [("gauges", CREATE_GAUGES), ("counters", CREATE_COUNTERS)] {
            let exists: i64 = sqlx::query_scalar(dialect.table_exists_query())
                .bind(table)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| bootstrap(&format!("look up {table}"), e))?;

            if exists > 0 {
                debug!(table, "table already exists");
                continue;
            }

            info!(table, "creating table");
            sqlx::query(ddl)
                .execute(&mut *tx)
                .await
                .map_err(|e| bootstrap(&format!("create {table}"), e))?;
            created.push(table);
        }

        tx.commit().await.map_err(|e| bootstrap("commit", e))?;
        Ok(created)
    })
}

pub struct DbStore {
    pool: DbPool,
    retry: RetryPolicy,
    is_transient: fn(&sqlx::Error) -> bool,
}

impl DbStore {
    /// Connect using the storage config and bootstrap the schema.
    pub async fn connect(cfg: &StorageConfig) -> Result<Self> {
        let url = cfg
            .database_url
            .as_deref()
            .ok_or_else(|| MetrixError::Config("storage.database_url is not set".into()))?;
        let connect_err = |e: sqlx::Error| MetrixError::SchemaBootstrap(format!("connect: {e}"));

        let pool = match Dialect::from_url(url)? {
            Dialect::Postgres => DbPool::Postgres(
                PgPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect(url)
                    .await
                    .map_err(connect_err)?,
            ),
            Dialect::Sqlite => {
                let options = SqliteConnectOptions::from_str(url)
                    .map_err(|e| MetrixError::Config(format!("storage.database_url: {e}")))?
                    .create_if_missing(true);

                let mut pool_options =
                    SqlitePoolOptions::new().max_connections(cfg.max_connections);
                if url.contains(":memory:") {
                    // every in-memory connection is its own database
                    pool_options = pool_options
                        .max_connections(1)
                        .idle_timeout(None::<Duration>)
                        .max_lifetime(None::<Duration>);
                }

                DbPool::Sqlite(pool_options.connect_with(options).await.map_err(connect_err)?)
            }
        };

        Self::new(pool, RetryPolicy::from(&cfg.retry)).await
    }

    /// Wrap an existing pool. Fails if the schema cannot be verified or created.
    pub async fn new(pool: DbPool, retry: RetryPolicy) -> Result<Self> {
        let created = ensure_schema(&pool).await?;
        info!(dialect = ?pool.dialect(), ?created, "database store ready");

        Ok(Self {
            pool,
            retry,
            is_transient: is_connection_exception,
        })
    }

    /// Replace the transient-failure classifier.
    pub fn with_classifier(mut self, is_transient: fn(&sqlx::Error) -> bool) -> Self {
        self.is_transient = is_transient;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    fn map_err(&self, context: &str, e: sqlx::Error) -> MetrixError {
        if (self.is_transient)(&e) {
            MetrixError::TransientConnectivity(format!("{context}: {e}"))
        } else {
            MetrixError::Storage(format!("{context}: {e}"))
        }
    }

    async fn upsert_counter(&self, name: &str, delta: i64) -> SqlResult<i64> {
        on_pool!(&self.pool, p => {
            sqlx::query_scalar(UPSERT_COUNTER).bind(name).bind(delta).fetch_one(p).await
        })
    }

    async fn upsert_gauge(&self, name: &str, value: f64) -> SqlResult<f64> {
        on_pool!(&self.pool, p => {
            sqlx::query_scalar(UPSERT_GAUGE).bind(name).bind(value).fetch_one(p).await
        })
    }

    async fn fetch_counter(&self, name: &str) -> SqlResult<Option<i64>> {
        on_pool!(&self.pool, p => {
            sqlx::query_scalar(SELECT_COUNTER).bind(name).fetch_optional(p).await
        })
    }

    async fn fetch_gauge(&self, name: &str) -> SqlResult<Option<f64>> {
        on_pool!(&self.pool, p => {
            sqlx::query_scalar(SELECT_GAUGE).bind(name).fetch_optional(p).await
        })
    }

    async fn fetch_counters(&self) -> SqlResult<Vec<(String, i64)>> {
        on_pool!(&self.pool, p => sqlx::query_as(SELECT_COUNTERS).fetch_all(p).await)
    }

    async fn fetch_gauges(&self) -> SqlResult<Vec<(String, f64)>> {
        on_pool!(&self.pool, p => sqlx::query_as(SELECT_GAUGES).fetch_all(p).await)
    }

    async fn apply_batch(&self, updates: &[MetricUpdate]) -> SqlResult<()> {
        on_pool!(&self.pool, p => {
            let mut tx = p.begin().await?;
            for u in updates {
                match u {
                    MetricUpdate::Counter { name, delta } => {
                        sqlx::query(UPSERT_COUNTER)
                            .bind(name.as_str())
                            .bind(*delta)
                            .execute(&mut *tx)
                            .await?;
                    }
                    MetricUpdate::Gauge { name, value } => {
                        sqlx::query(UPSERT_GAUGE)
                            .bind(name.as_str())
                            .bind(*value)
                            .execute(&mut *tx)
                            .await?;
                    }
                }
            }
            // dropping an uncommitted transaction rolls it back
            tx.commit().await
        })
    }

    async fn ping_backend(&self) -> SqlResult<()> {
        on_pool!(&self.pool, p => {
            let mut conn = p.acquire().await?;
            conn.ping().await
        })
    }
}

#[async_trait]
impl Store for DbStore {
    #[instrument(skip(self, metric), fields(name = %metric.id, kind = %metric.mtype))]
    async fn update(&self, metric: &Metric) -> Result<Metric> {
        let update = metric.to_update()?;
        let t = self.is_transient;

        match update {
            MetricUpdate::Counter { name, delta } => {
                let n = name.as_str();
                let total = self
                    .retry
                    .run(t, move || self.upsert_counter(n, delta))
                    .await
                    .map_err(|e| self.map_err(&format!("update counter {name}"), e))?;
                Ok(Metric::counter(name, total))
            }
            MetricUpdate::Gauge { name, value } => {
                let n = name.as_str();
                let stored = self
                    .retry
                    .run(t, move || self.upsert_gauge(n, value))
                    .await
                    .map_err(|e| self.map_err(&format!("update gauge {name}"), e))?;
                Ok(Metric::gauge(name, stored))
            }
        }
    }

    #[instrument(skip(self))]
    async fn value(&self, name: &str, kind: MetricKind) -> Result<Metric> {
        let found = match kind {
            MetricKind::Counter => self
                .retry
                .run(self.is_transient, move || self.fetch_counter(name))
                .await
                .map(|v| v.map(|d| Metric::counter(name, d))),
            MetricKind::Gauge => self
                .retry
                .run(self.is_transient, move || self.fetch_gauge(name))
                .await
                .map(|v| v.map(|g| Metric::gauge(name, g))),
        }
        .map_err(|e| self.map_err(&format!("get {kind} {name}"), e))?;

        found.ok_or_else(|| MetrixError::NotFound {
            kind,
            name: name.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn get_all_gauges(&self) -> Result<HashMap<String, f64>> {
        let rows = self
            .retry
            .run(self.is_transient, move || self.fetch_gauges())
            .await
            .map_err(|e| self.map_err("get gauges", e))?;
        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn get_all_counters(&self) -> Result<HashMap<String, i64>> {
        let rows = self
            .retry
            .run(self.is_transient, move || self.fetch_counters())
            .await
            .map_err(|e| self.map_err("get counters", e))?;
        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self, batch), fields(len = batch.len()))]
    async fn updates(&self, batch: &[Metric]) -> Result<()> {
        // a malformed metric rejects the batch before any statement runs
        let updates = batch
            .iter()
            .map(Metric::to_update)
            .collect::<Result<Vec<_>>>()?;
        let updates = updates.as_slice();

        self.retry
            .run(self.is_transient, move || self.apply_batch(updates))
            .await
            .map_err(|e| self.map_err("send batch", e))
    }

    async fn ping(&self) -> Result<()> {
        self.ping_backend().await.map_err(|e| self.map_err("ping", e))
    }
}
