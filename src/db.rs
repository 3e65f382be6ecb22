//! Database access helper (SQLite).
//!
//! Every statement goes through [`Db::run`]: acquire a connection, open a
//! transaction, bind positional parameters, execute, commit. The outcome says
//! whether the statement produced rows, matched nothing, or failed, so callers
//! never have to guess from an empty result.

use crate::config::DatabaseConfig;
use crate::error::{DbError, Result};

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, SqlitePool, TypeInfo as _, ValueRef as _};

/// One result row keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// What the caller wants back from a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    FetchOne,
    FetchAll,
    Mutate,
}

/// Rows or row counts from a statement that did something.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    One(Record),
    All(Vec<Record>),
    /// Always at least one; zero affected rows is [`QueryOutcome::NoRows`].
    Affected(u64),
}

/// Result of [`Db::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success(QueryOutput),
    /// The statement ran but found or changed nothing.
    NoRows,
    /// The statement failed. The error has already been logged.
    Failed(String),
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }

    /// Rows of a fetch, empty for `NoRows` and `Failed`.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            QueryOutcome::Success(QueryOutput::All(records)) => records,
            QueryOutcome::Success(QueryOutput::One(record)) => vec![record],
            _ => Vec::new(),
        }
    }

    /// First row of a fetch, if any.
    pub fn into_record(self) -> Option<Record> {
        match self {
            QueryOutcome::Success(QueryOutput::One(record)) => Some(record),
            QueryOutcome::Success(QueryOutput::All(records)) => records.into_iter().next(),
            _ => None,
        }
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT,
        real_name TEXT,
        email TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        is_bot INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS responses (
        response_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        channel_id TEXT NOT NULL UNIQUE,
        submission_time INTEGER,
        report_state TEXT NOT NULL DEFAULT 'pending',
        general_area TEXT,
        general_area_other TEXT,
        exact_location TEXT,
        language TEXT,
        language_other TEXT,
        heard_at INTEGER,
        method_heard_spoken INTEGER,
        method_asked_speaker INTEGER,
        method_saw_written INTEGER,
        method_other INTEGER,
        method_other_details TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_responses_submission_time ON responses (submission_time)",
    "CREATE INDEX IF NOT EXISTS idx_responses_user_id ON responses (user_id)",
];

/// Handle to the SQLite database shared by the stores.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (and create if missing) the database file named by the config.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let path = config.sqlite_path();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|source| DbError::Connect {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "sqlite pool opened");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the tables this crate reads and writes if they don't exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(DbError::Schema)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Execute one parameterized statement.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`QueryOutcome::Failed`].
    pub async fn run(&self, sql: &str, params: &[SqlParam], mode: QueryMode) -> QueryOutcome {
        match self.try_run(sql, params, mode).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%error, ?mode, "database statement failed");
                QueryOutcome::Failed(error.to_string())
            }
        }
    }

    async fn try_run(
        &self,
        sql: &str,
        params: &[SqlParam],
        mode: QueryMode,
    ) -> std::result::Result<QueryOutcome, sqlx::Error> {
        // Dropping an uncommitted transaction rolls it back and returns the
        // connection to the pool, so the early `?` returns still release it.
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Null => query.bind(None::<i64>),
                SqlParam::Int(value) => query.bind(*value),
                SqlParam::Bool(value) => query.bind(*value),
                SqlParam::Text(value) => query.bind(value.clone()),
            };
        }

        let outcome = match mode {
            QueryMode::FetchOne => match query.fetch_optional(&mut *tx).await? {
                Some(row) => QueryOutcome::Success(QueryOutput::One(record_from_row(&row))),
                None => QueryOutcome::NoRows,
            },
            QueryMode::FetchAll => {
                let rows = query.fetch_all(&mut *tx).await?;
                if rows.is_empty() {
                    QueryOutcome::NoRows
                } else {
                    QueryOutcome::Success(QueryOutput::All(
                        rows.iter().map(record_from_row).collect(),
                    ))
                }
            }
            QueryMode::Mutate => {
                let affected = query.execute(&mut *tx).await?.rows_affected();
                if affected == 0 {
                    QueryOutcome::NoRows
                } else {
                    QueryOutcome::Success(QueryOutput::Affected(affected))
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

/// Convert a row into a JSON map using each value's storage class.
fn record_from_row(row: &SqliteRow) -> Record {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let value = match row.try_get_raw(index) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => {
                let type_name = raw.type_info().name().to_string();
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => row
                        .try_get::<i64, _>(index)
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                    "REAL" => row
                        .try_get::<f64, _>(index)
                        .map(Value::from)
                        .unwrap_or(Value::Null),
                    "BLOB" => row
                        .try_get::<Vec<u8>, _>(index)
                        .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
                        .unwrap_or(Value::Null),
                    _ => row
                        .try_get::<String, _>(index)
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                }
            }
            Err(error) => {
                tracing::debug!(%error, column = column.name(), "unreadable column value");
                Value::Null
            }
        };
        record.insert(column.name().to_string(), value);
    }

    record
}

#[cfg(test)]
pub(crate) async fn test_db() -> Db {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should connect");
    let db = Db::from_pool(pool);
    db.ensure_schema().await.expect("schema should be created");
    db
}
