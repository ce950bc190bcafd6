//! SQLite-backed job store.
//!
//! One row per job in the `jobs` table. Each call acquires its own pooled
//! connection and runs a single statement, so no transaction ever spans a handler
//! call and a slow job holds no database lock.
//!
//! Transitions are a conditional `UPDATE ... WHERE status = <event source>`: the
//! check and the write are one atomic statement. When no row matches, the record is
//! re-read to tell "unknown id" from "event not allowed in this status".

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use taskq_core::{JobEvent, JobId, JobRecord, JobStatus};

use super::{JobStore, JobStoreError};

const SELECT_COLUMNS: &str = "id, job_type, payload, status, result, created_at";

#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url`, e.g. `sqlite://taskq.db`.
    pub async fn connect(url: &str) -> Result<Self, JobStoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    /// A private in-memory database.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is pinned
    /// to exactly one connection that never expires.
    pub async fn in_memory() -> Result<Self, JobStoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("parse_url", e))?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn init(&self) -> Result<(), JobStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id          TEXT PRIMARY KEY,
                job_type    TEXT NOT NULL,
                payload     TEXT NOT NULL,
                status      TEXT NOT NULL,
                result      TEXT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_table", e))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS jobs_created_at ON jobs (created_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_index", e))?;

        Ok(())
    }

    #[instrument(skip(self, record), fields(job_id = %record.id), err)]
    async fn insert(&self, record: &JobRecord) -> Result<(), JobStoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, payload, status, result, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.job_type)
        .bind(&record.payload)
        .bind(record.status.as_str())
        .bind(record.result.as_deref())
        .bind(encode_timestamp(record.created_at))
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(JobStoreError::AlreadyExists(record.id))
            }
            Err(e) => Err(map_sqlx_error("insert", e)),
        }
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<JobRecord>, JobStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self, result), fields(job_id = %id, event = %event), err)]
    async fn transition(
        &self,
        id: JobId,
        event: JobEvent,
        result: Option<String>,
    ) -> Result<JobRecord, JobStoreError> {
        let target = event.target();
        let result = if target.is_terminal() { result } else { None };

        let row = sqlx::query(&format!(
            r#"
            UPDATE jobs
            SET status = ?1, result = ?2
            WHERE id = ?3 AND status = ?4
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(target.as_str())
        .bind(result)
        .bind(id.to_string())
        .bind(event.source().as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transition", e))?;

        if let Some(row) = row {
            return record_from_row(&row);
        }

        match self.get(id).await? {
            None => Err(JobStoreError::NotFound(id)),
            Some(current) => match current.status.apply(event) {
                Err(e) => Err(JobStoreError::InvalidTransition(id, e)),
                // Status changed between the UPDATE and the re-read.
                Ok(_) => Err(JobStoreError::Storage(format!(
                    "job {id} changed concurrently during {event}"
                ))),
            },
        }
    }
}

// Fixed-width UTC with nanoseconds: sorts lexicographically and round-trips exactly.
fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn record_from_row(row: &SqliteRow) -> Result<JobRecord, JobStoreError> {
    let id: String = row.try_get("id").map_err(|e| map_sqlx_error("decode", e))?;
    let status: String = row.try_get("status").map_err(|e| map_sqlx_error("decode", e))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| map_sqlx_error("decode", e))?;

    Ok(JobRecord {
        id: id
            .parse()
            .map_err(|e| JobStoreError::Corrupt(format!("id {id:?}: {e}")))?,
        job_type: row
            .try_get("job_type")
            .map_err(|e| map_sqlx_error("decode", e))?,
        payload: row
            .try_get("payload")
            .map_err(|e| map_sqlx_error("decode", e))?,
        status: status
            .parse::<JobStatus>()
            .map_err(|e| JobStoreError::Corrupt(format!("job {id}: {e}")))?,
        result: row
            .try_get("result")
            .map_err(|e| map_sqlx_error("decode", e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| JobStoreError::Corrupt(format!("job {id} created_at {created_at:?}: {e}")))?
            .with_timezone(&Utc),
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> JobStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            JobStoreError::Storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            JobStoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::ColumnDecode { .. } => {
            JobStoreError::Corrupt(format!("{}: {}", operation, err))
        }
        _ => JobStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteJobStore {
        let store = SqliteJobStore::in_memory().await.unwrap();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = store().await;
        store.init().await.unwrap();
    }

    #[tokio::test]
    async fn stored_record_reads_back_identically() {
        let store = store().await;
        let job = JobRecord::from_json("thumbnail", &json!({"size": [64, 64]}));
        store.insert(&job).await.unwrap();

        assert_eq!(store.get(job.id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let store = store().await;
        assert_eq!(store.get(JobId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = store().await;
        let job = JobRecord::new("email", "{}");
        store.insert(&job).await.unwrap();

        let err = store.insert(&job).await.unwrap_err();
        assert!(matches!(err, JobStoreError::AlreadyExists(id) if id == job.id));
    }

    #[tokio::test]
    async fn failure_is_recorded_with_its_message() {
        let store = store().await;
        let job = JobRecord::new("error_test", "{}");
        store.insert(&job).await.unwrap();

        store.transition(job.id, JobEvent::Dequeued, None).await.unwrap();
        let failed = store
            .transition(job.id, JobEvent::Failed, Some("boom".into()))
            .await
            .unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.result.as_deref(), Some("boom"));
        assert_eq!(store.get(job.id).await.unwrap(), Some(failed));
    }

    #[tokio::test]
    async fn refuses_to_skip_running() {
        let store = store().await;
        let job = JobRecord::new("email", "{}");
        store.insert(&job).await.unwrap();

        let err = store
            .transition(job.id, JobEvent::Succeeded, Some("ok".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, JobStoreError::InvalidTransition(id, _) if id == job.id));

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.result, None);
    }

    #[tokio::test]
    async fn refuses_to_leave_a_terminal_state() {
        let store = store().await;
        let job = JobRecord::new("email", "{}");
        store.insert(&job).await.unwrap();
        store.transition(job.id, JobEvent::Dequeued, None).await.unwrap();
        store
            .transition(job.id, JobEvent::Succeeded, Some("ok".into()))
            .await
            .unwrap();

        let err = store.transition(job.id, JobEvent::Dequeued, None).await.unwrap_err();
        assert!(matches!(err, JobStoreError::InvalidTransition(..)));
    }

    #[tokio::test]
    async fn transition_of_unknown_job_is_not_found() {
        let store = store().await;
        let err = store
            .transition(JobId::new(), JobEvent::Dequeued, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JobStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_is_oldest_first() {
        let store = store().await;
        let first = JobRecord::new("a", "{}");
        let mut second = JobRecord::new("b", "{}");
        second.created_at = first.created_at + chrono::Duration::milliseconds(5);
        store.insert(&second).await.unwrap();
        store.insert(&first).await.unwrap();

        let listed: Vec<_> = store.list().await.unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(listed, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn unreadable_status_is_reported_as_corrupt() {
        let store = store().await;
        let job = JobRecord::new("a", "{}");
        store.insert(&job).await.unwrap();
        sqlx::query("UPDATE jobs SET status = 'LOST' WHERE id = ?1")
            .bind(job.id.to_string())
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.get(job.id).await.unwrap_err();
        assert!(matches!(err, JobStoreError::Corrupt(_)));
    }
}
