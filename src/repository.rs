//! Database repository for check-history persistence.
//!
//! All SQLite read/write logic lives here. The refresh task calls
//! [`CheckRepository::record_run`] with the per-provider outcomes once
//! a run finishes, and per-card checks log a single outcome row with no
//! run id. `GET /refresh/history` is served from [`CheckRepository::recent_runs`].
//!
//! Timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::pricing::types::{DisplayOutcome, RunSummary};

/// A persisted refresh-run row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRunRow {
    pub id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub cancelled: bool,
}

/// A persisted per-provider check outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcomeRow {
    pub id: i64,
    pub run_id: Option<i64>,
    pub provider: String,
    pub outcome: String,
    pub price: Option<String>,
    pub checked_at: String,
}

/// Repository for reading and writing check history to SQLite.
pub struct CheckRepository {
    pool: SqlitePool,
}

impl CheckRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a finished run and its outcomes in a single transaction.
    /// Returns the new run row id.
    pub async fn record_run(
        &self,
        started_at: DateTime<Utc>,
        summary: &RunSummary,
        outcomes: &[(String, DisplayOutcome)],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO refresh_runs
             (started_at, finished_at, total, succeeded, failed, cancelled)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(started_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(summary.total as i64)
        .bind(summary.succeeded as i64)
        .bind(summary.failed as i64)
        .bind(summary.cancelled as i64)
        .execute(&mut *tx)
        .await?;

        let run_id = result.last_insert_rowid();
        let checked_at = Utc::now().to_rfc3339();

        for (provider, outcome) in outcomes {
            sqlx::query(
                "INSERT INTO check_outcomes (run_id, provider, outcome, price, checked_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(provider)
            .bind(outcome.tag())
            .bind(outcome.deal().map(|d| d.price.clone()))
            .bind(&checked_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(run_id)
    }

    /// Log one ad-hoc (per-card) check outcome.
    pub async fn record_outcome(
        &self,
        provider: &str,
        outcome: &DisplayOutcome,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO check_outcomes (run_id, provider, outcome, price, checked_at)
             VALUES (NULL, ?, ?, ?, ?)",
        )
        .bind(provider)
        .bind(outcome.tag())
        .bind(outcome.deal().map(|d| d.price.clone()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent runs, newest first.
    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<RefreshRunRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, started_at, finished_at, total, succeeded, failed, cancelled
             FROM refresh_runs
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let runs = rows
            .into_iter()
            .filter_map(|row| {
                use sqlx::Row;
                Some(RefreshRunRow {
                    id: row.try_get("id").ok()?,
                    started_at: row.try_get("started_at").ok()?,
                    finished_at: row.try_get("finished_at").ok()?,
                    total: row.try_get("total").ok()?,
                    succeeded: row.try_get("succeeded").ok()?,
                    failed: row.try_get("failed").ok()?,
                    cancelled: row.try_get::<i64, _>("cancelled").ok()? != 0,
                })
            })
            .collect();

        Ok(runs)
    }

    /// All outcome rows for one run, in insertion order.
    pub async fn outcomes_for_run(&self, run_id: i64) -> Result<Vec<CheckOutcomeRow>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, run_id, provider, outcome, price, checked_at
             FROM check_outcomes
             WHERE run_id = ?
             ORDER BY id ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        let outcomes = rows
            .into_iter()
            .filter_map(|row| {
                use sqlx::Row;
                Some(CheckOutcomeRow {
                    id: row.try_get("id").ok()?,
                    run_id: row.try_get("run_id").ok()?,
                    provider: row.try_get("provider").ok()?,
                    outcome: row.try_get("outcome").ok()?,
                    price: row.try_get("price").ok()?,
                    checked_at: row.try_get("checked_at").ok()?,
                })
            })
            .collect();

        Ok(outcomes)
    }
}
