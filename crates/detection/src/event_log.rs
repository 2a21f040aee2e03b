//! Durable append-only event log, backed by a local SQLite database via `sqlx`.
//!
//! Every processed event is persisted regardless of outcome. Timestamps are
//! normalized on write: values in the future are clamped to now, and
//! non-positive values are replaced with now.

use erp_core::error::Result;
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct EventLogRecord {
    pub id: i64,
    pub ts: i64,
    pub entity: String,
    pub endpoint: String,
    pub outcome: String,
    pub decision: String,
    pub risk: f64,
    pub enforcement_allowed: bool,
    pub enforcement_reason: Option<String>,
    pub raw_event: String,
}

pub struct EventLog {
    pool: SqlitePool,
}

impl EventLog {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ts INTEGER NOT NULL,
                entity TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                outcome TEXT NOT NULL,
                decision TEXT NOT NULL,
                risk REAL NOT NULL,
                enforcement_allowed INTEGER NOT NULL,
                enforcement_reason TEXT,
                raw_event TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Appends a record. `ts` is normalized: future timestamps are clamped to
    /// `now_ms`, non-positive timestamps are replaced with `now_ms`.
    pub async fn append(
        &self,
        ts: i64,
        now_ms: i64,
        entity: &str,
        endpoint: &str,
        outcome: &str,
        decision: &str,
        risk: f64,
        enforcement_allowed: bool,
        enforcement_reason: Option<&str>,
        raw_event: &str,
    ) -> Result<()> {
        let normalized_ts = if ts > now_ms || ts <= 0 { now_ms } else { ts };

        sqlx::query(
            r#"
            INSERT INTO event_log
                (ts, entity, endpoint, outcome, decision, risk, enforcement_allowed, enforcement_reason, raw_event)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(normalized_ts)
        .bind(entity)
        .bind(endpoint)
        .bind(outcome)
        .bind(decision)
        .bind(risk)
        .bind(enforcement_allowed as i64)
        .bind(enforcement_reason)
        .bind(raw_event)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Events for `entity` with `ts >= since`, optionally bounded by `until`.
    pub async fn range_by_entity(
        &self,
        entity: &str,
        since: i64,
        until: Option<i64>,
    ) -> Result<Vec<EventLogRecord>> {
        let rows = if let Some(until) = until {
            sqlx::query(
                "SELECT * FROM event_log WHERE entity = ? AND ts >= ? AND ts <= ? ORDER BY ts DESC",
            )
            .bind(entity)
            .bind(since)
            .bind(until)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query("SELECT * FROM event_log WHERE entity = ? AND ts >= ? ORDER BY ts DESC")
                .bind(entity)
                .bind(since)
                .fetch_all(&self.pool)
                .await?
        };

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Paginated reads filtered by decision and/or entity, ordered `ts DESC`.
    pub async fn query(
        &self,
        decision: Option<&str>,
        entity: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM event_log
            WHERE (?1 IS NULL OR decision = ?1)
              AND (?2 IS NULL OR entity = ?2)
            ORDER BY ts DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(decision)
        .bind(entity)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    pub async fn count_by_decision(&self, decision: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM event_log WHERE decision = ?")
            .bind(decision)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("c"))
    }
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> EventLogRecord {
    EventLogRecord {
        id: row.get("id"),
        ts: row.get("ts"),
        entity: row.get("entity"),
        endpoint: row.get("endpoint"),
        outcome: row.get("outcome"),
        decision: row.get("decision"),
        risk: row.get("risk"),
        enforcement_allowed: row.get::<i64, _>("enforcement_allowed") != 0,
        enforcement_reason: row.get("enforcement_reason"),
        raw_event: row.get("raw_event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_read_back() {
        let log = EventLog::in_memory().await.unwrap();
        log.append(1000, 1000, "1.2.3.4", "LOGIN", "FAILURE", "CHALLENGE", 30.0, true, None, "{}")
            .await
            .unwrap();

        let records = log.range_by_entity("1.2.3.4", 0, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].decision, "CHALLENGE");
    }

    #[tokio::test]
    async fn future_timestamp_is_clamped_to_now() {
        let log = EventLog::in_memory().await.unwrap();
        log.append(5_000_000, 1_000, "1.2.3.4", "LOGIN", "FAILURE", "ALLOW", 0.0, true, None, "{}")
            .await
            .unwrap();

        let records = log.range_by_entity("1.2.3.4", 0, None).await.unwrap();
        assert_eq!(records[0].ts, 1_000);
    }

    #[tokio::test]
    async fn non_positive_timestamp_is_replaced_with_now() {
        let log = EventLog::in_memory().await.unwrap();
        log.append(-5, 2_000, "1.2.3.4", "LOGIN", "FAILURE", "ALLOW", 0.0, true, None, "{}")
            .await
            .unwrap();

        let records = log.range_by_entity("1.2.3.4", 0, None).await.unwrap();
        assert_eq!(records[0].ts, 2_000);
    }

    #[tokio::test]
    async fn query_filters_by_decision() {
        let log = EventLog::in_memory().await.unwrap();
        log.append(1, 1, "a", "LOGIN", "FAILURE", "BLOCK", 90.0, false, None, "{}")
            .await
            .unwrap();
        log.append(1, 1, "b", "LOGIN", "SUCCESS", "ALLOW", 0.0, true, None, "{}")
            .await
            .unwrap();

        let blocked = log.query(Some("BLOCK"), None, 10, 0).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].entity, "a");
    }
}
