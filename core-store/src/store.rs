//! Record store trait and SQLite implementation
//!
//! The reconciliation engine mutates the three record sets exclusively
//! through this contract. No transaction spans record sets; callers rely on
//! operation ordering for cross-set consistency. The one intra-set
//! transaction is [`RecordStore::replace_all`], which guarantees readers
//! never observe a half-replaced set.

use crate::error::Result;
use crate::models::{RecordSet, TrackRecord, TrackStatus};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

/// Rows per multi-row INSERT statement. 11 binds per row keeps a chunk well
/// under SQLite's host-parameter limit.
const UPSERT_CHUNK: usize = 80;

/// Ids per `IN (...)` list.
const ID_CHUNK: usize = 500;

/// Record store interface for the three record sets
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List all ids currently in a record set.
    async fn list_ids(&self, set: RecordSet) -> Result<HashSet<String>>;

    /// Fetch full records by id. Ids with no record are skipped silently.
    async fn fetch_by_ids(&self, set: RecordSet, ids: &[String]) -> Result<Vec<TrackRecord>>;

    /// Insert or replace records by id.
    async fn upsert_many(&self, set: RecordSet, records: &[TrackRecord]) -> Result<()>;

    /// Replace the entire contents of a record set in one transaction.
    ///
    /// Readers observe either the old contents or the new, never an empty
    /// or partial window.
    async fn replace_all(&self, set: RecordSet, records: &[TrackRecord]) -> Result<()>;

    /// Delete every record in a set.
    ///
    /// # Returns
    /// Number of records deleted.
    async fn delete_all(&self, set: RecordSet) -> Result<u64>;

    /// Delete records by id.
    ///
    /// # Returns
    /// Number of records deleted.
    async fn delete_by_ids(&self, set: RecordSet, ids: &[String]) -> Result<u64>;

    /// Bulk status transition for the given ids, one logical statement per
    /// id chunk rather than one write per record.
    ///
    /// Sets `last_updated = ts` on every matched record. Transitioning to
    /// removed stamps `removed_at = ts`; transitioning to active clears it.
    ///
    /// # Returns
    /// Number of records updated.
    async fn update_status_bulk(
        &self,
        set: RecordSet,
        ids: &[String],
        status: TrackStatus,
        ts: i64,
    ) -> Result<u64>;

    /// Count records in a set.
    async fn count(&self, set: RecordSet) -> Result<i64>;

    /// Count records in a set with the given status.
    async fn count_by_status(&self, set: RecordSet, status: TrackStatus) -> Result<i64>;
}

/// SQLite implementation of [`RecordStore`]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

impl SqliteRecordStore {
    /// Create a new SQLite record store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn placeholders(n: usize) -> String {
        let mut s = String::with_capacity(n * 2);
        for i in 0..n {
            if i > 0 {
                s.push(',');
            }
            s.push('?');
        }
        s
    }

    fn insert_sql(set: RecordSet, rows: usize) -> String {
        let row = "(?,?,?,?,?,?,?,?,?,?,?)";
        let mut values = String::with_capacity(rows * (row.len() + 1));
        for i in 0..rows {
            if i > 0 {
                values.push(',');
            }
            values.push_str(row);
        }
        format!(
            "INSERT OR REPLACE INTO {} (id, title, artist, duration_seconds, permalink_url, \
             last_updated, playlist_source, status, removed_at, track_number, album) VALUES {}",
            set.table(),
            values
        )
    }

    fn bind_record<'q>(query: SqliteQuery<'q>, record: &'q TrackRecord) -> SqliteQuery<'q> {
        query
            .bind(&record.id)
            .bind(&record.title)
            .bind(&record.artist)
            .bind(record.duration_seconds)
            .bind(&record.permalink_url)
            .bind(record.last_updated)
            .bind(&record.playlist_source)
            .bind(record.status)
            .bind(record.removed_at)
            .bind(record.track_number)
            .bind(&record.album)
    }

    async fn insert_chunked<'e, E>(set: RecordSet, records: &[TrackRecord], executor: E) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite> + Copy,
    {
        for chunk in records.chunks(UPSERT_CHUNK) {
            let sql = Self::insert_sql(set, chunk.len());
            let mut query = sqlx::query(&sql);
            for record in chunk {
                query = Self::bind_record(query, record);
            }
            query.execute(executor).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_ids(&self, set: RecordSet) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT id FROM {}", set.table()))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn fetch_by_ids(&self, set: RecordSet, ids: &[String]) -> Result<Vec<TrackRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let sql = format!(
                "SELECT * FROM {} WHERE id IN ({})",
                set.table(),
                Self::placeholders(chunk.len())
            );
            let mut query = sqlx::query_as::<_, TrackRecord>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            records.extend(query.fetch_all(&self.pool).await?);
        }
        Ok(records)
    }

    async fn upsert_many(&self, set: RecordSet, records: &[TrackRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        Self::insert_chunked(set, records, &self.pool).await?;
        debug!(set = %set, count = records.len(), "Upserted records");
        Ok(())
    }

    async fn replace_all(&self, set: RecordSet, records: &[TrackRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {}", set.table()))
            .execute(&mut *tx)
            .await?;

        for chunk in records.chunks(UPSERT_CHUNK) {
            let sql = Self::insert_sql(set, chunk.len());
            let mut query = sqlx::query(&sql);
            for record in chunk {
                query = Self::bind_record(query, record);
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        debug!(set = %set, count = records.len(), "Replaced record set");
        Ok(())
    }

    async fn delete_all(&self, set: RecordSet) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", set.table()))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_ids(&self, set: RecordSet, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0u64;
        for chunk in ids.chunks(ID_CHUNK) {
            let sql = format!(
                "DELETE FROM {} WHERE id IN ({})",
                set.table(),
                Self::placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            deleted += query.execute(&self.pool).await?.rows_affected();
        }
        Ok(deleted)
    }

    async fn update_status_bulk(
        &self,
        set: RecordSet,
        ids: &[String],
        status: TrackStatus,
        ts: i64,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut updated = 0u64;
        for chunk in ids.chunks(ID_CHUNK) {
            let sql = match status {
                TrackStatus::Removed => format!(
                    "UPDATE {} SET status = ?, removed_at = ?, last_updated = ? WHERE id IN ({})",
                    set.table(),
                    Self::placeholders(chunk.len())
                ),
                TrackStatus::Active => format!(
                    "UPDATE {} SET status = ?, removed_at = NULL, last_updated = ? WHERE id IN ({})",
                    set.table(),
                    Self::placeholders(chunk.len())
                ),
            };

            let mut query = sqlx::query(&sql).bind(status);
            if status == TrackStatus::Removed {
                query = query.bind(ts);
            }
            query = query.bind(ts);
            for id in chunk {
                query = query.bind(id);
            }
            updated += query.execute(&self.pool).await?.rows_affected();
        }

        debug!(set = %set, status = %status, count = updated, "Bulk status update");
        Ok(updated)
    }

    async fn count(&self, set: RecordSet) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", set.table()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn count_by_status(&self, set: RecordSet, status: TrackStatus) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {} WHERE status = ?",
            set.table()
        ))
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn record(id: &str, ts: i64) -> TrackRecord {
        TrackRecord {
            id: format!("https://soundcloud.com/test/{}", id),
            title: format!("Test Artist - {}", id),
            artist: "Test Artist".to_string(),
            duration_seconds: 180.25,
            permalink_url: format!("https://soundcloud.com/test/{}", id),
            last_updated: ts,
            playlist_source: "https://soundcloud.com/test/sets/p".to_string(),
            status: TrackStatus::Active,
            removed_at: None,
            track_number: None,
            album: None,
        }
    }

    fn full_id(id: &str) -> String {
        format!("https://soundcloud.com/test/{}", id)
    }

    async fn store() -> SqliteRecordStore {
        SqliteRecordStore::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_and_list_ids() {
        let store = store().await;
        store
            .upsert_many(RecordSet::All, &[record("a", 1), record("b", 1)])
            .await
            .unwrap();

        let ids = store.list_ids(RecordSet::All).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&full_id("a")));
        assert!(ids.contains(&full_id("b")));

        // Upsert replaces, never duplicates
        let mut updated = record("a", 2);
        updated.title = "Test Artist - a (remaster)".to_string();
        store
            .upsert_many(RecordSet::All, &[updated.clone()])
            .await
            .unwrap();

        let ids = store.list_ids(RecordSet::All).await.unwrap();
        assert_eq!(ids.len(), 2);

        let fetched = store
            .fetch_by_ids(RecordSet::All, &[full_id("a")])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], updated);
    }

    #[tokio::test]
    async fn test_fetch_by_ids_skips_missing() {
        let store = store().await;
        store
            .upsert_many(RecordSet::All, &[record("a", 1)])
            .await
            .unwrap();

        let fetched = store
            .fetch_by_ids(RecordSet::All, &[full_id("a"), full_id("ghost")])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, full_id("a"));
    }

    #[tokio::test]
    async fn test_replace_all() {
        let store = store().await;
        store
            .upsert_many(RecordSet::Current, &[record("a", 1), record("b", 1)])
            .await
            .unwrap();

        store
            .replace_all(RecordSet::Current, &[record("c", 2)])
            .await
            .unwrap();

        let ids = store.list_ids(RecordSet::Current).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&full_id("c")));
    }

    #[tokio::test]
    async fn test_delete_by_ids_and_delete_all() {
        let store = store().await;
        store
            .upsert_many(
                RecordSet::Removed,
                &[record("a", 1), record("b", 1), record("c", 1)],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_by_ids(RecordSet::Removed, &[full_id("a"), full_id("ghost")])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count(RecordSet::Removed).await.unwrap(), 2);

        let deleted = store.delete_all(RecordSet::Removed).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count(RecordSet::Removed).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_bulk_removed_then_active() {
        let store = store().await;
        store
            .upsert_many(RecordSet::All, &[record("a", 1), record("b", 1)])
            .await
            .unwrap();

        let updated = store
            .update_status_bulk(RecordSet::All, &[full_id("a")], TrackStatus::Removed, 50)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let fetched = store
            .fetch_by_ids(RecordSet::All, &[full_id("a")])
            .await
            .unwrap();
        assert_eq!(fetched[0].status, TrackStatus::Removed);
        assert_eq!(fetched[0].removed_at, Some(50));
        assert_eq!(fetched[0].last_updated, 50);

        // The transition back to active clears removed_at
        store
            .update_status_bulk(RecordSet::All, &[full_id("a")], TrackStatus::Active, 60)
            .await
            .unwrap();

        let fetched = store
            .fetch_by_ids(RecordSet::All, &[full_id("a")])
            .await
            .unwrap();
        assert_eq!(fetched[0].status, TrackStatus::Active);
        assert_eq!(fetched[0].removed_at, None);
        assert_eq!(fetched[0].last_updated, 60);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_noops() {
        let store = store().await;

        store.upsert_many(RecordSet::All, &[]).await.unwrap();
        assert_eq!(store.delete_by_ids(RecordSet::All, &[]).await.unwrap(), 0);
        assert_eq!(
            store
                .update_status_bulk(RecordSet::All, &[], TrackStatus::Active, 1)
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.count(RecordSet::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let store = store().await;
        store
            .upsert_many(RecordSet::All, &[record("a", 1), record("b", 1), record("c", 1)])
            .await
            .unwrap();
        store
            .update_status_bulk(RecordSet::All, &[full_id("c")], TrackStatus::Removed, 2)
            .await
            .unwrap();

        assert_eq!(
            store
                .count_by_status(RecordSet::All, TrackStatus::Active)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count_by_status(RecordSet::All, TrackStatus::Removed)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_bulk_ops_span_chunks() {
        let store = store().await;
        let records: Vec<TrackRecord> =
            (0..150).map(|i| record(&format!("t{:03}", i), 1)).collect();
        store.upsert_many(RecordSet::All, &records).await.unwrap();
        assert_eq!(store.count(RecordSet::All).await.unwrap(), 150);

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let updated = store
            .update_status_bulk(RecordSet::All, &ids, TrackStatus::Removed, 9)
            .await
            .unwrap();
        assert_eq!(updated, 150);
    }
}
