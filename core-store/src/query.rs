//! Read-side queries over the record sets
//!
//! Pagination and text search for the API layer. Queries never mutate and
//! run concurrently with reconciliation passes; WAL mode keeps readers
//! unblocked.

use crate::error::{Result, StoreError};
use crate::models::{RecordSet, TrackRecord, TrackStatus};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Pagination request parameters (1-indexed pages)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageRequest {
    /// Create a new page request
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Reject out-of-range parameters before they reach the database.
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(StoreError::InvalidInput {
                field: "page".to_string(),
                message: "page numbers start at 1".to_string(),
            });
        }
        if self.page_size < MIN_PAGE_SIZE || self.page_size > MAX_PAGE_SIZE {
            return Err(StoreError::InvalidInput {
                field: "page_size".to_string(),
                message: format!(
                    "page size must be between {} and {}",
                    MIN_PAGE_SIZE, MAX_PAGE_SIZE
                ),
            });
        }
        Ok(())
    }

    /// Calculate the SQL OFFSET value
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }

    /// Get the LIMIT value (same as page_size)
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response containing items and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Total number of pages; 0 when there are no items
    pub total_pages: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Create a new paginated response
    ///
    /// # Examples
    ///
    /// ```
    /// use core_store::query::{Page, PageRequest};
    ///
    /// let page = Page::new(vec![1, 2, 3], 125, PageRequest::new(1, 50));
    /// assert_eq!(page.total_pages, 3);
    /// ```
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let total_pages = if request.page_size == 0 {
            0
        } else {
            ((total as f64) / (request.page_size as f64)).ceil() as u32
        };

        Self {
            items,
            total,
            page: request.page,
            total_pages,
            page_size: request.page_size,
        }
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

/// Per-set record counts for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub current: i64,
    pub all: i64,
    pub removed: i64,
    pub all_active: i64,
    pub all_removed: i64,
}

/// Read-only paginated, searchable access into the record sets
pub struct RecordQuery {
    pool: SqlitePool,
}

impl RecordQuery {
    /// Create a new query service over the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Query one record set with pagination and optional text search.
    ///
    /// Records are ordered by `last_updated` descending. Search matches
    /// case-insensitively as a substring against title OR artist;
    /// empty or whitespace-only search text is equivalent to no filter.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for out-of-range pagination before
    /// touching the database.
    pub async fn query(
        &self,
        set: RecordSet,
        request: PageRequest,
        search: Option<&str>,
    ) -> Result<Page<TrackRecord>> {
        request.validate()?;

        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

        let (total, items) = match &pattern {
            Some(pattern) => {
                let total: (i64,) = sqlx::query_as(&format!(
                    "SELECT COUNT(*) FROM {} \
                     WHERE LOWER(title) LIKE ? ESCAPE '\\' OR LOWER(artist) LIKE ? ESCAPE '\\'",
                    set.table()
                ))
                .bind(pattern.as_str())
                .bind(pattern.as_str())
                .fetch_one(&self.pool)
                .await?;

                let items = sqlx::query_as::<_, TrackRecord>(&format!(
                    "SELECT * FROM {} \
                     WHERE LOWER(title) LIKE ? ESCAPE '\\' OR LOWER(artist) LIKE ? ESCAPE '\\' \
                     ORDER BY last_updated DESC LIMIT ? OFFSET ?",
                    set.table()
                ))
                .bind(pattern.as_str())
                .bind(pattern.as_str())
                .bind(request.limit() as i64)
                .bind(request.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

                (total.0, items)
            }
            None => {
                let total: (i64,) =
                    sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", set.table()))
                        .fetch_one(&self.pool)
                        .await?;

                let items = sqlx::query_as::<_, TrackRecord>(&format!(
                    "SELECT * FROM {} ORDER BY last_updated DESC LIMIT ? OFFSET ?",
                    set.table()
                ))
                .bind(request.limit() as i64)
                .bind(request.offset() as i64)
                .fetch_all(&self.pool)
                .await?;

                (total.0, items)
            }
        };

        Ok(Page::new(items, total as u64, request))
    }

    /// Record counts for every set plus the active/removed breakdown of the
    /// ledger.
    pub async fn stats(&self) -> Result<CollectionStats> {
        let current = self.count(RecordSet::Current).await?;
        let all = self.count(RecordSet::All).await?;
        let removed = self.count(RecordSet::Removed).await?;
        let all_active = self.count_status(RecordSet::All, TrackStatus::Active).await?;
        let all_removed = self
            .count_status(RecordSet::All, TrackStatus::Removed)
            .await?;

        Ok(CollectionStats {
            current,
            all,
            removed,
            all_active,
            all_removed,
        })
    }

    async fn count(&self, set: RecordSet) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", set.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn count_status(&self, set: RecordSet, status: TrackStatus) -> Result<i64> {
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

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
