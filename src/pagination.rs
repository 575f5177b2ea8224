//! Paged reads: one windowed select plus one unbounded count.
//!
//! Both reads go through the same [`DbContext`], so inside a unit of work
//! they see the same transaction. Outside one they are two independent
//! statements and the total may drift from the page contents.

use crate::context::DbContext;
use crate::error::{DataError, Result};
use crate::query::QueryFilter;
use crate::row::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// One page of decoded rows with its position in the full result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationResult<T> {
    /// 1-based page number, as requested
    pub page: u64,
    /// Page size, as requested
    pub take: u64,
    /// Rows matching the filter, ignoring the window
    pub total: u64,
    pub pages: u64,
    pub items: Vec<T>,
}

/// `ceil(total / take)`, zero for an empty page size.
pub fn pages_for(total: u64, take: u64) -> u64 {
    if take == 0 {
        return 0;
    }
    total.div_ceil(take)
}

/// The single integer a `COUNT(*)` statement returns; no rows counts as zero.
pub(crate) fn read_count(rows: &[Row]) -> Result<u64> {
    let count = match rows.first() {
        Some(row) => row.first_i64()?,
        None => 0,
    };
    u64::try_from(count).map_err(|_| DataError::ParseError(format!("negative row count {count}")))
}

/// Window selecting page `page` (1-based) of size `take`.
pub fn window(query: &QueryFilter, page: u64, take: u64) -> QueryFilter {
    query
        .without_window()
        .limit(take)
        .offset(page.saturating_sub(1).saturating_mul(take))
}

/// Fetch page `page` of `query` over `table`, decoding rows into `T`.
///
/// Any window already on `query` is replaced.
pub async fn paginate<T>(
    context: &DbContext,
    table: &str,
    query: &QueryFilter,
    page: u64,
    take: u64,
    cancel: &CancellationToken,
) -> Result<PaginationResult<T>>
where
    T: DeserializeOwned + Send,
{
    let compiler = context.compiler();

    let rows = context
        .query(&compiler.select(table, &window(query, page, take)), cancel)
        .await?;
    let items = rows.iter().map(|row| row.decode::<T>()).collect::<Result<Vec<T>>>()?;

    let total = read_count(
        &context
            .query(&compiler.count(table, &query.without_window()), cancel)
            .await?,
    )?;

    log::debug!("{table}: page {page}/{} ({total} rows)", pages_for(total, take));
    Ok(PaginationResult {
        page,
        take,
        total,
        pages: pages_for(total, take),
        items,
    })
}
