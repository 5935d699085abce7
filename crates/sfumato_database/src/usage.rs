//! Append-only usage log and spend aggregation.

use crate::DatabaseResult;
use crate::models::NewUsageLogRow;
use crate::schema::usage_log;
use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use sfumato_core::UsageLogEntry;

/// Append a usage entry.
pub fn insert(conn: &mut SqliteConnection, entry: &UsageLogEntry) -> DatabaseResult<()> {
    diesel::insert_into(usage_log::table)
        .values(NewUsageLogRow::from(entry))
        .execute(conn)?;
    Ok(())
}

/// `SUM(cost_estimate)` of entries at or after `since`, or of all entries.
pub fn cost_since(
    conn: &mut SqliteConnection,
    since: Option<DateTime<Utc>>,
) -> DatabaseResult<f64> {
    let total: Option<f64> = match since {
        Some(start) => usage_log::table
            .filter(usage_log::created_at.ge(start.naive_utc()))
            .select(sum(usage_log::cost_estimate))
            .first(conn)?,
        None => usage_log::table
            .select(sum(usage_log::cost_estimate))
            .first(conn)?,
    };
    Ok(total.unwrap_or(0.0))
}
