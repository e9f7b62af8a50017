//! Dashboard aggregate queries.
//!
//! Tables read: `users`, `events (organizer_id, date)` and
//! `registrations (event_id, status, created_at)`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::PgPool;
use tracing::debug;

use eventhub_core::error::{AppError, ErrorKind};
use eventhub_core::result::AppResult;
use eventhub_core::traits::StatsProvider;
use eventhub_core::types::{AdminStats, OrganizerStats, UserId};

const ADMIN_STATS_SQL: &str = "\
    SELECT \
        (SELECT COUNT(*) FROM users), \
        (SELECT COUNT(*) FROM events), \
        (SELECT COUNT(*) FROM events WHERE date >= NOW()), \
        (SELECT COUNT(*) FROM registrations), \
        (SELECT COUNT(*) FROM registrations WHERE status = 'pending')";

const ORGANIZER_STATS_SQL: &str = "\
    SELECT \
        (SELECT COUNT(*) FROM events WHERE organizer_id = $1), \
        (SELECT COUNT(*) FROM events WHERE organizer_id = $1 AND date >= NOW()), \
        (SELECT COUNT(*) FROM registrations r \
            JOIN events e ON e.id = r.event_id WHERE e.organizer_id = $1), \
        (SELECT COUNT(*) FROM registrations r \
            JOIN events e ON e.id = r.event_id \
            WHERE e.organizer_id = $1 AND r.created_at >= $2)";

/// Repository computing dashboard aggregates.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    /// Create a new stats repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsProvider for StatsRepository {
    async fn admin_stats(&self) -> AppResult<AdminStats> {
        let (total_users, total_events, upcoming_events, total_registrations, pending_requests) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(ADMIN_STATS_SQL)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to compute admin stats", e)
                })?;

        Ok(AdminStats {
            total_users,
            total_events,
            upcoming_events,
            total_registrations,
            pending_requests,
        })
    }

    async fn organizer_stats(&self, organizer: UserId) -> AppResult<OrganizerStats> {
        let since = month_start(Utc::now());
        debug!(organizer = %organizer, since = %since, "Computing organizer stats");

        let (total_events, active_events, total_registrations, registrations_this_month) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(ORGANIZER_STATS_SQL)
                .bind(organizer.get())
                .bind(since)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to compute organizer stats",
                        e,
                    )
                })?;

        Ok(OrganizerStats {
            total_events,
            active_events,
            total_registrations,
            registrations_this_month,
        })
    }
}

/// Midnight UTC on the first day of `now`'s calendar month.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}
