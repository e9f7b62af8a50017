//! Dashboard statistics commands.

use clap::{Args, Subcommand};
use tabled::Tabled;

use eventhub_core::error::AppError;
use eventhub_core::traits::StatsProvider;
use eventhub_core::types::{AdminStats, OrganizerStats, UserId};
use eventhub_database::{DatabasePool, StatsRepository};

use crate::output::{self, OutputFormat};

/// Arguments for stats commands
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Stats subcommand
    #[command(subcommand)]
    pub command: StatsCommand,
}

/// Stats subcommands
#[derive(Debug, Subcommand)]
pub enum StatsCommand {
    /// Platform-wide counters
    Admin,
    /// Counters for one organizer's events
    Organizer {
        /// Organizer user ID
        id: UserId,
    },
}

#[derive(Debug, serde::Serialize, Tabled)]
struct StatRow {
    metric: &'static str,
    value: i64,
}

fn admin_rows(stats: &AdminStats) -> Vec<StatRow> {
    vec![
        StatRow { metric: "Total users", value: stats.total_users },
        StatRow { metric: "Total events", value: stats.total_events },
        StatRow { metric: "Upcoming events", value: stats.upcoming_events },
        StatRow { metric: "Total registrations", value: stats.total_registrations },
        StatRow { metric: "Pending requests", value: stats.pending_requests },
    ]
}

fn organizer_rows(stats: &OrganizerStats) -> Vec<StatRow> {
    vec![
        StatRow { metric: "Total events", value: stats.total_events },
        StatRow { metric: "Active events", value: stats.active_events },
        StatRow { metric: "Total registrations", value: stats.total_registrations },
        StatRow { metric: "Registrations this month", value: stats.registrations_this_month },
    ]
}

/// Execute stats commands
pub async fn execute(args: &StatsArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let db = DatabasePool::connect(&config.database).await?;
    let repo = StatsRepository::new(db.pool().clone());

    let result = match &args.command {
        StatsCommand::Admin => repo.admin_stats().await.map(|s| match format {
            OutputFormat::Table => output::print_list(&admin_rows(&s), format),
            OutputFormat::Json => output::print_item(&s, format),
        }),
        StatsCommand::Organizer { id } => repo.organizer_stats(*id).await.map(|s| match format {
            OutputFormat::Table => output::print_list(&organizer_rows(&s), format),
            OutputFormat::Json => output::print_item(&s, format),
        }),
    };

    db.close().await;
    result
}
