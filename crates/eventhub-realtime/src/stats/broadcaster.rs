//! Dashboard statistics: the global admin loop and per-socket organizer tickers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use eventhub_core::config::RealtimeConfig;
use eventhub_core::traits::StatsProvider;
use eventhub_core::types::StatsSnapshot;

use crate::connection::handle::ConnectionHandle;
use crate::connection::manager::ConnectionManager;
use crate::message::types::ServerEvent;
use crate::metrics::RealtimeMetrics;
use crate::room::Room;

use super::task::StatsTask;

const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

/// Computes statistics and pushes them to dashboard sockets.
#[derive(Debug)]
pub struct StatsBroadcaster {
    provider: Arc<dyn StatsProvider>,
    connections: Arc<ConnectionManager>,
    metrics: Arc<RealtimeMetrics>,
    admin_interval: Duration,
    organizer_interval: Duration,
    skip_when_idle: bool,
}

impl StatsBroadcaster {
    /// Creates a broadcaster over a statistics source.
    pub fn new(
        config: &RealtimeConfig,
        provider: Arc<dyn StatsProvider>,
        connections: Arc<ConnectionManager>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            provider,
            connections,
            metrics,
            admin_interval: config.admin_stats_interval(),
            organizer_interval: config.organizer_stats_interval(),
            skip_when_idle: config.skip_admin_stats_when_idle,
        }
    }

    /// Spawns the admin loop. It ticks every admin interval until `shutdown` fires.
    ///
    /// The first push happens one full interval after start.
    pub fn spawn_admin_loop(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = this.admin_interval;
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "Admin stats loop started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => this.admin_tick().await,
                }
            }

            info!("Admin stats loop stopped");
        })
    }

    /// One admin loop iteration: compute and push to `role_ADMIN`.
    pub async fn admin_tick(&self) {
        if self.skip_when_idle && self.connections.room_size(&Room::ADMINS) == 0 {
            debug!("No admin connected, skipping stats computation");
            return;
        }

        match self.provider.admin_stats().await {
            Ok(stats) => {
                let event = ServerEvent::DashboardStatsUpdate(StatsSnapshot::now(stats));
                let sent = self.connections.emit_event_to_room(&Room::ADMINS, &event);
                self.metrics.stats_pushed();
                debug!(sent, "Admin stats pushed");
            }
            Err(e) => {
                error!(error = %e, "Failed to compute admin stats");
                self.metrics.stats_failed();
                self.connections
                    .emit_event_to_room(&Room::ADMINS, &ServerEvent::error(e.message));
            }
        }
    }

    /// Serves `request_admin_stats`: a snapshot plus the online count, to the caller only.
    pub async fn handle_admin_request(&self, handle: &ConnectionHandle) {
        if !handle.role.can_view_dashboard() {
            handle.send_event(&ServerEvent::error(INSUFFICIENT_PERMISSIONS));
            return;
        }

        match self.provider.admin_stats().await {
            Ok(stats) => {
                handle.send_event(&ServerEvent::DashboardStatsUpdate(StatsSnapshot::now(stats)));
                self.metrics.stats_pushed();
            }
            Err(e) => {
                error!(conn_id = %handle.id, error = %e, "Failed to compute admin stats");
                self.metrics.stats_failed();
                handle.send_event(&ServerEvent::error(e.message));
            }
        }

        handle.send_event(&ServerEvent::DashboardOnlineUpdate {
            online_users: self.connections.online_count(),
        });
    }

    /// Serves `request_organizer_stats`: an immediate snapshot, then a
    /// per-socket ticker unless one is already running.
    pub async fn handle_organizer_request(self: &Arc<Self>, handle: &Arc<ConnectionHandle>) {
        if !handle.role.can_view_dashboard() {
            handle.send_event(&ServerEvent::error(INSUFFICIENT_PERMISSIONS));
            return;
        }

        self.push_organizer_stats(handle).await;

        let this = Arc::clone(self);
        let target = Arc::clone(handle);
        let period = self.organizer_interval;
        handle
            .start_stats_task(move || {
                StatsTask::spawn(move |token| async move {
                    let mut ticker = time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => {
                                if !target.is_alive() {
                                    break;
                                }
                                tokio::select! {
                                    biased;
                                    _ = token.cancelled() => break,
                                    _ = this.push_organizer_stats(&target) => {}
                                }
                            }
                        }
                    }
                    debug!(conn_id = %target.id, "Organizer stats ticker stopped");
                })
            })
            .await;
    }

    async fn push_organizer_stats(&self, handle: &ConnectionHandle) {
        match self.provider.organizer_stats(handle.user_id).await {
            Ok(stats) => {
                handle.send_event(&ServerEvent::OrganizerStatsUpdate(StatsSnapshot::now(stats)));
                self.metrics.stats_pushed();
            }
            Err(e) => {
                error!(
                    conn_id = %handle.id,
                    user_id = %handle.user_id,
                    error = %e,
                    "Failed to compute organizer stats"
                );
                self.metrics.stats_failed();
                handle.send_event(&ServerEvent::error(e.message));
            }
        }
    }
}
