//! In-process scheduler.
//!
//! One interval loop per schedule, each firing a `schedule.tick` event
//! through the trigger registry. The first tick lands one full period after
//! start, so restarts do not repeat a run. Loops stop on the shutdown
//! broadcast.
//! Disable with `SCHEDULER_ENABLED=false` when an external scheduler posts
//! ticks to `/api/v1/schedules/{name}/run` instead.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::config::Config;
use crate::context::AppContext;
use crate::triggers::{TriggerEvent, TriggerRegistry, SWEEP_SCHEDULE, WARN_SCHEDULE};

/// A named tick and its period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub name: String,
    pub every: Duration,
}

impl Schedule {
    pub fn new(name: &str, every: Duration) -> Self {
        Self {
            name: name.to_string(),
            every,
        }
    }
}

/// Sweeper and warner periods from config
pub fn configured_schedules(config: &Config) -> Vec<Schedule> {
    vec![
        Schedule::new(
            SWEEP_SCHEDULE,
            Duration::from_secs(config.schedules.sweep_interval_secs),
        ),
        Schedule::new(
            WARN_SCHEDULE,
            Duration::from_secs(config.schedules.warn_interval_secs),
        ),
    ]
}

/// Tick `schedule` until shutdown. The first tick fires after one period.
pub async fn run_schedule_loop(
    schedule: Schedule,
    registry: Arc<TriggerRegistry>,
    ctx: AppContext,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut timer = interval_at(Instant::now() + schedule.every, schedule.every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        schedule = %schedule.name,
        interval_secs = schedule.every.as_secs(),
        "Starting schedule loop"
    );

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let report = registry
                    .dispatch(&ctx, TriggerEvent::schedule_tick(&schedule.name))
                    .await;
                let failed = report.handled.iter().filter(|h| h.outcome.is_failed()).count();
                if failed > 0 {
                    error!(
                        schedule = %schedule.name,
                        failed = failed,
                        "Scheduled run failed, next interval will retry"
                    );
                }
            }
            _ = shutdown.recv() => {
                info!(schedule = %schedule.name, "Received shutdown signal, stopping schedule loop");
                break;
            }
        }
    }

    info!(schedule = %schedule.name, "Schedule loop stopped");
}

/// Spawn one loop per schedule
pub fn spawn_schedules(
    schedules: Vec<Schedule>,
    registry: Arc<TriggerRegistry>,
    ctx: AppContext,
    shutdown: &broadcast::Sender<()>,
) -> Vec<JoinHandle<()>> {
    schedules
        .into_iter()
        .map(|schedule| {
            tokio::spawn(run_schedule_loop(
                schedule,
                registry.clone(),
                ctx.clone(),
                shutdown.subscribe(),
            ))
        })
        .collect()
}
