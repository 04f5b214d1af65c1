//! In-process daily batch jobs on the hours configured per stage (local time, minute 0).

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, TimeZone};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::batch_jobs::BatchJobs;
use crate::config::SchedulerConfig;
use crate::pipeline::summary::Stage;

/// First `hh:00` strictly after `now`, trying today and tomorrow.
/// `None` when `hours` holds no valid hour.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hours: &[u32]) -> Option<DateTime<Tz>> {
    let mut sorted: Vec<u32> = hours.iter().copied().filter(|h| *h < 24).collect();
    sorted.sort_unstable();
    let today = now.date_naive();

    for day in [today, today + Duration::days(1)] {
        for hour in &sorted {
            let Some(naive) = day.and_hms_opt(*hour, 0, 0) else {
                continue;
            };
            // Skipped by a DST gap: try the next hour
            let Some(at) = now.timezone().from_local_datetime(&naive).earliest() else {
                continue;
            };
            if at > *now {
                return Some(at);
            }
        }
    }
    None
}

async fn run_daily(jobs: Arc<BatchJobs>, stage: Stage, hours: Vec<u32>) {
    loop {
        let now = Local::now();
        let Some(next) = next_run_after(&now, &hours) else {
            warn!(stage = stage.as_str(), "No valid schedule hours; job disabled");
            return;
        };
        info!(
            stage = stage.as_str(),
            next_run = %next.to_rfc3339(),
            "{} daily job scheduled",
            stage.agent()
        );
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        let summary = jobs.run(stage).await;
        info!(
            correlation_id = %summary.run_id,
            stage = stage.as_str(),
            evaluated = summary.evaluated,
            errors = summary.errors,
            "{} daily job complete",
            stage.agent()
        );
    }
}

/// Starts one task per stage. Returns no tasks when the scheduler is disabled.
pub fn spawn(jobs: Arc<BatchJobs>, config: &SchedulerConfig) -> Vec<JoinHandle<()>> {
    if !config.enabled {
        info!("Job scheduler disabled (ENABLE_JOB_SCHEDULER is false)");
        return Vec::new();
    }
    info!(
        l1_hours = ?config.l1_hours,
        l2_hours = ?config.l2_hours,
        "Job scheduler started"
    );
    vec![
        tokio::spawn(run_daily(jobs.clone(), Stage::L1, config.l1_hours.clone())),
        tokio::spawn(run_daily(jobs, Stage::L2, config.l2_hours.clone())),
    ]
}
