//! Background refresh of the province/ward reference data.
//!
//! The reference lists change rarely, so a refresh every few hours is
//! plenty. A failed run leaves the current snapshot in place; the next run
//! tries again.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `refresh_cron` is not a valid schedule, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    refresh_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_refresh_job(&scheduler, state, refresh_cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_refresh_job(
    scheduler: &JobScheduler,
    state: AppState,
    refresh_cron: &str,
) -> Result<(), JobSchedulerError> {
    let state = Arc::new(state);

    let job = Job::new_async(refresh_cron, move |_uuid, _lock| {
        let state = Arc::clone(&state);
        Box::pin(async move {
            run_refresh(&state, "schedule").await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = refresh_cron, "scheduler: reference-data refresh registered");
    Ok(())
}

/// Refreshes the snapshot once, logging the outcome.
pub async fn run_refresh(state: &AppState, trigger: &'static str) {
    match state.geo.refresh(&state.client).await {
        Ok(summary) => {
            tracing::info!(
                trigger,
                provinces = summary.provinces,
                wards = summary.wards,
                "scheduler: reference-data refresh complete"
            );
        }
        Err(e) => {
            tracing::error!(
                trigger,
                error = %e,
                "scheduler: reference-data refresh failed; keeping previous snapshot"
            );
        }
    }
}
