//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! periodic report job.

use std::sync::Arc;
use std::time::Duration;

use hashmood_sentiment::{ReportEmitter, StatusPublisher};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle. Call `shutdown` on it before
/// exit so no timer outlives the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler<P>(
    emitter: Arc<ReportEmitter<P>>,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError>
where
    P: StatusPublisher + 'static,
{
    let scheduler = JobScheduler::new().await?;
    register_report_job(&scheduler, emitter, interval).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Publish a report every `interval`.
///
/// A failed publish is logged and left for the next tick; it never stops
/// the job.
async fn register_report_job<P>(
    scheduler: &JobScheduler,
    emitter: Arc<ReportEmitter<P>>,
    interval: Duration,
) -> Result<(), JobSchedulerError>
where
    P: StatusPublisher + 'static,
{
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let emitter = Arc::clone(&emitter);

        Box::pin(async move {
            match emitter.emit().await {
                Ok(status) => tracing::info!(status = %status, "scheduler: report published"),
                Err(e) => {
                    tracing::warn!(error = %e, "scheduler: report failed, retrying next tick");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(interval_secs = interval.as_secs(), "scheduler: report job registered");
    Ok(())
}
