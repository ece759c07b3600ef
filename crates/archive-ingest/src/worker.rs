use crate::pipeline::{process_ingest_job, PipelineContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Polls `ingest_jobs` for ready work and runs each claimed job on its own
/// task, bounded by a semaphore so a burst of ready jobs can't outrun the
/// worker's concurrency budget. Grounded on the teacher's
/// `automations::server::serve` poll-claim-spawn loop, minus its executor
/// registry — this crate only ever runs one kind of task.
pub struct Worker {
    ctx: Arc<PipelineContext>,
    permits: usize,
    poll_interval: Duration,
    batch_size: i64,
}

impl Worker {
    pub fn new(ctx: Arc<PipelineContext>, permits: usize, poll_interval: Duration, batch_size: i64) -> Self {
        Self {
            ctx,
            permits,
            poll_interval,
            batch_size,
        }
    }

    /// Runs the poll loop until `shutdown` resolves, then waits for any
    /// in-flight jobs to finish before returning.
    pub async fn serve(self, shutdown: impl std::future::Future<Output = ()>) {
        let semaphore = Arc::new(Semaphore::new(self.permits));
        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = &mut shutdown => break,
            }

            let available = semaphore.available_permits();
            if available == 0 {
                continue;
            }

            let claim_limit = self.batch_size.min(available as i64);
            let jobs = match archive_sql::ingest_jobs::claim_ready_batch(&self.ctx.db, claim_limit).await {
                Ok(jobs) => jobs,
                Err(err) => {
                    tracing::error!(?err, "failed to poll for ready ingest jobs (will retry)");
                    continue;
                }
            };

            for job in jobs {
                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let ctx = Arc::clone(&self.ctx);
                let job_id = job.id;
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(err) = process_ingest_job(&ctx, job_id).await {
                        tracing::error!(?err, %job_id, "ingest job processing crashed before reaching a terminal state");
                    }
                });
            }
        }

        tracing::info!("ingest worker signaled to stop, awaiting in-flight jobs");
        let _ = semaphore.acquire_many(self.permits as u32).await;
    }
}
