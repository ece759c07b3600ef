pub mod backfill;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod review_queue;
pub mod worker;

pub use backfill::{run_backfill, BackfillSummary};
pub use error::PipelineError;
pub use pipeline::{default_ruleset_id, process_ingest_job, PipelineContext, PipelineOutcome};
pub use review_queue::{list_needs_review, reassign_category, resolve, ReviewQueueError};
pub use worker::Worker;
