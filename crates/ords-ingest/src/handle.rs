use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{run_ingest_loop, IngestContext, IngestError, IngestStats};
use crate::source::MessageSource;

/// Owner's view of a running ingestion task.
#[derive(Debug)]
pub struct IngestHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<IngestStats, IngestError>>,
}

impl IngestHandle {
    /// Ask the loop to stop. The message in flight, if any, finishes first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end. A fatal source error comes back as
    /// `IngestError::Source`; a panic in the task as `IngestError::Task`.
    pub async fn join(self) -> Result<IngestStats, IngestError> {
        match self.task.await {
            Ok(res) => res,
            Err(e) => Err(IngestError::Task(e.to_string())),
        }
    }
}

/// Run the ingestion loop on its own tokio task.
pub fn spawn_ingest<S>(mut source: S, ctx: IngestContext, cancel: CancellationToken) -> IngestHandle
where
    S: MessageSource + 'static,
{
    let token = cancel.clone();
    let task = tokio::spawn(async move { run_ingest_loop(&mut source, &ctx, &token).await });
    IngestHandle { cancel, task }
}
