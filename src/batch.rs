// Batch orchestration: run every request strictly one after another,
// recording failures and moving on. Only local precondition failures stop
// the run, and those are caught before anything is sent.

use std::path::PathBuf;

use log::{info, warn};

use crate::api::TaskApi;
use crate::error::Result;
use crate::lifecycle::{LifecycleController, PollPolicy, Sleep, TaskState};
use crate::model::GenerationRequest;
use crate::report::Progress;
use crate::retriever::AssetRetriever;

/// Outcome of a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Items attempted, whether or not submission went through.
    pub submitted: usize,
    /// Items whose task reached the Succeeded state.
    pub succeeded: usize,
    pub saved: Vec<PathBuf>,
}

pub struct BatchOrchestrator<'a, C, S> {
    client: &'a C,
    sleeper: &'a S,
    policy: PollPolicy,
    retriever: &'a AssetRetriever,
}

impl<'a, C: TaskApi, S: Sleep> BatchOrchestrator<'a, C, S> {
    pub fn new(
        client: &'a C,
        sleeper: &'a S,
        policy: PollPolicy,
        retriever: &'a AssetRetriever,
    ) -> Self {
        Self {
            client,
            sleeper,
            policy,
            retriever,
        }
    }

    /// Validate every request, then submit, poll and collect them in order.
    pub fn run(
        &self,
        requests: &[GenerationRequest],
        progress: &mut dyn Progress,
    ) -> Result<BatchResult> {
        for request in requests {
            request.validate()?;
        }
        self.retriever.prepare()?;

        let controller = LifecycleController::new(self.client, self.sleeper, self.policy);
        let total = requests.len();
        let mut result = BatchResult::default();

        for (i, request) in requests.iter().enumerate() {
            let index = i + 1;
            progress.item_started(index, total, &request.prompt);
            result.submitted += 1;

            let handle = match self.client.submit(request) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("item {index}: submit failed: {e}");
                    progress.failed(&e);
                    continue;
                }
            };
            progress.submitted(&handle);

            match controller.drive(&handle, progress) {
                TaskState::Succeeded { .. } => {
                    result.succeeded += 1;
                    let prefix = format!("{}{index}", request.mode.as_str());
                    match self.retriever.retrieve(self.client, &handle, &prefix, progress) {
                        Ok(paths) => result.saved.extend(paths),
                        Err(e) => {
                            warn!("item {index}: retrieval failed: {e}");
                            progress.failed(&e);
                        }
                    }
                }
                other => info!("item {index}: no assets ({other:?})"),
            }
        }

        info!(
            "batch done: {} submitted, {} succeeded, {} saved",
            result.submitted,
            result.succeeded,
            result.saved.len()
        );
        Ok(result)
    }
}
