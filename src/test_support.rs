//! In-memory fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

use crate::api::TaskApi;
use crate::error::{Result, TaskError};
use crate::lifecycle::Sleep;
use crate::model::{AssetReference, GenerationRequest, TaskHandle, TaskStatus};
use crate::report::Progress;

enum Submit {
    Handle(String),
    Error(u16),
}

enum Poll {
    Status(Option<i64>),
    Error(u16),
}

/// Scripted `TaskApi`: submissions are answered in order, statuses per
/// handle. An empty asset URL stands for an entry without a URL. Asset
/// bytes are the URL itself.
#[derive(Default)]
pub struct ScriptedApi {
    submits: RefCell<VecDeque<Submit>>,
    polls: RefCell<HashMap<String, VecDeque<Poll>>>,
    results: HashMap<String, Vec<String>>,
    result_errors: HashMap<String, u16>,
    failing_assets: HashSet<String>,
    submitted_prompts: RefCell<Vec<String>>,
    status_calls: Cell<usize>,
    result_calls: Cell<usize>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(self, handle: &str) -> Self {
        self.submits
            .borrow_mut()
            .push_back(Submit::Handle(handle.to_string()));
        self
    }

    pub fn reject(self, status: u16) -> Self {
        self.submits.borrow_mut().push_back(Submit::Error(status));
        self
    }

    pub fn statuses(self, handle: &str, seq: impl IntoIterator<Item = Option<i64>>) -> Self {
        self.polls
            .borrow_mut()
            .entry(handle.to_string())
            .or_default()
            .extend(seq.into_iter().map(Poll::Status));
        self
    }

    pub fn status_error(self, handle: &str, status: u16) -> Self {
        self.polls
            .borrow_mut()
            .entry(handle.to_string())
            .or_default()
            .push_back(Poll::Error(status));
        self
    }

    pub fn assets<S: Into<String>>(mut self, handle: &str, urls: impl IntoIterator<Item = S>) -> Self {
        self.results
            .insert(handle.to_string(), urls.into_iter().map(Into::into).collect());
        self
    }

    pub fn result_error(mut self, handle: &str, status: u16) -> Self {
        self.result_errors.insert(handle.to_string(), status);
        self
    }

    pub fn failing_asset(mut self, url: &str) -> Self {
        self.failing_assets.insert(url.to_string());
        self
    }

    pub fn submitted_prompts(&self) -> Vec<String> {
        self.submitted_prompts.borrow().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.get()
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.get()
    }

    pub fn network_calls(&self) -> usize {
        self.submitted_prompts.borrow().len() + self.status_calls() + self.result_calls()
    }
}

impl TaskApi for ScriptedApi {
    fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        self.submitted_prompts.borrow_mut().push(request.prompt.clone());
        match self.submits.borrow_mut().pop_front() {
            Some(Submit::Handle(h)) => Ok(TaskHandle::new(h)),
            Some(Submit::Error(status)) => Err(TaskError::Submit {
                status,
                body: "rejected".into(),
            }),
            None => panic!("unexpected submit for {:?}", request.prompt),
        }
    }

    fn status(&self, handle: &TaskHandle) -> Result<TaskStatus> {
        self.status_calls.set(self.status_calls.get() + 1);
        let next = self
            .polls
            .borrow_mut()
            .get_mut(handle.as_str())
            .and_then(|q| q.pop_front());
        match next {
            Some(Poll::Status(code)) => Ok(TaskStatus(code)),
            Some(Poll::Error(status)) => Err(TaskError::Status {
                status,
                body: String::new(),
            }),
            // an exhausted script keeps reporting "in progress"
            None => Ok(TaskStatus(Some(0))),
        }
    }

    fn result(&self, handle: &TaskHandle) -> Result<Vec<AssetReference>> {
        self.result_calls.set(self.result_calls.get() + 1);
        if let Some(status) = self.result_errors.get(handle.as_str()) {
            return Err(TaskError::Result {
                status: *status,
                body: String::new(),
            });
        }
        Ok(self
            .results
            .get(handle.as_str())
            .map(|urls| {
                urls.iter()
                    .enumerate()
                    .filter(|(_, url)| !url.is_empty())
                    .map(|(i, url)| AssetReference::new(i + 1, url.as_str()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_asset(&self, asset: &AssetReference) -> Result<Vec<u8>> {
        if self.failing_assets.contains(&asset.url) {
            return Err(TaskError::AssetFetch {
                url: asset.url.clone(),
                status: 404,
            });
        }
        Ok(asset.url.as_bytes().to_vec())
    }
}

/// Records requested sleeps instead of waiting.
#[derive(Default)]
pub struct RecordingSleep {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleep {
    pub fn total(&self) -> Duration {
        self.slept.borrow().iter().sum()
    }
}

impl Sleep for RecordingSleep {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// Collects the events that tests assert on.
#[derive(Default)]
pub struct RecordingProgress {
    pub started: Vec<(usize, usize)>,
    pub succeeded: usize,
    pub timed_out: usize,
    pub failures: Vec<String>,
    pub saved: usize,
    pub skipped: Vec<usize>,
}

impl Progress for RecordingProgress {
    fn item_started(&mut self, index: usize, total: usize, _prompt: &str) {
        self.started.push((index, total));
    }

    fn succeeded(&mut self, _handle: &TaskHandle, _elapsed: Duration) {
        self.succeeded += 1;
    }

    fn timed_out(&mut self, _handle: &TaskHandle, _elapsed: Duration) {
        self.timed_out += 1;
    }

    fn failed(&mut self, error: &TaskError) {
        self.failures.push(error.to_string());
    }

    fn asset_saved(&mut self, _path: &Path) {
        self.saved += 1;
    }

    fn asset_skipped(&mut self, index: usize, _error: &TaskError) {
        self.skipped.push(index);
    }
}
