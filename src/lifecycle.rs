// Task lifecycle: an explicit state machine that drives one submitted
// task through Polling to a terminal state. Each poll iteration is the
// only suspension point.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::api::TaskApi;
use crate::error::TaskError;
use crate::model::{Phase, TaskHandle};
use crate::report::Progress;

/// Fixed-interval polling with a hard ceiling on cumulative wait time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub ceiling: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ceiling: Duration::from_secs(300),
        }
    }
}

/// Blocking wait between polls.
pub trait Sleep {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug)]
pub enum TaskState {
    Submitted,
    Polling { elapsed: Duration },
    Succeeded { elapsed: Duration },
    Failed(TaskError),
    TimedOut { elapsed: Duration },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded { .. } | TaskState::Failed(_) | TaskState::TimedOut { .. }
        )
    }
}

/// Drives a single task to a terminal state.
pub struct LifecycleController<'a, C, S> {
    client: &'a C,
    sleeper: &'a S,
    policy: PollPolicy,
}

impl<'a, C: TaskApi, S: Sleep> LifecycleController<'a, C, S> {
    pub fn new(client: &'a C, sleeper: &'a S, policy: PollPolicy) -> Self {
        Self {
            client,
            sleeper,
            policy,
        }
    }

    /// Advance the machine by one transition. Terminal states map to
    /// themselves.
    pub fn step(
        &self,
        handle: &TaskHandle,
        state: TaskState,
        progress: &mut dyn Progress,
    ) -> TaskState {
        match state {
            TaskState::Submitted => TaskState::Polling {
                elapsed: Duration::ZERO,
            },
            TaskState::Polling { elapsed } if elapsed >= self.policy.ceiling => {
                TaskState::TimedOut { elapsed }
            }
            TaskState::Polling { elapsed } => match self.client.status(handle) {
                Err(e) => TaskState::Failed(e),
                Ok(status) => {
                    progress.polled(handle, elapsed, status);
                    match status.phase() {
                        Phase::Complete => TaskState::Succeeded { elapsed },
                        Phase::Failed => TaskState::Failed(TaskError::Rejected {
                            status: status.0.unwrap_or_default(),
                        }),
                        Phase::InProgress => {
                            self.sleeper.sleep(self.policy.interval);
                            TaskState::Polling {
                                elapsed: elapsed + self.policy.interval,
                            }
                        }
                    }
                }
            },
            terminal => terminal,
        }
    }

    /// Run from Submitted until a terminal state is reached.
    pub fn drive(&self, handle: &TaskHandle, progress: &mut dyn Progress) -> TaskState {
        let mut state = TaskState::Submitted;
        while !state.is_terminal() {
            state = self.step(handle, state, progress);
        }
        debug!("task {handle} finished: {state:?}");
        match &state {
            TaskState::Succeeded { elapsed } => progress.succeeded(handle, *elapsed),
            TaskState::TimedOut { elapsed } => progress.timed_out(handle, *elapsed),
            TaskState::Failed(e) => progress.failed(e),
            _ => {}
        }
        state
    }
}
