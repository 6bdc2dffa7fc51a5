use std::sync::{Arc, Mutex};

use crate::bench::events::{emit, EventSender, UiEvent};

struct SinkState {
    epoch: u64,
    text: String,
}

/// Append-only result log shared between the orchestrator and its workers.
///
/// `begin` clears synchronously and hands out an epoch-bound writer; appends
/// from writers of an older epoch are dropped, so a just-cancelled workload
/// can never overwrite the clear or bleed stale lines into the next run.
#[derive(Clone)]
pub struct ResultSink {
    state: Arc<Mutex<SinkState>>,
    events: EventSender,
}

impl ResultSink {
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                epoch: 0,
                text: String::new(),
            })),
            events,
        }
    }

    /// Start a new workload's log: bump the epoch and clear before returning,
    /// so no append from a previous epoch can land afterwards.
    pub fn begin(&self) -> SinkWriter {
        let mut state = self.state.lock().expect("result sink poisoned");
        state.epoch += 1;
        state.text.clear();
        emit(&self.events, UiEvent::ResultsChanged(String::new()));
        SinkWriter {
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            epoch: state.epoch,
        }
    }

    pub fn snapshot(&self) -> String {
        self.state.lock().expect("result sink poisoned").text.clone()
    }
}

/// Writer bound to the sink epoch it was created in.
#[derive(Clone)]
pub struct SinkWriter {
    state: Arc<Mutex<SinkState>>,
    events: EventSender,
    epoch: u64,
}

impl SinkWriter {
    pub fn append(&self, line: &str) {
        let mut state = self.state.lock().expect("result sink poisoned");
        if state.epoch != self.epoch {
            // a newer workload owns the sink now
            return;
        }
        state.text.push_str(line);
        emit(&self.events, UiEvent::ResultsChanged(state.text.clone()));
    }
}
