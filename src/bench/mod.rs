//! Benchmark harness core: generator, timed runner, result sink and the
//! orchestrator that sequences workloads across backend variants.

mod events;
mod generator;
mod runner;
mod sink;
mod workload;

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::task::JoinHandle;

pub use events::{event_channel, EventReceiver, EventSender, UiEvent};
pub use generator::RecordGenerator;
pub use runner::{
    average_millis, batch_count, percentage_deviation, run_batched, time_millis, CancelFlag,
    RunResult, WorkloadKind, LOOKUP_BATCH,
};
pub use sink::{ResultSink, SinkWriter};

use events::emit;
use workload::Session;

use crate::conf::BenchConfig;
use crate::core::HarnessError;
use crate::storage::{BackendRegistry, Configuration};

/// Dataset sizes the harness accepts.
pub const DATASET_SIZES: [usize; 4] = [1000, 10_000, 50_000, 100_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

struct ActiveSession {
    cancel: CancelFlag,
    writer: SinkWriter,
    state: Arc<Mutex<WorkloadState>>,
    handle: Option<JoinHandle<()>>,
    cancelled: bool,
}

/// Single-flight workload driver.
///
/// At most one workload runs at a time, on a dedicated blocking worker;
/// starting a new one supersedes the current session (flag set, worker
/// unwinds at its next round/batch boundary, stale sink appends dropped).
/// Must live inside a tokio runtime.
pub struct Orchestrator {
    registry: Arc<BackendRegistry>,
    sink: ResultSink,
    events: EventSender,
    dataset_size: usize,
    insert_rounds: u32,
    seed: Option<u64>,
    configuration: Configuration,
    comparative: bool,
    active: Option<ActiveSession>,
}

impl Orchestrator {
    pub fn new(registry: Arc<BackendRegistry>, config: &BenchConfig, events: EventSender) -> Self {
        emit(&events, UiEvent::DatasetSizeChanged(config.dataset_size));
        Self {
            registry,
            sink: ResultSink::new(events.clone()),
            events,
            dataset_size: config.dataset_size,
            insert_rounds: config.insert_rounds,
            seed: config.seed,
            configuration: Configuration::Plain,
            comparative: false,
            active: None,
        }
    }

    pub fn start_insert_workload(&mut self, comparative: bool) {
        self.start(WorkloadKind::Insert, comparative);
    }

    pub fn start_indexed_select_workload(&mut self, comparative: bool) {
        self.start(WorkloadKind::SelectIndexed, comparative);
    }

    pub fn start_unindexed_select_workload(&mut self, comparative: bool) {
        self.start(WorkloadKind::SelectUnindexed, comparative);
    }

    /// Cooperatively cancel the running workload: set the flag, log the
    /// cancellation once and re-arm the UI. The worker unwinds quietly at its
    /// next boundary.
    pub fn cancel_current_workload(&mut self) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        if session.cancelled || *session.state.lock().expect("state poisoned") != WorkloadState::Running {
            return;
        }
        session.cancelled = true;
        session.cancel.set();
        *session.state.lock().expect("state poisoned") = WorkloadState::Cancelled;
        session
            .writer
            .append("\n\nUser canceled the action\nSTOPPING...\n\n");
        emit(&self.events, UiEvent::UiEnabled(true));
    }

    pub fn set_dataset_size(&mut self, size: usize) {
        if !DATASET_SIZES.contains(&size) {
            warn!("ignoring unsupported dataset size {}", size);
            return;
        }
        self.dataset_size = size;
        emit(&self.events, UiEvent::DatasetSizeChanged(size));
    }

    /// Select the backend for single-configuration runs. Ignored while the
    /// most recent start selected comparative mode, which owns the backend
    /// sequence.
    pub fn set_configuration(&mut self, configuration: Configuration) {
        if self.comparative {
            debug!("comparative mode selected; ignoring backend selection");
            return;
        }
        self.configuration = configuration;
    }

    pub fn dataset_size(&self) -> usize {
        self.dataset_size
    }

    pub fn configuration(&self) -> Configuration {
        self.configuration
    }

    pub fn state(&self) -> WorkloadState {
        match &self.active {
            Some(session) => *session.state.lock().expect("state poisoned"),
            None => WorkloadState::Idle,
        }
    }

    /// Full cumulative result log.
    pub fn results(&self) -> String {
        self.sink.snapshot()
    }

    /// Wait for the current worker to finish (used by the CLI and tests; the
    /// UI path observes `UiEnabled` events instead).
    pub async fn join(&mut self) {
        let handle = self.active.as_mut().and_then(|s| s.handle.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn start(&mut self, kind: WorkloadKind, comparative: bool) {
        self.comparative = comparative;
        if let Some(previous) = self.active.take() {
            // quiet supersede: the old worker observes the flag and unwinds,
            // its remaining sink appends fall into a stale epoch
            previous.cancel.set();
        }

        emit(&self.events, UiEvent::UiEnabled(false));
        let writer = self.sink.begin();
        let cancel = CancelFlag::new();
        let state = Arc::new(Mutex::new(WorkloadState::Running));

        let mut session = Session {
            registry: Arc::clone(&self.registry),
            writer: writer.clone(),
            cancel: cancel.clone(),
            kind,
            comparative,
            configuration: self.configuration,
            length: self.dataset_size,
            insert_rounds: self.insert_rounds,
            generator: RecordGenerator::new(self.seed),
        };

        let events = self.events.clone();
        let worker_state = Arc::clone(&state);
        let worker_writer = writer.clone();
        let handle = tokio::task::spawn_blocking(move || {
            match session.execute() {
                Ok(()) => {
                    *worker_state.lock().expect("state poisoned") = WorkloadState::Completed;
                    emit(&events, UiEvent::UiEnabled(true));
                }
                Err(HarnessError::Interrupted) => {
                    // cancellation (or a superseding start) already handled
                    // the log line and the UI signal
                    *worker_state.lock().expect("state poisoned") = WorkloadState::Cancelled;
                }
                Err(err) => {
                    worker_writer.append(&format!("\nERROR: {}\n", err));
                    *worker_state.lock().expect("state poisoned") = WorkloadState::Completed;
                    emit(&events, UiEvent::UiEnabled(true));
                }
            }
        });

        self.active = Some(ActiveSession {
            cancel,
            writer,
            state,
            handle: Some(handle),
            cancelled: false,
        });
    }
}
