use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use cipherbench::bench::{
    event_channel, EventReceiver, Orchestrator, UiEvent, WorkloadState,
};
use cipherbench::conf::BenchConfig;
use cipherbench::storage::{
    BackendFactory, BackendRegistry, Configuration, StorageError, StoragePort,
};
use cipherbench::testutil::{CountingFactory, GatedStore, SharedStoreFactory};

fn small_config() -> BenchConfig {
    BenchConfig {
        dataset_size: 1000,
        insert_rounds: 10,
        seed: Some(42),
    }
}

fn orchestrator_with(
    factory: Arc<CountingFactory>,
) -> (Orchestrator, EventReceiver) {
    let (events, rx) = event_channel();
    let registry = Arc::new(BackendRegistry::new(Box::new(FactoryHandle(factory))));
    let orch = Orchestrator::new(registry, &small_config(), events);
    (orch, rx)
}

/// Lets a test keep its own `Arc` to the factory the registry owns.
struct FactoryHandle(Arc<CountingFactory>);

impl BackendFactory for FactoryHandle {
    fn open(&self, configuration: Configuration) -> Result<Arc<dyn StoragePort>, StorageError> {
        self.0.open(configuration)
    }
}

fn drain(rx: &mut EventReceiver) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn count_ui_enabled(events: &[UiEvent], enabled: bool) -> usize {
    events
        .iter()
        .filter(|e| **e == UiEvent::UiEnabled(enabled))
        .count()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_workload_logs_rounds_and_average() {
    let factory = Arc::new(CountingFactory::new());
    let (mut orch, mut rx) = orchestrator_with(Arc::clone(&factory));

    orch.start_insert_workload(false);
    orch.join().await;

    let results = orch.results();
    assert!(results.contains("Starting (backend: plain)...\n"));
    for round in 1..=10 {
        assert!(
            results.contains(&format!("Insert 1000, round: {} :", round)),
            "missing round {} in:\n{}",
            round,
            results
        );
    }
    let average_line = results
        .lines()
        .find(|l| l.starts_with("Average: "))
        .expect("no average line");
    let millis: u64 = average_line
        .trim_start_matches("Average: ")
        .trim_end_matches("ms")
        .parse()
        .unwrap();
    assert!(results.trim_end().ends_with(&format!("Average: {}ms", millis)));

    // 1001 rows with ids 0..=1000 survive the run
    let store = factory.store(Configuration::Plain).unwrap();
    assert_eq!(store.len(), 1001);

    assert_eq!(orch.state(), WorkloadState::Completed);
    let events = drain(&mut rx);
    assert_eq!(count_ui_enabled(&events, false), 1);
    assert_eq!(count_ui_enabled(&events, true), 1);
}

#[rstest]
#[case::indexed(true)]
#[case::unindexed(false)]
#[tokio::test(flavor = "multi_thread")]
async fn test_select_workloads_clean_start_and_report(#[case] indexed: bool) {
    let factory = Arc::new(CountingFactory::new());
    let (mut orch, _rx) = orchestrator_with(Arc::clone(&factory));

    if indexed {
        orch.start_indexed_select_workload(false);
    } else {
        orch.start_unindexed_select_workload(false);
    }
    orch.join().await;

    let results = orch.results();
    // clean start: one populate round numbered 0
    assert!(results.contains("Insert 1000, round: 0 :"));
    let expected = if indexed {
        "Select 1000 time indexed:"
    } else {
        "Select 1000 time NOT indexed:"
    };
    assert!(results.contains(expected), "missing report in:\n{}", results);

    assert_eq!(
        factory.store(Configuration::Plain).unwrap().len(),
        1001
    );
    assert_eq!(orch.state(), WorkloadState::Completed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_comparative_insert_reports_deviation_per_leg() {
    let factory = Arc::new(CountingFactory::new());
    let (mut orch, _rx) = orchestrator_with(Arc::clone(&factory));

    orch.start_insert_workload(true);
    orch.join().await;

    let results = orch.results();
    let plain = results.find("Starting (backend: plain)...").unwrap();
    let encrypted = results.find("Starting (backend: encrypted)...").unwrap();
    let scrubbed = results
        .find("Starting (backend: encrypted+memory-security)...")
        .unwrap();
    assert!(plain < encrypted && encrypted < scrubbed);

    assert!(results.contains("Inserts\nNo Encryption (base):"));
    assert!(results.contains("Encrypted+Memory Security:"));
    // percentage deltas carry two decimals
    assert_eq!(results.matches('%').count(), 2);

    // each leg populated its own isolated store
    for configuration in Configuration::ALL {
        assert_eq!(factory.built_count(configuration), 1);
        assert_eq!(factory.store(configuration).unwrap().len(), 1001);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_comparative_failing_leg_skips_rest_and_summary() {
    let factory = Arc::new(CountingFactory::with_failure(Configuration::Encrypted));
    let (mut orch, mut rx) = orchestrator_with(Arc::clone(&factory));

    orch.start_insert_workload(true);
    orch.join().await;

    let results = orch.results();
    // baseline leg completed, failing leg logged, third leg never ran
    assert!(results.contains("Starting (backend: plain)..."));
    assert!(results.contains("ERROR: Backend unavailable:"));
    assert!(!results.contains("Starting (backend: encrypted+memory-security)..."));
    assert!(!results.contains("No Encryption (base):"));

    assert_eq!(factory.built_count(Configuration::EncryptedMemoryScrubbed), 0);
    assert_eq!(orch.state(), WorkloadState::Completed);

    let events = drain(&mut rx);
    assert_eq!(count_ui_enabled(&events, true), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_backend_singleton_across_sequential_runs() {
    let factory = Arc::new(CountingFactory::new());
    let (mut orch, _rx) = orchestrator_with(Arc::clone(&factory));

    orch.set_configuration(Configuration::Encrypted);
    orch.start_insert_workload(false);
    orch.join().await;
    orch.start_insert_workload(false);
    orch.join().await;

    assert_eq!(factory.built_count(Configuration::Encrypted), 1);
    assert_eq!(factory.built_count(Configuration::Plain), 0);
    assert_eq!(
        factory.store(Configuration::Encrypted).unwrap().len(),
        1001
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_mid_workload_stops_before_next_round() {
    let store = Arc::new(GatedStore::new());
    let (events, mut rx) = event_channel();
    let registry = Arc::new(BackendRegistry::new(Box::new(SharedStoreFactory::new(
        store.clone(),
    ))));
    let mut orch = Orchestrator::new(registry, &small_config(), events);

    orch.start_insert_workload(false);
    assert!(store.wait_started(Duration::from_secs(10)), "worker never reached the store");

    orch.cancel_current_workload();
    assert_eq!(orch.state(), WorkloadState::Cancelled);
    store.release();
    orch.join().await;

    let results = orch.results();
    assert_eq!(results.matches("User canceled the action").count(), 1);
    // the in-flight round may finish; no later round starts
    assert!(!results.contains("round: 2"));
    assert!(!results.contains("Average:"));

    let events = drain(&mut rx);
    assert_eq!(count_ui_enabled(&events, true), 1);
    assert_eq!(orch.state(), WorkloadState::Cancelled);

    // cancelling again is a no-op
    orch.cancel_current_workload();
    assert_eq!(orch.results().matches("User canceled the action").count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_new_workload_supersedes_cancelled_log() {
    let store = Arc::new(GatedStore::new());
    let (events, _rx) = event_channel();
    let registry = Arc::new(BackendRegistry::new(Box::new(SharedStoreFactory::new(
        store.clone(),
    ))));
    let mut orch = Orchestrator::new(registry, &small_config(), events);

    orch.start_insert_workload(false);
    assert!(store.wait_started(Duration::from_secs(10)), "worker never reached the store");

    // replace the running workload while the old worker is still blocked
    // inside the gated insert, then let both proceed
    orch.start_insert_workload(false);
    store.release();
    orch.join().await;

    let results = orch.results();
    // no stale lines from the superseded run: every round appears exactly once
    assert_eq!(results.matches("round: 1 :").count(), 1);
    assert!(results.contains("Average:"));
    assert_eq!(orch.state(), WorkloadState::Completed);
}
