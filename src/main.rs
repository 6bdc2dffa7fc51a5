use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{debug, info};

use cipherbench::bench::{event_channel, Orchestrator, UiEvent};
use cipherbench::conf::Config;
use cipherbench::core::{setup_logging, CliArgs, Workload};
use cipherbench::storage::{BackendRegistry, SqliteBackendFactory};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = &args; "cipherbench started");

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut bench_config = config.bench.clone();
    if let Some(seed) = args.seed {
        bench_config.seed = Some(seed);
    }

    let (events, mut rx) = event_channel();
    let registry = Arc::new(BackendRegistry::new(Box::new(SqliteBackendFactory::new(
        &config.storage,
    ))));
    let mut orchestrator = Orchestrator::new(registry, &bench_config, events);
    if let Some(size) = args.size {
        orchestrator.set_dataset_size(size);
    }
    orchestrator.set_configuration(args.backend.into());

    // render the result log as it grows; the full text arrives every time,
    // so print only the new suffix
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                UiEvent::ResultsChanged(text) => {
                    if text.len() < printed {
                        printed = 0;
                    }
                    print!("{}", &text[printed..]);
                    printed = text.len();
                    let _ = std::io::stdout().flush();
                }
                UiEvent::UiEnabled(enabled) => debug!("ui enabled: {}", enabled),
                UiEvent::DatasetSizeChanged(size) => debug!("dataset size: {}", size),
            }
        }
    });

    match args.workload {
        Workload::Inserts => orchestrator.start_insert_workload(args.all),
        Workload::SelectIndexed => orchestrator.start_indexed_select_workload(args.all),
        Workload::SelectUnindexed => orchestrator.start_unindexed_select_workload(args.all),
    }

    orchestrator.join().await;
    drop(orchestrator);
    let _ = printer.await;
    Ok(())
}
