use std::sync::Arc;

use crate::bench::generator::RecordGenerator;
use crate::bench::runner::{
    average_millis, batch_count, percentage_deviation, run_batched, time_millis, CancelFlag,
    RunResult, WorkloadKind,
};
use crate::bench::sink::SinkWriter;
use crate::core::HarnessError;
use crate::storage::{BackendRegistry, Configuration, StorageError, StoragePort};

/// One triggered workload: everything the background worker needs, moved off
/// the caller thread. Rounds within a session run strictly sequentially.
pub(crate) struct Session {
    pub registry: Arc<BackendRegistry>,
    pub writer: SinkWriter,
    pub cancel: CancelFlag,
    pub kind: WorkloadKind,
    pub comparative: bool,
    pub configuration: Configuration,
    pub length: usize,
    pub insert_rounds: u32,
    pub generator: RecordGenerator,
}

impl Session {
    pub fn execute(&mut self) -> Result<(), HarnessError> {
        if self.comparative {
            self.run_comparative()
        } else {
            self.run_single(self.configuration).map(|_| ())
        }
    }

    /// Run the workload once per backend variant, each leg a fully
    /// independent delete-all + populate + measure cycle, then report both
    /// encrypted legs against the unencrypted baseline.
    fn run_comparative(&mut self) -> Result<(), HarnessError> {
        let mut results = Vec::with_capacity(Configuration::ALL.len());
        for configuration in Configuration::ALL {
            results.push(self.run_single(configuration)?);
        }

        let base = results[0].millis;
        let encrypted = results[1];
        let scrubbed = results[2];
        self.writer.append(&format!(
            "\n\n{}\n\
             No Encryption (base):      {}ms \n\
             Encrypted:                 {}ms {}%\n\
             Encrypted+Memory Security: {}ms {}%\n",
            self.kind.summary_header(),
            base,
            encrypted.millis,
            percentage_deviation(base as f64, encrypted.millis as f64),
            scrubbed.millis,
            percentage_deviation(base as f64, scrubbed.millis as f64),
        ));
        Ok(())
    }

    fn run_single(&mut self, configuration: Configuration) -> Result<RunResult, HarnessError> {
        let store = self.registry.get(configuration)?;
        let store = store.as_ref();
        let millis = match self.kind {
            WorkloadKind::Insert => self.run_insert_rounds(store, configuration)?,
            WorkloadKind::SelectIndexed => {
                self.clean_start(store, configuration)?;
                self.run_select_indexed(store)?
            }
            WorkloadKind::SelectUnindexed => {
                self.clean_start(store, configuration)?;
                self.run_select_unindexed(store)?
            }
        };
        Ok(RunResult {
            configuration,
            kind: self.kind,
            millis,
        })
    }

    fn ensure_active(&self) -> Result<(), HarnessError> {
        if self.cancel.is_set() {
            return Err(HarnessError::Interrupted);
        }
        Ok(())
    }

    fn delete_all(
        &mut self,
        store: &dyn StoragePort,
        configuration: Configuration,
    ) -> Result<(), HarnessError> {
        self.ensure_active()?;
        store.delete_all()?;
        self.writer
            .append(&format!("Starting (backend: {})...\n", configuration));
        Ok(())
    }

    fn run_insert_rounds(
        &mut self,
        store: &dyn StoragePort,
        configuration: Configuration,
    ) -> Result<u64, HarnessError> {
        self.delete_all(store, configuration)?;

        let mut total = 0u64;
        for round in 1..=self.insert_rounds {
            self.ensure_active()?;
            total += self.insert_round(store, round, false)?;
        }

        let average = average_millis(total, self.insert_rounds);
        self.writer.append(&format!("Average: {}ms\n\n", average));
        Ok(average)
    }

    /// Generate a fresh dataset (untimed), then measure one batch insert.
    fn insert_round(
        &mut self,
        store: &dyn StoragePort,
        round: u32,
        capture_samples: bool,
    ) -> Result<u64, HarnessError> {
        let records = self.generator.generate(self.length, capture_samples);
        let (millis, ()) = time_millis(|| store.insert_batch(&records))?;
        self.writer.append(&format!(
            "Insert {}, round: {} : {}ms\n",
            self.length, round, millis
        ));
        Ok(millis)
    }

    /// Delete-all plus one capturing populate, so the select workloads start
    /// from a known dataset with usable lookup samples.
    fn clean_start(
        &mut self,
        store: &dyn StoragePort,
        configuration: Configuration,
    ) -> Result<(), HarnessError> {
        self.delete_all(store, configuration)?;
        self.insert_round(store, 0, true)?;
        Ok(())
    }

    fn run_select_indexed(&mut self, store: &dyn StoragePort) -> Result<u64, HarnessError> {
        let batches = batch_count(self.length);
        // draw the whole id pool first, so it is not counted in the query time
        let ids = if self.length > 0 {
            self.generator.identity_pool(self.length, self.length)
        } else {
            Vec::new()
        };

        let millis = run_batched(&self.cancel, batches, |idx| {
            match store.get_by_id(ids[idx]) {
                // a miss is a probe result, not a failure
                Err(StorageError::NotFound(_)) | Ok(_) => Ok(()),
                Err(err) => Err(err),
            }
        })?;

        self.writer.append(&format!(
            "Select {} time indexed: {}ms\n\n",
            self.length, millis
        ));
        Ok(millis)
    }

    fn run_select_unindexed(&mut self, store: &dyn StoragePort) -> Result<u64, HarnessError> {
        let batches = batch_count(self.length);
        let names = self.generator.shuffled_first_names();

        let millis = run_batched(&self.cancel, batches, |idx| {
            store.find_by_first_name(&names[idx]).map(|_| ())
        })?;

        self.writer.append(&format!(
            "Select {} time NOT indexed: {}ms\n\n",
            self.length, millis
        ));
        Ok(millis)
    }
}
