use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::storage::Record;

/// Synthetic dataset generator with deterministic size formulas.
///
/// Record `i` gets names of length `8 + (i % 5)` and a free-text payload of
/// length `280 + (i % 100)`, so datasets have slightly varying row sizes
/// regardless of the RNG seed. A capturing generation additionally retains
/// per-record sample strings that the unindexed select workload looks up
/// later; the samples persist until the next capturing generation.
pub struct RecordGenerator {
    rng: StdRng,
    first_names: Vec<String>,
    payload_snippets: Vec<String>,
}

impl RecordGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            first_names: Vec::new(),
            payload_snippets: Vec::new(),
        }
    }

    /// Produce `count + 1` records with ids `0..=count`.
    pub fn generate(&mut self, count: usize, capture_samples: bool) -> Vec<Record> {
        if capture_samples {
            self.first_names.clear();
            self.payload_snippets.clear();
        }

        let mut records = Vec::with_capacity(count + 1);
        for i in 0..=count {
            let first_name = self.random_string(8 + (i % 5));
            let cv_info = self.random_string(280 + (i % 100));
            if capture_samples {
                self.first_names.push(first_name.clone());
                self.payload_snippets
                    .push(cv_info[8 + (i % 30)..40 + (i % 100)].to_string());
            }
            records.push(Record {
                id: i as i64,
                first_name,
                last_name: self.random_string(8 + (i % 5)),
                height: self.rng.gen(),
                weight: self.rng.gen(),
                cv_info,
            });
        }
        records
    }

    pub fn first_names(&self) -> &[String] {
        &self.first_names
    }

    pub fn payload_snippets(&self) -> &[String] {
        &self.payload_snippets
    }

    /// Shuffled copy of the captured first names, for lookup order that does
    /// not match insertion order.
    pub fn shuffled_first_names(&mut self) -> Vec<String> {
        let mut names = self.first_names.clone();
        names.shuffle(&mut self.rng);
        names
    }

    /// Random identity pool for the indexed select workload: `count + 1` ids
    /// drawn uniformly from `[0, max_id)`.
    pub fn identity_pool(&mut self, count: usize, max_id: usize) -> Vec<i64> {
        (0..=count)
            .map(|_| self.rng.gen_range(0..max_id as i64))
            .collect()
    }

    fn random_string(&mut self, length: usize) -> String {
        // uniform over the 62 alphanumeric symbols
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
