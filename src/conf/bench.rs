use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Number of records per generated dataset.
    #[serde(default = "BenchConfig::default_dataset_size")]
    pub dataset_size: usize,
    /// Rounds per insert workload.
    #[serde(default = "BenchConfig::default_insert_rounds")]
    pub insert_rounds: u32,
    /// Fixed RNG seed; fresh entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl BenchConfig {
    fn default_dataset_size() -> usize {
        1000
    }

    fn default_insert_rounds() -> u32 {
        10
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dataset_size: Self::default_dataset_size(),
            insert_rounds: Self::default_insert_rounds(),
            seed: None,
        }
    }
}
