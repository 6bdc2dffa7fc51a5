use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the three per-backend database files.
    #[serde(default = "StorageConfig::default_data_dir")]
    pub data_dir: PathBuf,
    /// SQLCipher passphrase for the encrypted backends.
    #[serde(default = "StorageConfig::default_passphrase")]
    pub passphrase: String,
}

impl StorageConfig {
    fn default_data_dir() -> PathBuf {
        std::env::temp_dir().join("cipherbench")
    }

    fn default_passphrase() -> String {
        String::from("P@s5P4ras3VeryL0n9")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            passphrase: Self::default_passphrase(),
        }
    }
}
