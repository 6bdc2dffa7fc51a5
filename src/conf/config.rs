use config::Config as CConfig;
use serde::{Deserialize, Serialize};

use crate::conf::{BenchConfig, StorageConfig};
use crate::core::HarnessError::{self, ConfigParsingError};

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, HarnessError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Config, HarnessError> {
        let config = CConfig::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [storage]
        data_dir = "/tmp/cipherbench"

        [bench]
        dataset_size = 10000
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(conf.storage.data_dir, PathBuf::from("/tmp/cipherbench"));
        assert_eq!(conf.bench.dataset_size, 10000);
        assert_eq!(conf.bench.insert_rounds, 10);
    }

    #[test]
    fn unknown_fields_rejected() {
        let toml = r#"
        [bench]
        datset_size = 10000
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }
}
