use clap::{Parser, Subcommand, ValueEnum};
use log::kv::{ToValue, Value};

use crate::storage::Configuration;

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    /// Workload to run.
    #[command(subcommand)]
    pub workload: Workload,

    /// Run the workload against all three backends and report deltas.
    #[arg(long, global = true)]
    pub all: bool,

    /// Backend to measure (ignored with --all).
    #[arg(short, long, value_enum, global = true, default_value_t = BackendArg::Plain)]
    pub backend: BackendArg,

    /// Dataset size (1000, 10000, 50000 or 100000).
    #[arg(short, long, global = true)]
    pub size: Option<usize>,

    /// RNG seed for reproducible datasets.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum Workload {
    /// Timed insert rounds.
    Inserts,
    /// Point lookups by primary key.
    SelectIndexed,
    /// Pattern lookups by first name.
    SelectUnindexed,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum BackendArg {
    Plain,
    Encrypted,
    EncryptedMemory,
}

impl From<BackendArg> for Configuration {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Plain => Configuration::Plain,
            BackendArg::Encrypted => Configuration::Encrypted,
            BackendArg::EncryptedMemory => Configuration::EncryptedMemoryScrubbed,
        }
    }
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
