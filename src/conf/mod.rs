mod bench;
mod config;
mod storage;

pub use bench::BenchConfig;
pub use config::Config;
pub use storage::StorageConfig;
