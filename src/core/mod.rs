mod args;
mod error;
mod logger;

pub use args::{BackendArg, CliArgs, Workload};
pub use error::HarnessError;
pub use logger::setup_logging;
