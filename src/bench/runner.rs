use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::core::HarnessError;
use crate::storage::{Configuration, StorageError};

/// Lookups per cancellation-check unit. The flag is polled once per batch so
/// long select runs stay cancellable without polluting the timed region with
/// per-lookup checks.
pub const LOOKUP_BATCH: usize = 500;

/// Shared cooperative cancellation flag, polled at batch boundaries only.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Insert,
    SelectIndexed,
    SelectUnindexed,
}

impl WorkloadKind {
    /// Header used in the comparative summary block.
    pub fn summary_header(&self) -> &'static str {
        match self {
            WorkloadKind::Insert => "Inserts",
            WorkloadKind::SelectIndexed => "Selects indexed",
            WorkloadKind::SelectUnindexed => "Selects NOT indexed",
        }
    }
}

/// One measured workload execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub configuration: Configuration,
    pub kind: WorkloadKind,
    pub millis: u64,
}

/// Time a single operation with a monotonic clock.
pub fn time_millis<T>(
    op: impl FnOnce() -> Result<T, StorageError>,
) -> Result<(u64, T), StorageError> {
    let start = Instant::now();
    let out = op()?;
    Ok((start.elapsed().as_millis() as u64, out))
}

/// Run `batches * LOOKUP_BATCH` operations as one timed region, checking the
/// cancellation flag between batches. A cancelled run yields the
/// `Interrupted` sentinel instead of a partial, misleading duration.
pub fn run_batched(
    cancel: &CancelFlag,
    batches: usize,
    mut op: impl FnMut(usize) -> Result<(), StorageError>,
) -> Result<u64, HarnessError> {
    let start = Instant::now();
    for batch in 0..batches {
        if cancel.is_set() {
            return Err(HarnessError::Interrupted);
        }
        for j in 0..LOOKUP_BATCH {
            op(batch * LOOKUP_BATCH + j)?;
        }
    }
    Ok(start.elapsed().as_millis() as u64)
}

/// Number of 500-lookup batches for a dataset of `length` rows. Clamps to
/// zero below one full batch instead of underflowing.
pub fn batch_count(length: usize) -> usize {
    length / LOOKUP_BATCH
}

/// Arithmetic mean over the recorded rounds, truncating toward zero.
pub fn average_millis(total: u64, rounds: u32) -> u64 {
    total / rounds as u64
}

/// Percentage deviation of `actual` against `base`, two decimal places.
pub fn percentage_deviation(base: f64, actual: f64) -> String {
    format!("{:.2}", actual / base * 100.0 - 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deviation_fixtures() {
        assert_eq!(percentage_deviation(100.0, 150.0), "50.00");
        assert_eq!(percentage_deviation(100.0, 80.0), "-20.00");
        assert_eq!(percentage_deviation(100.0, 100.0), "0.00");
    }

    #[test]
    fn test_average_truncates_toward_zero() {
        assert_eq!(average_millis(9, 10), 0);
        assert_eq!(average_millis(19, 10), 1);
        assert_eq!(average_millis(100, 10), 10);
    }

    #[test]
    fn test_batch_count_clamps_small_datasets() {
        assert_eq!(batch_count(0), 0);
        assert_eq!(batch_count(499), 0);
        assert_eq!(batch_count(500), 1);
        assert_eq!(batch_count(1000), 2);
        assert_eq!(batch_count(100_000), 200);
    }

    #[test]
    fn test_run_batched_covers_every_index_once() {
        let cancel = CancelFlag::new();
        let mut seen = Vec::new();
        run_batched(&cancel, 2, |idx| {
            seen.push(idx);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_batched_zero_batches_reports_zero_ops() {
        let cancel = CancelFlag::new();
        let mut calls = 0;
        run_batched(&cancel, 0, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_run_batched_interrupts_before_first_batch() {
        let cancel = CancelFlag::new();
        cancel.set();
        let mut calls = 0;
        let result = run_batched(&cancel, 4, |_| {
            calls += 1;
            Ok(())
        });
        assert_eq!(result, Err(HarnessError::Interrupted));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_run_batched_checks_between_batches_only() {
        let cancel = CancelFlag::new();
        let mut calls = 0;
        let flag = cancel.clone();
        let result = run_batched(&cancel, 4, |idx| {
            calls += 1;
            if idx == 0 {
                // set mid-batch; the current batch must still finish
                flag.set();
            }
            Ok(())
        });
        assert_eq!(result, Err(HarnessError::Interrupted));
        assert_eq!(calls, LOOKUP_BATCH);
    }

    #[test]
    fn test_time_millis_propagates_errors() {
        let result: Result<(u64, ()), _> =
            time_millis(|| Err(StorageError::Unavailable("gone".into())));
        assert!(result.is_err());
    }
}
