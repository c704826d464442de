//! Unique foreign-key tuples for tables referencing several parents.
//!
//! Each row gets a tuple of `width` values drawn uniformly from `[1, N]`;
//! a tuple equal to one already accepted is rejected and drawn again.
//! Expected retries grow as `N / (N^K - accepted)`, so near saturation
//! (`K = 1` being the extreme) every row costs more draws than the last.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, SeedError};
use crate::faker::ValueSource;

/// Attempts on a single row after which a warning is logged.
pub const RETRY_WARN_THRESHOLD: u64 = 1_000;

/// Multiple of the expected draws for a row that is still tolerated.
pub const EXPECTED_DRAWS_FACTOR: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorOptions {
    /// Draws allowed for one row before the allocation fails. Rows late in a
    /// saturated tuple space get `EXPECTED_DRAWS_FACTOR` times their expected
    /// draws when that is larger.
    pub max_attempts_per_row: u64,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            max_attempts_per_row: 100_000,
        }
    }
}

/// Row index (`1..=N`) to a distinct tuple of foreign-key values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyTupleSet {
    width: usize,
    tuples: BTreeMap<u64, Vec<i64>>,
}

impl ForeignKeyTupleSet {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn get(&self, row: u64) -> Option<&[i64]> {
        self.tuples.get(&row).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[i64])> {
        self.tuples.iter().map(|(row, tuple)| (*row, tuple.as_slice()))
    }
}

/// Allocate with [`AllocatorOptions::default`].
pub fn allocate<S>(row_count: u64, width: usize, source: &mut S) -> Result<ForeignKeyTupleSet>
where
    S: ValueSource + ?Sized,
{
    allocate_with(row_count, width, source, &AllocatorOptions::default())
}

pub fn allocate_with<S>(
    row_count: u64,
    width: usize,
    source: &mut S,
    options: &AllocatorOptions,
) -> Result<ForeignKeyTupleSet>
where
    S: ValueSource + ?Sized,
{
    let space = tuple_space(row_count, width);
    if let Some(space) = space {
        // Row `space + 1` can never be filled.
        if space < u128::from(row_count) {
            return Err(SeedError::ForeignKeyAllocation {
                row: space as u64 + 1,
                attempts: 0,
            });
        }
    }

    let max = i64::try_from(row_count).unwrap_or(i64::MAX);
    let mut seen: HashSet<Vec<i64>> = HashSet::with_capacity(row_count as usize);
    let mut tuples = BTreeMap::new();

    for row in 1..=row_count {
        let ceiling = attempt_ceiling(space, row - 1, options);
        let mut attempts = 0_u64;
        loop {
            attempts += 1;
            let tuple: Vec<i64> = (0..width).map(|_| source.number_between(1, max)).collect();
            if seen.insert(tuple.clone()) {
                tuples.insert(row, tuple);
                break;
            }

            if attempts == RETRY_WARN_THRESHOLD {
                warn!(
                    event = "foreign_key_retry",
                    row,
                    attempts,
                    row_count,
                    width,
                    "foreign key tuple space is nearly exhausted"
                );
            }
            if attempts >= ceiling {
                return Err(SeedError::ForeignKeyAllocation { row, attempts });
            }
        }
    }

    debug!(event = "foreign_keys_allocated", rows = row_count, width);
    Ok(ForeignKeyTupleSet { width, tuples })
}

/// Draws allowed for the row after `accepted` tuples. A free fraction `f`
/// of the space costs `1 / f` draws on average.
fn attempt_ceiling(space: Option<u128>, accepted: u64, options: &AllocatorOptions) -> u64 {
    let expected = match space {
        Some(space) => space.div_ceil(space - u128::from(accepted)),
        None => 1,
    };
    let scaled = expected.saturating_mul(u128::from(EXPECTED_DRAWS_FACTOR));
    let scaled = u64::try_from(scaled).unwrap_or(u64::MAX);
    options.max_attempts_per_row.max(scaled)
}

/// `N^K`, or `None` when it exceeds `u128`.
fn tuple_space(row_count: u64, width: usize) -> Option<u128> {
    let exponent = u32::try_from(width).ok()?;
    u128::from(row_count).checked_pow(exponent)
}
