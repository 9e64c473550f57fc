//! Mergeable running statistics backed by compensated sums.
//!
//! [`SumStats`] keeps only a count, a sum and a sum of squares, which is
//! enough to fold in pre-aggregated sub-samples (for example one simulation
//! run's mean payoff and its standard deviation) without access to the raw
//! values. Both sums go through [`KahanSum`] because the variance formula
//! subtracts two quantities of similar magnitude.

use thiserror::Error;

use crate::kahan::KahanSum;
use crate::numbers::count_to_f64;

/// Errors raised when a statistic is requested with too few samples.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    #[error("mean of an empty sample is undefined")]
    Empty,
    #[error("sample standard deviation needs at least two samples (got {count})")]
    TooFewSamples { count: u64 },
    #[error("sample count overflows: {count} + {added}")]
    CountOverflow { count: u64, added: u64 },
}

/// Count, compensated sum and compensated sum of squares of a sample.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SumStats {
    count: u64,
    sum: KahanSum,
    sum_of_squares: KahanSum,
}

impl SumStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: KahanSum::new(),
            sum_of_squares: KahanSum::new(),
        }
    }

    /// Build statistics over every value of an iterator.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut stats = Self::new();
        for value in values {
            stats.add_one(value);
        }
        stats
    }

    /// Add a single data point.
    pub fn add_one(&mut self, value: f64) {
        self.count += 1;
        self.sum.add(value);
        self.sum_of_squares.add(value * value);
    }

    /// Fold in a pre-aggregated sub-sample of `count` values.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::CountOverflow`] when the merged count would not
    /// fit in a `u64`; the statistics are left unchanged.
    pub fn add_many(
        &mut self,
        count: u64,
        sum: f64,
        sum_of_squares: f64,
    ) -> Result<(), StatsError> {
        self.count = self
            .count
            .checked_add(count)
            .ok_or(StatsError::CountOverflow {
                count: self.count,
                added: count,
            })?;
        self.sum.add(sum);
        self.sum_of_squares.add(sum_of_squares);
        Ok(())
    }

    /// Fold in a sub-sample known only by its size, mean and sample standard
    /// deviation.
    ///
    /// The sums are reconstructed as `n·mean` and `stddev²·(n − 1) + n·mean²`.
    ///
    /// # Errors
    ///
    /// See [`SumStats::add_many`].
    pub fn add_mean_stddev(
        &mut self,
        count: u64,
        mean: f64,
        stddev: f64,
    ) -> Result<(), StatsError> {
        let n = count_to_f64(count);
        let degrees_of_freedom = count_to_f64(count.saturating_sub(1));
        self.add_many(
            count,
            n * mean,
            stddev * stddev * degrees_of_freedom + n * mean * mean,
        )
    }

    /// Merge another set of statistics into this one.
    ///
    /// # Errors
    ///
    /// See [`SumStats::add_many`].
    pub fn absorb(&mut self, other: &Self) -> Result<(), StatsError> {
        self.add_many(
            other.count,
            other.sum.total(),
            other.sum_of_squares.total(),
        )
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub const fn sum(&self) -> f64 {
        self.sum.total()
    }

    #[must_use]
    pub const fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares.total()
    }

    /// Mean of the data added so far.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Empty`] when nothing has been added.
    pub fn mean(&self) -> Result<f64, StatsError> {
        if self.count == 0 {
            return Err(StatsError::Empty);
        }
        Ok(self.sum.total() / count_to_f64(self.count))
    }

    /// Sample variance of the data added so far.
    ///
    /// Rounding can push the squared error slightly below zero for identical
    /// inputs; it is clamped to zero. A `NaN` squared error stays `NaN`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::TooFewSamples`] when fewer than two values were
    /// added.
    pub fn variance(&self) -> Result<f64, StatsError> {
        if self.count < 2 {
            return Err(StatsError::TooFewSamples { count: self.count });
        }
        let n = count_to_f64(self.count);
        let sum = self.sum.total();
        let squared_error = self.sum_of_squares.total() - sum * sum / n;
        let squared_error = if squared_error < 0.0 {
            0.0
        } else {
            squared_error
        };
        Ok(squared_error / (n - 1.0))
    }

    /// Sample standard deviation of the data added so far.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::TooFewSamples`] when fewer than two values were
    /// added.
    pub fn sample_stddev(&self) -> Result<f64, StatsError> {
        self.variance().map(f64::sqrt)
    }
}
