//! Assignment of usage records to fixed-width hectare ranges.

use tracing::debug;
use wear_core::models::{UsageLedger, UsageRangeBucket, UsageRecord, DEFAULT_BUCKET_WIDTH};

/// A usage record together with the range its reading falls in.
#[derive(Debug, Clone, Copy)]
pub struct BucketedRecord<'a> {
    pub bucket: UsageRangeBucket,
    pub record: &'a UsageRecord,
}

/// Result of bucketing a ledger.
#[derive(Debug, Clone, Default)]
pub struct Bucketing<'a> {
    /// Number of buckets from 0 up to the one holding the highest reading.
    pub bucket_count: u64,
    /// Records that fell in a bucket, in ledger order.
    pub records: Vec<BucketedRecord<'a>>,
    /// Records left out: missing, `NaN`, negative or out-of-range readings.
    pub unbucketed: usize,
}

/// Splits `[0, max usage]` into half-open ranges of a fixed width.
#[derive(Debug, Clone, Copy)]
pub struct RangeBucketizer {
    width: u64,
}

impl Default for RangeBucketizer {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_WIDTH)
    }
}

impl RangeBucketizer {
    /// A zero width is raised to 1.
    pub fn new(width: u64) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    /// Exclusive upper bound of the bucket range covering `max_usage`.
    ///
    /// `None` when there is nothing to cover (negative or non-finite max).
    pub fn upper_bound(&self, max_usage: f64) -> Option<f64> {
        if !max_usage.is_finite() || max_usage < 0.0 {
            return None;
        }
        let width = self.width as f64;
        Some(((max_usage / width).floor() + 1.0) * width)
    }

    /// Number of buckets needed to cover `[0, max_usage]`. Saturates at
    /// `u64::MAX`.
    pub fn bucket_count(&self, max_usage: f64) -> u64 {
        self.upper_bound(max_usage)
            .map_or(0, |upper| (upper / self.width as f64) as u64)
    }

    /// The bucket holding `usage`, given the exclusive `upper_bound` of the
    /// covered range. Left-inclusive, right-exclusive.
    ///
    /// `None` also when the bucket start does not fit in a `u64`.
    pub fn bucket_for(&self, usage: f64, upper_bound: f64) -> Option<UsageRangeBucket> {
        if !usage.is_finite() || usage < 0.0 || usage >= upper_bound {
            return None;
        }
        let index = (usage / self.width as f64).floor();
        if index >= u64::MAX as f64 {
            return None;
        }
        let start = (index as u64).checked_mul(self.width)?;
        Some(UsageRangeBucket::new(start, self.width))
    }

    /// Bucket every record of `ledger`. Records that cannot be placed are
    /// counted in [`Bucketing::unbucketed`] and otherwise dropped.
    pub fn assign<'a>(&self, ledger: &'a UsageLedger) -> Bucketing<'a> {
        let max_usage = ledger.max_usage();
        let Some(upper) = max_usage.and_then(|m| self.upper_bound(m)) else {
            debug!("No usable hectare readings; all {} records unbucketed", ledger.len());
            return Bucketing {
                bucket_count: 0,
                records: Vec::new(),
                unbucketed: ledger.len(),
            };
        };

        let mut records: Vec<BucketedRecord<'a>> = Vec::with_capacity(ledger.len());
        let mut unbucketed = 0usize;

        for record in &ledger.records {
            match record
                .valid_usage()
                .and_then(|usage| self.bucket_for(usage, upper))
            {
                Some(bucket) => records.push(BucketedRecord { bucket, record }),
                None => unbucketed += 1,
            }
        }

        let bucket_count = max_usage.map_or(0, |m| self.bucket_count(m));

        debug!(
            "Bucketed {} records into {} ranges of {}; {} unbucketed",
            records.len(),
            bucket_count,
            self.width,
            unbucketed
        );

        Bucketing {
            bucket_count,
            records,
            unbucketed,
        }
    }
}
