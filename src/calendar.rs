//! Date dimension: the contiguous calendar every sparse series is densified onto

use chrono::NaiveDate;

/// Ordered, gap-free run of calendar dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    dates: Vec<NaiveDate>,
}

impl Calendar {
    /// Every date in `[start, end]`; empty when `end < start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let dates = start.iter_days().take_while(|d| *d <= end).collect();
        Self { dates }
    }

    /// Calendar starting at the earlier of `epoch` and the first operation, ending at `today`
    pub fn spanning(epoch: NaiveDate, earliest_operation: Option<NaiveDate>, today: NaiveDate) -> Self {
        let start = earliest_operation.map_or(epoch, |d| d.min(epoch));
        Self::new(start, today)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Dates in the half-open window `[from, until)`
    pub fn window(&self, from: NaiveDate, until: NaiveDate) -> &[NaiveDate] {
        let lo = self.dates.partition_point(|d| *d < from);
        let hi = self.dates.partition_point(|d| *d < until);
        if lo >= hi {
            &[]
        } else {
            &self.dates[lo..hi]
        }
    }
}
