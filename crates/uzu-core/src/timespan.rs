use crate::Fraction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open span of time `[begin, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: Fraction,
    pub end: Fraction,
}

impl TimeSpan {
    /// Create a new timespan
    pub fn new(begin: Fraction, end: Fraction) -> Self {
        TimeSpan { begin, end }
    }

    /// Create a timespan from two integers (whole numbers)
    pub fn from_ints(begin: i64, end: i64) -> Self {
        TimeSpan {
            begin: Fraction::from_int(begin),
            end: Fraction::from_int(end),
        }
    }

    /// The unit span `[cycle, cycle + 1)`
    pub fn with_cycle(cycle: i64) -> Self {
        TimeSpan::from_ints(cycle, cycle + 1)
    }

    /// Get the duration of this timespan
    pub fn duration(&self) -> Fraction {
        self.end - self.begin
    }

    /// Check if this timespan contains a point in time
    pub fn contains(&self, time: Fraction) -> bool {
        time >= self.begin && time < self.end
    }

    /// Check if two timespans overlap. Adjacent spans do not.
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Get the intersection of two timespans, if any
    pub fn intersection(&self, other: &TimeSpan) -> Option<TimeSpan> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeSpan::new(
            self.begin.max(other.begin),
            self.end.min(other.end),
        ))
    }

    /// Get the midpoint of the timespan
    pub fn midpoint(&self) -> Fraction {
        (self.begin + self.end) * Fraction::new(1, 2)
    }

    /// Check if the timespan is empty (begin >= end)
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Shift the timespan by an offset
    pub fn shift(&self, offset: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin + offset, self.end + offset)
    }

    /// Scale the timespan by a factor
    pub fn scale(&self, factor: Fraction) -> TimeSpan {
        TimeSpan::new(self.begin * factor, self.end * factor)
    }

    /// Index of the cycle this span starts in
    pub fn cycle_of(&self) -> i64 {
        self.begin.cycle_of()
    }

    /// Split the span at every cycle boundary it crosses.
    ///
    /// Yields adjacent non-empty sub-spans covering exactly `[begin, end)`;
    /// nothing at all when the span is empty or inverted.
    pub fn span_cycles(&self) -> impl Iterator<Item = TimeSpan> {
        let mut begin = self.begin;
        let end = self.end;
        std::iter::from_fn(move || {
            if begin >= end {
                return None;
            }
            let next = begin.next_sam().min(end);
            let span = TimeSpan::new(begin, next);
            begin = next;
            Some(span)
        })
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.begin, self.end)
    }
}
