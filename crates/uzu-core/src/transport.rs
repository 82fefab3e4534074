//! Finite materialization for external schedulers.
//!
//! Patterns are lazy and infinite; a scheduler wants a bounded,
//! cycle-indexed bundle of events with float times. This module produces
//! that bundle, optionally compressed to the pattern's detected period.

use crate::{Context, Pattern, TimeSpan, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Longest period the detector will look for
pub const DETECT_PERIOD_MAX: usize = 64;

/// Fewest cycles a transport bundle will carry
pub const TRANSPORT_MIN_CYCLES: usize = 16;

/// A timespan as cycle-relative floats, for the scheduler boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSpan {
    pub begin: f64,
    pub end: f64,
}

impl From<TimeSpan> for SchedulerSpan {
    fn from(span: TimeSpan) -> Self {
        SchedulerSpan {
            begin: span.begin.to_float(),
            end: span.end.to_float(),
        }
    }
}

/// One event as handed to a scheduler: float spans, a control map and
/// the source context. `whole` is None for sampled (continuous) values,
/// which schedulers must treat as modulation rather than onsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerHap {
    pub whole: Option<SchedulerSpan>,
    pub part: SchedulerSpan,
    pub value: BTreeMap<String, Value>,
    pub context: Context,
}

/// A bounded, cycle-indexed materialization of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportBundle {
    pub cycles: BTreeMap<i64, Vec<SchedulerHap>>,
    pub num_cycles: usize,
}

impl Pattern {
    /// Materialize one cycle for a scheduler: cycle-relative float times
    /// in [0, 1), values coerced to control maps
    pub fn query_for_scheduler(&self, cycle: i64) -> Vec<SchedulerHap> {
        self.query_cycle(cycle)
            .into_iter()
            .map(|hap| SchedulerHap {
                whole: hap.whole.map(Into::into),
                part: hap.part.into(),
                value: hap.value.into_controls(),
                context: hap.context,
            })
            .collect()
    }
}

/// Materialize the first `num_cycles` cycles of a pattern
pub fn expand_for_transport(pattern: &Pattern, num_cycles: usize) -> TransportBundle {
    let cycles = (0..num_cycles as i64)
        .map(|cycle| (cycle, pattern.query_for_scheduler(cycle)))
        .collect();
    TransportBundle { cycles, num_cycles }
}

/// The values of one cycle in onset order, with timing stripped, so that
/// patterns whose timing wobbles per cycle still compare as periodic
fn value_projection(pattern: &Pattern, cycle: i64) -> Vec<Value> {
    pattern
        .query_cycle(cycle)
        .into_iter()
        .map(|hap| hap.value)
        .collect()
}

/// Find the smallest cycle count after which the pattern repeats,
/// comparing value-only projections over a `max`-cycle window
pub fn detect_period(pattern: &Pattern, max: usize) -> Option<usize> {
    if max == 0 {
        return None;
    }
    let projections: Vec<Vec<Value>> = (0..=max as i64)
        .map(|cycle| value_projection(pattern, cycle))
        .collect();
    for period in 1..=max {
        let repeats = (0..=max - period).all(|c| projections[c + period] == projections[c]);
        if repeats {
            return Some(period);
        }
    }
    debug!(max, "no repeating period within the detection window");
    None
}

/// Materialize enough cycles to cover the pattern's period (at least
/// `TRANSPORT_MIN_CYCLES`, at most `DETECT_PERIOD_MAX`)
pub fn expand_for_transport_auto(pattern: &Pattern) -> TransportBundle {
    let period = detect_period(pattern, DETECT_PERIOD_MAX).unwrap_or(DETECT_PERIOD_MAX);
    expand_for_transport(pattern, period.max(TRANSPORT_MIN_CYCLES))
}
