//! Continuous signal patterns.
//!
//! A signal queries to one continuous hap per cycle-slice, carrying the
//! sampled value under the `value` key, and stores its sampling closure
//! in the pattern metadata. Operations like `range` compose into that
//! closure rather than rewriting emitted haps, which keeps sub-cycle
//! sampling through `sample_at` continuous.

use crate::error::{PatternError, Result};
use crate::pattern::TimeFn;
use crate::{rng, Fraction, Hap, Pattern, TimeSpan, Value};
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::Arc;

const RAND_SALT: u64 = 0x7261_6e64;

fn signal_value(x: f64) -> Value {
    let mut controls = BTreeMap::new();
    controls.insert("value".to_string(), Value::Number(x));
    Value::Map(controls)
}

fn from_time_fn(time_fn: TimeFn) -> Pattern {
    let sample = time_fn.clone();
    Pattern::new(move |state| {
        state
            .span
            .span_cycles()
            .map(|part| Hap::continuous(part, signal_value(sample(part.begin.to_float()))))
            .collect()
    })
    .set_time_fn(Some(time_fn))
}

/// Build a continuous pattern from a time function
pub fn signal<F>(func: F) -> Pattern
where
    F: Fn(f64) -> f64 + Send + Sync + 'static,
{
    from_time_fn(Arc::new(func))
}

/// Unipolar sine, one period per cycle
pub fn sine() -> Pattern {
    signal(|t| (t * TAU).sin() * 0.5 + 0.5)
}

/// Unipolar cosine, one period per cycle
pub fn cosine() -> Pattern {
    signal(|t| (t * TAU).cos() * 0.5 + 0.5)
}

/// Rising ramp from 0 to 1 each cycle
pub fn saw() -> Pattern {
    signal(|t| t.rem_euclid(1.0))
}

/// Falling ramp from 1 to 0 each cycle
pub fn isaw() -> Pattern {
    signal(|t| 1.0 - t.rem_euclid(1.0))
}

/// Triangle wave in [0, 1], one period per cycle
pub fn tri() -> Pattern {
    signal(|t| {
        let phase = t.rem_euclid(1.0);
        if phase < 0.5 {
            phase * 2.0
        } else {
            2.0 - phase * 2.0
        }
    })
}

/// Square wave, low then high
pub fn square() -> Pattern {
    signal(|t| if t.rem_euclid(1.0) < 0.5 { 0.0 } else { 1.0 })
}

/// A random value in [0, 1) held for each cycle, seeded from the cycle
pub fn rand() -> Pattern {
    signal(|t| rng::cycle_rng(t.floor() as i64, RAND_SALT).gen())
}

/// A random integer in [0, n) per cycle
pub fn irand(n: usize) -> Pattern {
    let n = n as f64;
    signal(move |t| (rng::cycle_rng(t.floor() as i64, RAND_SALT).gen::<f64>() * n).floor())
}

/// Smooth pseudo-noise in [0, 1], summed from five sine octaves
pub fn perlin() -> Pattern {
    signal(|t| {
        let noise: f64 = (0..5)
            .map(|octave| {
                let freq = 2f64.powi(octave);
                let amp = 0.5f64.powi(octave);
                (t * freq * TAU).sin() * amp
            })
            .sum::<f64>()
            * 0.5
            + 0.5;
        noise.clamp(0.0, 1.0)
    })
}

fn map_numeric(value: &Value, func: &dyn Fn(f64) -> f64) -> Value {
    match value {
        Value::Number(n) => Value::Number(func(*n)),
        Value::Map(m) if m.contains_key("value") => {
            let mut m = m.clone();
            if let Some(x) = m.get("value").and_then(|v| v.numeric()) {
                m.insert("value".to_string(), Value::Number(func(x)));
            }
            Value::Map(m)
        }
        other => other.clone(),
    }
}

impl Pattern {
    /// Map the numeric values of a signal while composing the function
    /// into the stored sampling closure
    pub fn with_signal_fn<F>(&self, func: F) -> Pattern
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        let mapped = {
            let func = func.clone();
            self.with_value(move |v| map_numeric(v, func.as_ref()))
        };
        let composed = self.time_fn().map(|tf| {
            let func = func.clone();
            Arc::new(move |t: f64| func(tf(t))) as TimeFn
        });
        mapped.set_time_fn(composed)
    }

    /// Rescale a unipolar signal linearly into [lo, hi]
    pub fn range(&self, lo: f64, hi: f64) -> Pattern {
        self.with_signal_fn(move |x| lo + x * (hi - lo))
    }

    /// Rescale a unipolar signal exponentially between `lo` and `hi`;
    /// both bounds must be positive
    pub fn rangex(&self, lo: f64, hi: f64) -> Result<Pattern> {
        if lo <= 0.0 || hi <= 0.0 {
            return Err(PatternError::InvalidRange(
                Fraction::from_float(lo),
                Fraction::from_float(hi),
            ));
        }
        Ok(self.with_signal_fn(move |x| lo * (hi / lo).powf(x)))
    }

    /// Sample the pattern into `n` discrete events per cycle, each taking
    /// the value at its slot's begin
    pub fn segment(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let inner = self.clone();
        let count = n as i64;
        Ok(Pattern::new(move |state| {
            let mut out = Vec::new();
            for cycle_span in state.span.span_cycles() {
                let cycle = cycle_span.begin.sam();
                for i in 0..count {
                    let slot = TimeSpan::new(
                        cycle + Fraction::new(i, count),
                        cycle + Fraction::new(i + 1, count),
                    );
                    if let Some(part) = slot.intersection(&cycle_span) {
                        let value = Value::Number(inner.sample_at(slot.begin));
                        out.push(Hap::new(Some(slot), part, value));
                    }
                }
            }
            out
        }))
    }

    /// Numeric value of the pattern at a point in time.
    ///
    /// Signals answer through their sampling closure; discrete patterns
    /// answer with the value sounding at that moment (0.0 when silent).
    pub fn sample_at(&self, time: Fraction) -> f64 {
        if let Some(time_fn) = self.time_fn() {
            return time_fn(time.to_float());
        }
        let mut haps = self.query_span(TimeSpan::with_cycle(time.cycle_of()));
        haps.sort_by(|a, b| a.part.begin.cmp(&b.part.begin));
        haps.iter()
            .find(|h| h.whole_or_part().contains(time))
            .or_else(|| haps.first())
            .and_then(|h| h.value.numeric())
            .unwrap_or(0.0)
    }
}
