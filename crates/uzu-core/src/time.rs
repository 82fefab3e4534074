//! Time transformations: dilation, rotation, squeezing and windowing.
//!
//! Everything here stays in exact rational time; factors arriving as
//! floats are converted once at the boundary.

use crate::error::{PatternError, Result};
use crate::{Fraction, Hap, Pattern, TimeSpan};

impl Pattern {
    /// Speed the pattern up by a positive factor
    pub fn fast(&self, factor: impl Into<Fraction>) -> Result<Pattern> {
        let factor = factor.into();
        if factor <= Fraction::ZERO {
            return Err(PatternError::InvalidFactor(factor));
        }
        Ok(self.fast_frac(factor))
    }

    /// Slow the pattern down by a positive factor
    pub fn slow(&self, factor: impl Into<Fraction>) -> Result<Pattern> {
        let factor = factor.into();
        if factor <= Fraction::ZERO {
            return Err(PatternError::InvalidFactor(factor));
        }
        Ok(self.slow_frac(factor))
    }

    pub(crate) fn fast_frac(&self, factor: Fraction) -> Pattern {
        self.with_query_time(move |t| t * factor)
            .with_hap_time(move |t| t / factor)
    }

    pub(crate) fn slow_frac(&self, factor: Fraction) -> Pattern {
        self.fast_frac(factor.reciprocal())
    }

    /// Speed factor taken from another pattern: each factor hap squeezes
    /// a correspondingly sped-up copy into its own extent.
    ///
    /// Factors outside `(0, 65536]` silence their slot; a query may not
    /// materialize an unbounded number of events.
    pub fn fast_pat(&self, factor: &Pattern) -> Pattern {
        let inner = self.clone();
        factor.squeeze_bind(move |value| match value.numeric() {
            Some(f) if f > 0.0 && f <= 65536.0 => inner.fast_frac(Fraction::from_float(f)),
            _ => crate::combinators::silence(),
        })
    }

    /// Slowdown factor taken from another pattern, bounded like
    /// `fast_pat`
    pub fn slow_pat(&self, factor: &Pattern) -> Pattern {
        let inner = self.clone();
        factor.squeeze_bind(move |value| match value.numeric() {
            Some(f) if f > 0.0 && f.recip() <= 65536.0 => {
                inner.slow_frac(Fraction::from_float(f))
            }
            _ => crate::combinators::silence(),
        })
    }

    /// Speed the pattern up and raise sample playback speed by the same
    /// factor, so pitched material transposes with the tempo
    pub fn hurry(&self, factor: impl Into<Fraction>) -> Result<Pattern> {
        let factor = factor.into();
        if factor <= Fraction::ZERO {
            return Err(PatternError::InvalidFactor(factor));
        }
        let rate = factor.to_float();
        Ok(self
            .fast_frac(factor)
            .map_control("speed", move |speed| speed * rate))
    }

    /// Shift the pattern earlier in time, pulling events in from the
    /// following cycles
    pub fn early(&self, amount: impl Into<Fraction>) -> Pattern {
        let amount = amount.into();
        self.with_query_time(move |t| t + amount)
            .with_hap_time(move |t| t - amount)
            .split_queries()
    }

    /// Shift the pattern later in time
    pub fn late(&self, amount: impl Into<Fraction>) -> Pattern {
        let amount = amount.into();
        self.early(-amount)
    }

    /// Replace every hap by `n` evenly spaced copies within its part
    pub fn ply(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let count = n as i64;
        let step_div = Fraction::new(1, count);
        Ok(self.with_haps(move |haps| {
            let mut out = Vec::with_capacity(haps.len() * count as usize);
            for hap in &haps {
                let step = hap.part.duration() * step_div;
                for i in 0..count {
                    let begin = hap.part.begin + step * i;
                    let span = TimeSpan::new(begin, begin + step);
                    out.push(Hap::with_context(
                        hap.whole.map(|_| span),
                        span,
                        hap.value.clone(),
                        hap.context.clone(),
                    ));
                }
            }
            out
        }))
    }

    /// Play the pattern `factor` times faster, leaving silence for the
    /// rest of each cycle
    fn fast_gap(&self, factor: Fraction) -> Pattern {
        let inner = self.clone();
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let begin = cycle + ((state.span.begin - cycle) * factor).min(Fraction::ONE);
            let end = cycle + ((state.span.end - cycle) * factor).min(Fraction::ONE);
            if begin >= end {
                return Vec::new();
            }
            inner
                .query(state.set_span(TimeSpan::new(begin, end)))
                .into_iter()
                .map(|hap| {
                    hap.with_span(|ts| {
                        TimeSpan::new(
                            cycle + (ts.begin - cycle) / factor,
                            cycle + (ts.end - cycle) / factor,
                        )
                    })
                })
                .collect()
        })
        .split_queries()
    }

    pub(crate) fn compress_frac(&self, begin: Fraction, end: Fraction) -> Pattern {
        self.fast_gap((end - begin).reciprocal()).late(begin)
    }

    /// Squeeze one cycle of the pattern into `[begin, end)` of every
    /// cycle, with silence around it
    pub fn compress(&self, begin: impl Into<Fraction>, end: impl Into<Fraction>) -> Result<Pattern> {
        let begin = begin.into();
        let end = end.into();
        if begin < Fraction::ZERO || end > Fraction::ONE || begin >= end {
            return Err(PatternError::InvalidRange(begin, end));
        }
        Ok(self.compress_frac(begin, end))
    }

    /// Play only the `[begin, end)` window of every cycle, stretched to
    /// fill the whole cycle. Inverse of `compress` on their overlap.
    pub fn zoom(&self, begin: impl Into<Fraction>, end: impl Into<Fraction>) -> Result<Pattern> {
        let begin = begin.into();
        let end = end.into();
        if begin < Fraction::ZERO || end > Fraction::ONE || begin >= end {
            return Err(PatternError::InvalidRange(begin, end));
        }
        let width = end - begin;
        let inner = self.clone();
        Ok(Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let to_inner = move |t: Fraction| cycle + (t - cycle) * width + begin;
            let from_inner = move |t: Fraction| cycle + (t - cycle - begin) / width;
            let span = TimeSpan::new(to_inner(state.span.begin), to_inner(state.span.end));
            inner
                .query(state.set_span(span))
                .into_iter()
                .map(|hap| {
                    hap.with_span(|ts| TimeSpan::new(from_inner(ts.begin), from_inner(ts.end)))
                })
                .collect()
        })
        .split_queries())
    }

    /// Repeat the first `fraction` of every cycle for the rest of it
    pub fn linger(&self, fraction: impl Into<Fraction>) -> Result<Pattern> {
        let fraction = fraction.into();
        if fraction <= Fraction::ZERO || fraction > Fraction::ONE {
            return Err(PatternError::InvalidRange(fraction, Fraction::ONE));
        }
        let reps = fraction.reciprocal().round();
        let inner = self.clone();
        Ok(Pattern::new(move |state| {
            let cycle_span = state.span;
            let cycle = cycle_span.begin.sam();
            let window = TimeSpan::new(cycle, cycle + fraction);
            let base = inner.query(state.set_span(window));
            let mut out = Vec::new();
            for rep in 0..reps {
                let offset = fraction * rep;
                for hap in &base {
                    if let Some(clipped) = hap.shift(offset).clip_to(cycle_span) {
                        out.push(clipped);
                    }
                }
            }
            out
        })
        .split_queries())
    }

    /// Apply a function at a finer timescale: `k` cycles are squeezed
    /// into one, transformed, and expanded back
    pub fn inside<F>(&self, k: impl Into<Fraction>, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        let k = k.into();
        if k <= Fraction::ZERO {
            return Err(PatternError::InvalidFactor(k));
        }
        Ok(func(&self.slow_frac(k)).fast_frac(k))
    }

    /// Apply a function at a coarser timescale
    pub fn outside<F>(&self, k: impl Into<Fraction>, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        let k = k.into();
        if k <= Fraction::ZERO {
            return Err(PatternError::InvalidFactor(k));
        }
        Ok(func(&self.fast_frac(k)).slow_frac(k))
    }

    /// Apply a function only to the part of every cycle lying within
    /// `[begin, end)`, judged by event onset
    pub fn within<F>(
        &self,
        begin: impl Into<Fraction>,
        end: impl Into<Fraction>,
        func: F,
    ) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        let begin = begin.into();
        let end = end.into();
        if begin < Fraction::ZERO || end > Fraction::ONE || begin >= end {
            return Err(PatternError::InvalidRange(begin, end));
        }
        Ok(self.within_frac(begin, end, &func(self)))
    }

    pub(crate) fn within_frac(
        &self,
        begin: Fraction,
        end: Fraction,
        transformed: &Pattern,
    ) -> Pattern {
        let in_window = move |hap: &Hap| {
            let pos = hap.whole_or_part().begin.cycle_pos();
            pos >= begin && pos < end
        };
        crate::combinators::stack(vec![
            transformed.filter_haps(in_window),
            self.filter_haps(move |hap| !in_window(hap)),
        ])
    }
}
