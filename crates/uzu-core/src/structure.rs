//! Structural transformations: reversal, masking, degradation, layering
//! and slicing.

use crate::combinators::{slowcat, stack};
use crate::error::{PatternError, Result};
use crate::{rng, Fraction, Hap, Pattern, TimeSpan, Value};
use rand::Rng;

/// Salt separating degrade draws from every other random site
const DEGRADE_SALT: u64 = 0x6465_6772;

impl Pattern {
    /// Reverse the pattern within each cycle
    pub fn rev(&self) -> Pattern {
        let inner = self.clone();
        Pattern::new(move |state| {
            let cycle = state.span.begin.sam();
            let mirror = move |t: Fraction| cycle + cycle + Fraction::ONE - t;
            let reflect = move |ts: &TimeSpan| TimeSpan::new(mirror(ts.end), mirror(ts.begin));
            let span = reflect(&state.span);
            inner
                .query(state.set_span(span))
                .into_iter()
                .map(|hap| hap.with_span(reflect))
                .collect()
        })
        .split_queries()
    }

    /// Alternate forward and reversed cycles
    pub fn palindrome(&self) -> Pattern {
        slowcat(vec![self.clone(), self.rev()])
    }

    /// Take rhythmic structure from another pattern, sampling values from
    /// this one. Haps of the structure pattern with falsy values are
    /// dropped.
    pub fn struct_(&self, structure: &Pattern) -> Pattern {
        let values = self.clone();
        let structure = structure.clone();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for sh in structure.query(state.clone()) {
                if !sh.value.is_truthy() {
                    continue;
                }
                for vh in values.query(state.set_span(sh.whole_or_part())) {
                    if let Some(part) = sh.part.intersection(&vh.part) {
                        out.push(Hap::with_context(
                            sh.whole,
                            part,
                            vh.value.clone(),
                            sh.combine_context(&vh),
                        ));
                    }
                }
            }
            out
        })
    }

    /// Keep only events sounding while the mask pattern has a non-silent
    /// event. Rest markers (`"~"`, `"-"`, `"rest"`, `"0"`, zero, false)
    /// count as silent.
    pub fn mask(&self, mask: &Pattern) -> Pattern {
        let inner = self.clone();
        let mask = mask.clone();
        Pattern::new(move |state| {
            let keep: Vec<TimeSpan> = mask
                .query(state.clone())
                .into_iter()
                .filter(|hap| !hap.value.is_rest())
                .map(|hap| hap.whole_or_part())
                .collect();
            inner
                .query(state)
                .into_iter()
                .filter(|hap| {
                    let onset = hap.whole_or_part().begin;
                    keep.iter().any(|span| span.contains(onset))
                })
                .collect()
        })
    }

    fn degrade_frac(&self, amount: f64, keep_below: bool) -> Pattern {
        self.filter_haps(move |hap| {
            let roll: f64 = rng::time_rng(hap.whole_or_part().begin, DEGRADE_SALT).gen();
            if keep_below {
                roll < amount
            } else {
                roll >= amount
            }
        })
    }

    /// Randomly drop events with the given probability, seeded per event
    /// position so re-queries always agree
    pub fn degrade_by(&self, amount: f64) -> Result<Pattern> {
        if !(0.0..=1.0).contains(&amount) {
            return Err(PatternError::InvalidProbability(amount));
        }
        Ok(self.degrade_frac(amount, false))
    }

    /// Keep exactly the events `degrade_by` would drop
    pub fn undegrade_by(&self, amount: f64) -> Result<Pattern> {
        if !(0.0..=1.0).contains(&amount) {
            return Err(PatternError::InvalidProbability(amount));
        }
        Ok(self.degrade_frac(amount, true))
    }

    /// Randomly drop half of the events
    pub fn degrade(&self) -> Pattern {
        self.degrade_frac(0.5, false)
    }

    /// Play the pattern against a transformed copy, panned apart
    pub fn jux_by<F>(&self, amount: f64, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        let left = self.with_control("pan", Value::Number(0.5 - amount / 2.0));
        let right = func(self).with_control("pan", Value::Number(0.5 + amount / 2.0));
        stack(vec![left, right])
    }

    /// `jux_by` at full stereo width
    pub fn jux<F>(&self, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.jux_by(1.0, func)
    }

    /// Layer a transformed copy on top of the pattern
    pub fn superimpose<F>(&self, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        stack(vec![self.clone(), func(self)])
    }

    /// Layer a transformed copy, shifted later by `offset`
    pub fn off<F>(&self, offset: impl Into<Fraction>, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        stack(vec![self.clone(), func(self).late(offset)])
    }

    /// The pattern plus `n` progressively quieter copies, the i-th
    /// delayed by `i * offset` (wrapped into the cycle) with gain
    /// multiplied by `gain^i`
    pub fn echo(&self, n: usize, offset: impl Into<Fraction>, gain: f64) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let offset = offset.into();
        let mut layers = vec![self.clone()];
        let mut level = 1.0;
        for i in 1..=n {
            level *= gain;
            let delay = offset * (i as i64);
            let wrapped = delay - delay.floor();
            let layer_gain = level;
            layers.push(
                self.late(wrapped)
                    .map_control("gain", move |g| g * layer_gain),
            );
        }
        Ok(stack(layers))
    }

    fn subdivide<F>(&self, n: usize, decorate: F) -> Pattern
    where
        F: Fn(Hap, usize) -> Hap + Send + Sync + 'static,
    {
        let count = n as i64;
        let step_div = Fraction::new(1, count);
        self.with_haps(move |haps| {
            let mut out = Vec::with_capacity(haps.len() * count as usize);
            for hap in &haps {
                let step = hap.part.duration() * step_div;
                for i in 0..count {
                    let begin = hap.part.begin + step * i;
                    let span = TimeSpan::new(begin, begin + step);
                    let piece = Hap::with_context(
                        hap.whole.map(|_| span),
                        span,
                        hap.value.clone(),
                        hap.context.clone(),
                    );
                    out.push(decorate(piece, i as usize));
                }
            }
            out
        })
    }

    /// Cut every event into `n` equal consecutive pieces
    pub fn chop(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        Ok(self.subdivide(n, |hap, _| hap))
    }

    /// Cut every event into `n` pieces, each playing the matching slice
    /// of its sample via `begin`/`end` controls
    pub fn striate(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let slices = n as f64;
        Ok(self.subdivide(n, move |hap, i| {
            let value = {
                let mut controls = hap.value.clone().into_controls();
                controls.insert("begin".to_string(), Value::Number(i as f64 / slices));
                controls.insert("end".to_string(), Value::Number((i + 1) as f64 / slices));
                Value::Map(controls)
            };
            Hap::with_context(hap.whole, hap.part, value, hap.context)
        }))
    }

    /// Delay events falling in the second half of each `1/n` slice by
    /// `amount / (2n)`
    pub fn swing_by(&self, amount: impl Into<Fraction>, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let half = Fraction::new(1, 2);
        let delay = amount.into() * half;
        self.inside(Fraction::from_int(n as i64), move |slowed| {
            slowed.within_frac(half, Fraction::ONE, &slowed.late(delay))
        })
    }

    /// Classic triplet swing over `n` slices per cycle
    pub fn swing(&self, n: usize) -> Result<Pattern> {
        self.swing_by(Fraction::new(1, 3), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{fastcat, pure};
    use proptest::prelude::*;

    fn abc() -> Pattern {
        fastcat(vec![
            pure(Value::from("a")),
            pure(Value::from("b")),
            pure(Value::from("c")),
        ])
    }

    fn values(pattern: &Pattern, cycle: i64) -> Vec<String> {
        pattern
            .query_cycle(cycle)
            .iter()
            .map(|h| h.value.to_string())
            .collect()
    }

    #[test]
    fn test_rev_flips_cycle() {
        let reversed = abc().rev();
        assert_eq!(values(&reversed, 0), vec!["c", "b", "a"]);
        let haps = reversed.query_cycle(0);
        assert_eq!(
            haps[0].whole,
            Some(TimeSpan::new(Fraction::ZERO, Fraction::new(1, 3)))
        );
    }

    #[test]
    fn test_palindrome_alternates() {
        let pattern = abc().palindrome();
        assert_eq!(values(&pattern, 0), vec!["a", "b", "c"]);
        assert_eq!(values(&pattern, 1), vec!["c", "b", "a"]);
        assert_eq!(values(&pattern, 2), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_palindrome_fast_two_folds_into_one_cycle() {
        let pattern = abc().palindrome().fast(2).unwrap();
        assert_eq!(values(&pattern, 0), vec!["a", "b", "c", "c", "b", "a"]);
    }

    #[test]
    fn test_struct_takes_timing_from_structure() {
        let structure = fastcat(vec![
            pure(Value::from(1.0)),
            pure(Value::from(0.0)),
            pure(Value::from(1.0)),
            pure(Value::from(0.0)),
        ]);
        let pattern = pure(Value::from("bd")).struct_(&structure);
        let haps = pattern.query_cycle(0);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].whole.unwrap().begin, Fraction::ZERO);
        assert_eq!(haps[1].whole.unwrap().begin, Fraction::new(1, 2));
        assert_eq!(haps[1].value, Value::from("bd"));
    }

    #[test]
    fn test_mask_silences_rest_positions() {
        let quarters = fastcat(vec![
            pure(Value::from("a")),
            pure(Value::from("b")),
            pure(Value::from("c")),
            pure(Value::from("d")),
        ]);
        let mask = fastcat(vec![
            pure(Value::from("x")),
            pure(Value::from("~")),
            pure(Value::from("x")),
            pure(Value::from("0")),
        ]);
        let masked = quarters.mask(&mask);
        assert_eq!(values(&masked, 0), vec!["a", "c"]);
    }

    #[test]
    fn test_degrade_deterministic_per_cycle() {
        let pattern = abc().fast(4).unwrap().degrade();
        for cycle in 0..8 {
            let first = values(&pattern, cycle);
            let second = values(&pattern, cycle);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_degrade_and_undegrade_partition() {
        let base = abc().fast(4).unwrap();
        let kept = base.degrade_by(0.3).unwrap();
        let dropped = base.undegrade_by(0.3).unwrap();
        for cycle in 0..8 {
            let total = base.query_cycle(cycle).len();
            assert_eq!(
                kept.query_cycle(cycle).len() + dropped.query_cycle(cycle).len(),
                total
            );
        }
    }

    #[test]
    fn test_degrade_by_validates_probability() {
        assert!(abc().degrade_by(1.5).is_err());
        assert!(abc().degrade_by(-0.1).is_err());
        assert!(abc().degrade_by(0.0).is_ok());
    }

    #[test]
    fn test_jux_pans_copies_apart() {
        let pattern = pure(Value::from("bd")).jux(|p| p.rev());
        let haps = pattern.query_cycle(0);
        assert_eq!(haps.len(), 2);
        let pans: Vec<f64> = haps
            .iter()
            .map(|h| {
                h.value.as_map().unwrap()["pan"]
                    .as_number()
                    .unwrap()
            })
            .collect();
        assert!(pans.contains(&0.0));
        assert!(pans.contains(&1.0));
    }

    #[test]
    fn test_superimpose_layers() {
        let pattern = pure(Value::from("bd")).superimpose(|p| p.fast(2).unwrap());
        assert_eq!(pattern.query_cycle(0).len(), 3);
    }

    #[test]
    fn test_off_shifts_copy() {
        let pattern = pure(Value::from("bd")).off(Fraction::new(1, 4), |p| p.clone());
        let mut onsets: Vec<Fraction> = pattern
            .query_cycle(0)
            .iter()
            .filter(|h| h.has_onset())
            .map(|h| h.onset().unwrap())
            .collect();
        onsets.sort();
        assert_eq!(onsets, vec![Fraction::ZERO, Fraction::new(1, 4)]);
    }

    #[test]
    fn test_echo_decays_gain() {
        let pattern = pure(Value::from("bd"))
            .echo(2, Fraction::new(1, 4), 0.5)
            .unwrap();
        let haps = pattern.query_cycle(0);
        let mut gains: Vec<f64> = haps
            .iter()
            .map(|h| {
                h.value
                    .as_map()
                    .and_then(|m| m.get("gain"))
                    .and_then(|v| v.as_number())
                    .unwrap_or(1.0)
            })
            .collect();
        gains.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(gains, vec![0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_chop_subdivides_events() {
        let pattern = fastcat(vec![pure(Value::from("bd")), pure(Value::from("sd"))])
            .chop(2)
            .unwrap();
        let haps = pattern.query_cycle(0);
        assert_eq!(haps.len(), 4);
        assert_eq!(
            haps[1].whole,
            Some(TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2)))
        );
        assert_eq!(haps[1].value, Value::from("bd"));
    }

    #[test]
    fn test_striate_writes_sample_windows() {
        let pattern = pure(Value::from("bd")).striate(2).unwrap();
        let haps = pattern.query_cycle(0);
        assert_eq!(haps.len(), 2);
        let first = haps[0].value.as_map().unwrap();
        assert_eq!(first.get("begin"), Some(&Value::Number(0.0)));
        assert_eq!(first.get("end"), Some(&Value::Number(0.5)));
        let second = haps[1].value.as_map().unwrap();
        assert_eq!(second.get("begin"), Some(&Value::Number(0.5)));
    }

    #[test]
    fn test_swing_delays_offbeats() {
        let pattern = pure(Value::from("x")).fast(4).unwrap().swing(2).unwrap();
        let onsets: Vec<Fraction> = pattern
            .query_cycle(0)
            .iter()
            .map(|h| h.whole_or_part().begin)
            .collect();
        // slices are halves; the events at 1/4 and 3/4 fall in the second
        // half of their slice and move later by 1/3 * 1/4
        assert!(onsets.contains(&Fraction::ZERO));
        assert!(onsets.contains(&(Fraction::new(1, 4) + Fraction::new(1, 12))));
        assert!(onsets.contains(&Fraction::new(1, 2)));
        assert!(onsets.contains(&(Fraction::new(3, 4) + Fraction::new(1, 12))));
    }

    proptest! {
        // rev is an involution within each cycle
        #[test]
        fn prop_rev_involution(cycle in -4i64..8) {
            let base = abc();
            let twice = base.rev().rev();
            let expect = base.query_cycle(cycle);
            let got = twice.query_cycle(cycle);
            prop_assert_eq!(expect.len(), got.len());
            for (a, b) in expect.iter().zip(got.iter()) {
                prop_assert!(a.eq_shape(b));
            }
        }

        // degrade keeps a subset of the original events
        #[test]
        fn prop_degrade_is_subset(cycle in 0i64..16) {
            let base = abc().fast(4).unwrap();
            let degraded = base.degrade();
            let all = base.query_cycle(cycle);
            for hap in degraded.query_cycle(cycle) {
                prop_assert!(all.iter().any(|h| h.eq_shape(&hap)));
            }
        }
    }
}
