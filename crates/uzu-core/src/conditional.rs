//! Cycle-conditional transformations: apply a function on some cycles,
//! rotate per cycle, or rewrite one sub-cycle window at a time.

use crate::error::{PatternError, Result};
use crate::{rng, Fraction, Pattern};
use rand::Rng;

/// Salt separating the sometimes-family coin flips from other random sites
const SOMETIMES_SALT: u64 = 0x736f_6d65;

impl Pattern {
    /// Apply a function on cycles where `cycle mod n == offset`
    pub fn every_offset<F>(&self, n: usize, offset: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let transformed = func(self);
        let base = self.clone();
        let n = n as i64;
        let offset = (offset as i64).rem_euclid(n);
        Ok(Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            if cycle.rem_euclid(n) == offset {
                transformed.query(state)
            } else {
                base.query(state)
            }
        })
        .split_queries())
    }

    /// Apply a function every `n` cycles, starting at cycle 0
    pub fn every<F>(&self, n: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.every_offset(n, 0, func)
    }

    /// Alias of `every`: the function applies on the first cycle of each
    /// group of `n`
    pub fn first_of<F>(&self, n: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.every_offset(n, 0, func)
    }

    /// Apply a function on the last cycle of each group of `n`
    pub fn last_of<F>(&self, n: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        self.every_offset(n, n - 1, func)
    }

    /// Apply a function on cycles selected by an arbitrary predicate
    pub fn when_fn<C, F>(&self, cond: C, func: F) -> Pattern
    where
        C: Fn(i64) -> bool + Send + Sync + 'static,
        F: FnOnce(&Pattern) -> Pattern,
    {
        let transformed = func(self);
        let base = self.clone();
        Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            if cond(cycle) {
                transformed.query(state)
            } else {
                base.query(state)
            }
        })
        .split_queries()
    }

    fn sometimes_frac(&self, prob: f64, transformed: Pattern) -> Pattern {
        let base = self.clone();
        Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            let roll: f64 = rng::cycle_rng(cycle, SOMETIMES_SALT).gen();
            if roll < prob {
                transformed.query(state)
            } else {
                base.query(state)
            }
        })
        .split_queries()
    }

    /// Apply a function with the given probability per cycle, seeded from
    /// the cycle index
    pub fn sometimes_by<F>(&self, prob: f64, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        if !(0.0..=1.0).contains(&prob) {
            return Err(PatternError::InvalidProbability(prob));
        }
        Ok(self.sometimes_frac(prob, func(self)))
    }

    /// Apply a function on roughly half of the cycles
    pub fn sometimes<F>(&self, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.sometimes_frac(0.5, func(self))
    }

    /// Apply a function on roughly three quarters of the cycles
    pub fn often<F>(&self, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.sometimes_frac(0.75, func(self))
    }

    /// Apply a function on roughly a quarter of the cycles
    pub fn rarely<F>(&self, func: F) -> Pattern
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.sometimes_frac(0.25, func(self))
    }

    /// Rotate the pattern earlier by `(cycle mod n) / n` each cycle, so
    /// every `n` cycles each event has started the cycle once
    pub fn iter(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let rotations: Vec<Pattern> = (0..n)
            .map(|r| self.early(Fraction::new(r as i64, n as i64)))
            .collect();
        let n = n as i64;
        Ok(Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            rotations[cycle.rem_euclid(n) as usize].query(state)
        })
        .split_queries())
    }

    /// `iter` in the opposite direction
    pub fn iter_back(&self, n: usize) -> Result<Pattern> {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let rotations: Vec<Pattern> = (0..n)
            .map(|r| self.early(Fraction::new(n as i64 - r as i64, n as i64)))
            .collect();
        let n = n as i64;
        Ok(Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            rotations[cycle.rem_euclid(n) as usize].query(state)
        })
        .split_queries())
    }

    /// Apply a function to one `1/n` window per cycle, advancing the
    /// window each cycle
    pub fn chunk<F>(&self, n: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.chunk_with(n, func, false)
    }

    /// `chunk` with the window walking backwards
    pub fn chunk_back<F>(&self, n: usize, func: F) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        self.chunk_with(n, func, true)
    }

    fn chunk_with<F>(&self, n: usize, func: F, back: bool) -> Result<Pattern>
    where
        F: FnOnce(&Pattern) -> Pattern,
    {
        if n == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        let transformed = func(self);
        let count = n as i64;
        let windows: Vec<Pattern> = (0..count)
            .map(|k| {
                self.within_frac(
                    Fraction::new(k, count),
                    Fraction::new(k + 1, count),
                    &transformed,
                )
            })
            .collect();
        Ok(Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            let step = cycle.rem_euclid(count);
            let index = if back { count - 1 - step } else { step };
            windows[index as usize].query(state)
        })
        .split_queries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{fastcat, pure};
    use crate::Value;

    fn bd_sd() -> Pattern {
        fastcat(vec![pure(Value::from("bd")), pure(Value::from("sd"))])
    }

    fn quarters() -> Pattern {
        fastcat(vec![
            pure(Value::from("a")),
            pure(Value::from("b")),
            pure(Value::from("c")),
            pure(Value::from("d")),
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
    fn test_every_other_cycle_reversed() {
        let pattern = bd_sd().every(2, |p| p.rev()).unwrap();
        assert_eq!(values(&pattern, 0), vec!["sd", "bd"]);
        assert_eq!(values(&pattern, 1), vec!["bd", "sd"]);
        assert_eq!(values(&pattern, 2), vec!["sd", "bd"]);
    }

    #[test]
    fn test_every_offset() {
        let pattern = bd_sd().every_offset(3, 1, |p| p.rev()).unwrap();
        assert_eq!(values(&pattern, 0), vec!["bd", "sd"]);
        assert_eq!(values(&pattern, 1), vec!["sd", "bd"]);
        assert_eq!(values(&pattern, 4), vec!["sd", "bd"]);
    }

    #[test]
    fn test_last_of() {
        let pattern = bd_sd().last_of(4, |p| p.rev()).unwrap();
        assert_eq!(values(&pattern, 2), vec!["bd", "sd"]);
        assert_eq!(values(&pattern, 3), vec!["sd", "bd"]);
        assert_eq!(values(&pattern, 7), vec!["sd", "bd"]);
    }

    #[test]
    fn test_when_fn() {
        let pattern = bd_sd().when_fn(|c| c % 2 == 0, |p| p.rev());
        assert_eq!(values(&pattern, 0), vec!["sd", "bd"]);
        assert_eq!(values(&pattern, 1), vec!["bd", "sd"]);
    }

    #[test]
    fn test_every_validates_count() {
        assert!(bd_sd().every(0, |p| p.clone()).is_err());
        assert!(bd_sd().last_of(0, |p| p.clone()).is_err());
    }

    #[test]
    fn test_sometimes_by_extremes() {
        let never = bd_sd().sometimes_by(0.0, |p| p.rev()).unwrap();
        let always = bd_sd().sometimes_by(1.0, |p| p.rev()).unwrap();
        for cycle in 0..16 {
            assert_eq!(values(&never, cycle), vec!["bd", "sd"]);
            assert_eq!(values(&always, cycle), vec!["sd", "bd"]);
        }
        assert!(bd_sd().sometimes_by(1.5, |p| p.clone()).is_err());
    }

    #[test]
    fn test_sometimes_deterministic() {
        let pattern = bd_sd().sometimes(|p| p.rev());
        for cycle in 0..16 {
            assert_eq!(values(&pattern, cycle), values(&pattern, cycle));
        }
    }

    #[test]
    fn test_iter_rotates_forward() {
        let pattern = quarters().iter(4).unwrap();
        assert_eq!(values(&pattern, 0), vec!["a", "b", "c", "d"]);
        assert_eq!(values(&pattern, 1), vec!["b", "c", "d", "a"]);
        assert_eq!(values(&pattern, 2), vec!["c", "d", "a", "b"]);
        assert_eq!(values(&pattern, 4), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_iter_back_rotates_backward() {
        let pattern = quarters().iter_back(4).unwrap();
        assert_eq!(values(&pattern, 0), vec!["a", "b", "c", "d"]);
        assert_eq!(values(&pattern, 1), vec!["d", "a", "b", "c"]);
        assert_eq!(values(&pattern, 2), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_chunk_walks_the_window() {
        let upper = |p: &Pattern| {
            p.with_value(|v| match v {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other.clone(),
            })
        };
        let pattern = quarters().chunk(2, upper).unwrap();
        assert_eq!(values(&pattern, 0), vec!["A", "B", "c", "d"]);
        assert_eq!(values(&pattern, 1), vec!["a", "b", "C", "D"]);
        assert_eq!(values(&pattern, 2), vec!["A", "B", "c", "d"]);
    }

    #[test]
    fn test_chunk_back_walks_in_reverse() {
        let upper = |p: &Pattern| {
            p.with_value(|v| match v {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other.clone(),
            })
        };
        let pattern = quarters().chunk_back(2, upper).unwrap();
        assert_eq!(values(&pattern, 0), vec!["a", "b", "C", "D"]);
        assert_eq!(values(&pattern, 1), vec!["A", "B", "c", "d"]);
    }
}
