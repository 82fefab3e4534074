//! Applicative and monadic structure over patterns.
//!
//! These are what let patterns appear as arguments to other transforms:
//! a pattern of factors, a pattern of control values, a pattern of
//! patterns. Values combine as control maps (structural union); time
//! structure combines through span intersection with a configurable
//! choice of `whole`.

use crate::{Hap, Pattern, TimeSpan, Value};

/// How the wholes of an outer and inner hap combine
fn intersect_wholes(a: Option<TimeSpan>, b: Option<TimeSpan>) -> Option<TimeSpan> {
    match (a, b) {
        (Some(a), Some(b)) => a.intersection(&b),
        _ => None,
    }
}

impl Pattern {
    /// Pair every overlapping hap of both patterns: parts and wholes
    /// intersect, values merge with `self` winning key conflicts.
    pub fn app_both(&self, other: &Pattern) -> Pattern {
        let left = self.clone();
        let right = other.clone();
        Pattern::new(move |state| {
            let left_haps = left.query(state.clone());
            let right_haps = right.query(state);
            let mut out = Vec::new();
            for lh in &left_haps {
                for rh in &right_haps {
                    if let Some(part) = lh.part.intersection(&rh.part) {
                        out.push(Hap::with_context(
                            intersect_wholes(lh.whole, rh.whole),
                            part,
                            lh.value.union(&rh.value),
                            lh.combine_context(rh),
                        ));
                    }
                }
            }
            out
        })
    }

    /// Merge values from `other`, keeping the structure (wholes and
    /// onsets) of `self`
    pub fn app_left(&self, other: &Pattern) -> Pattern {
        let left = self.clone();
        let right = other.clone();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for lh in left.query(state.clone()) {
                for rh in right.query(state.set_span(lh.whole_or_part())) {
                    if let Some(part) = lh.part.intersection(&rh.part) {
                        out.push(Hap::with_context(
                            lh.whole,
                            part,
                            lh.value.union(&rh.value),
                            lh.combine_context(&rh),
                        ));
                    }
                }
            }
            out
        })
    }

    /// Merge values from `other`, keeping its structure
    pub fn app_right(&self, other: &Pattern) -> Pattern {
        let left = self.clone();
        let right = other.clone();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for rh in right.query(state.clone()) {
                for lh in left.query(state.set_span(rh.whole_or_part())) {
                    if let Some(part) = lh.part.intersection(&rh.part) {
                        out.push(Hap::with_context(
                            rh.whole,
                            part,
                            lh.value.union(&rh.value),
                            lh.combine_context(&rh),
                        ));
                    }
                }
            }
            out
        })
    }

    /// Monadic bind with an explicit whole-combining rule.
    ///
    /// For every outer hap the function gives an inner pattern, which is
    /// queried over the outer part; inner haps keep their part and value,
    /// contexts merge, and wholes combine through `choose_whole`.
    pub fn bind_with<F, W>(&self, func: F, choose_whole: W) -> Pattern
    where
        F: Fn(&Value) -> Pattern + Send + Sync + 'static,
        W: Fn(Option<TimeSpan>, Option<TimeSpan>) -> Option<TimeSpan> + Send + Sync + 'static,
    {
        let outer = self.clone();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for oh in outer.query(state.clone()) {
                let inner = func(&oh.value);
                for ih in inner.query(state.set_span(oh.part)) {
                    out.push(Hap::with_context(
                        choose_whole(oh.whole, ih.whole),
                        ih.part,
                        ih.value.clone(),
                        oh.combine_context(&ih),
                    ));
                }
            }
            out
        })
    }

    /// Standard bind: wholes intersect
    pub fn bind<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Value) -> Pattern + Send + Sync + 'static,
    {
        self.bind_with(func, intersect_wholes)
    }

    /// Bind keeping the outer pattern's wholes
    pub fn outer_bind<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Value) -> Pattern + Send + Sync + 'static,
    {
        self.bind_with(func, |outer, _| outer)
    }

    /// Bind keeping the inner patterns' wholes
    pub fn inner_bind<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Value) -> Pattern + Send + Sync + 'static,
    {
        self.bind_with(func, |_, inner| inner)
    }

    /// Bind squeezing each inner pattern into the extent of the outer
    /// hap that produced it: one inner cycle fits the outer whole exactly.
    pub fn squeeze_bind<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Value) -> Pattern + Send + Sync + 'static,
    {
        let outer = self.clone();
        Pattern::new(move |state| {
            let mut out = Vec::new();
            for oh in outer.query(state.clone()) {
                let focused = func(&oh.value).focus_span(oh.whole_or_part());
                for ih in focused.query(state.set_span(oh.part)) {
                    out.push(Hap::with_context(
                        intersect_wholes(oh.whole, ih.whole),
                        ih.part,
                        ih.value.clone(),
                        oh.combine_context(&ih),
                    ));
                }
            }
            out
        })
    }

    /// Rescale the pattern so one of its cycles occupies the given span,
    /// repeating with the span's period.
    ///
    /// This is the affine map behind squeezing: queries are pulled back
    /// into the pattern's own time, results pushed forward.
    pub fn focus_span(&self, span: TimeSpan) -> Pattern {
        let width = span.duration();
        if width <= crate::Fraction::ZERO {
            return crate::combinators::silence();
        }
        let begin = span.begin;
        self.with_query_time(move |t| (t - begin) / width)
            .with_hap_time(move |t| begin + t * width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{fastcat, pure, silence};
    use crate::{Fraction, Value};
    use std::collections::BTreeMap;

    fn ctrl(key: &str, v: f64) -> Value {
        let mut m = BTreeMap::new();
        m.insert(key.to_string(), Value::Number(v));
        Value::Map(m)
    }

    #[test]
    fn test_app_left_keeps_own_structure() {
        let notes = fastcat(vec![pure(ctrl("n", 0.0)), pure(ctrl("n", 1.0))]);
        let gains = pure(ctrl("gain", 0.8));
        let combined = notes.app_left(&gains);
        let haps = combined.query_cycle(0);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].whole.unwrap().end, Fraction::new(1, 2));
        let map = haps[0].value.as_map().unwrap();
        assert_eq!(map.get("n"), Some(&Value::Number(0.0)));
        assert_eq!(map.get("gain"), Some(&Value::Number(0.8)));
    }

    #[test]
    fn test_app_right_takes_other_structure() {
        let notes = pure(ctrl("n", 3.0));
        let gains = fastcat(vec![pure(ctrl("gain", 0.5)), pure(ctrl("gain", 1.0))]);
        let combined = notes.app_right(&gains);
        let haps = combined.query_cycle(0);
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[1].whole.unwrap().begin, Fraction::new(1, 2));
        let map = haps[1].value.as_map().unwrap();
        assert_eq!(map.get("n"), Some(&Value::Number(3.0)));
        assert_eq!(map.get("gain"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_app_both_intersects() {
        let halves = fastcat(vec![pure(ctrl("a", 1.0)), pure(ctrl("a", 2.0))]);
        let thirds = fastcat(vec![
            pure(ctrl("b", 1.0)),
            pure(ctrl("b", 2.0)),
            pure(ctrl("b", 3.0)),
        ]);
        let combined = halves.app_both(&thirds);
        let haps = combined.query_cycle(0);
        // 2 against 3 yields 4 overlapping fragments
        assert_eq!(haps.len(), 4);
        assert_eq!(
            haps[1].part,
            TimeSpan::new(Fraction::new(1, 3), Fraction::new(1, 2))
        );
        assert_eq!(
            haps[1].whole,
            Some(TimeSpan::new(Fraction::new(1, 3), Fraction::new(1, 2)))
        );
    }

    #[test]
    fn test_bind_queries_inner_over_outer_part() {
        let outer = fastcat(vec![pure(Value::from("a")), pure(Value::from("b"))]);
        let bound = outer.bind(|v| match v.as_string() {
            Some("a") => pure(Value::from("x")),
            _ => fastcat(vec![pure(Value::from("y")), pure(Value::from("z"))]),
        });
        let values: Vec<_> = bound
            .query_cycle(0)
            .iter()
            .map(|h| h.value.to_string())
            .collect();
        assert_eq!(values, vec!["x", "z"]);
    }

    #[test]
    fn test_outer_and_inner_bind_wholes() {
        let outer = pure(Value::from("a"));
        let inner_pat = fastcat(vec![pure(Value::from("x")), pure(Value::from("y"))]);
        let half = TimeSpan::new(Fraction::ZERO, Fraction::new(1, 2));

        let kept_outer = outer.outer_bind(move |_| inner_pat.clone());
        let haps = kept_outer.query_cycle(0);
        assert_eq!(haps[0].whole, Some(TimeSpan::from_ints(0, 1)));
        assert_eq!(haps[0].part, half);

        let inner_pat = fastcat(vec![pure(Value::from("x")), pure(Value::from("y"))]);
        let kept_inner = outer.inner_bind(move |_| inner_pat.clone());
        let haps = kept_inner.query_cycle(0);
        assert_eq!(haps[0].whole, Some(half));
    }

    #[test]
    fn test_squeeze_bind_fits_inner_cycle_to_outer_hap() {
        let outer = fastcat(vec![pure(Value::from("a")), pure(Value::from("b"))]);
        let squeezed = outer.squeeze_bind(|_| {
            fastcat(vec![pure(Value::from("x")), pure(Value::from("y"))])
        });
        let haps = squeezed.query_cycle(0);
        assert_eq!(haps.len(), 4);
        assert_eq!(
            haps[1].whole,
            Some(TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2)))
        );
        let values: Vec<_> = haps.iter().map(|h| h.value.to_string()).collect();
        assert_eq!(values, vec!["x", "y", "x", "y"]);
    }

    #[test]
    fn test_focus_span_tiles() {
        let pattern = pure(Value::from("x"))
            .focus_span(TimeSpan::new(Fraction::ZERO, Fraction::new(1, 2)));
        let haps = pattern.query_cycle(0);
        // the half-cycle period tiles the full cycle
        assert_eq!(haps.len(), 2);
        assert_eq!(haps[0].whole.unwrap().end, Fraction::new(1, 2));
        assert_eq!(haps[1].whole.unwrap(), TimeSpan::new(Fraction::new(1, 2), Fraction::ONE));
    }

    #[test]
    fn test_focus_span_empty_is_silent() {
        let pattern = pure(Value::from("x")).focus_span(TimeSpan::from_ints(1, 1));
        assert!(pattern.query_cycle(0).is_empty());
        assert!(silence().app_left(&pure(Value::from(1.0))).query_cycle(0).is_empty());
    }
}
