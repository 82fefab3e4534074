use crate::hap::Location;
use crate::{rng, Context, Fraction, Hap, Pattern, TimeSpan, Value};
use rand::Rng;
use std::sync::Arc;

/// Create a pattern repeating a single value once per cycle.
///
/// Each cycle intersecting the query yields one discrete hap whose whole
/// is the full cycle and whose part is clipped to the query span.
pub fn pure(value: Value) -> Pattern {
    Pattern::new(move |state| {
        state
            .span
            .span_cycles()
            .map(|part| {
                let cycle = part.begin.sam();
                let whole = TimeSpan::new(cycle, cycle + Fraction::ONE);
                Hap::new(Some(whole), part, value.clone())
            })
            .collect()
    })
}

/// Create an empty/silent pattern
pub fn silence() -> Pattern {
    Pattern::new(|_state| Vec::new())
}

/// A constant continuous value, queryable at any resolution
pub fn steady(value: Value) -> Pattern {
    Pattern::new(move |state| {
        state
            .span
            .span_cycles()
            .map(|part| Hap::continuous(part, value.clone()))
            .collect()
    })
}

/// A pattern playing back a fixed list of events, clipped per query
pub fn from_haps(haps: Vec<Hap>) -> Pattern {
    Pattern::new(move |state| {
        haps.iter()
            .filter_map(|hap| hap.clip_to(state.span))
            .collect()
    })
}

/// Build a pattern from a cycle-indexed function.
///
/// The function returns haps in the cycle's local time `[0, 1)`; the
/// wrapper shifts them to absolute time and clips them to the query.
pub fn from_cycles<F>(func: F) -> Pattern
where
    F: Fn(i64) -> Vec<Hap> + Send + Sync + 'static,
{
    Pattern::new(move |state| {
        let mut out = Vec::new();
        for cycle_span in state.span.span_cycles() {
            let cycle = cycle_span.cycle_of();
            let offset = Fraction::from_int(cycle);
            for hap in func(cycle) {
                if let Some(clipped) = hap.shift(offset).clip_to(cycle_span) {
                    out.push(clipped);
                }
            }
        }
        out
    })
}

/// Least common multiple of the known step counts of a set of patterns
fn steps_lcm(patterns: &[Pattern]) -> Option<Fraction> {
    patterns
        .iter()
        .filter_map(|p| p.get_steps())
        .reduce(|a, b| {
            Fraction::new(
                Fraction::lcm(a.numerator, b.numerator),
                Fraction::gcd(a.denominator, b.denominator),
            )
        })
}

/// Stack/layer patterns on top of each other; all play simultaneously
pub fn stack(patterns: Vec<Pattern>) -> Pattern {
    if patterns.is_empty() {
        return silence();
    }
    if patterns.len() == 1 {
        return patterns.into_iter().next().unwrap();
    }
    let steps = steps_lcm(&patterns);
    let patterns = Arc::new(patterns);
    Pattern::with_steps(
        move |state| {
            patterns
                .iter()
                .flat_map(|pat| pat.query(state.clone()))
                .collect()
        },
        steps,
    )
}

/// Concatenate patterns across cycles: pattern `c mod n` plays on cycle
/// `c`, each member advancing one of its own cycles per round.
pub fn slowcat(patterns: Vec<Pattern>) -> Pattern {
    if patterns.is_empty() {
        return silence();
    }
    if patterns.len() == 1 {
        return patterns.into_iter().next().unwrap();
    }
    let count = patterns.len() as i64;
    let steps = steps_lcm(&patterns);
    let patterns = Arc::new(patterns);
    Pattern::with_steps(
        move |state| {
            let cycle = state.span.begin.cycle_of();
            let index = cycle.rem_euclid(count) as usize;
            let offset = Fraction::from_int(cycle - cycle.div_euclid(count));
            patterns[index]
                .query(state.with_span(|s| s.shift(-offset)))
                .into_iter()
                .map(|hap| hap.shift(offset))
                .collect()
        },
        steps,
    )
    .split_queries()
}

/// Concatenate patterns within a single cycle
pub fn fastcat(patterns: Vec<Pattern>) -> Pattern {
    if patterns.is_empty() {
        return silence();
    }
    if patterns.len() == 1 {
        return patterns.into_iter().next().unwrap();
    }
    let count = Fraction::from_int(patterns.len() as i64);
    slowcat(patterns)
        .with_query_time(move |t| t * count)
        .with_hap_time(move |t| t / count)
        .set_steps(Some(count))
}

/// Alias for fastcat
pub fn sequence(patterns: Vec<Pattern>) -> Pattern {
    fastcat(patterns)
}

/// Play one pattern, then the other, a cycle each
pub fn append(a: Pattern, b: Pattern) -> Pattern {
    slowcat(vec![a, b])
}

/// Weighted sequential concatenation: item `i` with weight `w_i` occupies
/// the slice `[Σw_<i / Σw, Σw_≤i / Σw)` of every cycle.
pub fn timecat(pairs: Vec<(Fraction, Pattern)>) -> Pattern {
    let total = pairs.iter().fold(Fraction::ZERO, |acc, (weight, _)| {
        if *weight > Fraction::ZERO {
            acc + *weight
        } else {
            acc
        }
    });
    if total <= Fraction::ZERO {
        return silence();
    }
    let mut layers = Vec::with_capacity(pairs.len());
    let mut begin = Fraction::ZERO;
    for (weight, pattern) in pairs {
        if weight <= Fraction::ZERO {
            continue;
        }
        let end = begin + weight;
        layers.push(pattern.compress_frac(begin / total, end / total));
        begin = end;
    }
    stack(layers).set_steps(Some(total))
}

/// Play patterns of different lengths against each other, aligned to a
/// shared step grid.
///
/// With `steps` given every group plays that many of its tokens per
/// cycle; otherwise groups align to the first group's step count.
pub fn polymeter(patterns: Vec<Pattern>, steps: Option<Fraction>) -> Pattern {
    if patterns.is_empty() {
        return silence();
    }
    let base = steps
        .or_else(|| patterns[0].get_steps())
        .unwrap_or(Fraction::ONE);
    if base <= Fraction::ZERO {
        return silence();
    }
    let adjusted: Vec<Pattern> = patterns
        .into_iter()
        .map(|pat| {
            let count = pat.get_steps().unwrap_or(Fraction::ONE);
            if count <= Fraction::ZERO {
                silence()
            } else {
                pat.fast_frac(base / count)
            }
        })
        .collect();
    stack(adjusted).set_steps(Some(base))
}

/// Randomly select one pattern per cycle, deterministically seeded from
/// the cycle index
pub fn choose(patterns: Vec<Pattern>, seed: u64) -> Pattern {
    if patterns.is_empty() {
        return silence();
    }
    if patterns.len() == 1 {
        return patterns.into_iter().next().unwrap();
    }
    let count = patterns.len();
    let patterns = Arc::new(patterns);
    Pattern::new(move |state| {
        let cycle = state.span.begin.cycle_of();
        let pick = rng::cycle_rng(cycle, seed).gen_range(0..count);
        patterns[pick].query(state)
    })
    .split_queries()
}

/// Weighted random selection, one pattern per cycle
pub fn choose_weighted(pairs: Vec<(Pattern, f64)>, seed: u64) -> Pattern {
    if pairs.is_empty() {
        return silence();
    }
    if pairs.len() == 1 {
        return pairs.into_iter().next().unwrap().0;
    }
    let total: f64 = pairs.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        let patterns = pairs.into_iter().map(|(p, _)| p).collect();
        return choose(patterns, seed);
    }
    let pairs = Arc::new(pairs);
    Pattern::new(move |state| {
        let cycle = state.span.begin.cycle_of();
        let roll = rng::cycle_rng(cycle, seed).gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (pattern, weight) in pairs.iter() {
            cumulative += weight.max(0.0);
            if roll < cumulative {
                return pattern.query(state);
            }
        }
        pairs.last().map(|(p, _)| p.query(state)).unwrap_or_default()
    })
    .split_queries()
}

impl Pattern {
    /// Hold every source cycle for `n` output cycles before advancing
    pub fn repeat_cycles(&self, n: usize) -> Pattern {
        if n <= 1 {
            return self.clone();
        }
        let n = n as i64;
        let inner = self.clone();
        Pattern::new(move |state| {
            let cycle = state.span.begin.cycle_of();
            let delta = Fraction::from_int(cycle - cycle.div_euclid(n));
            inner
                .query(state.with_span(|s| s.shift(-delta)))
                .into_iter()
                .map(|hap| hap.shift(delta))
                .collect()
        })
        .split_queries()
    }

    /// Append a source location to every hap's context
    pub fn with_loc(&self, start: usize, end: usize) -> Pattern {
        self.with_hap(move |hap| {
            hap.map_context(|ctx| {
                let mut ctx = ctx.clone();
                ctx.locations.push(Location::new(start, end));
                ctx
            })
        })
    }

    /// Shift every recorded source location by a byte offset
    pub fn with_loc_offset(&self, offset: usize) -> Pattern {
        self.with_hap(move |hap| hap.map_context(|ctx| ctx.shift_locations(offset)))
    }

    /// Rewrite every hap's context through a function
    pub fn with_context<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Context) -> Context + Send + Sync + 'static,
    {
        self.with_hap(move |hap| hap.map_context(&func))
    }

    /// Append a tag to every hap's context
    pub fn with_tag(&self, tag: &str) -> Pattern {
        let tag = tag.to_string();
        self.with_hap(move |hap| {
            hap.map_context(|ctx| {
                let mut ctx = ctx.clone();
                ctx.tags.push(tag.clone());
                ctx
            })
        })
    }
}
