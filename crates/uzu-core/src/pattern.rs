use crate::{Fraction, Hap, State, TimeSpan, Value};
use std::sync::Arc;

/// Shared handle to the sampling function of a continuous signal
pub type TimeFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A Pattern is a lazy function from a queried timespan to the events
/// active within it.
///
/// Patterns are immutable values; combinators capture existing patterns
/// by cheap Arc clones and wrap their queries in new closures, forming a
/// bottom-up DAG with no cycles. Any randomness inside a query is seeded
/// from the cycle being queried (see [`crate::rng`]), so queries are
/// referentially transparent.
pub struct Pattern {
    /// The query function that produces events for a given state
    query_func: Arc<dyn Fn(State) -> Vec<Hap> + Send + Sync>,

    /// Number of steps per cycle, when the pattern has a known meter
    steps: Option<Fraction>,

    /// Sampling function, present exactly on continuous signals
    time_fn: Option<TimeFn>,
}

impl Pattern {
    pub fn new<F>(query_func: F) -> Self
    where
        F: Fn(State) -> Vec<Hap> + Send + Sync + 'static,
    {
        Pattern {
            query_func: Arc::new(query_func),
            steps: None,
            time_fn: None,
        }
    }

    /// Create a new Pattern with a query function and step count
    pub fn with_steps<F>(query_func: F, steps: Option<Fraction>) -> Self
    where
        F: Fn(State) -> Vec<Hap> + Send + Sync + 'static,
    {
        Pattern {
            query_func: Arc::new(query_func),
            steps,
            time_fn: None,
        }
    }

    /// Query this pattern with the given state
    pub fn query(&self, state: State) -> Vec<Hap> {
        (self.query_func)(state)
    }

    /// Query a raw timespan with no further processing
    pub fn query_span(&self, span: TimeSpan) -> Vec<Hap> {
        self.query(State::new(span))
    }

    /// Materialize one cycle in cycle-relative time, sorted by part begin.
    ///
    /// This is the convenience used throughout the tests: times come back
    /// shifted so the cycle starts at 0.
    pub fn query_cycle(&self, cycle: i64) -> Vec<Hap> {
        let offset = Fraction::from_int(cycle);
        let mut haps: Vec<Hap> = self
            .query_span(TimeSpan::with_cycle(cycle))
            .iter()
            .map(|h| h.shift(-offset))
            .collect();
        haps.sort_by(|a, b| {
            a.part
                .begin
                .cmp(&b.part.begin)
                .then(a.part.end.cmp(&b.part.end))
        });
        haps
    }

    pub fn get_steps(&self) -> Option<Fraction> {
        self.steps
    }

    pub fn set_steps(mut self, steps: Option<Fraction>) -> Self {
        self.steps = steps;
        self
    }

    pub fn time_fn(&self) -> Option<TimeFn> {
        self.time_fn.clone()
    }

    pub(crate) fn set_time_fn(mut self, time_fn: Option<TimeFn>) -> Self {
        self.time_fn = time_fn;
        self
    }

    /// Apply a function to each value in the pattern (the functor map)
    pub fn with_value<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| {
                query_func(state)
                    .into_iter()
                    .map(|hap| hap.with_value(&func))
                    .collect()
            }),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Apply a function to the query span before querying
    pub fn with_query_span<F>(&self, func: F) -> Pattern
    where
        F: Fn(&TimeSpan) -> TimeSpan + Send + Sync + 'static,
    {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| {
                let span = func(&state.span);
                query_func(state.set_span(span))
            }),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Apply a function to both endpoints of the query span
    pub fn with_query_time<F>(&self, func: F) -> Pattern
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + 'static,
    {
        self.with_query_span(move |span| TimeSpan::new(func(span.begin), func(span.end)))
    }

    /// Apply a function to the spans of every returned hap
    pub fn with_hap_span<F>(&self, func: F) -> Pattern
    where
        F: Fn(&TimeSpan) -> TimeSpan + Send + Sync + 'static,
    {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| {
                query_func(state)
                    .into_iter()
                    .map(|hap| hap.with_span(&func))
                    .collect()
            }),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Apply a function to every time value of every returned hap
    pub fn with_hap_time<F>(&self, func: F) -> Pattern
    where
        F: Fn(Fraction) -> Fraction + Send + Sync + 'static,
    {
        self.with_hap_span(move |span| TimeSpan::new(func(span.begin), func(span.end)))
    }

    /// Apply a function to each hap
    pub fn with_hap<F>(&self, func: F) -> Pattern
    where
        F: Fn(&Hap) -> Hap + Send + Sync + 'static,
    {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| {
                query_func(state).into_iter().map(|hap| func(&hap)).collect()
            }),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Apply a function to all haps of a query at once
    pub fn with_haps<F>(&self, func: F) -> Pattern
    where
        F: Fn(Vec<Hap>) -> Vec<Hap> + Send + Sync + 'static,
    {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| func(query_func(state))),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Keep only haps matching a predicate
    pub fn filter_haps<F>(&self, pred: F) -> Pattern
    where
        F: Fn(&Hap) -> bool + Send + Sync + 'static,
    {
        self.with_haps(move |haps| haps.into_iter().filter(|h| pred(h)).collect())
    }

    /// Keep only haps whose part includes their onset
    pub fn filter_onsets(&self) -> Pattern {
        self.filter_haps(|h| h.has_onset())
    }

    /// Split queries at cycle boundaries, so the inner query only ever
    /// sees spans within a single cycle
    pub fn split_queries(&self) -> Pattern {
        let query_func = self.query_func.clone();
        Pattern {
            query_func: Arc::new(move |state| {
                state
                    .span
                    .span_cycles()
                    .flat_map(|span| query_func(state.set_span(span)))
                    .collect()
            }),
            steps: self.steps,
            time_fn: None,
        }
    }

    /// Merge a constant control into every hap's value map
    pub fn with_control(&self, key: &str, value: Value) -> Pattern {
        let key = key.to_string();
        self.with_value(move |v| {
            let mut controls = v.clone().into_controls();
            controls.insert(key.clone(), value.clone());
            Value::Map(controls)
        })
    }

    /// Rewrite a numeric control through a function; absent controls are
    /// treated as 1.0 (the neutral gain)
    pub fn map_control<F>(&self, key: &str, func: F) -> Pattern
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let key = key.to_string();
        self.with_value(move |v| {
            let mut controls = v.clone().into_controls();
            let current = controls.get(&key).and_then(|v| v.numeric()).unwrap_or(1.0);
            controls.insert(key.clone(), Value::Number(func(current)));
            Value::Map(controls)
        })
    }
}

impl Clone for Pattern {
    fn clone(&self) -> Self {
        Pattern {
            query_func: self.query_func.clone(),
            steps: self.steps,
            time_fn: self.time_fn.clone(),
        }
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("query", &"<closure>")
            .field("steps", &self.steps)
            .field("continuous", &self.time_fn.is_some())
            .finish()
    }
}
