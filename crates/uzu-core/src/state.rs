use crate::{TimeSpan, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State is the context a pattern is queried with: the timespan being
/// asked for, plus any control parameters the host wants to thread
/// through. Combinators pass controls along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// The timespan being queried
    pub span: TimeSpan,
    /// Control parameters supplied by the host
    pub controls: HashMap<String, Value>,
}

impl State {
    pub fn new(span: TimeSpan) -> Self {
        State {
            span,
            controls: HashMap::new(),
        }
    }

    pub fn with_controls(span: TimeSpan, controls: HashMap<String, Value>) -> Self {
        State { span, controls }
    }

    /// Return a new State with a different span
    pub fn set_span(&self, span: TimeSpan) -> State {
        State {
            span,
            controls: self.controls.clone(),
        }
    }

    /// Return a new State with the span modified by a function
    pub fn with_span<F>(&self, func: F) -> State
    where
        F: FnOnce(&TimeSpan) -> TimeSpan,
    {
        self.set_span(func(&self.span))
    }

    pub fn get_control(&self, key: &str) -> Option<&Value> {
        self.controls.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fraction;

    #[test]
    fn test_state_creation() {
        let span = TimeSpan::from_ints(0, 1);
        let state = State::new(span);
        assert_eq!(state.span, span);
        assert!(state.controls.is_empty());
    }

    #[test]
    fn test_with_span() {
        let state = State::new(TimeSpan::from_ints(0, 1));
        let shifted = state.with_span(|s| s.shift(Fraction::from_int(1)));
        assert_eq!(shifted.span, TimeSpan::from_ints(1, 2));
    }

    #[test]
    fn test_controls_survive_set_span() {
        let mut state = State::new(TimeSpan::from_ints(0, 1));
        state
            .controls
            .insert("tempo".to_string(), Value::from(120.0));
        let moved = state.set_span(TimeSpan::from_ints(1, 2));
        assert_eq!(moved.get_control("tempo"), Some(&Value::from(120.0)));
    }
}
