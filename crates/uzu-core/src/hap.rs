use crate::{Fraction, TimeSpan, Value};
use serde::{Deserialize, Serialize};

/// Byte span into the mini-notation source that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Location { start, end }
    }

    pub fn shifted(&self, offset: usize) -> Location {
        Location {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Context metadata for a Hap (event)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Source code locations causing this event
    pub locations: Vec<Location>,
    /// Free-form tags attached by combinators
    pub tags: Vec<String>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn with_location(start: usize, end: usize) -> Self {
        Context {
            locations: vec![Location::new(start, end)],
            tags: Vec::new(),
        }
    }

    /// Combine two contexts, concatenating locations and tags in order
    pub fn combine(&self, other: &Context) -> Context {
        let mut locations = self.locations.clone();
        locations.extend(other.locations.iter().copied());
        let mut tags = self.tags.clone();
        tags.extend(other.tags.iter().cloned());
        Context { locations, tags }
    }

    /// Shift every location by a byte offset
    pub fn shift_locations(&self, offset: usize) -> Context {
        Context {
            locations: self.locations.iter().map(|l| l.shifted(offset)).collect(),
            tags: self.tags.clone(),
        }
    }
}

/// A Hap (happening) is a value active during a timespan.
///
/// The `part` is the fragment of the event visible to the current query,
/// which may be smaller than the `whole` when the event is clipped by the
/// query window. `part` never extends outside `whole`. Continuous events
/// (sampled signals) have no `whole`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hap {
    /// The full extent of the event; None for continuous events
    pub whole: Option<TimeSpan>,
    /// The clipped fragment, always present
    pub part: TimeSpan,
    /// The value of this event
    pub value: Value,
    /// Source locations and tags
    pub context: Context,
}

impl Hap {
    pub fn new(whole: Option<TimeSpan>, part: TimeSpan, value: Value) -> Self {
        Hap {
            whole,
            part,
            value,
            context: Context::new(),
        }
    }

    pub fn with_context(
        whole: Option<TimeSpan>,
        part: TimeSpan,
        value: Value,
        context: Context,
    ) -> Self {
        Hap {
            whole,
            part,
            value,
            context,
        }
    }

    /// A discrete event whose whole coincides with its part
    pub fn discrete(span: TimeSpan, value: Value) -> Self {
        Hap::new(Some(span), span, value)
    }

    /// A continuous (sampled) event
    pub fn continuous(part: TimeSpan, value: Value) -> Self {
        Hap::new(None, part, value)
    }

    /// Get the whole timespan or fall back to part
    pub fn whole_or_part(&self) -> TimeSpan {
        self.whole.unwrap_or(self.part)
    }

    /// Whether the part includes the event's onset
    pub fn has_onset(&self) -> bool {
        match self.whole {
            Some(w) => w.begin == self.part.begin,
            None => false,
        }
    }

    /// The moment to trigger a sound; None for continuous events
    pub fn onset(&self) -> Option<Fraction> {
        self.whole.map(|w| w.begin)
    }

    /// Duration of the full event; None for continuous events
    pub fn duration(&self) -> Option<Fraction> {
        self.whole.map(|w| w.end - w.begin)
    }

    /// Apply a function to the value, returning a new Hap
    pub fn with_value<F>(&self, func: F) -> Hap
    where
        F: FnOnce(&Value) -> Value,
    {
        Hap {
            whole: self.whole,
            part: self.part,
            value: func(&self.value),
            context: self.context.clone(),
        }
    }

    /// Apply a function to both timespans, returning a new Hap
    pub fn with_span<F>(&self, func: F) -> Hap
    where
        F: Fn(&TimeSpan) -> TimeSpan,
    {
        Hap {
            whole: self.whole.map(|w| func(&w)),
            part: func(&self.part),
            value: self.value.clone(),
            context: self.context.clone(),
        }
    }

    /// Shift whole and part by an offset
    pub fn shift(&self, offset: Fraction) -> Hap {
        self.with_span(|ts| ts.shift(offset))
    }

    /// Scale whole and part by a factor
    pub fn scale(&self, factor: Fraction) -> Hap {
        self.with_span(|ts| ts.scale(factor))
    }

    /// Restrict the event to a new part.
    ///
    /// For discrete events the new part is clipped against the whole and
    /// the hap disappears when they no longer meet; continuous events just
    /// take the given part.
    pub fn with_part(&self, part: TimeSpan) -> Option<Hap> {
        match self.whole {
            Some(whole) => whole.intersection(&part).map(|clipped| Hap {
                whole: self.whole,
                part: clipped,
                value: self.value.clone(),
                context: self.context.clone(),
            }),
            None => Some(Hap {
                whole: None,
                part,
                value: self.value.clone(),
                context: self.context.clone(),
            }),
        }
    }

    /// Clip the part against a query span, dropping the hap when the part
    /// falls entirely outside it
    pub fn clip_to(&self, span: TimeSpan) -> Option<Hap> {
        self.part.intersection(&span).map(|clipped| Hap {
            whole: self.whole,
            part: clipped,
            value: self.value.clone(),
            context: self.context.clone(),
        })
    }

    pub fn set_context(&self, context: Context) -> Hap {
        Hap {
            whole: self.whole,
            part: self.part,
            value: self.value.clone(),
            context,
        }
    }

    pub fn map_context<F>(&self, func: F) -> Hap
    where
        F: FnOnce(&Context) -> Context,
    {
        Hap {
            whole: self.whole,
            part: self.part,
            value: self.value.clone(),
            context: func(&self.context),
        }
    }

    pub fn combine_context(&self, other: &Hap) -> Context {
        self.context.combine(&other.context)
    }

    /// Structural equality on shape: whole, part and value, ignoring context
    pub fn eq_shape(&self, other: &Hap) -> bool {
        self.whole == other.whole && self.part == other.part && self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_span() -> TimeSpan {
        TimeSpan::from_ints(0, 1)
    }

    #[test]
    fn test_discrete_hap() {
        let hap = Hap::discrete(unit_span(), Value::from("bd"));
        assert_eq!(hap.whole, Some(unit_span()));
        assert_eq!(hap.part, unit_span());
        assert_eq!(hap.onset(), Some(Fraction::ZERO));
        assert_eq!(hap.duration(), Some(Fraction::ONE));
        assert!(hap.has_onset());
    }

    #[test]
    fn test_continuous_hap() {
        let hap = Hap::continuous(unit_span(), Value::from(0.5));
        assert_eq!(hap.whole, None);
        assert_eq!(hap.onset(), None);
        assert_eq!(hap.duration(), None);
        assert!(!hap.has_onset());
    }

    #[test]
    fn test_with_part_clips_against_whole() {
        let whole = TimeSpan::new(Fraction::ZERO, Fraction::new(1, 2));
        let hap = Hap::discrete(whole, Value::from("bd"));
        let clipped = hap
            .with_part(TimeSpan::new(Fraction::new(1, 4), Fraction::ONE))
            .unwrap();
        assert_eq!(clipped.whole, Some(whole));
        assert_eq!(
            clipped.part,
            TimeSpan::new(Fraction::new(1, 4), Fraction::new(1, 2))
        );
        assert!(!clipped.has_onset());

        let gone = hap.with_part(TimeSpan::new(Fraction::new(3, 4), Fraction::ONE));
        assert!(gone.is_none());
    }

    #[test]
    fn test_shift_and_scale() {
        let hap = Hap::discrete(unit_span(), Value::from("bd"));
        let shifted = hap.shift(Fraction::new(1, 2));
        assert_eq!(
            shifted.whole,
            Some(TimeSpan::new(Fraction::new(1, 2), Fraction::new(3, 2)))
        );
        let scaled = hap.scale(Fraction::new(1, 2));
        assert_eq!(
            scaled.part,
            TimeSpan::new(Fraction::ZERO, Fraction::new(1, 2))
        );
    }

    #[test]
    fn test_context_combine_preserves_order() {
        let mut a = Context::with_location(0, 2);
        a.tags.push("left".to_string());
        let mut b = Context::with_location(3, 5);
        b.tags.push("right".to_string());
        let combined = a.combine(&b);
        assert_eq!(
            combined.locations,
            vec![Location::new(0, 2), Location::new(3, 5)]
        );
        assert_eq!(combined.tags, vec!["left", "right"]);
    }

    #[test]
    fn test_shift_locations() {
        let ctx = Context::with_location(2, 4).shift_locations(10);
        assert_eq!(ctx.locations, vec![Location::new(12, 14)]);
    }
}
