//! Control parameters (effects).
//!
//! A parameter setter merges a value under a canonical key into every
//! hap's control map. The value may be a plain number or name, another
//! pattern (sampled at each hap's onset), or a mini-notation string,
//! which is parsed and then treated as a pattern. Sampling merges the
//! source hap's locations into the target context so editors can
//! highlight the modulation source.

use crate::interp::interpret;
use crate::parser::parse;
use tracing::debug;
use uzu_core::{Fraction, Hap, Location, Pattern, TimeSpan, Value};

/// Argument accepted by every parameter setter
pub enum ParamArg {
    Number(f64),
    Text(String),
    Pattern(Pattern),
}

impl From<f64> for ParamArg {
    fn from(n: f64) -> Self {
        ParamArg::Number(n)
    }
}

impl From<i64> for ParamArg {
    fn from(n: i64) -> Self {
        ParamArg::Number(n as f64)
    }
}

impl From<i32> for ParamArg {
    fn from(n: i32) -> Self {
        ParamArg::Number(n as f64)
    }
}

impl From<&str> for ParamArg {
    fn from(s: &str) -> Self {
        ParamArg::Text(s.to_string())
    }
}

impl From<String> for ParamArg {
    fn from(s: String) -> Self {
        ParamArg::Text(s)
    }
}

impl From<Pattern> for ParamArg {
    fn from(p: Pattern) -> Self {
        ParamArg::Pattern(p)
    }
}

/// Resolve a DSL alias to its canonical parameter key
pub fn canonical_key(key: &str) -> &str {
    match key {
        "lpf" | "ctf" => "cutoff",
        "lpq" => "resonance",
        "hpf" => "hcutoff",
        "hpq" => "hresonance",
        "bpf" => "bandf",
        "bpq" => "bandq",
        "delayfb" => "delayfeedback",
        "dist" => "distort",
        "legato" => "clip",
        "sz" => "roomsize",
        "sound" => "s",
        other => other,
    }
}

/// Merge a parameter into every hap of the pattern
pub fn set_param(pattern: &Pattern, key: &str, value: impl Into<ParamArg>) -> Pattern {
    set_param_with_offset(pattern, key, value, 0)
}

/// `set_param` with a byte offset added to the source locations of a
/// parsed mini-notation argument
pub fn set_param_with_offset(
    pattern: &Pattern,
    key: &str,
    value: impl Into<ParamArg>,
    source_offset: usize,
) -> Pattern {
    let key = canonical_key(key);
    match value.into() {
        ParamArg::Number(n) => pattern.with_control(key, Value::Number(n)),
        ParamArg::Pattern(values) => sample_param(pattern, key, &values),
        ParamArg::Text(source) => match parse(&source) {
            Ok(node) => {
                let values = interpret(&node).with_loc_offset(source_offset);
                sample_param(pattern, key, &values)
            }
            Err(err) => {
                debug!(%err, %source, "parameter string is not mini notation, using it verbatim");
                pattern.with_control(key, Value::String(source))
            }
        },
    }
}

/// Merge the value pattern into each hap, sampled at the hap's onset
fn sample_param(pattern: &Pattern, key: &str, values: &Pattern) -> Pattern {
    let key = key.to_string();
    let values = values.clone();
    pattern.with_hap(move |hap| {
        let at = hap.whole_or_part().begin;
        let (value, locations) = sample_value(&values, at);
        let mut controls = hap.value.clone().into_controls();
        controls.insert(key.clone(), value);
        let mut context = hap.context.clone();
        context.locations.extend(locations);
        Hap::with_context(hap.whole, hap.part, Value::Map(controls), context)
    })
}

/// Value of the pattern sounding at a point in time, with the source
/// locations of the hap it came from. Numeric strings are coerced.
fn sample_value(values: &Pattern, at: Fraction) -> (Value, Vec<Location>) {
    if let Some(time_fn) = values.time_fn() {
        return (Value::Number(time_fn(at.to_float())), Vec::new());
    }
    let mut haps = values.query_span(TimeSpan::with_cycle(at.cycle_of()));
    haps.sort_by(|a, b| a.part.begin.cmp(&b.part.begin));
    let found = haps
        .iter()
        .find(|h| h.whole_or_part().contains(at))
        .or_else(|| haps.first());
    match found {
        Some(hap) => {
            let value = match &hap.value {
                Value::String(s) => match s.parse::<f64>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => hap.value.clone(),
                },
                other => other.clone(),
            };
            (value, hap.context.locations.clone())
        }
        None => (Value::Number(0.0), Vec::new()),
    }
}

macro_rules! control_setters {
    ($($name:ident => $key:literal),* $(,)?) => {
        $(
            pub fn $name(pattern: &Pattern, value: impl Into<ParamArg>) -> Pattern {
                set_param(pattern, $key, value)
            }
        )*
    };
}

control_setters! {
    // filters
    cutoff => "cutoff",
    lpf => "cutoff",
    ctf => "cutoff",
    resonance => "resonance",
    lpq => "resonance",
    hcutoff => "hcutoff",
    hpf => "hcutoff",
    hresonance => "hresonance",
    hpq => "hresonance",
    bandf => "bandf",
    bpf => "bandf",
    bandq => "bandq",
    bpq => "bandq",
    // envelope
    attack => "attack",
    decay => "decay",
    sustain => "sustain",
    release => "release",
    // mix
    gain => "gain",
    pan => "pan",
    speed => "speed",
    orbit => "orbit",
    cut => "cut",
    // room and delay
    room => "room",
    roomsize => "roomsize",
    sz => "roomsize",
    delay => "delay",
    delaytime => "delaytime",
    delayfeedback => "delayfeedback",
    delayfb => "delayfeedback",
    // distortion
    distort => "distort",
    dist => "distort",
    crush => "crush",
    coarse => "coarse",
    // modulation
    vib => "vib",
    vibmod => "vibmod",
    tremolo => "tremolo",
    detune => "detune",
    // sample control
    begin => "begin",
    end => "end",
    clip => "clip",
    legato => "clip",
    unit => "unit",
    // source selection
    s => "s",
    sound => "s",
    n => "n",
    note => "note",
}

/// Sample looping; named with a trailing underscore to stay clear of
/// the keyword
pub fn loop_(pattern: &Pattern, value: impl Into<ParamArg>) -> Pattern {
    set_param(pattern, "loop", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uzu_core::{fastcat, pure, saw};

    fn bd() -> Pattern {
        pure(Value::from("bd"))
    }

    fn control_of(pattern: &Pattern, index: usize, key: &str) -> Value {
        pattern.query_cycle(0)[index]
            .value
            .as_map()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_constant_number_param() {
        let pattern = gain(&bd(), 0.8);
        assert_eq!(control_of(&pattern, 0, "gain"), Value::Number(0.8));
        assert_eq!(control_of(&pattern, 0, "s"), Value::from("bd"));
    }

    #[test]
    fn test_alias_stores_canonical_key() {
        let pattern = lpf(&bd(), 800.0);
        assert_eq!(control_of(&pattern, 0, "cutoff"), Value::Number(800.0));
        assert!(pattern.query_cycle(0)[0]
            .value
            .as_map()
            .unwrap()
            .get("lpf")
            .is_none());
        let pattern = legato(&bd(), 0.5);
        assert_eq!(control_of(&pattern, 0, "clip"), Value::Number(0.5));
    }

    #[test]
    fn test_pattern_param_sampled_per_onset() {
        let base = fastcat(vec![pure(Value::from("bd")), pure(Value::from("sd"))]);
        let values = fastcat(vec![pure(Value::Number(200.0)), pure(Value::Number(400.0))]);
        let pattern = cutoff(&base, values);
        assert_eq!(control_of(&pattern, 0, "cutoff"), Value::Number(200.0));
        assert_eq!(control_of(&pattern, 1, "cutoff"), Value::Number(400.0));
    }

    #[test]
    fn test_mini_notation_param() {
        let pattern = cutoff(&bd(), "<200 400>");
        assert_eq!(control_of(&pattern, 0, "cutoff"), Value::Number(200.0));
        let next = pattern.query_cycle(1);
        assert_eq!(
            next[0].value.as_map().unwrap().get("cutoff"),
            Some(&Value::Number(400.0))
        );
    }

    #[test]
    fn test_plain_sound_name_param() {
        let pattern = s(&pure(Value::Number(3.0)), "casio");
        assert_eq!(control_of(&pattern, 0, "s"), Value::from("casio"));
    }

    #[test]
    fn test_signal_param_samples_time_fn() {
        let base = fastcat(vec![pure(Value::from("bd")), pure(Value::from("sd"))]);
        let pattern = pan(&base, saw());
        let first = control_of(&pattern, 0, "pan").as_number().unwrap();
        let second = control_of(&pattern, 1, "pan").as_number().unwrap();
        assert!((first - 0.0).abs() < 1e-9);
        assert!((second - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_param_merges_source_locations() {
        let base = crate::pattern("bd").unwrap();
        let with_param = cutoff(&base, "800");
        let haps = with_param.query_cycle(0);
        // locations from both the base pattern and the parameter string
        assert!(haps[0].context.locations.len() >= 2);
    }

    #[test]
    fn test_param_location_offset() {
        let pattern = set_param_with_offset(&bd(), "cutoff", "800", 10);
        let haps = pattern.query_cycle(0);
        let loc = haps[0].context.locations.last().unwrap();
        assert_eq!(loc.start, 10);
        assert_eq!(loc.end, 13);
    }

    #[test]
    fn test_stacked_params() {
        let pattern = pan(&gain(&bd(), 0.9), 0.25);
        let map_value = pattern.query_cycle(0)[0].value.clone();
        let map = map_value.as_map().unwrap();
        assert_eq!(map.get("gain"), Some(&Value::Number(0.9)));
        assert_eq!(map.get("pan"), Some(&Value::Number(0.25)));
        assert_eq!(map.get("s"), Some(&Value::from("bd")));
    }
}
