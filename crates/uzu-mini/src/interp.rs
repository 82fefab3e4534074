//! Interpretation of the mini-notation syntax tree into patterns.
//!
//! Interpretation never fails: a node the interpreter cannot make sense
//! of becomes silence (with a trace warning), so a built tree always
//! yields a queryable pattern.

use crate::ast::{AtomValue, EuclidArgs, Mods, Node};
use std::collections::BTreeMap;
use tracing::warn;
use uzu_core::{
    choose, choose_weighted, polymeter, pure, silence, stack, timecat, Fraction, Pattern, Value,
};

/// Hard ceiling on `!n` expansion; beyond this the count is clamped
const MAX_REPLICATE: usize = 4096;

/// Hard ceiling on Euclidean step grids
const MAX_EUCLID_STEPS: f64 = 65536.0;

/// Hard ceiling on `*n` speed-ups; a faster factor would ask a single
/// query to materialize that many events
const MAX_TEMPO_FACTOR: f64 = 65536.0;

fn replicate_count(node: &Node) -> usize {
    let count = node.mods().and_then(|m| m.replicate).unwrap_or(1);
    if count > MAX_REPLICATE {
        warn!(count, "clamping excessive replication");
        MAX_REPLICATE
    } else {
        count
    }
}

/// Turn a syntax tree into a pattern
pub fn interpret(node: &Node) -> Pattern {
    match node {
        Node::Sequence { items, .. } => sequence_pattern(items),
        Node::Stack { children, .. } => stack(children.iter().map(interpret).collect()),
        Node::RandomChoice {
            children, seed, ..
        } => random_choice(children, *seed),
        Node::Alternation { .. }
        | Node::Subdivision { .. }
        | Node::Polymetric { .. }
        | Node::Atom { .. } => sequence_pattern(std::slice::from_ref(node)),
        Node::Rest { .. } | Node::Elongation { .. } => silence(),
    }
}

/// Weighted sequential interpretation: one timecat slot per item, `@`
/// weights widening slots, `!` replication repeating them, `_`
/// elongation stretching the preceding slot.
fn sequence_pattern(items: &[Node]) -> Pattern {
    let mut entries: Vec<(Fraction, Pattern)> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Node::Elongation { .. } => {
                if let Some(last) = entries.last_mut() {
                    last.0 = last.0 + Fraction::ONE;
                } else {
                    entries.push((Fraction::ONE, silence()));
                }
            }
            _ => {
                let weight = item
                    .mods()
                    .and_then(|m| m.weight)
                    .map(Fraction::from_float)
                    .unwrap_or(Fraction::ONE);
                let copies = replicate_count(item);
                let pattern = slot_pattern(item);
                for _ in 0..copies {
                    entries.push((weight, pattern.clone()));
                }
            }
        }
    }
    match entries.len() {
        0 => silence(),
        1 if entries[0].0 > Fraction::ZERO => entries.into_iter().next().unwrap().1,
        _ => timecat(entries),
    }
}

/// Interpret one sequence slot, applying every modifier except weight
/// and replication (those shape the enclosing sequence instead)
fn slot_pattern(node: &Node) -> Pattern {
    let base = match node {
        Node::Atom {
            value,
            sample,
            loc,
            ..
        } => atom_pattern(value, *sample).with_loc(loc.start, loc.end),
        Node::Subdivision { children, .. } => sequence_pattern(children),
        Node::Alternation { children, .. } => alternation_pattern(children),
        Node::Polymetric { groups, steps, .. } => {
            let patterns: Vec<Pattern> = groups.iter().map(interpret).collect();
            let steps = steps.as_deref().and_then(node_number).and_then(|n| {
                if n > 0.0 && n <= MAX_TEMPO_FACTOR {
                    Some(Fraction::from_float(n))
                } else {
                    warn!(steps = n, "ignoring unusable polymetric step count");
                    None
                }
            });
            polymeter(patterns, steps)
        }
        Node::Sequence { items, .. } => sequence_pattern(items),
        Node::Stack { children, .. } => stack(children.iter().map(interpret).collect()),
        Node::RandomChoice {
            children, seed, ..
        } => random_choice(children, *seed),
        Node::Rest { .. } | Node::Elongation { .. } => silence(),
    };
    match node.mods() {
        Some(mods) => apply_mods(base, mods),
        None => base,
    }
}

fn atom_pattern(value: &AtomValue, sample: Option<i64>) -> Pattern {
    let value = match value {
        AtomValue::Number(n) => Value::Number(*n),
        AtomValue::Name(name) => match sample {
            Some(index) => {
                let mut controls = BTreeMap::new();
                controls.insert("s".to_string(), Value::String(name.clone()));
                controls.insert("n".to_string(), Value::Number(index as f64));
                Value::Map(controls)
            }
            None => Value::String(name.clone()),
        },
    };
    pure(value)
}

/// `<a b c>`: one child per cycle. Replication gives a child extra
/// cycles, as does elongation of the preceding child.
fn alternation_pattern(children: &[Node]) -> Pattern {
    let mut cycles: Vec<Pattern> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Elongation { .. } => {
                let repeat = cycles.last().cloned().unwrap_or_else(silence);
                cycles.push(repeat);
            }
            _ => {
                let copies = match child.mods() {
                    Some(mods) if mods.replicate.is_some() => replicate_count(child),
                    Some(mods) => mods
                        .weight
                        .map(|w| (w.max(1.0) as usize).min(MAX_REPLICATE))
                        .unwrap_or(1),
                    None => 1,
                };
                let pattern = slot_pattern(child);
                for _ in 0..copies {
                    cycles.push(pattern.clone());
                }
            }
        }
    }
    uzu_core::slowcat(cycles)
}

fn random_choice(children: &[Node], seed: u64) -> Pattern {
    let weighted = children
        .iter()
        .any(|c| c.mods().and_then(|m| m.weight).unwrap_or(1.0) > 1.0);
    if weighted {
        let pairs = children
            .iter()
            .map(|c| {
                let weight = c.mods().and_then(|m| m.weight).unwrap_or(1.0);
                (slot_pattern(c), weight)
            })
            .collect();
        choose_weighted(pairs, seed)
    } else {
        choose(children.iter().map(slot_pattern).collect(), seed)
    }
}

/// Modifier application order: Euclidean rhythm, then tempo (`*`, `/`),
/// then degradation (`?`)
fn apply_mods(pattern: Pattern, mods: &Mods) -> Pattern {
    let mut pattern = pattern;
    if let Some(euclid) = &mods.euclid {
        pattern = apply_euclid(pattern, euclid);
    }
    if let Some(repeat) = &mods.repeat {
        pattern = apply_factor(pattern, repeat, true);
    }
    if let Some(division) = &mods.division {
        pattern = apply_factor(pattern, division, false);
    }
    if let Some(probability) = mods.probability {
        pattern = match pattern.degrade_by(probability) {
            Ok(degraded) => degraded,
            Err(err) => {
                warn!(%err, "ignoring out-of-range drop probability");
                pattern
            }
        };
    }
    pattern
}

fn apply_factor(pattern: Pattern, node: &Node, faster: bool) -> Pattern {
    match node_number(node) {
        Some(n) if (faster && n > MAX_TEMPO_FACTOR) || (!faster && n > 0.0 && n.recip() > MAX_TEMPO_FACTOR) => {
            warn!(factor = n, "tempo factor too extreme, yielding silence");
            silence()
        }
        Some(n) if n > 0.0 => {
            let factor = Fraction::from_float(n);
            if faster {
                match pattern.fast(factor) {
                    Ok(p) => p,
                    Err(_) => silence(),
                }
            } else {
                match pattern.slow(factor) {
                    Ok(p) => p,
                    Err(_) => silence(),
                }
            }
        }
        Some(n) => {
            warn!(factor = n, "non-positive tempo factor yields silence");
            silence()
        }
        None => {
            let factors = interpret(node);
            if faster {
                pattern.fast_pat(&factors)
            } else {
                pattern.slow_pat(&factors)
            }
        }
    }
}

fn apply_euclid(pattern: Pattern, args: &EuclidArgs) -> Pattern {
    let pulse = node_number(&args.pulse);
    let step = node_number(&args.step);
    let rotation = args.rotation.as_deref().map(node_number);
    match (pulse, step, rotation) {
        (Some(pulse), Some(step), None | Some(Some(_)))
            if pulse >= 0.0 && step >= 1.0 && step <= MAX_EUCLID_STEPS && pulse <= step =>
        {
            let rotation = rotation.flatten().unwrap_or(0.0) as i64;
            match pattern.euclid_rot(pulse as usize, step as usize, rotation) {
                Ok(p) => p,
                Err(err) => {
                    warn!(%err, "euclid arguments rejected, yielding silence");
                    silence()
                }
            }
        }
        (Some(pulse), Some(step), _) if pulse > step || step < 1.0 || step > MAX_EUCLID_STEPS => {
            warn!(pulse, step, "impossible euclid rhythm yields silence");
            silence()
        }
        _ => euclid_dynamic(pattern, args),
    }
}

/// Euclid with pattern-valued arguments: the rhythm is rebuilt per cycle
/// from the argument patterns sampled at that cycle
fn euclid_dynamic(pattern: Pattern, args: &EuclidArgs) -> Pattern {
    let pulse = interpret(&args.pulse);
    let step = interpret(&args.step);
    let rotation = args.rotation.as_deref().map(interpret);
    Pattern::new(move |state| {
        let at = Fraction::from_int(state.span.begin.cycle_of());
        let k = pulse.sample_at(at).round();
        let n = step.sample_at(at).round();
        let rot = rotation
            .as_ref()
            .map(|p| p.sample_at(at).round() as i64)
            .unwrap_or(0);
        if k < 0.0 || n < 1.0 || n > MAX_EUCLID_STEPS || k > n {
            return Vec::new();
        }
        match pattern.euclid_rot(k as usize, n as usize, rot) {
            Ok(p) => p.query(state),
            Err(_) => Vec::new(),
        }
    })
    .split_queries()
}

/// Read a plain number out of a node, looking through single-item
/// sequences; pattern-shaped nodes answer None
fn node_number(node: &Node) -> Option<f64> {
    match node {
        Node::Atom {
            value: AtomValue::Number(n),
            mods,
            ..
        } if mods.is_empty() => Some(*n),
        Node::Sequence { items, .. } if items.len() == 1 => node_number(&items[0]),
        Node::Subdivision { children, mods, .. } if children.len() == 1 && mods.is_empty() => {
            node_number(&children[0])
        }
        _ => None,
    }
}
