//! Euclidean rhythm generation using the Bjorklund algorithm.

use crate::combinators::{fastcat, pure};
use crate::error::{PatternError, Result};
use crate::{Pattern, Value};

/// Distribute `pulses` onsets as evenly as possible over `steps` slots.
///
/// Works by repeatedly zipping the shorter group list onto the longer
/// one, carrying the remainder forward, until the remainder is at most
/// one group.
pub fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    if pulses == 0 {
        return vec![false; steps];
    }
    if pulses >= steps {
        return vec![true; steps];
    }

    let mut groups: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut remainder: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];

    while remainder.len() > 1 {
        let pairs = groups.len().min(remainder.len());
        let mut zipped: Vec<Vec<bool>> = Vec::with_capacity(pairs);
        for (group, tail) in groups.iter().zip(remainder.iter()).take(pairs) {
            let mut combined = group.clone();
            combined.extend_from_slice(tail);
            zipped.push(combined);
        }
        let leftover = if groups.len() > pairs {
            groups.split_off(pairs)
        } else {
            remainder.split_off(pairs)
        };
        groups = zipped;
        remainder = leftover;
    }

    groups.into_iter().chain(remainder).flatten().collect()
}

/// Rotate a rhythm left by `offset` steps (modulo its length)
pub fn rotate(mut bits: Vec<bool>, offset: i64) -> Vec<bool> {
    if bits.is_empty() {
        return bits;
    }
    let len = bits.len() as i64;
    bits.rotate_left(offset.rem_euclid(len) as usize);
    bits
}

fn rhythm_pattern(bits: Vec<bool>) -> Pattern {
    fastcat(bits.into_iter().map(|b| pure(Value::Bool(b))).collect())
}

impl Pattern {
    /// Keep `pulses` evenly distributed onsets out of `steps` per cycle,
    /// each occupying its `1/steps` slot
    pub fn euclid(&self, pulses: usize, steps: usize) -> Result<Pattern> {
        self.euclid_rot(pulses, steps, 0)
    }

    /// Euclidean rhythm with the pulse grid rotated left
    pub fn euclid_rot(&self, pulses: usize, steps: usize, rotation: i64) -> Result<Pattern> {
        if steps == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        if pulses > steps {
            return Err(PatternError::InvalidEuclid { pulses, steps });
        }
        let bits = rotate(bjorklund(pulses, steps), rotation);
        Ok(self.struct_(&rhythm_pattern(bits)))
    }

    /// Play the complement of the Euclidean rhythm
    pub fn euclid_inv(&self, pulses: usize, steps: usize, rotation: i64) -> Result<Pattern> {
        if steps == 0 {
            return Err(PatternError::InvalidCount(0));
        }
        if pulses > steps {
            return Err(PatternError::InvalidEuclid { pulses, steps });
        }
        let bits: Vec<bool> = rotate(bjorklund(pulses, steps), rotation)
            .into_iter()
            .map(|b| !b)
            .collect();
        Ok(self.struct_(&rhythm_pattern(bits)))
    }
}
