//! Pattern composition and query engine for uzu live coding.
//!
//! A [`Pattern`] is a pure, lazy function from a half-open rational
//! [`TimeSpan`] to the events ([`Hap`]s) active within it. Patterns are
//! built by constructors ([`pure`], [`silence`], the signal generators)
//! and composed by a combinator algebra: concatenation, layering, time
//! dilation, conditional rewrites, probabilistic degradation and
//! pattern-of-patterns binds. An external scheduler drives playback by
//! querying bounded windows through the [`transport`] module.
//!
//! # Examples
//!
//! ```
//! use uzu_core::{fastcat, pure, Value};
//!
//! let pattern = fastcat(vec![
//!     pure(Value::from("bd")),
//!     pure(Value::from("sd")),
//! ]);
//! let haps = pattern.query_cycle(0);
//! assert_eq!(haps.len(), 2);
//! ```
//!
//! All timing is exact rational arithmetic ([`Fraction`]); floats only
//! appear at the scheduler boundary and inside signal waveforms.

pub mod algebra;
pub mod combinators;
pub mod conditional;
pub mod error;
pub mod euclid;
pub mod fraction;
pub mod hap;
pub mod pattern;
pub mod rng;
pub mod signal;
pub mod state;
pub mod structure;
pub mod time;
pub mod timespan;
pub mod transport;
pub mod value;

pub use combinators::{
    append, choose, choose_weighted, fastcat, from_cycles, from_haps, polymeter, pure, sequence,
    silence, slowcat, stack, steady, timecat,
};
pub use error::{PatternError, Result};
pub use euclid::{bjorklund, rotate};
pub use fraction::Fraction;
pub use hap::{Context, Hap, Location};
pub use pattern::{Pattern, TimeFn};
pub use signal::{cosine, irand, isaw, perlin, rand, saw, signal, sine, square, tri};
pub use state::State;
pub use timespan::TimeSpan;
pub use transport::{
    detect_period, expand_for_transport, expand_for_transport_auto, SchedulerHap, SchedulerSpan,
    TransportBundle,
};
pub use value::Value;
