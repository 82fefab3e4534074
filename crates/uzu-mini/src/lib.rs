//! Mini notation front end for uzu patterns.
//!
//! This crate parses the mini-notation string DSL into a syntax tree,
//! interprets the tree into [`uzu_core::Pattern`] values, and provides
//! the control-parameter layer (`ctrl`) whose arguments may themselves
//! be numbers, patterns or mini-notation strings.
//!
//! # Examples
//!
//! ```
//! use uzu_mini::{ctrl, pattern};
//!
//! let drums = pattern("bd sd [bd bd] sd").unwrap();
//! let filtered = ctrl::lpf(&drums, "<400 800>");
//! assert_eq!(filtered.query_cycle(0).len(), 5);
//! ```
//!
//! # Mini notation
//!
//! - Sequences: `bd sd cp`, weighted with `@`, stretched with `_`
//! - Grouping: `[bd sd] cp`, alternation `<bd sd>`, polymeter
//!   `{bd sd, hh oh cp}` with optional `%n`
//! - Layering `,` and per-cycle random choice `|`
//! - Modifiers: `*n`, `/n`, `!n`, `?p`, Euclidean `(k,n,off)`
//! - Rests `~` / `-`, sample selection `bd:3`

pub mod ast;
pub mod ctrl;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;


pub use ast::{AtomValue, EuclidArgs, Mods, Node, SourceSpan};
pub use ctrl::{canonical_key, set_param, set_param_with_offset, ParamArg};
pub use error::{ParseError, Result};
pub use interp::interpret;
pub use lexer::{Lexer, Token};
pub use parser::{parse, Parser};

use uzu_core::Pattern;

/// Parse and interpret a mini-notation string in one step
pub fn pattern(source: &str) -> Result<Pattern> {
    parse(source).map(|node| interpret(&node))
}
