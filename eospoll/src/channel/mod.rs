//! Channel layer for output accumulation and pattern matching.
//!
//! This module handles framing of the raw terminal stream: ANSI stripping,
//! tail search for prompts and incremental scanning for error patterns.

mod buffer;
mod patterns;

pub use buffer::PatternBuffer;
pub use patterns::{CompiledPattern, PatternMatch, PatternMatcher, PatternSet};
