//! Deterministic timing orchestration.
//!
//! The calculator turns an authored script plus a target duration into an
//! exact, contiguous timeline; `breathing` holds the named breathing-pattern
//! table the content stage draws from.

pub mod breathing;
pub mod calculator;

pub use breathing::{describe_pattern, fit_cycles, named_pattern, NATURAL_PATTERN};
pub use calculator::{calculate_timing, speech_seconds, SECONDS_PER_WORD, WORDS_PER_MINUTE};
