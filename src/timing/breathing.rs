//! Named breathing patterns for guided breathwork.

use crate::models::BreathPattern;

/// The default pattern when a structure does not recommend one.
pub const NATURAL_PATTERN: BreathPattern = BreathPattern {
    inhale_seconds: 4.0,
    hold_seconds: 0.0,
    exhale_seconds: 6.0,
    rest_seconds: 2.0,
};

/// Look up a pattern by its conventional name.
///
/// Recognized names: `4-7-8`, `box`, `natural`, `calm`.
pub fn named_pattern(name: &str) -> Option<BreathPattern> {
    match name {
        "4-7-8" => Some(BreathPattern {
            inhale_seconds: 4.0,
            hold_seconds: 7.0,
            exhale_seconds: 8.0,
            rest_seconds: 2.0,
        }),
        "box" => Some(BreathPattern {
            inhale_seconds: 4.0,
            hold_seconds: 4.0,
            exhale_seconds: 4.0,
            rest_seconds: 4.0,
        }),
        "natural" => Some(NATURAL_PATTERN),
        "calm" => Some(BreathPattern {
            inhale_seconds: 3.0,
            hold_seconds: 0.0,
            exhale_seconds: 5.0,
            rest_seconds: 2.0,
        }),
        _ => None,
    }
}

/// How many full cycles of `pattern` fit into a window of `window_seconds`.
pub fn fit_cycles(pattern: &BreathPattern, window_seconds: f64) -> u32 {
    let cycle = pattern.cycle_seconds();
    if cycle <= 0.0 || window_seconds <= 0.0 {
        return 0;
    }
    (window_seconds / cycle).floor() as u32
}

/// Human-readable instruction line for a repeated pattern.
pub fn describe_pattern(pattern: &BreathPattern, cycles: u32) -> String {
    format!(
        "Repeat {} times: Inhale {}s, Hold {}s, Exhale {}s, Rest {}s",
        cycles,
        pattern.inhale_seconds,
        pattern.hold_seconds,
        pattern.exhale_seconds,
        pattern.rest_seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_patterns() {
        let relax = named_pattern("4-7-8").unwrap();
        assert_eq!(relax.cycle_seconds(), 21.0);
        assert!(named_pattern("ujjayi").is_none());
    }

    #[test]
    fn test_fit_cycles_floors() {
        let pattern = named_pattern("box").unwrap();
        assert_eq!(fit_cycles(&pattern, 60.0), 3);
        assert_eq!(fit_cycles(&pattern, 15.0), 0);
    }

    #[test]
    fn test_describe_pattern() {
        let line = describe_pattern(&NATURAL_PATTERN, 3);
        assert_eq!(line, "Repeat 3 times: Inhale 4s, Hold 0s, Exhale 6s, Rest 2s");
    }
}
