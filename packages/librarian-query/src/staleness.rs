//! Staleness decay: a monotonically non-increasing multiplier applied to
//! a pack's confidence at read time, never persisted.

/// Exponential decay toward a 0.5 asymptote, calibrated so 30 days reads
/// close to 0.9. The exact shape isn't a documented requirement; only
/// monotonicity is.
const ASYMPTOTE: f64 = 0.5;
const DECAY_RATE_PER_DAY: f64 = 0.00744;

/// Multiplier in (ASYMPTOTE, 1.0] for `age_days` since last indexing.
pub fn decay(age_days: f64) -> f64 {
    let age_days = age_days.max(0.0);
    ASYMPTOTE + (1.0 - ASYMPTOTE) * (-DECAY_RATE_PER_DAY * age_days).exp()
}

/// Applies staleness decay to a base confidence at read time.
pub fn apply(base_confidence: f64, age_days: f64) -> f64 {
    (base_confidence * decay(age_days)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_reads_as_full_confidence() {
        assert!((decay(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn thirty_days_is_close_to_nine_tenths() {
        assert!((decay(30.0) - 0.9).abs() < 0.02);
    }

    #[test]
    fn one_hundred_eighty_days_is_noticeably_lower_than_thirty() {
        assert!(decay(180.0) < decay(30.0));
        assert!(decay(180.0) < 0.7);
    }

    #[test]
    fn decay_never_drops_below_the_asymptote() {
        assert!(decay(100_000.0) > ASYMPTOTE);
    }

    #[test]
    fn decay_is_monotone_non_increasing() {
        let mut previous = decay(0.0);
        for day in [1.0, 10.0, 30.0, 60.0, 180.0, 365.0, 1000.0] {
            let current = decay(day);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn applying_decay_to_a_base_of_point_eight_drops_with_age() {
        let base = 0.8;
        let today = apply(base, 0.0);
        let thirty = apply(base, 30.0);
        let one_eighty = apply(base, 180.0);
        assert!((today - 0.8).abs() < 1e-9);
        assert!(thirty < base);
        assert!(one_eighty < thirty);
    }
}
