//! Exponentially-decaying averages.
//!
//! Each average follows `S1 = a * S0 + (1 - a) * Y` where `Y` is the new
//! observation and `a` is the decay factor
//!
//! ```text
//!    a = (1/2) ** (t / t_half)
//! t_half = T * ln(2)
//! ```
//!
//! with `t` the sample interval and `T` the mean lifetime (1, 5 and 15
//! minutes, as on Linux).

use std::time::Duration;

/// Interval between two samples. The decay factors below are only valid for
/// this interval.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Decay factor for the 1-minute average.
pub const DECAY_1MIN: f64 = 0.920_044_414_629_323_247_893_155_324_1;
/// Decay factor for the 5-minute average.
pub const DECAY_5MIN: f64 = 0.983_471_453_821_617_489_473_747_750_1;
/// Decay factor for the 15-minute average.
pub const DECAY_15MIN: f64 = 0.994_459_848_004_896_750_879_547_339_5;

/// Blend a new observation into a running average.
#[inline]
#[must_use]
pub fn update(previous: f64, observation: f64, decay: f64) -> f64 {
    decay * previous + (1.0 - decay) * observation
}

/// Decay factor for a given sample interval and mean lifetime.
#[must_use]
pub fn decay_factor(interval: Duration, mean_lifetime: Duration) -> f64 {
    let half_life = mean_lifetime.as_secs_f64() * std::f64::consts::LN_2;
    2f64.powf(-interval.as_secs_f64() / half_life)
}

/// The three averaging windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeClass {
    Short,
    Medium,
    Long,
}

impl TimeClass {
    pub const ALL: [TimeClass; 3] = [TimeClass::Short, TimeClass::Medium, TimeClass::Long];

    /// Mean lifetime `T` of the window.
    pub fn mean_lifetime(self) -> Duration {
        match self {
            Self::Short  => Duration::from_secs(60),
            Self::Medium => Duration::from_secs(5 * 60),
            Self::Long   => Duration::from_secs(15 * 60),
        }
    }

    /// Precomputed decay factor for [`SAMPLE_INTERVAL`].
    pub fn decay(self) -> f64 {
        match self {
            Self::Short  => DECAY_1MIN,
            Self::Medium => DECAY_5MIN,
            Self::Long   => DECAY_15MIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn constants_match_half_life_formula() {
        for class in TimeClass::ALL {
            let computed = decay_factor(SAMPLE_INTERVAL, class.mean_lifetime());
            assert!(
                (computed - class.decay()).abs() < EPS,
                "{class:?}: {computed} vs {}",
                class.decay()
            );
        }
    }

    #[test]
    fn first_observation_from_zero() {
        assert!((update(0.0, 4.0, 0.92) - 0.32).abs() < EPS);
    }

    #[test]
    fn long_window_decays_slowly() {
        assert!((update(1.0, 0.0, DECAY_15MIN) - 0.994_459_848_004_896_8).abs() < EPS);
    }

    #[test]
    fn result_is_between_previous_and_observation() {
        let cases = [(0.0, 10.0), (10.0, 0.0), (3.5, 3.5), (1.0, 250.0), (42.0, 7.0)];
        for (p, o) in cases {
            for d in [0.01, 0.5, DECAY_1MIN, DECAY_5MIN, DECAY_15MIN, 0.999] {
                let next = update(p, o, d);
                assert!(next >= p.min(o) - EPS && next <= p.max(o) + EPS, "update({p}, {o}, {d}) = {next}");
            }
        }
    }

    #[test]
    fn steady_input_is_a_fixed_point() {
        let mut avg = 2.0;
        for _ in 0..1_000 {
            avg = update(avg, 2.0, DECAY_5MIN);
        }
        assert!((avg - 2.0).abs() < EPS);
    }

    #[test]
    fn converges_monotonically_from_below_and_above() {
        for start in [0.0_f64, 20.0] {
            let target = 6.0;
            let mut avg = start;
            let mut gap = (avg - target).abs();
            for _ in 0..300 {
                avg = update(avg, target, DECAY_1MIN);
                let next_gap = (avg - target).abs();
                assert!(next_gap <= gap);
                gap = next_gap;
            }
            assert!(gap < 1e-6, "start {start}: still {gap} away");
        }
    }
}
