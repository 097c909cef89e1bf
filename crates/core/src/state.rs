use crate::decay::{update, TimeClass};
use chrono::{DateTime, Local};

/// The three running load averages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadAverage {
    /// 1-minute average.
    pub short: f64,
    /// 5-minute average.
    pub medium: f64,
    /// 15-minute average.
    pub long: f64,
}

impl LoadAverage {
    fn slot(&mut self, class: TimeClass) -> &mut f64 {
        match class {
            TimeClass::Short  => &mut self.short,
            TimeClass::Medium => &mut self.medium,
            TimeClass::Long   => &mut self.long,
        }
    }

    /// Feed one observation into all three windows.
    pub fn observe(&mut self, observation: f64) {
        for class in TimeClass::ALL {
            let slot = self.slot(class);
            *slot = update(*slot, observation, class.decay());
        }
    }
}

/// What the sampler publishes after every tick; readers always get a
/// consistent copy.
#[derive(Debug, Clone, Default)]
pub struct LoadSnapshot {
    pub averages: LoadAverage,
    /// Successful samples since start.
    pub samples: u64,
    /// Failed samples since start.
    pub failures: u64,
    /// Raw queue length of the last successful sample.
    pub last_observation: Option<u32>,
    /// When the averages last changed.
    pub updated_at: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::{DECAY_15MIN, DECAY_1MIN, DECAY_5MIN};

    #[test]
    fn starts_at_zero() {
        assert_eq!(LoadAverage::default(), LoadAverage { short: 0.0, medium: 0.0, long: 0.0 });
    }

    #[test]
    fn observe_updates_every_window_with_its_own_factor() {
        let mut avg = LoadAverage::default();
        avg.observe(4.0);
        assert!((avg.short  - 4.0 * (1.0 - DECAY_1MIN)).abs()  < 1e-12);
        assert!((avg.medium - 4.0 * (1.0 - DECAY_5MIN)).abs()  < 1e-12);
        assert!((avg.long   - 4.0 * (1.0 - DECAY_15MIN)).abs() < 1e-12);
        // Shorter windows react faster.
        assert!(avg.short > avg.medium && avg.medium > avg.long);
    }
}
