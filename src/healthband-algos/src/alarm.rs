use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

pub struct AlarmEvaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlarmKind {
    LowSpO2,
    LowHeartRate,
    HighHeartRate,
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LowSpO2 => "Low SpO2",
            Self::LowHeartRate => "Low Heart Rate",
            Self::HighHeartRate => "High Heart Rate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmThresholds {
    pub spo2_low: u32,
    pub heart_rate_low: u32,
    pub heart_rate_high: u32,
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self {
            spo2_low: 90,
            heart_rate_low: 60,
            heart_rate_high: 100,
        }
    }
}

/// The vitals alarms are raised on. `None` means the channel has not
/// reported yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vitals {
    pub spo2: Option<f64>,
    pub heart_rate: Option<f64>,
}

impl AlarmEvaluator {
    pub fn evaluate(vitals: &Vitals, thresholds: &AlarmThresholds) -> BTreeSet<AlarmKind> {
        let mut alarms = BTreeSet::new();

        if let Some(spo2) = vitals.spo2 {
            if spo2 < f64::from(thresholds.spo2_low) {
                alarms.insert(AlarmKind::LowSpO2);
            }
        }

        if let Some(hr) = vitals.heart_rate {
            if hr < f64::from(thresholds.heart_rate_low) {
                alarms.insert(AlarmKind::LowHeartRate);
            }
            if hr > f64::from(thresholds.heart_rate_high) {
                alarms.insert(AlarmKind::HighHeartRate);
            }
        }

        alarms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn thresholds() -> AlarmThresholds {
        AlarmThresholds::default()
    }

    #[test]
    fn nothing_known_no_alarms() {
        assert!(AlarmEvaluator::evaluate(&Vitals::default(), &thresholds()).is_empty());
    }

    #[test]
    fn low_heart_rate() {
        let vitals = Vitals {
            spo2: None,
            heart_rate: Some(45.0),
        };
        let alarms = AlarmEvaluator::evaluate(&vitals, &thresholds());
        assert_eq!(alarms, BTreeSet::from([AlarmKind::LowHeartRate]));
    }

    #[test]
    fn normal_heart_rate_clears() {
        let vitals = Vitals {
            spo2: None,
            heart_rate: Some(70.0),
        };
        assert!(AlarmEvaluator::evaluate(&vitals, &thresholds()).is_empty());
    }

    #[test]
    fn high_heart_rate_and_low_spo2() {
        let vitals = Vitals {
            spo2: Some(85.0),
            heart_rate: Some(130.0),
        };
        let alarms = AlarmEvaluator::evaluate(&vitals, &thresholds());
        assert_eq!(
            alarms,
            BTreeSet::from([AlarmKind::LowSpO2, AlarmKind::HighHeartRate])
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        let vitals = Vitals {
            spo2: Some(90.0),
            heart_rate: Some(60.0),
        };
        assert!(AlarmEvaluator::evaluate(&vitals, &thresholds()).is_empty());

        let vitals = Vitals {
            spo2: None,
            heart_rate: Some(100.0),
        };
        assert!(AlarmEvaluator::evaluate(&vitals, &thresholds()).is_empty());
    }

    #[test]
    fn unknown_spo2_never_alarms() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let thresholds = AlarmThresholds {
                spo2_low: rng.random_range(0..=100),
                heart_rate_low: 60,
                heart_rate_high: 100,
            };
            let vitals = Vitals {
                spo2: None,
                heart_rate: Some(rng.random_range(20.0..220.0)),
            };
            let alarms = AlarmEvaluator::evaluate(&vitals, &thresholds);
            assert!(!alarms.contains(&AlarmKind::LowSpO2));
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let vitals = Vitals {
                spo2: Some(rng.random_range(70.0..100.0)),
                heart_rate: Some(rng.random_range(30.0..180.0)),
            };
            let first = AlarmEvaluator::evaluate(&vitals, &thresholds());
            let second = AlarmEvaluator::evaluate(&vitals, &thresholds());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(AlarmKind::LowSpO2.to_string(), "Low SpO2");
        assert_eq!(AlarmKind::HighHeartRate.to_string(), "High Heart Rate");
    }
}
