use std::{collections::BTreeMap, ops::RangeInclusive};

use healthband_algos::AlarmThresholds;
use healthband_codec::SensorChannel;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ConfigError;

pub const SPO2_RANGE: RangeInclusive<i64> = 0..=100;
pub const HEART_RATE_RANGE: RangeInclusive<i64> = 0..=300;
pub const GRAPH_POINTS_RANGE: RangeInclusive<i64> = 10..=1000;

/// Plotted series a colour can be assigned to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GraphSeries {
    Temp,
    HeartTemp,
    Hr,
    Spo2,
}

impl GraphSeries {
    pub const ALL: [Self; 4] = [Self::Temp, Self::HeartTemp, Self::Hr, Self::Spo2];

    pub fn channel(self) -> SensorChannel {
        match self {
            Self::Temp => SensorChannel::Temp,
            Self::HeartTemp => SensorChannel::HeartTemp,
            Self::Hr => SensorChannel::HeartRate,
            Self::Spo2 => SensorChannel::Spo2,
        }
    }
}

/// Display and alarm settings the front end can change at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub visible_sensors: BTreeMap<SensorChannel, bool>,
    pub graph_colors: BTreeMap<GraphSeries, String>,
    pub alarm_thresholds: AlarmThresholds,
    pub graph_data_points: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            visible_sensors: SensorChannel::ALL.into_iter().map(|c| (c, true)).collect(),
            graph_colors: BTreeMap::from([
                (GraphSeries::Temp, "blue".to_owned()),
                (GraphSeries::HeartTemp, "red".to_owned()),
                (GraphSeries::Hr, "green".to_owned()),
                (GraphSeries::Spo2, "purple".to_owned()),
            ]),
            alarm_thresholds: AlarmThresholds::default(),
            graph_data_points: 100,
        }
    }
}

/// Partial update; `None` leaves a setting as it is, maps are merged by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub visible_sensors: Option<BTreeMap<SensorChannel, bool>>,
    pub graph_colors: Option<BTreeMap<GraphSeries, String>>,
    pub alarm_thresholds: Option<AlarmThresholds>,
    pub graph_data_points: Option<usize>,
}

impl ConfigUpdate {
    pub fn with_thresholds(mut self, thresholds: AlarmThresholds) -> Self {
        self.alarm_thresholds = Some(thresholds);
        self
    }

    pub fn with_graph_data_points(mut self, points: usize) -> Self {
        self.graph_data_points = Some(points);
        self
    }

    pub fn with_visibility(mut self, channel: SensorChannel, visible: bool) -> Self {
        self.visible_sensors
            .get_or_insert_with(BTreeMap::new)
            .insert(channel, visible);
        self
    }

    pub fn with_color(mut self, series: GraphSeries, color: impl Into<String>) -> Self {
        self.graph_colors
            .get_or_insert_with(BTreeMap::new)
            .insert(series, color.into());
        self
    }
}

impl StoreConfig {
    /// Applies `update` on a copy. Nothing is merged unless every value is
    /// in range.
    pub fn merged(&self, update: ConfigUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();

        if let Some(visible) = update.visible_sensors {
            next.visible_sensors.extend(visible);
        }

        if let Some(colors) = update.graph_colors {
            for (series, color) in colors {
                let color = color.trim();
                if color.is_empty() {
                    return Err(ConfigError::EmptyColor(series.to_string()));
                }
                next.graph_colors.insert(series, color.to_owned());
            }
        }

        if let Some(thresholds) = update.alarm_thresholds {
            validate_thresholds(&thresholds)?;
            next.alarm_thresholds = thresholds;
        }

        if let Some(points) = update.graph_data_points {
            let value = i64::try_from(points).unwrap_or(i64::MAX);
            check_range("graph_data_points", value, GRAPH_POINTS_RANGE)?;
            next.graph_data_points = points;
        }

        Ok(next)
    }

    pub fn is_visible(&self, channel: SensorChannel) -> bool {
        self.visible_sensors.get(&channel).copied().unwrap_or(true)
    }
}

fn validate_thresholds(thresholds: &AlarmThresholds) -> Result<(), ConfigError> {
    check_range("spo2_low", thresholds.spo2_low.into(), SPO2_RANGE)?;
    check_range("heart_rate_low", thresholds.heart_rate_low.into(), HEART_RATE_RANGE)?;
    check_range("heart_rate_high", thresholds.heart_rate_high.into(), HEART_RATE_RANGE)?;

    if thresholds.heart_rate_low > thresholds.heart_rate_high {
        return Err(ConfigError::InvertedHeartRateRange {
            low: thresholds.heart_rate_low,
            high: thresholds.heart_rate_high,
        });
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: i64,
    range: RangeInclusive<i64>,
) -> Result<(), ConfigError> {
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_show_everything() {
        let config = StoreConfig::default();
        for channel in SensorChannel::ALL {
            assert!(config.is_visible(channel));
        }
        assert_eq!(config.graph_colors[&GraphSeries::Hr], "green");
        assert_eq!(config.alarm_thresholds.spo2_low, 90);
    }

    #[test]
    fn merge_keeps_unmentioned_settings() {
        let config = StoreConfig::default();
        let next = config
            .merged(
                ConfigUpdate::default()
                    .with_visibility(SensorChannel::Gyro, false)
                    .with_color(GraphSeries::Spo2, "orange"),
            )
            .unwrap();

        assert!(!next.is_visible(SensorChannel::Gyro));
        assert!(next.is_visible(SensorChannel::Accel));
        assert_eq!(next.graph_colors[&GraphSeries::Spo2], "orange");
        assert_eq!(next.graph_colors[&GraphSeries::Temp], "blue");
        assert_eq!(next.alarm_thresholds, config.alarm_thresholds);
    }

    #[test]
    fn spo2_threshold_out_of_range_rejected() {
        let thresholds = AlarmThresholds {
            spo2_low: 101,
            ..Default::default()
        };
        let err = StoreConfig::default()
            .merged(ConfigUpdate::default().with_thresholds(thresholds))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                field: "spo2_low",
                value: 101,
                min: 0,
                max: 100
            }
        );
    }

    #[test]
    fn inverted_heart_rate_rejected() {
        let thresholds = AlarmThresholds {
            spo2_low: 90,
            heart_rate_low: 120,
            heart_rate_high: 80,
        };
        assert!(
            StoreConfig::default()
                .merged(ConfigUpdate::default().with_thresholds(thresholds))
                .is_err()
        );
    }

    #[test]
    fn graph_points_bounds() {
        let config = StoreConfig::default();
        assert_eq!(
            config.merged(ConfigUpdate::default().with_graph_data_points(usize::MAX)),
            Err(ConfigError::OutOfRange {
                field: "graph_data_points",
                value: i64::MAX,
                min: 10,
                max: 1000
            })
        );
        assert!(config.merged(ConfigUpdate::default().with_graph_data_points(9)).is_err());
        assert!(config.merged(ConfigUpdate::default().with_graph_data_points(1001)).is_err());
        let next = config
            .merged(ConfigUpdate::default().with_graph_data_points(1000))
            .unwrap();
        assert_eq!(next.graph_data_points, 1000);
    }

    #[test]
    fn rejection_is_all_or_nothing() {
        let config = StoreConfig::default();
        let update = ConfigUpdate::default()
            .with_visibility(SensorChannel::Temp, false)
            .with_graph_data_points(5);
        assert!(config.merged(update).is_err());
        assert!(config.is_visible(SensorChannel::Temp));
    }

    #[test]
    fn blank_color_rejected() {
        let update = ConfigUpdate::default().with_color(GraphSeries::Hr, "  ");
        assert_eq!(
            StoreConfig::default().merged(update),
            Err(ConfigError::EmptyColor("hr".into()))
        );
    }

    #[test]
    fn series_names() {
        assert_eq!("hearttemp".parse::<GraphSeries>().unwrap(), GraphSeries::HeartTemp);
        assert_eq!(GraphSeries::Hr.to_string(), "hr");
    }
}
