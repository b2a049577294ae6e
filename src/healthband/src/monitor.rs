use std::{collections::BTreeMap, fmt::Write};

use chrono::{DateTime, Local};
use healthband_algos::{TrendSummary, TrendWindow};
use healthband_codec::{SensorChannel, constants::NO_DATA};

use crate::{
    config::{GraphSeries, StoreConfig},
    store::StoreView,
};

/// Rolling history of the plotted series, fed from store snapshots.
#[derive(Debug, Clone)]
pub struct SeriesTrends {
    windows: BTreeMap<GraphSeries, TrendWindow>,
    last_seen: BTreeMap<GraphSeries, DateTime<Local>>,
}

impl SeriesTrends {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: GraphSeries::ALL
                .into_iter()
                .map(|series| (series, TrendWindow::new(capacity)))
                .collect(),
            last_seen: BTreeMap::new(),
        }
    }

    /// Records readings that arrived since the previous call. Capacity
    /// follows `graph_data_points`.
    pub fn sample(&mut self, view: &StoreView, config: &StoreConfig) {
        for (series, window) in &mut self.windows {
            if window.capacity() != config.graph_data_points {
                window.set_capacity(config.graph_data_points);
            }

            let channel = series.channel();
            let Some(reading) = view.reading(channel) else {
                continue;
            };
            let Some(value) = reading.value.as_scalar() else {
                continue;
            };

            if self.last_seen.get(series) == Some(&reading.time) {
                continue;
            }
            self.last_seen.insert(*series, reading.time);
            window.push(reading.time, value);
        }
    }

    pub fn window(&self, series: GraphSeries) -> Option<&TrendWindow> {
        self.windows.get(&series)
    }

    pub fn summary(&self, series: GraphSeries) -> Option<TrendSummary> {
        self.windows.get(&series)?.summary()
    }
}

/// One status line per visible channel, then alarms and trends.
pub fn render(view: &StoreView, config: &StoreConfig, trends: &SeriesTrends) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Connection: {}", view.connection_state);

    for channel in SensorChannel::ALL {
        if !config.is_visible(channel) {
            continue;
        }

        let value = match channel {
            SensorChannel::Accel | SensorChannel::Gyro => view
                .calibrated(channel)
                .map(|v| v.to_string()),
            _ => view.reading(channel).map(|r| r.value.to_string()),
        };
        let _ = writeln!(
            out,
            "{:>10}: {}",
            channel,
            value.as_deref().unwrap_or(NO_DATA)
        );
    }

    if config.is_visible(SensorChannel::Accel) {
        let linear = view
            .linear_acceleration
            .map(|v| format!("{:.2} m/s²", v))
            .unwrap_or_else(|| NO_DATA.to_owned());
        let _ = writeln!(out, "{:>10}: {}", "linear", linear);
    }

    for series in GraphSeries::ALL {
        if !config.is_visible(series.channel()) {
            continue;
        }
        if let Some(summary) = trends.summary(series) {
            let _ = writeln!(
                out,
                "{:>10}: min {:.1} max {:.1} mean {:.1} over {} points",
                format!("{} trend", series),
                summary.min,
                summary.max,
                summary.mean,
                summary.count
            );
        }
    }

    if view.active_alarms.is_empty() {
        let _ = writeln!(out, "Alarms: none");
    } else {
        let alarms: Vec<String> = view.active_alarms.iter().map(|a| a.to_string()).collect();
        let _ = writeln!(out, "Alarms: {}", alarms.join(", "));
    }

    if view.rejected_payloads > 0 {
        let _ = writeln!(out, "Rejected payloads: {}", view.rejected_payloads);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::{config::ConfigUpdate, store::SensorStore};

    #[test]
    fn samples_each_reading_once() {
        let store = SensorStore::default();
        let config = store.config();
        let mut trends = SeriesTrends::new(config.graph_data_points);
        let start = Local::now();

        store.update(SensorChannel::HeartRate, b"70", start);
        trends.sample(&store.snapshot(), &config);
        trends.sample(&store.snapshot(), &config);
        store.update(SensorChannel::HeartRate, b"80", start + TimeDelta::seconds(1));
        trends.sample(&store.snapshot(), &config);

        let summary = trends.summary(GraphSeries::Hr).unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 75.0);
        assert_eq!(summary.latest, 80.0);
        assert!(trends.summary(GraphSeries::Spo2).is_none());
    }

    #[test]
    fn follows_graph_point_setting() {
        let store = SensorStore::default();
        store
            .set_config(ConfigUpdate::default().with_graph_data_points(10))
            .unwrap();
        let config = store.config();
        let mut trends = SeriesTrends::new(100);
        let start = Local::now();

        for i in 0..25 {
            store.update(SensorChannel::Temp, b"36.6", start + TimeDelta::seconds(i));
            trends.sample(&store.snapshot(), &config);
        }

        let window = trends.window(GraphSeries::Temp).unwrap();
        assert_eq!(window.capacity(), 10);
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn render_hides_invisible_channels() {
        let store = SensorStore::default();
        store
            .set_config(ConfigUpdate::default().with_visibility(SensorChannel::Gyro, false))
            .unwrap();
        store.update(SensorChannel::HeartRate, b"45", Local::now());

        let config = store.config();
        let view = store.snapshot();
        let mut trends = SeriesTrends::new(config.graph_data_points);
        trends.sample(&view, &config);
        let text = render(&view, &config, &trends);

        assert!(text.contains("Connection: disconnected"));
        assert!(text.contains("heart_rate: 45"));
        assert!(text.contains("accel: N/A"));
        assert!(!text.contains("gyro:"));
        assert!(text.contains("Alarms: Low Heart Rate"));
    }
}
