use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Bounded history of one plotted series. Holds at most `capacity` points,
/// dropping the oldest first.
#[derive(Debug, Clone)]
pub struct TrendWindow {
    capacity: usize,
    points: VecDeque<(DateTime<Local>, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub latest: f64,
    pub count: usize,
}

impl TrendWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, time: DateTime<Local>, value: f64) {
        self.points.push_back((time, value));
        self.trim();
    }

    /// Shrinking drops the oldest points immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    pub fn points(&self) -> impl Iterator<Item = &(DateTime<Local>, f64)> {
        self.points.iter()
    }

    pub fn summary(&self) -> Option<TrendSummary> {
        let (_, latest) = *self.points.back()?;
        let count = self.points.len();
        let (min, max, sum) = self.points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &(_, v)| (min.min(v), max.max(v), sum + v),
        );

        Some(TrendSummary {
            min,
            max,
            mean: sum / count as f64,
            latest,
            count,
        })
    }

    fn trim(&mut self) {
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }
}
