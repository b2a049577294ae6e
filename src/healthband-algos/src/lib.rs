pub(crate) mod alarm;
pub use alarm::{AlarmEvaluator, AlarmKind, AlarmThresholds, Vitals};

pub(crate) mod bias;
pub use bias::BiasAccumulator;

pub(crate) mod trend;
pub use trend::{TrendSummary, TrendWindow};
