use uuid::{Uuid, uuid};

pub const HEALTHBAND_SERVICE: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");
pub const ACCEL_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");
pub const GYRO_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a9");
pub const SPO2_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26aa");
pub const HEART_RATE_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26ab");
pub const TEMP_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26ac");
// internal temperature sensor
pub const HEART_TEMP_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26af");
pub const PEDOMETER_CHAR: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26b0");

/// Standard gravity, used to turn readings in g into m/s².
pub const GRAVITY: f64 = 9.81;

/// Placeholder written wherever a channel has not reported yet.
pub const NO_DATA: &str = "N/A";
