#[macro_use]
extern crate serde;

mod error;
pub use error::DecodeError;

pub mod constants;

mod channel;
pub use channel::{PayloadShape, SensorChannel};

pub mod helpers;

pub mod legacy;

mod reading;
pub use reading::{Notification, SensorReading, SensorValue, Vector3};
