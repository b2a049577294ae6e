use std::{
    fmt,
    ops::{Add, Div, Mul, Sub},
};

use chrono::{DateTime, Local};

use crate::{
    DecodeError, PayloadShape, SensorChannel, constants::GRAVITY, helpers::TextPayload, legacy,
};

/// Per-axis triple, used for motion readings and their calibration biases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// One gravity unit along z, what a level device at rest reads.
    pub const GRAVITY_Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Magnitude of the acceleration with bias and gravity removed, in m/s².
    pub fn linear_acceleration(self, bias: Vector3) -> f64 {
        ((self - bias - Self::GRAVITY_Z) * GRAVITY).magnitude()
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vector3 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&legacy::format_triple(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorValue {
    Vector(Vector3),
    Scalar(f64),
    Count(u64),
}

impl SensorValue {
    pub fn decode(shape: PayloadShape, payload: &[u8]) -> Result<Self, DecodeError> {
        match shape {
            PayloadShape::Triple => Ok(Self::Vector(payload.fields::<3>()?.into())),
            PayloadShape::Scalar => Ok(Self::Scalar(payload.scalar()?)),
            PayloadShape::Count => Ok(Self::Count(payload.count()?)),
        }
    }

    pub fn as_vector(&self) -> Option<Vector3> {
        match self {
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Count(v) => Some(*v as f64),
            Self::Vector(_) => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(v) => write!(f, "{}", v),
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Count(v) => write!(f, "{}", v),
        }
    }
}

/// A decoded notification. Superseded, never merged, by the next one on the
/// same channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub channel: SensorChannel,
    pub value: SensorValue,
    pub time: DateTime<Local>,
}

impl SensorReading {
    pub fn decode(
        channel: SensorChannel,
        payload: &[u8],
        time: DateTime<Local>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            channel,
            value: SensorValue::decode(channel.shape(), payload)?,
            time,
        })
    }
}

/// Raw notification as handed over by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub channel: SensorChannel,
    pub payload: Vec<u8>,
    pub time: DateTime<Local>,
}

impl Notification {
    pub fn new(channel: SensorChannel, payload: Vec<u8>) -> Self {
        Self {
            channel,
            payload,
            time: Local::now(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Notification {{ channel: {}, payload: {} }}",
            self.channel,
            hex::encode(&self.payload)
        )
    }
}
