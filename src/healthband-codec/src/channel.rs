use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};
use uuid::Uuid;

use crate::{DecodeError, constants::*};

/// One sensor data stream exposed by the band.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    Accel,
    Gyro,
    Spo2,
    HeartRate,
    Temp,
    #[strum(serialize = "hearttemp")]
    #[serde(rename = "hearttemp")]
    HeartTemp,
    Pedometer,
}

/// What a channel's text payload decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Triple,
    Scalar,
    Count,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; Self::COUNT] = [
        Self::Accel,
        Self::Gyro,
        Self::Spo2,
        Self::HeartRate,
        Self::Temp,
        Self::HeartTemp,
        Self::Pedometer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn shape(self) -> PayloadShape {
        match self {
            Self::Accel | Self::Gyro => PayloadShape::Triple,
            Self::Spo2 | Self::HeartRate | Self::Temp | Self::HeartTemp => PayloadShape::Scalar,
            Self::Pedometer => PayloadShape::Count,
        }
    }

    pub fn uuid(self) -> Uuid {
        match self {
            Self::Accel => ACCEL_CHAR,
            Self::Gyro => GYRO_CHAR,
            Self::Spo2 => SPO2_CHAR,
            Self::HeartRate => HEART_RATE_CHAR,
            Self::Temp => TEMP_CHAR,
            Self::HeartTemp => HEART_TEMP_CHAR,
            Self::Pedometer => PEDOMETER_CHAR,
        }
    }

    pub fn from_uuid(uuid: Uuid) -> Result<Self, DecodeError> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.uuid() == uuid)
            .ok_or(DecodeError::UnknownCharacteristic(uuid))
    }

    pub fn parse(name: &str) -> Result<Self, DecodeError> {
        name.parse()
            .map_err(|_| DecodeError::UnknownChannel(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_match_wire_names() {
        let names: Vec<_> = SensorChannel::iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "accel",
                "gyro",
                "spo2",
                "heart_rate",
                "temp",
                "hearttemp",
                "pedometer"
            ]
        );
    }

    #[test]
    fn all_is_ordered_by_index() {
        for (i, channel) in SensorChannel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn uuid_lookup_is_bijective() {
        for channel in SensorChannel::iter() {
            assert_eq!(SensorChannel::from_uuid(channel.uuid()), Ok(channel));
        }
    }

    #[test]
    fn unknown_uuid_errors() {
        let err = SensorChannel::from_uuid(HEALTHBAND_SERVICE).unwrap_err();
        assert_eq!(err, DecodeError::UnknownCharacteristic(HEALTHBAND_SERVICE));
    }

    #[test]
    fn parse_by_name() {
        assert_eq!(SensorChannel::parse("heart_rate"), Ok(SensorChannel::HeartRate));
        assert_eq!(SensorChannel::parse("hearttemp"), Ok(SensorChannel::HeartTemp));
        assert!(SensorChannel::parse("ecg").is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&SensorChannel::HeartTemp).unwrap();
        assert_eq!(json, "\"hearttemp\"");
        let channel: SensorChannel = serde_json::from_str("\"spo2\"").unwrap();
        assert_eq!(channel, SensorChannel::Spo2);
    }
}
