use crate::errors::Result;
use crate::model::{parse_timestamp, CameraReading, Coordinates};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// One frame of the camera live feed, as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFrame {
    /// ISO-8601, with or without a UTC offset
    pub timestamp: String,
    pub camera_id: String,
    pub gas_concentration: f64,
    pub person_detected: bool,
    pub coordinates: Coordinates,
}

impl LiveFrame {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_reading(reading: &CameraReading) -> Self {
        Self {
            timestamp: reading
                .last_update
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            camera_id: reading.id.clone(),
            gas_concentration: reading.gas_concentration,
            person_detected: reading.person_detected,
            coordinates: reading.coordinates,
        }
    }

    /// Converts the frame into the reading it reports. Timestamps without an
    /// offset are taken as UTC.
    pub fn into_reading(self) -> Result<CameraReading> {
        let last_update = parse_timestamp(&self.timestamp)?;

        Ok(CameraReading {
            id: self.camera_id,
            coordinates: self.coordinates,
            gas_concentration: self.gas_concentration,
            person_detected: self.person_detected,
            last_update,
        })
    }
}
