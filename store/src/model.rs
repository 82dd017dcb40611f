use crate::errors::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Geographic position of a camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Latest sensor snapshot of one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraReading {
    pub id: String,
    pub coordinates: Coordinates,
    pub gas_concentration: f64,
    pub person_detected: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_update: DateTime<Utc>,
}

/// Parses an ISO-8601 timestamp. An offset is converted to UTC; a timestamp
/// without one is taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let rfc3339 = match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => return Ok(ts.with_timezone(&Utc)),
        Err(e) => e,
    };

    value
        .parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|naive| Error::Timestamp {
            value: value.to_string(),
            rfc3339,
            naive,
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_timestamp(&value).map_err(serde::de::Error::custom)
}

/// Camera id -> latest reading. Each key is expected to equal its reading's `id`,
/// but nothing here enforces it.
pub type CameraReadingTable = HashMap<String, CameraReading>;

/// The two cameras every fresh table starts with, stamped with `now`.
pub fn seed_table(now: DateTime<Utc>) -> CameraReadingTable {
    let seeds = [
        ("1", 51.505, -0.09, 25.0),
        ("2", 51.506, -0.10, 55.0),
    ];

    seeds
        .into_iter()
        .map(|(id, lat, lng, gas)| {
            let reading = CameraReading {
                id: id.to_string(),
                coordinates: Coordinates { lat, lng },
                gas_concentration: gas,
                person_detected: false,
                last_update: now,
            };
            (id.to_string(), reading)
        })
        .collect()
}

pub fn initial_table() -> CameraReadingTable {
    seed_table(Utc::now())
}

/// Returns `table` with the entry for `reading.id` replaced (or added) as a whole.
pub fn with_reading(table: &CameraReadingTable, reading: CameraReading) -> CameraReadingTable {
    let mut next = table.clone();
    next.insert(reading.id.clone(), reading);
    next
}

/// Returns `table` without the entry keyed `id`.
pub fn without_camera(table: &CameraReadingTable, id: &str) -> CameraReadingTable {
    let mut next = table.clone();
    next.remove(id);
    next
}

/// Serializes a table snapshot with keys in sorted order.
pub fn table_to_json(table: &CameraReadingTable) -> Result<String> {
    let ordered: BTreeMap<&String, &CameraReading> = table.iter().collect();
    Ok(serde_json::to_string(&ordered)?)
}

pub fn table_from_json(json: &str) -> Result<CameraReadingTable> {
    Ok(serde_json::from_str(json)?)
}
