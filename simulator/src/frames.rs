use camera_store::{CameraReading, CameraReadingTable, Coordinates, LiveFrame};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

const POSITION_JITTER: f64 = 0.0005;
const GAS_DRIFT: f64 = 3.0;
const GAS_SPIKE_RATE: f64 = 0.05;

/// Picks one of the table's cameras at random.
pub fn pick_camera(rng: &mut impl Rng, table: &CameraReadingTable) -> Option<CameraReading> {
    // Sorted so a seeded rng picks the same camera every run
    let mut ids: Vec<&String> = table.keys().collect();
    ids.sort();
    ids.choose(rng).map(|id| table[*id].clone())
}

/// Builds the next live frame for `previous`'s camera.
pub fn generate_frame(rng: &mut impl Rng, previous: &CameraReading, person_rate: f64) -> LiveFrame {
    let gas_concentration = if rng.gen_bool(GAS_SPIKE_RATE) {
        rng.gen_range(100.0..300.0) // 5% spikes
    } else {
        (previous.gas_concentration + rng.gen_range(-GAS_DRIFT..GAS_DRIFT)).max(0.0)
    };

    let coordinates = Coordinates {
        lat: previous.coordinates.lat + rng.gen_range(-POSITION_JITTER..POSITION_JITTER),
        lng: previous.coordinates.lng + rng.gen_range(-POSITION_JITTER..POSITION_JITTER),
    };

    LiveFrame {
        // Offset-less, as the live feed sends it; read back as UTC
        timestamp: Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        camera_id: previous.id.clone(),
        gas_concentration,
        person_detected: rng.gen_bool(person_rate),
        coordinates,
    }
}
