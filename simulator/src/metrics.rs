use camera_store::CameraReadingTable;
use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref FRAMES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "camera_frames_total",
        "Total live frames generated"
    ))
    .unwrap();
    pub static ref FRAME_ERRORS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "camera_frame_errors_total",
        "Total frames that could not be converted into a reading"
    ))
    .unwrap();
    pub static ref TABLE_NOTIFICATIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "camera_table_notifications_total",
        "Total table snapshots delivered to the metrics observer"
    ))
    .unwrap();
    pub static ref TABLE_SIZE: Gauge = Gauge::with_opts(Opts::new(
        "camera_table_size",
        "Number of cameras in the reading table"
    ))
    .unwrap();
    pub static ref GAS_CONCENTRATION: GaugeVec = GaugeVec::new(
        Opts::new(
            "camera_gas_concentration",
            "Latest gas concentration reported per camera"
        ),
        &["camera_id"]
    )
    .unwrap();
    pub static ref PERSON_DETECTED: GaugeVec = GaugeVec::new(
        Opts::new(
            "camera_person_detected",
            "1 if the camera's latest reading detected a person"
        ),
        &["camera_id"]
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(FRAMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FRAME_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TABLE_NOTIFICATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TABLE_SIZE.clone()))?;
    REGISTRY.register(Box::new(GAS_CONCENTRATION.clone()))?;
    REGISTRY.register(Box::new(PERSON_DETECTED.clone()))?;
    Ok(())
}

/// Store observer mirroring the current table into the gauges.
pub fn record_table(table: &CameraReadingTable) {
    TABLE_NOTIFICATIONS_TOTAL.inc();
    TABLE_SIZE.set(table.len() as f64);

    // Cameras dropped from the table must not keep reporting
    GAS_CONCENTRATION.reset();
    PERSON_DETECTED.reset();

    for (id, reading) in table {
        GAS_CONCENTRATION
            .with_label_values(&[id.as_str()])
            .set(reading.gas_concentration);
        PERSON_DETECTED
            .with_label_values(&[id.as_str()])
            .set(if reading.person_detected { 1.0 } else { 0.0 });
    }
}

pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
