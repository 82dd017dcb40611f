pub mod errors;
pub mod feed;
pub mod model;
pub mod store;

pub use errors::{Error, Result};
pub use feed::LiveFrame;
pub use model::{
    initial_table, parse_timestamp, seed_table, table_from_json, table_to_json, with_reading,
    without_camera, CameraReading, CameraReadingTable, Coordinates,
};
pub use store::{camera_store, CameraStore, Store, Subscription};
