use crate::config::Config;
use crate::frames::{generate_frame, pick_camera};
use crate::metrics::{FRAMES_TOTAL, FRAME_ERRORS_TOTAL};
use camera_store::{with_reading, CameraStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Feeds one generated frame per tick into `store` until the configured frame
/// count is reached or `shutdown` resolves. Returns the number of frames generated.
pub async fn run<F>(store: CameraStore, config: &Config, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    info!(
        "Starting frame loop with tick_ms={}, frames={}, person_rate={}",
        config.tick_ms, config.frames, config.person_rate
    );

    let mut rng = StdRng::from_entropy();
    let mut ticker = interval(Duration::from_millis(config.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut produced = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }

            _ = ticker.tick() => {
                let table = store.get();
                let Some(previous) = pick_camera(&mut rng, &table) else {
                    warn!("Reading table is empty, nothing to simulate");
                    continue;
                };

                let frame = generate_frame(&mut rng, &previous, config.person_rate);
                FRAMES_TOTAL.inc();
                produced += 1;

                debug!("Frame: {:?}", frame);

                match frame.into_reading() {
                    Ok(reading) => store.update(|t| with_reading(t, reading)),
                    Err(e) => {
                        FRAME_ERRORS_TOTAL.inc();
                        warn!("Dropping frame: {}", e);
                    }
                }

                if config.frames > 0 && produced >= config.frames {
                    info!("Reached {} frames", produced);
                    break;
                }
            }
        }
    }

    info!("Frame loop stopped");
    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_store::{camera_store, CameraReadingTable};
    use std::sync::{Arc, Mutex};

    fn config(frames: u64) -> Config {
        Config {
            tick_ms: 1,
            frames,
            person_rate: 0.5,
            emit_json: false,
        }
    }

    #[test]
    fn test_run_stops_after_frame_count() {
        tokio_test::block_on(async {
            let store = camera_store();
            let rounds = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&rounds);
            let sub = store.subscribe(move |table: &CameraReadingTable| {
                sink.lock().unwrap().push(table.clone());
            });

            let produced = run(store.clone(), &config(5), std::future::pending()).await;
            sub.unsubscribe();

            assert_eq!(produced, 5);
            let rounds = rounds.lock().unwrap();
            // immediate call + one round per frame
            assert_eq!(rounds.len(), 6);
            for table in rounds.iter() {
                assert_eq!(table.len(), 2);
            }
            // Every frame replaced a whole entry with jittered values
            assert!(rounds.windows(2).all(|pair| pair[0] != pair[1]));
        });
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        tokio_test::block_on(async {
            let store = camera_store();
            let before = store.get();

            let produced = run(store.clone(), &config(0), async {}).await;

            assert_eq!(produced, 0);
            assert_eq!(*store.get(), *before);
        });
    }

    #[test]
    fn test_run_skips_empty_table() {
        tokio_test::block_on(async {
            let store = camera_store();
            store.set(CameraReadingTable::new());

            let shutdown = tokio::time::sleep(Duration::from_millis(20));
            let produced = run(store.clone(), &config(3), shutdown).await;

            assert_eq!(produced, 0);
            assert!(store.get().is_empty());
        });
    }
}
