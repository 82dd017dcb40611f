use camera_store::{
    camera_store, with_reading, CameraReading, CameraReadingTable, CameraStore, Coordinates,
    Subscription,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::thread;

fn random_reading(rng: &mut impl Rng, id: String) -> CameraReading {
    CameraReading {
        id,
        coordinates: Coordinates {
            lat: rng.gen_range(-90.0..90.0),
            lng: rng.gen_range(-180.0..180.0),
        },
        gas_concentration: rng.gen_range(0.0..500.0),
        person_detected: rng.gen_bool(0.3),
        last_update: Utc::now() - Duration::seconds(rng.gen_range(0..3600)),
    }
}

fn random_table(rng: &mut impl Rng) -> CameraReadingTable {
    let cameras = rng.gen_range(0..8);
    (0..cameras)
        .map(|i| {
            let id = format!("cam-{}", i);
            (id.clone(), random_reading(&mut *rng, id))
        })
        .collect()
}

/// Observer that records every table it is handed
fn record(
    store: &CameraStore,
) -> (
    Arc<Mutex<Vec<CameraReadingTable>>>,
    Subscription<CameraReadingTable>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = store.subscribe(move |table: &CameraReadingTable| {
        sink.lock().unwrap().push(table.clone());
    });
    (seen, sub)
}

#[test]
fn test_initial_state() {
    let before: DateTime<Utc> = Utc::now();
    let store = camera_store();
    let after: DateTime<Utc> = Utc::now();

    let table = store.get();
    assert_eq!(table.len(), 2);

    let expected = [("1", 51.505, -0.09, 25.0), ("2", 51.506, -0.10, 55.0)];
    for (id, lat, lng, gas) in expected {
        let reading = &table[id];
        assert_eq!(reading.id, id);
        assert_eq!(reading.coordinates, Coordinates { lat, lng });
        assert_eq!(reading.gas_concentration, gas);
        assert!(!reading.person_detected);
        assert!(reading.last_update >= before && reading.last_update <= after);

        // Serialized timestamp is ISO-8601
        let json = serde_json::to_value(reading).unwrap();
        let stamp = json["lastUpdate"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}

#[test]
fn test_set_twice_notifies_twice() {
    let store = camera_store();
    let (seen, _sub) = record(&store);
    let table = random_table(&mut rand::thread_rng());

    store.set(table.clone());
    store.set(table.clone());

    assert_eq!(*store.get(), table);
    let seen = seen.lock().unwrap();
    // immediate call + one round per set
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[1], table);
    assert_eq!(seen[2], table);
}

#[test]
fn test_subscribe_invokes_immediately_with_current_table() {
    let store = camera_store();
    let replacement = random_table(&mut rand::thread_rng());
    store.set(replacement.clone());

    let (seen, _sub) = record(&store);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], replacement);
}

#[test]
fn test_update_matches_set_of_applied_function() {
    let mut rng = rand::thread_rng();

    for _ in 0..50 {
        let table = random_table(&mut rng);
        let extra_id = format!("cam-{}", rng.gen_range(0..10));
        let extra = random_reading(&mut rng, extra_id);
        let flip_all = |t: &CameraReadingTable| -> CameraReadingTable {
            t.iter()
                .map(|(k, r)| {
                    let mut r = r.clone();
                    r.person_detected = !r.person_detected;
                    (k.clone(), r)
                })
                .collect()
        };

        let store = camera_store();
        store.set(table.clone());
        store.update(|t| with_reading(t, extra.clone()));
        assert_eq!(*store.get(), with_reading(&table, extra.clone()));

        store.set(table.clone());
        store.update(flip_all);
        assert_eq!(*store.get(), flip_all(&table));
    }
}

#[test]
fn test_update_notifies_with_result() {
    let store = camera_store();
    let (seen, _sub) = record(&store);
    let reading = random_reading(&mut rand::thread_rng(), "1".to_string());

    store.update(|t| with_reading(t, reading.clone()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1]["1"], reading);
    assert_eq!(seen[1]["2"], seen[0]["2"]);
}

#[test]
fn test_unsubscribe_stops_notification() {
    let store = camera_store();
    let (seen, sub) = record(&store);
    let (other_seen, _other) = record(&store);

    sub.unsubscribe();
    store.set(CameraReadingTable::new());
    store.update(|t| t.clone());

    assert_eq!(seen.lock().unwrap().len(), 1);
    // Other subscriptions are independent
    assert_eq!(other_seen.lock().unwrap().len(), 3);
}

#[test]
fn test_observers_notified_in_subscription_order() {
    let store = camera_store();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut subs = Vec::new();
    for name in ["A", "B", "C"] {
        let order = Arc::clone(&order);
        subs.push(store.subscribe(move |_: &CameraReadingTable| {
            order.lock().unwrap().push(name);
        }));
    }
    order.lock().unwrap().clear();

    store.set(CameraReadingTable::new());
    store.update(|t| t.clone());

    assert_eq!(*order.lock().unwrap(), vec!["A", "B", "C", "A", "B", "C"]);
}

#[test]
fn test_no_validation_of_key_id_mismatch() {
    let store = camera_store();
    let mut table = CameraReadingTable::new();
    let reading = random_reading(&mut rand::thread_rng(), "cam-b".to_string());
    table.insert("cam-a".to_string(), reading);

    store.set(table.clone());

    assert_eq!(*store.get(), table);
}

#[test]
fn test_concurrent_updates_are_serialized() {
    let store = camera_store();
    store.set(CameraReadingTable::new());

    // Each round records the number of cameras it saw
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&sizes);
    let _sub = store.subscribe(move |table: &CameraReadingTable| {
        sink.lock().unwrap().push(table.len());
    });

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let store = store.clone();
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..25 {
                    let reading = random_reading(&mut rng, format!("w{}-{}", w, i));
                    store.update(|t| with_reading(t, reading));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.get().len(), 100);
    let sizes = sizes.lock().unwrap();
    assert_eq!(*sizes, (0..=100).collect::<Vec<_>>());
}

#[test]
fn test_late_subscriber_on_other_thread_sees_consistent_sequence() {
    let store = camera_store();
    let writer = store.clone();

    let handle = thread::spawn(move || {
        let mut rng = rand::thread_rng();
        for i in 0..50 {
            let reading = random_reading(&mut rng, format!("late-{}", i));
            writer.update(|t| with_reading(t, reading));
        }
    });

    let (seen, _sub) = record(&store);
    handle.join().unwrap();

    // Whatever point the subscription landed at, it saw every later table
    // exactly once and in order.
    let sizes: Vec<usize> = seen.lock().unwrap().iter().map(|t| t.len()).collect();
    let first = sizes[0];
    assert_eq!(sizes, (first..=52).collect::<Vec<_>>());
}
