use std::sync::{Arc, Mutex};
use std::time::Duration;

use eos_sauna::{Event, SaunaClient, SnapshotKind};

/// Run with: EOS_SAUNA_ADDRESS=192.168.1.50 cargo test --test integration -- --ignored
/// Talks to a real controller. Read-only unless noted.
fn device_address() -> String {
    std::env::var("EOS_SAUNA_ADDRESS").expect("EOS_SAUNA_ADDRESS not set")
}

#[tokio::test]
#[ignore]
async fn open_read_close() {
    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();

    let mut client = SaunaClient::builder(device_address())
        .on_event(move |event| {
            events_clone.lock().unwrap().push(event.clone());
        })
        .build()
        .expect("bad address");

    client.check_connection().await.expect("device unreachable");
    client.open().await.expect("open failed");

    let status = client.actual_status().expect("no status snapshot");
    assert!(status.status.is_some(), "status should report S");
    let settings = client.desired_settings().expect("no settings snapshot");
    assert!(settings.target_temperature.is_some(), "settings should report Td");

    {
        let captured = events.lock().unwrap();
        assert!(!captured.is_empty(), "should have received initial events");
    }

    client.close().await;
    assert!(!client.is_open());
}

#[tokio::test]
#[ignore]
async fn polling_refreshes_status() {
    let mut client = SaunaClient::builder(device_address())
        .status_interval(Duration::from_secs(2))
        .build()
        .unwrap();
    client.open().await.unwrap();

    let mut rx = client.subscribe(SnapshotKind::ActualStatus).unwrap();
    let before = rx.borrow().refreshes();
    tokio::time::timeout(Duration::from_secs(10), rx.changed())
        .await
        .expect("no poll within 10s")
        .unwrap();
    assert!(rx.borrow().refreshes() > before);

    client.close().await;
}

/// Writes the current target temperature back unchanged.
#[tokio::test]
#[ignore]
async fn rewrite_target_temperature() {
    let mut client = SaunaClient::builder(device_address()).build().unwrap();
    client.open().await.unwrap();

    let target = client
        .desired_settings()
        .and_then(|s| s.target_temperature)
        .expect("no target temperature");
    client.set_target_temperature(target).await.unwrap();

    client.close().await;
}
