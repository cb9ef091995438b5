use std::sync::Arc;
use std::time::Duration;

use eos_sauna::{Coordinator, Endpoint, Error, SnapshotKind, Transport};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> Arc<Transport> {
    Arc::new(Transport::new(server.uri(), Duration::from_secs(2)).unwrap())
}

async fn mount_status(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path_regex(r"/usr/eos/is$"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_uses_device_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__//usr/eos/setdev"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Td": "90"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server).fetch(Endpoint::Settings).await.unwrap();
    assert_eq!(body["Td"], "90");
}

#[tokio::test]
async fn send_posts_single_key_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/usr/eos/setcld$"))
        .and(body_json(json!({"Lc": 40})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let resp = transport(&server)
        .send(Endpoint::Control, "Lc", 40)
        .await
        .unwrap();
    assert_eq!(resp["ok"], 1);
}

#[tokio::test]
async fn unauthorized_and_forbidden_are_auth_errors() {
    for code in [401u16, 403] {
        let server = MockServer::start().await;
        mount_status(&server, ResponseTemplate::new(code)).await;

        let err = transport(&server).fetch(Endpoint::Status).await.unwrap_err();
        assert!(
            matches!(err, Error::Auth { status, .. } if status == code),
            "{code}: got {err:?}"
        );
        assert!(!err.is_transient());
    }
}

#[tokio::test]
async fn server_error_is_communication() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(500)).await;

    let err = transport(&server).fetch(Endpoint::Status).await.unwrap_err();
    assert!(matches!(err, Error::Communication { .. }), "got {err:?}");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn invalid_json_is_client_error() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

    let err = transport(&server).fetch(Endpoint::Status).await.unwrap_err();
    assert!(matches!(err, Error::Client { .. }), "got {err:?}");
}

#[tokio::test]
async fn empty_body_decodes_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/usr/eos/setcld$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let resp = transport(&server)
        .send(Endpoint::Control, "Sxc", 1)
        .await
        .unwrap();
    assert!(resp.is_null());
}

#[tokio::test]
async fn slow_device_times_out() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"S": 0}))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let transport = Transport::new(server.uri(), Duration::from_millis(200)).unwrap();
    let err = transport.fetch(Endpoint::Status).await.unwrap_err();
    assert!(matches!(err, Error::Communication { .. }), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_is_communication() {
    let transport = Transport::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = transport.fetch(Endpoint::Status).await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

#[tokio::test]
async fn concurrent_refreshes_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/usr/eos/is$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"S": 1, "T": 70}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    );
    let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(coordinator.state().refreshes(), 1);
}

#[tokio::test]
async fn concurrent_refreshes_share_one_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/usr/eos/is$"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    );
    let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());
    assert!(a.is_err());
    assert!(matches!(b, Err(Error::Communication { .. })));
    assert!(!coordinator.last_update_success());
}

#[tokio::test]
async fn sequential_refreshes_each_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/usr/eos/is$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"S": 0})))
        .expect(2)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    );
    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.state().refreshes(), 2);
}

#[tokio::test]
async fn request_refresh_runs_in_background() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(json!({"S": 3}))).await;

    let coordinator = Arc::new(Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    ));
    assert!(coordinator.snapshot().is_none());

    coordinator.request_refresh().await.unwrap();
    assert_eq!(coordinator.snapshot().unwrap().int("S"), Some(3));
}

#[tokio::test]
async fn requested_refresh_fetches_again_after_completed_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"/usr/eos/is$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"S": 0})))
        .expect(2)
        .mount(&server)
        .await;

    let coordinator = Arc::new(Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    ));
    coordinator.refresh().await.unwrap();
    coordinator.request_refresh().await.unwrap();
    assert_eq!(coordinator.state().refreshes(), 2);
}

#[tokio::test]
async fn shutdown_cancels_pending_refresh() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"S": 1}))
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let coordinator = Arc::new(Coordinator::new(
        SnapshotKind::ActualStatus,
        Duration::from_secs(10),
        transport(&server),
    ));
    let pending = coordinator.request_refresh();
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.shutdown().await;

    assert!(pending.is_finished());
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(coordinator.snapshot().is_none());
    assert_eq!(coordinator.state().refreshes(), 0);
}
