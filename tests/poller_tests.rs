use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tuya_pool_heatpump::{Credentials, DeviceStatus, DpValue, Event, Poller, TuyaClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN: &str = "/v1.0/iot-01/associated-users/actions/authorized-login";

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true, "code": 0, "msg": "", "result": result, "t": 0, "tid": ""
    }))
}

fn token() -> Value {
    json!({
        "access_token": "session_token",
        "refresh_token": "session_refresh",
        "expire_time": 7200,
        "uid": "uid"
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1.0/token"))
        .respond_with(ok(token()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ok(token()))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> TuyaClient {
    let creds = Credentials::new("id", "key", server.uri()).user("u", "p", 1);
    TuyaClient::builder(creds).build().unwrap()
}

#[tokio::test]
async fn first_poll_reports_all_points_then_only_changes() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/devices/pool/status"))
        .respond_with(ok(json!([
            {"code": "switch", "value": true},
            {"code": "temp_current", "value": 280}
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();

    let mut poller = Poller::new(client(&server))
        .device("pool")
        .on_event(move |event| {
            events_clone.lock().unwrap().push(event.clone());
        });

    poller.poll_once().await;
    assert_eq!(events.lock().unwrap().len(), 2, "first poll should report every point");

    Mock::given(method("GET"))
        .and(path("/v1.0/devices/pool/status"))
        .respond_with(ok(json!([
            {"code": "switch", "value": true},
            {"code": "temp_current", "value": 285}
        ])))
        .mount(&server)
        .await;

    poller.poll_once().await;
    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert_eq!(
        captured[2],
        Event::StatusChanged {
            device_id: "pool".into(),
            code: "temp_current".into(),
            value: DpValue::Integer(285),
        }
    );
    assert_eq!(
        poller.last_status("pool").unwrap()[1],
        DeviceStatus::new("temp_current", 285)
    );
}

#[tokio::test]
async fn failing_device_is_skipped() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1.0/devices/broken/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/devices/spa/status"))
        .respond_with(ok(json!([{"code": "mode", "value": "Heating_Smart"}])))
        .mount(&server)
        .await;

    let snapshots: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
    let snapshots_clone = snapshots.clone();

    let mut poller = Poller::new(client(&server))
        .device("broken")
        .device("spa")
        .on_snapshot(move |device_id, status| {
            assert_eq!(status.len(), 1);
            snapshots_clone.lock().unwrap().push(device_id.to_string());
        });

    poller.poll_once().await;
    assert_eq!(*snapshots.lock().unwrap(), vec!["spa".to_string()]);
    assert!(poller.last_status("broken").is_none());
}

#[tokio::test]
async fn authenticate_with_retry_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "code": 1004, "msg": "sign invalid"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let mut poller = Poller::new(client(&server));
    let err = poller
        .authenticate_with_retry(3, Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("sign invalid"));
}

#[tokio::test]
async fn authenticate_with_retry_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/token"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_login(&server).await;

    let mut poller = Poller::new(client(&server));
    poller
        .authenticate_with_retry(3, Duration::from_millis(1))
        .await
        .expect("second attempt should succeed");
    assert!(poller.client().lease().is_some());
}
