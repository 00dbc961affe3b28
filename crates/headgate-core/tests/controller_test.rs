#![allow(clippy::unwrap_used)]
//! Integration tests driving [`Controller`] against a mock backend.

use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use headgate_core::{
    BackendConfig, Command, CommandOutcome, Controller, CoreError, MappingRequest, NoticeLevel,
    ScheduleWindow, SessionPhase,
};

fn device_json(imei: &str, device_type: i32, status: bool, default_gv: bool) -> Value {
    json!({
        "imei": imei,
        "status": status,
        "starTime": null,
        "endTime": null,
        "deviceType": device_type,
        "defaultGV": default_gv,
    })
}

fn motor_json(imei: &str, status: bool) -> Value {
    device_json(imei, 1, status, false)
}

fn valve_json(imei: &str, status: bool, default_gv: bool) -> Value {
    device_json(imei, 2, status, default_gv)
}

fn config_for(server: &MockServer) -> BackendConfig {
    BackendConfig {
        base_url: server.uri().parse().unwrap(),
        ..BackendConfig::default()
    }
}

/// Mount the device list for `farm1`, then resume + connect.
async fn ready_controller(server: &MockServer, devices: Vec<Value>) -> Controller {
    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(devices)))
        .mount(server)
        .await;

    let controller = Controller::new(config_for(server)).unwrap();
    controller.resume("farm1").await.unwrap();
    controller.connect().await.unwrap();
    controller
}

async fn mount_upsert_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_builds_ready_session() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![motor_json("m-1", false), valve_json("gv-1", false, true)],
    )
    .await;

    assert_eq!(*controller.phase().borrow(), SessionPhase::Ready);
    let session = controller.session_snapshot();
    assert_eq!(session.user_name(), "farm1");
    assert!(session.motor().is_some());
    assert_eq!(session.valve_count(), 1);

    controller.shutdown().await;
}

#[tokio::test]
async fn sign_in_rejects_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let controller = Controller::new(config_for(&server)).unwrap();
    let err = controller
        .sign_in("farm1", &"wrong".into())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert_eq!(*controller.phase().borrow(), SessionPhase::LoggedOut);
}

#[tokio::test]
async fn sign_in_then_connect_reaches_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .and(body_json(json!({"userName": "farm1", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let controller = Controller::new(config_for(&server)).unwrap();
    controller.sign_in("farm1", &"pw".into()).await.unwrap();
    controller.connect().await.unwrap();

    assert_eq!(*controller.phase().borrow(), SessionPhase::Ready);
    assert!(controller.session_snapshot().is_empty());

    controller.shutdown().await;
}

#[tokio::test]
async fn execute_before_connect_is_not_logged_in() {
    let server = MockServer::start().await;
    let controller = Controller::new(config_for(&server)).unwrap();

    let err = controller.execute(Command::Refresh).await.unwrap_err();
    assert!(matches!(err, CoreError::NotLoggedIn));
}

#[tokio::test]
async fn sign_out_closes_the_session() {
    let server = MockServer::start().await;
    let controller = ready_controller(&server, vec![motor_json("m-1", true)]).await;

    controller.sign_out().await;

    assert_eq!(*controller.phase().borrow(), SessionPhase::LoggedOut);
    assert!(controller.session_snapshot().user_name().is_empty());
    let err = controller.execute(Command::Refresh).await.unwrap_err();
    assert!(matches!(err, CoreError::NotLoggedIn));
}

#[tokio::test]
async fn failed_initial_fetch_leaves_retry_path_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;

    let controller = Controller::new(config_for(&server)).unwrap();
    controller.resume("farm1").await.unwrap();
    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, CoreError::Backend { .. }));
    assert_eq!(*controller.phase().borrow(), SessionPhase::Failed);

    // The command processor is already running, so a manual refresh is
    // still routable (and fails with the backend error, not a channel
    // error).
    let err = controller.execute(Command::Refresh).await.unwrap_err();
    assert!(matches!(err, CoreError::Backend { .. }));

    controller.shutdown().await;
}

// ── Motor commands ───────────────────────────────────────────────────

#[tokio::test]
async fn motor_start_cascades_to_default_valves() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![
            motor_json("A", false),
            valve_json("B", false, true),
            valve_json("C", false, false),
        ],
    )
    .await;
    mount_upsert_ok(&server).await;
    let mut notices = controller.notices();

    let outcome = controller.execute(Command::StartMotor).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Ok);

    let session = controller.session_snapshot();
    assert!(session.motor().unwrap().active);
    assert!(session.valve("B").unwrap().active, "default valve follows");
    assert!(!session.valve("C").unwrap().active);

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Device data updated successfully!");

    controller.shutdown().await;
}

#[tokio::test]
async fn failed_write_leaves_session_unchanged() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![motor_json("A", false), valve_json("B", false, true)],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "plc offline"})))
        .mount(&server)
        .await;
    let mut notices = controller.notices();

    let before = controller.session_snapshot();
    let err = controller.execute(Command::StartMotor).await.unwrap_err();

    assert!(matches!(err, CoreError::Backend { status: Some(500), .. }));
    assert_eq!(
        controller.session_snapshot(),
        before,
        "failed write must not move local state"
    );
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);

    controller.shutdown().await;
}

#[tokio::test]
async fn schedule_motor_sends_window_and_applies_start() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![motor_json("A", false), valve_json("B", false, true)],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .and(body_json(json!({
            "imei": "A",
            "status": true,
            "starTime": "2024-03-10T08:30:00",
            "endTime": "2024-03-10T10:00:00",
        })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let window = ScheduleWindow::new(
        "2024-03-10T08:30:00".parse().unwrap(),
        "2024-03-10T10:00:00".parse().unwrap(),
    );
    controller
        .execute(Command::ScheduleMotor { window })
        .await
        .unwrap();

    let session = controller.session_snapshot();
    let motor = session.motor().unwrap();
    assert!(motor.active, "scheduling implies a start");
    assert_eq!(motor.reported_start, Some(window.start));
    assert!(session.valve("B").unwrap().active);

    controller.shutdown().await;
}

#[tokio::test]
async fn motor_command_without_motor_fails_before_network() {
    let server = MockServer::start().await;
    let controller = ready_controller(&server, vec![valve_json("gv-1", false, false)]).await;

    // No UpsertDeviceLive mock mounted: reaching the network would 404.
    let err = controller.execute(Command::StartMotor).await.unwrap_err();
    assert!(matches!(err, CoreError::NoMotor));

    controller.shutdown().await;
}

// ── Valve commands ───────────────────────────────────────────────────

#[tokio::test]
async fn valve_stop_touches_only_named_valve() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![valve_json("a", true, false), valve_json("b", true, false)],
    )
    .await;
    mount_upsert_ok(&server).await;

    controller
        .execute(Command::StopValve { imei: "a".into() })
        .await
        .unwrap();

    let session = controller.session_snapshot();
    assert!(!session.valve("a").unwrap().active);
    assert!(session.valve("b").unwrap().active);

    controller.shutdown().await;
}

#[tokio::test]
async fn unknown_valve_fails_before_network() {
    let server = MockServer::start().await;
    let controller = ready_controller(&server, vec![valve_json("a", false, false)]).await;

    let err = controller
        .execute(Command::StartValve { imei: "ghost".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValveNotFound { .. }));

    controller.shutdown().await;
}

#[tokio::test]
async fn set_default_valve_is_exclusive() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![valve_json("x", false, true), valve_json("y", false, false)],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/Device/UpdateDefaultGV"))
        .and(body_json(json!({"imei": "y"})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let mut notices = controller.notices();

    controller
        .execute(Command::SetDefaultValve { imei: "y".into() })
        .await
        .unwrap();

    let session = controller.session_snapshot();
    let defaults: Vec<_> = session
        .valves()
        .iter()
        .filter(|v| v.default_valve)
        .map(|v| v.imei.as_str())
        .collect();
    assert_eq!(defaults, vec!["y"]);
    assert_eq!(notices.try_recv().unwrap().message, "Default Gate Valve Updated");

    controller.shutdown().await;
}

// ── Mapping and refresh ──────────────────────────────────────────────

#[tokio::test]
async fn register_mapping_posts_then_refreshes() {
    let server = MockServer::start().await;
    let controller = ready_controller(&server, vec![motor_json("m-1", false)]).await;
    Mock::given(method("POST"))
        .and(path("/device/upsert-mapping"))
        .and(body_json(json!({
            "userName": "farm1",
            "tPImei": "m-1",
            "gVImei": "gv-9",
            "tpActive": true,
            "gvActive": true,
            "defaultGV": false,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller
        .execute(Command::RegisterMapping(MappingRequest::new("m-1", "gv-9")))
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Ok);

    controller.shutdown().await;
}

#[tokio::test]
async fn invalid_mapping_rejected_before_network() {
    let server = MockServer::start().await;
    let controller = ready_controller(&server, vec![motor_json("m-1", false)]).await;

    let err = controller
        .execute(Command::RegisterMapping(MappingRequest::new("", "gv-9")))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    controller.shutdown().await;
}

#[tokio::test]
async fn refresh_reports_device_count() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![motor_json("m-1", false), valve_json("gv-1", false, false)],
    )
    .await;

    let outcome = controller.execute(Command::Refresh).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Refreshed { device_count: 2 });

    controller.shutdown().await;
}

// ── Local carousel operations ────────────────────────────────────────

#[tokio::test]
async fn carousel_moves_publish_snapshots() {
    let server = MockServer::start().await;
    let controller = ready_controller(
        &server,
        vec![
            valve_json("a", false, false),
            valve_json("b", false, false),
            valve_json("c", false, false),
        ],
    )
    .await;

    controller.next_valve().await;
    assert_eq!(
        controller.session_snapshot().current_valve().unwrap().imei,
        "b"
    );

    controller.previous_valve().await;
    controller.previous_valve().await;
    assert_eq!(
        controller.session_snapshot().current_valve().unwrap().imei,
        "c",
        "previous from the first valve wraps to the last"
    );

    controller.select_valve("a").await.unwrap();
    assert_eq!(controller.session_snapshot().valve_position(), Some((1, 3)));

    controller.shutdown().await;
}

// ── One-shot mode ────────────────────────────────────────────────────

#[tokio::test]
async fn oneshot_runs_and_tears_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([motor_json("m-1", true), valve_json("gv-1", true, true)])),
        )
        .mount(&server)
        .await;

    let count = Controller::oneshot(config_for(&server), "farm1", |ctrl| async move {
        Ok(ctrl.session_snapshot().valve_count())
    })
    .await
    .unwrap();

    assert_eq!(count, 1);
}
