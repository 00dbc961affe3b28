#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use headgate_api::types::{DeviceMapping, RegisterRequest, UpsertDeviceLive};
use headgate_api::{ApiClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn secret(s: &str) -> secrecy::SecretString {
    s.to_string().into()
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .and(body_json(json!({
            "userName": "farm1",
            "password": "pump-house",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.login("farm1", &secret("pump-house")).await.unwrap();
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "Invalid username or password" })),
        )
        .mount(&server)
        .await;

    let result = client.login("farm1", &secret("wrong")).await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert!(
                message.contains("Invalid username or password"),
                "expected backend message, got: {message}"
            );
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Auth/Login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.login("farm1", &secret("pump-house")).await;

    assert!(
        matches!(result, Err(Error::Api { status: 500, .. })),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_register_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Auth/Register"))
        .and(body_json(json!({
            "userName": "farm2",
            "firstName": "Priya",
            "lastName": "Nair",
            "email": "priya@example.com",
            "password": "well-field-9",
            "imei": "862817041234567",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let request = RegisterRequest {
        user_name: "farm2".into(),
        first_name: "Priya".into(),
        last_name: "Nair".into(),
        email: "priya@example.com".into(),
        password: "well-field-9".into(),
        imei: "862817041234567".into(),
    };

    client.register(&request).await.unwrap();
}

#[tokio::test]
async fn test_register_duplicate() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Auth/Register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "User already exists" })),
        )
        .mount(&server)
        .await;

    let request = RegisterRequest {
        user_name: "farm1".into(),
        first_name: "Priya".into(),
        last_name: "Nair".into(),
        email: "priya@example.com".into(),
        password: "well-field-9".into(),
        imei: "862817041234567".into(),
    };

    let result = client.register(&request).await;

    match result {
        Err(Error::Registration {
            ref message,
            status: 409,
        }) => {
            assert!(
                message.contains("already exists"),
                "expected duplicate message, got: {message}"
            );
        }
        other => panic!("expected Registration error, got: {other:?}"),
    }
}

// ── Device tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_user_devices_preserves_backend_order() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "imei": "gv-2", "status": false, "deviceType": 2, "defaultGV": false,
            "starTime": null, "endTime": null
        },
        {
            "imei": "motor-1", "status": true, "deviceType": 1, "defaultGV": false,
            "starTime": "2024-03-10T13:30:00", "endTime": "2024-03-10T15:00:00"
        },
        {
            "imei": "gv-1", "status": true, "deviceType": 2, "defaultGV": true,
            "starTime": null, "endTime": null
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = client.user_devices("farm1").await.unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].imei, "gv-2");
    assert_eq!(devices[1].imei, "motor-1");
    assert_eq!(devices[2].imei, "gv-1");
    assert!(devices[2].default_gv);
    assert_eq!(
        devices[1].star_time.as_deref(),
        Some("2024-03-10T13:30:00")
    );
}

#[tokio::test]
async fn test_user_devices_empty_account_is_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/Device/UserData/newfarm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let devices = client.user_devices("newfarm").await.unwrap();

    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_upsert_device_live_sends_null_times() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .and(body_json(json!({
            "imei": "motor-1",
            "status": true,
            "starTime": null,
            "endTime": null,
        })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client.set_device_status("motor-1", true).await.unwrap();
}

#[tokio::test]
async fn test_upsert_device_live_sends_schedule() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .and(body_json(json!({
            "imei": "motor-1",
            "status": true,
            "starTime": "2024-03-10T13:30:00",
            "endTime": "2024-03-10T15:00:00",
        })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client
        .upsert_device_live(&UpsertDeviceLive {
            imei: "motor-1".into(),
            status: true,
            star_time: Some("2024-03-10T13:30:00".into()),
            end_time: Some("2024-03-10T15:00:00".into()),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_default_gv() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Device/UpdateDefaultGV"))
        .and(body_json(json!({ "imei": "gv-1" })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client.update_default_gv("gv-1").await.unwrap();
}

#[tokio::test]
async fn test_upsert_mapping_field_names() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/device/upsert-mapping"))
        .and(body_json(json!({
            "userName": "farm1",
            "tPImei": "motor-1",
            "gVImei": "gv-1",
            "tpActive": true,
            "gvActive": true,
            "defaultGV": false,
        })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client
        .upsert_mapping(&DeviceMapping {
            user_name: "farm1".into(),
            tp_imei: "motor-1".into(),
            gv_imei: "gv-1".into(),
            tp_active: true,
            gv_active: true,
            default_gv: false,
        })
        .await
        .unwrap();
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_device_fetch() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.user_devices("farm1").await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_backend_error_message_extraction() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/Device/UpsertDeviceLive"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Unknown IMEI" })),
        )
        .mount(&server)
        .await;

    let result = client.set_device_status("bogus", true).await;

    match result {
        Err(Error::Api {
            ref message,
            status: 400,
        }) => {
            assert!(
                message.contains("Unknown IMEI"),
                "expected backend message, got: {message}"
            );
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_device_payload() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/Device/UserData/farm1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let result = client.user_devices("farm1").await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}
