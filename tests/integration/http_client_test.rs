//! HTTP client against a mock backend

use crate::common::{manager_on, monitor, open_db, temp_db_path, test_config};
use crate::{assert_err, assert_ok};
use serde_json::json;
use siteforce_offline::client::api_client::IDEMPOTENCY_HEADER;
use siteforce_offline::client::config::Config;
use siteforce_offline::client::{ApiError, HttpApiClient, RemoteApi};
use siteforce_offline::shared::{ActionType, AppConfig, QueuedAction};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer, token: Option<&str>) -> HttpApiClient {
    let app = AppConfig::builder()
        .server_url(server.uri())
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let client = HttpApiClient::new(Config::from_app(app).unwrap()).unwrap();
    client.set_token(token.map(str::to_string)).await;
    client
}

#[tokio::test]
async fn test_clock_in_request_shape() {
    let server = MockServer::start().await;
    let action = QueuedAction::new(ActionType::ClockIn, json!({"lat": 1.35, "lng": 103.82}));

    Mock::given(method("POST"))
        .and(path("/api/attendance/clock-in"))
        .and(header("Authorization", "Bearer field-token"))
        .and(header(IDEMPOTENCY_HEADER, action.idempotency_key.to_string().as_str()))
        .and(body_json(json!({"lat": 1.35, "lng": 103.82})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("field-token")).await;
    assert_ok!(client.dispatch(&action).await);
}

#[tokio::test]
async fn test_task_progress_uses_put() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/tasks/12/progress"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    let action =
        QueuedAction::new(ActionType::UpdateProgress, json!({"taskId": 12, "progress": 75}));
    assert_ok!(client.dispatch(&action).await);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_status_errors_are_classified() {
    let server = MockServer::start().await;

    Mock::given(path("/api/attendance/clock-out"))
        .respond_with(ResponseTemplate::new(422).set_body_string("already clocked out"))
        .mount(&server)
        .await;
    Mock::given(path("/api/tasks/4/start"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;

    let rejected = client
        .dispatch(&QueuedAction::new(ActionType::ClockOut, json!({})))
        .await
        .unwrap_err();
    assert_eq!(rejected, ApiError::status(422, "already clocked out"));
    assert!(rejected.is_permanent());

    let unavailable = client
        .dispatch(&QueuedAction::new(ActionType::StartTask, json!({"taskId": 4})))
        .await
        .unwrap_err();
    assert!(!unavailable.is_permanent());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    assert_err!(
        client
            .dispatch(&QueuedAction::new(ActionType::ClockIn, json!({})))
            .await,
        ApiError::Timeout
    );
}

#[tokio::test]
async fn test_fetch_collection_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 1}, {"id": 2}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"date": "2024-05-01"}])))
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    assert_eq!(assert_ok!(client.fetch_collection("tasks").await).len(), 2);
    assert_eq!(assert_ok!(client.fetch_collection("attendance").await).len(), 1);
}

#[tokio::test]
async fn test_offline_queue_replays_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/attendance/clock-in"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/21/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db_path();
    let api = Arc::new(client_for(&server, Some("token")).await);
    let manager = manager_on(open_db(&db_path).await, api, monitor(false), test_config()).await;

    manager.queue_action(ActionType::ClockIn, json!({"lat": 1.0, "lng": 2.0})).await.unwrap();
    manager
        .queue_action(ActionType::StartTask, json!({"taskId": 21}))
        .await
        .unwrap();

    let report = manager.on_connectivity_change(true).await.unwrap();
    assert_eq!(report.succeeded, 2);

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(paths, vec!["/api/attendance/clock-in", "/api/tasks/21/start"]);
    assert_ne!(
        requests[0].headers.get(IDEMPOTENCY_HEADER),
        requests[1].headers.get(IDEMPOTENCY_HEADER)
    );
}
