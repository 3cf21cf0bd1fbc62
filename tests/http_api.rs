//! Integration tests for the operator API, exercising the full router over
//! real components with a stub feed and recording notification channel.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Value, json};
use undine::{
    alerting::{AlertDispatcher, AlertEngine},
    channels::ChannelNotifier,
    config::AppConfig,
    context::AppMetrics,
    history::HistoryWindow,
    http_server::{ApiState, router},
    models::{Channel, TelemetrySnapshot},
    persistence::sqlite::SqliteStateRepository,
    recipients::RecipientRegistry,
    settings::SettingsStore,
    telemetry::{FeedError, TelemetrySource},
    test_helpers::{ReadingBuilder, RecordingNotifier},
};

/// A telemetry source answering with a fixed critical reading.
struct StubFeed;

#[async_trait]
impl TelemetrySource for StubFeed {
    async fn fetch_snapshot(&self) -> Result<TelemetrySnapshot, FeedError> {
        let reading = ReadingBuilder::new().tds(152.0).build();
        Ok(TelemetrySnapshot { latest: Some(reading), history: vec![reading] })
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    telegram: Arc<RecordingNotifier>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn spawn_server(api_key: Option<&str>) -> TestServer {
    let config_content = r#"
        database_url: "sqlite::memory:"
        feed:
          channel_id: "000000"
        server:
          listen_address: "127.0.0.1:0"
        "#;
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("app.yaml"), config_content).unwrap();
    let mut config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();
    config.server.api_key = api_key.map(str::to_string);

    let repo = Arc::new(SqliteStateRepository::new("sqlite::memory:").await.unwrap());
    repo.run_migrations().await.unwrap();

    let telegram = Arc::new(RecordingNotifier::new(Channel::Telegram));
    let mut notifiers: HashMap<Channel, Arc<dyn ChannelNotifier>> = HashMap::new();
    notifiers.insert(Channel::Telegram, telegram.clone());

    let registry = Arc::new(RecipientRegistry::new(Arc::clone(&repo)));
    let dispatcher = Arc::new(AlertDispatcher::new(notifiers, Arc::clone(&registry)));
    let engine = Arc::new(AlertEngine::new(dispatcher, Arc::clone(&repo)));
    let settings = Arc::new(SettingsStore::new(None, Arc::clone(&repo)));

    let state = ApiState {
        config: Arc::new(config),
        settings,
        registry,
        engine,
        telemetry: Arc::new(StubFeed),
        history: Arc::new(HistoryWindow::new(40)),
        app_metrics: AppMetrics::default(),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        telegram,
    }
}

fn recipient_body(name: &str, chat_id: &str) -> Value {
    json!({
        "name": name,
        "telegram_chat_id": chat_id,
        "channels": ["telegram"],
    })
}

#[tokio::test]
async fn test_recipient_crud_flow() {
    let server = spawn_server(None).await;

    // Create.
    let created: Value = server
        .client
        .post(server.url("/alerts/recipients"))
        .json(&recipient_body("Ops", "101"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["id"], 1);
    assert_eq!(created["is_active"], true);

    // List (active-only default).
    let listed: Vec<Value> = server
        .client
        .get(server.url("/alerts/recipients"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // Toggle off: excluded from the active listing, retained overall.
    let toggled: Value = server
        .client
        .patch(server.url("/alerts/recipients/1/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["is_active"], false);

    let active: Vec<Value> = server
        .client
        .get(server.url("/alerts/recipients"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(active.is_empty());

    let all: Vec<Value> = server
        .client
        .get(server.url("/alerts/recipients?active_only=false"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    // Delete.
    let response = server
        .client
        .delete(server.url("/alerts/recipients/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_invalid_recipient_is_unprocessable() {
    let server = spawn_server(None).await;

    let response = server
        .client
        .post(server.url("/alerts/recipients"))
        .json(&json!({ "name": "No Address", "channels": ["telegram"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("telegram"));
}

#[tokio::test]
async fn test_settings_update_and_envelope() {
    let server = spawn_server(None).await;

    let updated: Value = server
        .client
        .post(server.url("/settings"))
        .json(&json!({ "tdsThreshold": 180.0, "modifiedBy": "admin" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["status"], "success");
    assert_eq!(updated["settings"]["tdsThreshold"], 180.0);
    assert_eq!(updated["settings"]["modifiedBy"], "admin");

    let fetched: Value = server
        .client
        .get(server.url("/settings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["settings"]["tdsThreshold"], 180.0);

    // Invalid update is rejected without partial application.
    let rejected = server
        .client
        .post(server.url("/settings"))
        .json(&json!({ "tdsThreshold": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    let reset: Value = server
        .client
        .post(server.url("/settings/reset"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reset["settings"]["tdsThreshold"], 150.0);
    assert_eq!(reset["settings"]["tempThreshold"], 35.0);
}

#[tokio::test]
async fn test_test_alert_reports_delivery_ratio() {
    let server = spawn_server(None).await;

    server
        .client
        .post(server.url("/alerts/recipients"))
        .json(&recipient_body("Ops", "101"))
        .send()
        .await
        .unwrap();

    let outcome: Value = server
        .client
        .post(server.url("/alerts/test"))
        .json(&json!({ "message": "manual check" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["sent_successfully"], 1);
    assert_eq!(outcome["recipients_total"], 1);
    assert_eq!(server.telegram.deliveries().len(), 1);
}

#[tokio::test]
async fn test_check_alerts_evaluates_feed_reading() {
    let server = spawn_server(None).await;

    server
        .client
        .post(server.url("/alerts/recipients"))
        .json(&recipient_body("Ops", "101"))
        .send()
        .await
        .unwrap();

    // The stub feed returns TDS 152 against the default threshold of 150.
    let report: Value = server
        .client
        .post(server.url("/check-alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["status"], "CRITICAL");
    assert_eq!(report["fired"].as_array().unwrap().len(), 1);

    // Immediately checking again lands inside the cooldown window.
    let second: Value = server
        .client
        .post(server.url("/check-alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(second["fired"].as_array().unwrap().is_empty());
    assert_eq!(second["suppressed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_endpoints_require_bearer_token() {
    let server = spawn_server(Some("secret-key")).await;

    let unauthorized = server
        .client
        .post(server.url("/settings"))
        .json(&json!({ "tdsThreshold": 175.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), reqwest::StatusCode::UNAUTHORIZED);

    let authorized = server
        .client
        .post(server.url("/settings"))
        .bearer_auth("secret-key")
        .json(&json!({ "tdsThreshold": 175.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), reqwest::StatusCode::OK);

    // Reads stay open.
    let read = server.client.get(server.url("/settings")).send().await.unwrap();
    assert_eq!(read.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn test_alert_status_shape() {
    let server = spawn_server(None).await;

    let status: Value = server
        .client
        .get(server.url("/alerts/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["telegram_enabled"], true);
    assert_eq!(status["active_recipients"], 0);
    assert_eq!(status["tds_threshold"], 150.0);
    assert_eq!(status["cooldown_minutes"], 15);
    assert_eq!(status["cooldowns"].as_array().unwrap().len(), 4);
}
