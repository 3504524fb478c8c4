//! HTTP API integration tests over a real listener

mod common;

use serde_json::{Value, json};

#[tokio::test]
async fn server_lifecycle_over_http() {
    let server = common::create_test_server(&[]).await;
    let http = reqwest::Client::new();

    let created: Value = http
        .post(server.url("/api/servers"))
        .json(&json!({
            "name": "box1",
            "host": "10.0.0.5",
            "port": 22,
            "username": "root",
            "authType": "password",
            "password": "x"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let listed: Vec<Value> = http
        .get(server.url("/api/servers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let box1 = listed.iter().find(|s| s["id"] == id.as_str()).unwrap();
    assert_eq!(box1["name"], "box1");
    assert!(box1.get("password").is_none());

    let response = http
        .delete(server.url(&format!("/api/servers/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let local = server.local_id().await;
    let response = http
        .delete(server.url(&format!("/api/servers/{}", local)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn local_server_ignores_redirect_fields() {
    let server = common::create_test_server(&[]).await;
    let http = reqwest::Client::new();
    let local = server.local_id().await;

    let updated: Value = http
        .put(server.url(&format!("/api/servers/{}", local)))
        .json(&json!({"name": "This host", "host": "evil.example", "port": 2222}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(updated["name"], "This host");
    assert_eq!(updated["authType"], "local");
    assert!(updated["host"].is_null());
    assert_eq!(updated["port"], 22);
}

#[tokio::test]
async fn health_counts_websocket_connections() {
    let server = common::create_test_server(&[]).await;
    let _client = common::client::TestClient::connect(server.addr).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let health: Value = reqwest::get(server.url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["activeConnections"], 1);
}
