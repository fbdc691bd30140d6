#![allow(dead_code)]

use std::time::Duration;

use halo_cloud::HaloClient;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "tok-123";
pub const AUTH_HEADER: &str = "Token tok-123";

pub fn session_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "credentials": { "auth_token": TOKEN }
        })))
}

pub async fn authed_client(server: &MockServer) -> HaloClient {
    authed_client_with_ttl(server, Duration::from_secs(60)).await
}

pub async fn authed_client_with_ttl(server: &MockServer, ttl: Duration) -> HaloClient {
    session_mock().mount(server).await;
    let client = HaloClient::builder("user@example.com", "secret")
        .base_url(server.uri())
        .cache_ttl(ttl)
        .build()
        .expect("client should build");
    client.authenticate().await.expect("authenticate should succeed");
    client
}

pub fn named(name: &str, value: Value, humanized: Value) -> Value {
    json!({ "name": name, "value": value, "humanized": humanized })
}

pub fn on_dim(on: bool, dim: u32) -> Value {
    json!([
        named("on_off", json!(format!("[{}]", u8::from(on))), json!(if on { "On" } else { "Off" })),
        named("dim", json!(format!("[{dim}]")), json!(dim)),
    ])
}
