mod common;

use std::time::Duration;

use common::{on_dim, session_mock, AUTH_HEADER};
use halo_cloud::{blocking, Credentials, HaloConfig};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn blocking_client_drives_full_flow() {
    let server = MockServer::start().await;
    session_mock().expect(1).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/user/locations"))
        .and(header("Authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"locations": [{"pid": 1}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/1/abstract_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "abstract_devices": [{"pid": 7, "name": "Porch", "product_id": 162}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/7/state"))
        .and(body_json(json!({"state": {"name": "dim", "value": "[200]"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"states": on_dim(true, 200)})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/7/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": on_dim(false, 0)})))
        .expect(0)
        .mount(&server)
        .await;

    let config = HaloConfig {
        base_url: server.uri(),
        cache_ttl: Duration::from_secs(60),
        ..Default::default()
    };

    tokio::task::spawn_blocking(move || {
        let client =
            blocking::HaloClient::setup_with(config, Credentials::new("user@example.com", "secret"))
                .unwrap();
        let locations = client.list_locations().unwrap();
        let mut devices = client.list_devices(&locations[0].pid).unwrap();
        assert_eq!(devices.len(), 1);

        let porch = &mut devices[0];
        assert_eq!(porch.name(), "Porch");
        porch.set_brightness(200).unwrap();
        assert!(!porch.update().unwrap());
        assert_eq!(porch.brightness(), Some(200));

        let summary = blocking::refresh_all(&mut devices);
        assert_eq!(summary.skipped, 1);
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_setup_surfaces_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let config = HaloConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    let result = tokio::task::spawn_blocking(move || {
        blocking::HaloClient::setup_with(config, Credentials::new("user@example.com", "secret"))
            .map(|_| ())
    })
    .await
    .unwrap();
    assert!(
        matches!(result, Err(halo_cloud::Error::Authentication { .. })),
        "got {result:?}"
    );
}
