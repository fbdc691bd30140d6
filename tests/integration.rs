use halo_cloud::HaloClient;

/// Run with: cargo test --test integration -- --ignored
/// Requires a real account:
///   HALO_USERNAME=you@example.com HALO_PASSWORD=... cargo test --test integration -- --ignored
#[tokio::test]
#[ignore]
async fn authenticate_and_discover() {
    let username = std::env::var("HALO_USERNAME").expect("HALO_USERNAME not set");
    let password = std::env::var("HALO_PASSWORD").expect("HALO_PASSWORD not set");

    let client = HaloClient::setup(username, password)
        .await
        .expect("authentication failed");
    let mut topology = client.discover().await.expect("discovery failed");
    println!(
        "devices: {}, groups: {}, scenes: {}",
        topology.devices.len(),
        topology.groups.len(),
        topology.scenes.len()
    );

    let summary = halo_cloud::refresh_all(&mut topology.devices).await;
    assert_eq!(summary.failed, 0, "some devices failed to refresh");
    for device in &topology.devices {
        println!(
            "[{}] {} on={:?} brightness={:?} white={:?}",
            device.pid(),
            device.name(),
            device.is_on(),
            device.brightness(),
            device.color_temp()
        );
    }
}
