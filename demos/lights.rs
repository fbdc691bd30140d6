use std::env;
use std::time::Duration;

use halo_cloud::{HaloClient, LightCommand};

#[tokio::main]
async fn main() -> halo_cloud::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let username = args.get(1).expect("usage: lights <email> <password> [brightness]");
    let password = args.get(2).expect("usage: lights <email> <password> [brightness]");
    let brightness = args.get(3).and_then(|b| b.parse::<u32>().ok());

    let client = HaloClient::builder(username, password)
        .cache_ttl(Duration::from_secs(15))
        .build()?;
    client.authenticate().await?;

    let topology = client.discover().await?;
    let mut lights = topology.devices;
    lights.extend(topology.groups);

    let summary = halo_cloud::refresh_all(&mut lights).await;
    println!(
        "refreshed {} / failed {} / skipped {}",
        summary.refreshed, summary.failed, summary.skipped
    );

    for light in &mut lights {
        println!(
            "[{}] {}{} | on: {:?} | brightness: {:?} | white: {:?}K",
            light.pid(),
            light.name(),
            if light.is_group() { " (group)" } else { "" },
            light.is_on(),
            light.brightness(),
            light.color_temp(),
        );
        if let Some(level) = brightness {
            let cmd = LightCommand {
                brightness: Some(level),
                color_temp: None,
            };
            if let Err(e) = light.turn_on_with(cmd).await {
                eprintln!("failed to dim {}: {e}", light.name());
            }
        }
    }

    Ok(())
}
