use std::env;

use halo_cloud::blocking;

fn main() -> halo_cloud::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let username = args.get(1).expect("usage: scenes <email> <password> [scene name]");
    let password = args.get(2).expect("usage: scenes <email> <password> [scene name]");
    let wanted = args.get(3);

    let client = blocking::HaloClient::setup(username, password)?;
    for location in client.list_locations()? {
        println!("Location {} ({})", location.pid, location.name.as_deref().unwrap_or("-"));
        for mut scene in client.list_scenes(&location.pid)? {
            println!("  [{}] {} active: {:?}", scene.pid(), scene.name(), scene.is_on());
            if wanted.is_some_and(|name| name == scene.name()) {
                scene.turn_on()?;
                println!("  activated {}", scene.name());
            }
        }
    }
    Ok(())
}
