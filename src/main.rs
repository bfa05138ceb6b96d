use anyhow::{Context, Result};
use log::info;
use std::env;
use std::path::Path;

use lucid_bed_controller::{BedCommand, BedConfig, BedSession, BluestPeripheral};

fn print_usage() {
    eprintln!("Usage: lucid-bed-controller <address> [command]");
    eprintln!();
    eprintln!("Without a command, prints every state change until interrupted.");
    eprintln!("Commands:");
    for command in BedCommand::ALL.iter().filter(|c| !c.is_internal()) {
        eprintln!("  {}", command.name());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(address) = args.get(1) else {
        print_usage();
        std::process::exit(2);
    };

    let mut config = BedConfig::load_config(Path::new(".")).await?;
    config.address = address.clone();

    let peripheral = BluestPeripheral::new(&config.address)
        .await
        .context("Bluetooth adapter unavailable")?;
    let session = BedSession::connect(peripheral, config)
        .await
        .context("failed to establish bed session")?;

    match args.get(2) {
        Some(name) => {
            let state = session.send_command(name).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        None => {
            let mut changes = session.subscribe();
            info!("Watching for state changes, press Ctrl+C to exit");
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = *changes.borrow_and_update();
                        println!("{}", serde_json::to_string(&state)?);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        break;
                    }
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}
