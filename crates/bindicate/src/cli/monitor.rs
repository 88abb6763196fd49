//! `monitor` — hold the link open and log lifecycle transitions.

use std::path::Path;

use bindicate_lib::connection::BleManager;
use bindicate_lib::topology::ConfigTopology;

use super::{BindicateError, Result};

pub async fn cmd_monitor(config_path: Option<&Path>) -> Result<()> {
    let (config, warnings) = super::load_config(config_path);
    for warning in &warnings {
        log::warn!("{warning}");
    }
    let topology = ConfigTopology::new(config);

    let (ble, link) = BleManager::new(topology.peripheral_address()).await?;
    let runner = tokio::spawn(ble.run());

    println!("Monitoring link to {} (Ctrl+C to stop)", topology.peripheral_address());
    let mut status = link.subscribe();
    println!("state: {}", *status.borrow_and_update());

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    return Err(BindicateError::NotConnected);
                }
                println!("state: {}", *status.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
        }
    }

    runner.abort();
    Ok(())
}
