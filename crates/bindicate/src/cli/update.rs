//! `update` — push a bindicator set to the strip controller.

use std::path::Path;
use std::time::Duration;

use bindicate_lib::bindicators::{BindicatorsManager, UpdateStatus};
use bindicate_lib::connection::BleManager;
use bindicate_lib::queue::mock::MockSink;
use bindicate_lib::topology::ConfigTopology;

use super::{BindicateError, Result, read_payload};

pub async fn cmd_update(
    file: Option<String>,
    dry_run: bool,
    wait: u64,
    config_path: Option<&Path>,
) -> Result<()> {
    let (config, warnings) = super::load_config(config_path);
    for warning in &warnings {
        log::warn!("{warning}");
    }
    if let Err(errors) = config.validate() {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BindicateError::Config(joined));
    }

    let payload = read_payload(file)?;
    let topology = ConfigTopology::new(config);

    if dry_run {
        let sink = MockSink::new();
        let manager = BindicatorsManager::new(topology, sink.clone());
        let status = manager.update(&payload).await;
        for message in sink.writes() {
            println!("{}", hex(&message));
        }
        return finish(status);
    }

    let (ble, link) = BleManager::new(topology.peripheral_address()).await?;
    let mut runner = tokio::spawn(ble.run());

    log::info!("waiting up to {wait}s for the strip controller");
    tokio::select! {
        ready = link.wait_ready(Duration::from_secs(wait)) => {
            if let Err(e) = ready {
                runner.abort();
                return Err(e);
            }
        }
        joined = &mut runner => return Err(runner_failure(joined)),
    }

    let manager = BindicatorsManager::new(topology, link);
    let result = finish(manager.update(&payload).await);
    runner.abort();
    result
}

/// Error reported when the link task finishes while the command is still
/// waiting on it. The task only returns early when the adapter event
/// stream ends or errors out.
fn runner_failure(
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> BindicateError {
    match joined {
        Ok(Err(e)) => e,
        Ok(Ok(())) => BindicateError::NotConnected,
        Err(e) => BindicateError::WriteFailed(format!("link task failed: {e}")),
    }
}

fn finish(status: UpdateStatus) -> Result<()> {
    match status {
        UpdateStatus::Ok => Ok(()),
        UpdateStatus::BadRequest => Err(BindicateError::Encode(format!(
            "payload rejected (status {})",
            status.code()
        ))),
        UpdateStatus::InternalError => Err(BindicateError::WriteFailed(format!(
            "delivery aborted (status {})",
            status.code()
        ))),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_maps_statuses() {
        assert!(finish(UpdateStatus::Ok).is_ok());
        assert!(matches!(
            finish(UpdateStatus::BadRequest),
            Err(BindicateError::Encode(_))
        ));
        assert!(matches!(
            finish(UpdateStatus::InternalError),
            Err(BindicateError::WriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn runner_failure_maps_outcomes() {
        assert!(matches!(
            runner_failure(Ok(Ok(()))),
            BindicateError::NotConnected
        ));
        assert!(matches!(
            runner_failure(Ok(Err(BindicateError::NoAdapter))),
            BindicateError::NoAdapter
        ));

        let joined = tokio::spawn(async { panic!("event stream gone") }).await;
        assert!(matches!(
            runner_failure(joined.map(|_: ()| Ok(()))),
            BindicateError::WriteFailed(_)
        ));
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(hex(&[0x00, 0x02]), "0002");
        assert_eq!(hex(&[0xff, 0x0a]), "ff0a");
    }
}
