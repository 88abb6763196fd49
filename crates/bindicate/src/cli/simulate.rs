//! `simulate` — run a payload through the device logic without hardware.
//!
//! Encodes the payload exactly as `update` would, then replays the
//! resulting commands into the firmware's message handler and prints what
//! each strip would show.

use bindicate_lib::bindicators::BindicatorsManager;
use bindicate_lib::firmware::sim::{RecordingDriver, RecordingIndicators, lit_ranges};
use bindicate_lib::firmware::{StripDevice, StripOutput};
use bindicate_lib::queue::mock::MockSink;
use bindicate_lib::topology::ConfigTopology;

use std::path::Path;

use super::{LitRangeJson, Result, SimulateOutput, StripFrameJson, kv, kv_width, read_payload};

pub async fn cmd_simulate(file: Option<String>, json: bool, config_path: Option<&Path>) -> Result<()> {
    let (config, warnings) = super::load_config(config_path);
    for warning in &warnings {
        log::warn!("{warning}");
    }
    let payload = read_payload(file)?;

    let outputs: Vec<StripOutput> = config
        .strips
        .iter()
        .map(|s| StripOutput {
            id: s.id,
            length: s.length,
            line: s.line.unwrap_or(s.id),
        })
        .collect();

    let sink = MockSink::new();
    let manager = BindicatorsManager::new(ConfigTopology::new(config), sink.clone());
    let status = manager.update(&payload).await;

    let mut device = StripDevice::new(outputs, RecordingDriver::new(), RecordingIndicators::new());
    for message in sink.writes() {
        if let Err(e) = device.handle_message(&message) {
            log::warn!("device rejected a command: {e}");
        }
    }

    let outputs = device.strips().to_vec();
    let strips: Vec<StripFrameJson> = outputs
        .iter()
        .map(|output| {
            let frame = device.frame(output.id).unwrap_or(&[]);
            StripFrameJson {
                strip: output.id,
                length: output.length,
                lit: lit_ranges(frame)
                    .into_iter()
                    .map(|(start, end, colour)| LitRangeJson {
                        start,
                        end,
                        colour: colour.to_hex(),
                    })
                    .collect(),
            }
        })
        .collect();

    if json {
        let output = SimulateOutput {
            status: status.code(),
            commands: sink.writes().iter().map(|m| to_hex(m)).collect(),
            strips,
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
        return Ok(());
    }

    let w = kv_width(&["Status:", "Commands:"]);
    kv("Status:", status.code(), w);
    kv("Commands:", sink.writes().len(), w);
    for strip in &strips {
        println!("Strip {} ({} LEDs):", strip.strip, strip.length);
        if strip.lit.is_empty() {
            println!("  dark");
        }
        for range in &strip.lit {
            println!("  {}-{}  {}", range.start, range.end, range.colour);
        }
    }
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
