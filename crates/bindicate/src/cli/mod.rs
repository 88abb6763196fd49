//! CLI subcommands — updates, link monitoring, offline simulation.

mod config_cmd;
mod monitor;
mod simulate;
mod update;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use bindicate_lib::config::Config;
pub(super) use bindicate_lib::error::{BindicateError, Result};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output: at least
/// PADDING spaces after the longest key.
pub(super) fn kv_width(keys: &[&str]) -> usize {
    keys.iter().map(|k| k.len()).max().unwrap_or(0) + PADDING
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct SimulateOutput {
    pub status: u16,
    pub commands: Vec<String>,
    pub strips: Vec<StripFrameJson>,
}

#[derive(Serialize)]
pub(super) struct StripFrameJson {
    pub strip: u8,
    pub length: u16,
    pub lit: Vec<LitRangeJson>,
}

#[derive(Serialize)]
pub(super) struct LitRangeJson {
    pub start: usize,
    pub end: usize,
    pub colour: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Push a bindicator set to the strip controller
    Update {
        /// Path to the JSON payload (defaults to stdin)
        file: Option<String>,
        /// Print the encoded commands without connecting
        #[arg(long)]
        dry_run: bool,
        /// Seconds to wait for the link to become ready
        #[arg(long, default_value_t = 30)]
        wait: u64,
    },

    /// Maintain the link and log lifecycle transitions until Ctrl+C
    Monitor,

    /// Run a payload through the device logic offline and show the frames
    Simulate {
        /// Path to the JSON payload (defaults to stdin)
        file: Option<String>,
    },

    /// Show current configuration and file paths
    Config {
        /// Write a starter config file instead of showing the current one
        #[arg(long)]
        init: bool,
    },
}

pub async fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Update { file, dry_run, wait } => {
            if json {
                log::warn!("--json is not supported for `update` (ignored)");
            }
            update::cmd_update(file, dry_run, wait, config_path).await
        }
        Command::Monitor => {
            if json {
                log::warn!("--json is not supported for `monitor` (ignored)");
            }
            monitor::cmd_monitor(config_path).await
        }
        Command::Simulate { file } => simulate::cmd_simulate(file, json, config_path).await,
        Command::Config { init } => config_cmd::cmd_config(json, init, config_path),
    }
}

/// Load the configuration from a custom path, or the default location.
pub(super) fn load_config(custom_path: Option<&Path>) -> (Config, Vec<String>) {
    match custom_path {
        Some(path) => Config::load_from(path),
        None => Config::load_with_warnings(),
    }
}

/// Read a JSON payload from a file, or stdin when no path (or `-`) is given.
pub(super) fn read_payload(file: Option<String>) -> Result<serde_json::Value> {
    let text = match file.as_deref() {
        Some("-") | None => std::io::read_to_string(std::io::stdin())?,
        Some(path) => std::fs::read_to_string(path)?,
    };
    serde_json::from_str(&text)
        .map_err(|e| BindicateError::Encode(format!("payload is not valid JSON: {e}")))
}


#[cfg(test)]
mod json_struct_tests {
    use super::*;

    #[test]
    fn simulate_output_shape() {
        let output = SimulateOutput {
            status: 200,
            commands: vec!["0001".into()],
            strips: vec![StripFrameJson {
                strip: 1,
                length: 100,
                lit: vec![LitRangeJson {
                    start: 10,
                    end: 20,
                    colour: "#FF0000".into(),
                }],
            }],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["status"], 200);
        assert_eq!(parsed["strips"][0]["lit"][0]["colour"], "#FF0000");
    }

    #[test]
    fn config_output_missing_path_is_null() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: Config::default(),
            warnings: vec![],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_null());
        assert_eq!(parsed["config_file_exists"], false);
        assert!(parsed["settings"].is_object());
    }
}
