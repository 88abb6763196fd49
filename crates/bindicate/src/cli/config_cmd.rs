//! `config` subcommand — show current configuration and file paths.

use std::path::Path;

use super::{BindicateError, Config, ConfigOutput, Result, kv, kv_width};

pub(super) fn cmd_config(json: bool, init: bool, custom_path: Option<&Path>) -> Result<()> {
    if init {
        return cmd_config_init(custom_path);
    }

    let (config, warnings) = super::load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().map(|p| p.exists()).unwrap_or(false);

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            warnings,
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
        return Ok(());
    }

    let w = kv_width(&["Config file:", "Address:", "Strips:", "Bins:"]);

    match &config_path {
        Some(p) => {
            if config_exists {
                kv("Config file:", format_args!("{} (loaded)", p.display()), w);
            } else {
                kv(
                    "Config file:",
                    format_args!("{} (not found, using defaults)", p.display()),
                    w,
                );
            }
        }
        None => kv("Config file:", "(no config directory)", w),
    }
    for warning in &warnings {
        kv("Warning:", warning, w);
    }
    println!();

    kv("Address:", &config.bluetooth.address, w);
    kv("Strips:", config.strips.len(), w);
    for strip in &config.strips {
        println!("  strip {} - {} LEDs", strip.id, strip.length);
    }
    kv("Bins:", config.bins.len(), w);
    for bin in &config.bins {
        println!(
            "  {} shelf {} bin {} - strip {}, {} LED(s)",
            bin.cart,
            bin.shelf,
            bin.bin,
            bin.strip,
            bin.offsets.len()
        );
    }

    if let Err(errors) = config.validate() {
        println!();
        for error in errors {
            println!("Invalid: {error}");
        }
    }
    Ok(())
}

/// Write a starter config file without overwriting an existing one.
fn cmd_config_init(custom_path: Option<&Path>) -> Result<()> {
    let path = custom_path
        .map(|p| p.to_path_buf())
        .or_else(Config::path)
        .ok_or_else(|| BindicateError::Config("no config directory available".into()))?;
    if path.exists() {
        return Err(BindicateError::Config(format!(
            "refusing to overwrite existing config at {}",
            path.display()
        )));
    }
    Config::example().save_to(&path)?;
    println!("Wrote starter config to {}", path.display());
    Ok(())
}
