//! Bindicate CLI — drive cart/shelf/bin LED indicators over BLE.

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "bindicate",
    version,
    about = "Cart/shelf/bin LED indicators over Bluetooth Low Energy"
)]
struct Args {
    /// Output as JSON (for config, simulate)
    #[arg(long, global = true)]
    json: bool,

    /// Use a config file at a custom path
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: cli::Command,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    if let Err(e) = cli::run(args.command, args.json, args.config.as_deref()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
