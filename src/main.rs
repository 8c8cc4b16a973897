#![deny(dead_code)]
use anyhow::Result;
use clap::Parser;
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use tokio::sync::mpsc;

mod console;
mod utils;

use zapboard::config::{self, AppConfig};
use zapboard::{Notification, Store, Variant};

/// Command line arguments for zapboard
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "zapboard: console for a simulated WhatsApp Business dashboard.",
    long_about = "zapboard keeps sessions, contacts, messages, groups, webhooks and settings in memory,\n\
    seeded with mock data, and prints every notification the store emits.\n\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Config file (JSON) with api settings and simulated delays
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log file; overrides the config's log_file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Start with empty collections instead of the mock data
    #[arg(long)]
    no_seed: bool,
}

// Stands in for the toast layer: print notifications as they arrive
async fn print_notifications(mut rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        let marker = match notification.variant {
            Variant::Default => "*",
            Variant::Destructive => "!",
        };
        println!("{} {}: {}", marker, notification.title, notification.description);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.config {
        config::set_config_path_override(path.clone());
    }
    let app_config: AppConfig = config::load_config()?;

    let log_file_path = args
        .log_file
        .clone()
        .or_else(|| app_config.log_file.clone())
        .unwrap_or_else(|| PathBuf::from("zapboard.log"));
    utils::setup_logging(Some(log_file_path.as_path()), LevelFilter::Debug)?;

    info!("zapboard starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_file_path.display());

    let (store, notifications) = if args.no_seed {
        Store::empty(&app_config)
    } else {
        Store::new(&app_config)
    };
    let printer = tokio::spawn(print_notifications(notifications));
    store.start_auto_refresh().await;

    println!("zapboard ready. Type 'help' for commands.");
    loop {
        let line = match tokio::task::spawn_blocking(utils::read_line).await?? {
            Some(line) => line,
            None => break,
        };

        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };

        match console::execute(&store, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Command failed: {}", e);
                eprintln!("error: {}", e);
            }
        }
    }

    info!("zapboard shutting down");
    store.stop_auto_refresh();
    drop(store);
    // Pending timers may still hold store handles; don't wait on them
    printer.abort();
    Ok(())
}
