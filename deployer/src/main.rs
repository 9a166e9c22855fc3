//! Deployer backend - Entry Point
//!
//! Accepts tenant provisioning requests over HTTP and hands them to the
//! external setup script.

use std::collections::HashMap;
use std::env;

use deployer::app::options::AppOptions;
use deployer::app::run::{on_signal, run};
use deployer::logs::{init_logging, LogOptions};
use deployer::storage::settings::Settings;
use deployer::telemetry::init_sentry;
use deployer::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to print version: {e}"),
        }
        return;
    }

    // Retrieve the settings
    let settings = match Settings::load(cli_args.get("config").map(String::as_str))
        .await
        .and_then(Settings::with_env)
    {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings: {}", e);
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        sentry: settings.sentry.dsn.is_some(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let _sentry_guard = init_sentry(&settings.sentry);

    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return;
    }

    // Run the server
    let options = AppOptions::from(&settings);
    info!("Running deployer {} with options: {:?}", version.version, options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the deployer: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers, waiting for Ctrl+C: {e}");
                    on_signal("Ctrl+C", tokio::signal::ctrl_c()).await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = on_signal("Ctrl+C", tokio::signal::ctrl_c()) => {}
        }
    }

    #[cfg(not(unix))]
    {
        on_signal("Ctrl+C", tokio::signal::ctrl_c()).await;
    }
}
