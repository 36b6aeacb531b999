use agrodesk::app::dashboard::{render_text, simulated_market};
use agrodesk::core::facilities::{FixedLocation, NoLocationService};
use agrodesk::core::format::{format_currency, format_percent};
use agrodesk::core::refresh::{MarketBoard, MarketRefresher};
use agrodesk::core::ConfigProvider;
use agrodesk::utils::error::{ErrorSeverity, FarmError};
use agrodesk::utils::{logger, validation::Validate};
use agrodesk::{CliConfig, DashboardEngine, FarmConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // Logger
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting agrodesk");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    let engine = DashboardEngine::new(&config, simulated_market(&config));
    let report = match cli.explicit_reference() {
        Some(reference) => engine.run(&FixedLocation(reference)).await,
        None => engine.run(&NoLocationService).await,
    };
    let report = match report {
        Ok(report) => report,
        Err(e) => exit_with(&e),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, config.currency_prefix()));
    }

    if cli.watch {
        watch_market(&config).await;
    }

    Ok(())
}

async fn watch_market(config: &FarmConfig) {
    let board = MarketBoard::new();
    let mut changes = board.subscribe();
    let refresher = MarketRefresher::new(
        Arc::new(simulated_market(config)),
        board.clone(),
        config.market.refresh_policy,
    );
    let handle = refresher.spawn(Duration::from_secs(config.refresh_interval_seconds()));

    tracing::info!(
        "🔍 Watching market every {}s, Ctrl-C to stop",
        config.refresh_interval_seconds()
    );

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = board.snapshot();
                if let Some(data) = &snapshot.data {
                    let price = data.current_price().unwrap_or_default();
                    let daily = snapshot.variations.map(|v| v.daily).unwrap_or_default();
                    println!(
                        "[#{}] {} {}",
                        snapshot.generation,
                        format_currency(price, config.currency_prefix()),
                        format_percent(daily)
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping market watch");
                break;
            }
        }
    }

    handle.shutdown().await;
}

fn exit_with(e: &FarmError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // Exit code follows error severity
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
