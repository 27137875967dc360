use env_logger::Builder;
use log::{info, LevelFilter};
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stockwatch::api::polygon::ws;
use stockwatch::config::{self, AnalyzerConfig};
use stockwatch::core::{AlertCondition, TrendAnalyzer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Configure logger
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("stockwatch", LevelFilter::Debug)
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Always)
        .init();

    info!("Starting Stockwatch...");

    let api_key = std::env::var("POLYGON_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        log::warn!("POLYGON_API_KEY is not set; the feed will fail to authenticate");
    }

    let symbols = config::DEFAULT_SYMBOLS;

    let mut analyzer = TrendAnalyzer::new(&AnalyzerConfig::default());
    // Starter rules; a real deployment would load these per user
    analyzer.add_rule("AAPL", AlertCondition::PriceAbove(250.0))?;
    analyzer.add_rule("TSLA", AlertCondition::ChangeBelow(-5.0))?;
    analyzer.add_rule("NVDA", AlertCondition::Breakout)?;
    let analyzer = Arc::new(Mutex::new(analyzer));

    // Create channel between the feed and the analyzer
    let (sample_tx, mut sample_rx) =
        tokio::sync::mpsc::channel(config::SAMPLE_CHANNEL_CAPACITY);

    // Start WebSocket feed
    let ws_handle = tokio::spawn(async move {
        ws::run_feed(&symbols, &api_key, sample_tx).await;
    });

    // Start analysis task: every sample flows through the core
    let analysis_handle = {
        let analyzer = analyzer.clone();
        tokio::spawn(async move {
            while let Some(sample) = sample_rx.recv().await {
                let mut analyzer = analyzer.lock().unwrap();
                match analyzer.ingest(sample) {
                    Ok(snapshot) => {
                        log::debug!(
                            "{}: {:.2} ({:+.2}%)",
                            snapshot.symbol,
                            snapshot.last_price,
                            snapshot.percent_change
                        );
                    }
                    Err(e) => log::warn!("Sample rejected: {}", e),
                }
            }
        })
    };

    // Start reporting task: drain alerts and log the market summary
    let report_handle = {
        let analyzer = analyzer.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(config::REPORT_INTERVAL_SECS));
            interval.tick().await; // skip the immediate tick
            loop {
                interval.tick().await;
                let (events, dropped, report) = {
                    let mut analyzer = analyzer.lock().unwrap();
                    (
                        analyzer.drain_alerts(),
                        analyzer.dropped_alerts(),
                        analyzer.summary_report(),
                    )
                };
                for event in &events {
                    info!(
                        "ALERT: {} at {:.2} ({:+.2}%)",
                        event.rule_name,
                        event.snapshot.last_price,
                        event.snapshot.percent_change
                    );
                }
                if dropped > 0 {
                    log::warn!("{} alert events dropped since startup", dropped);
                }
                match serde_json::to_string(&report) {
                    Ok(json) => info!("Market summary: {}", json),
                    Err(e) => log::error!("Failed to serialize summary: {}", e),
                }
            }
        })
    };

    // Wait for tasks to complete (they won't unless there's an error)
    tokio::select! {
        _ = ws_handle => {},
        _ = analysis_handle => {},
        _ = report_handle => {},
    };

    info!("Shutdown complete");
    Ok(())
}
