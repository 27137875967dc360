use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite;

use crate::core::types::PriceSample;
use crate::error::StockWatchError;

const POLYGON_WS_URL: &str = "wss://socket.polygon.io/stocks";

const RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
#[serde(tag = "ev")]
enum StreamEvent {
    #[serde(rename = "T")]
    Trade(TradeEvent),
    #[serde(rename = "status")]
    Status(StatusEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
struct TradeEvent {
    sym: String, // Symbol
    p: f64,      // Trade price
    s: Option<f64>, // Trade size
    t: i64,      // SIP timestamp (ms)
}

#[derive(Debug, Deserialize)]
struct StatusEvent {
    status: String,
    message: Option<String>,
}

/// Keeps the trade stream alive: reconnects with a fixed delay whenever the
/// connection drops or errors. Ends only when the analyzer side goes away.
pub async fn run_feed(
    symbols: &[&str],
    api_key: &str,
    sender: tokio::sync::mpsc::Sender<PriceSample>,
) {
    loop {
        if let Err(e) = connect_to_trades(symbols, api_key, sender.clone()).await {
            error!("Feed connection failed: {}", e);
        }
        if sender.is_closed() {
            info!("Analyzer channel closed, stopping feed");
            return;
        }
        warn!("Feed disconnected, retrying in {}s", RECONNECT_DELAY_SECS);
        tokio::time::sleep(std::time::Duration::from_secs(RECONNECT_DELAY_SECS)).await;
    }
}

pub async fn connect_to_trades(
    symbols: &[&str],
    api_key: &str,
    sender: tokio::sync::mpsc::Sender<PriceSample>,
) -> Result<(), StockWatchError> {
    info!("Connecting to Polygon WebSocket: {}", POLYGON_WS_URL);

    let (mut ws_stream, _) = match connect_async(POLYGON_WS_URL).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Connection error: {}", e);
            return Err(e.into());
        }
    };

    info!("Successfully connected to WebSocket");

    // Authenticate, then subscribe to the trade stream for every symbol
    let auth = json!({ "action": "auth", "params": api_key });
    ws_stream
        .send(tungstenite::protocol::Message::Text(auth.to_string()))
        .await?;

    let channels = symbols
        .iter()
        .map(|s| format!("T.{}", s.to_uppercase()))
        .collect::<Vec<_>>()
        .join(",");
    let subscribe = json!({ "action": "subscribe", "params": channels });
    ws_stream
        .send(tungstenite::protocol::Message::Text(subscribe.to_string()))
        .await?;

    while let Some(message) = ws_stream.next().await {
        match message {
            Ok(tungstenite::protocol::Message::Text(text)) => {
                // Polygon delivers batches of events per frame
                match serde_json::from_str::<Vec<StreamEvent>>(&text) {
                    Ok(events) => {
                        for event in events {
                            match event {
                                StreamEvent::Trade(trade) => {
                                    let mut sample = PriceSample::new(
                                        trade.sym.to_uppercase(),
                                        trade.t,
                                        trade.p,
                                    );
                                    if let Some(size) = trade.s {
                                        sample = sample.with_volume(size);
                                    }
                                    if let Err(e) = sender.send(sample).await {
                                        error!("Failed to send to analyzer: {}", e);
                                    }
                                }
                                StreamEvent::Status(status) => {
                                    info!(
                                        "Stream status: {} {}",
                                        status.status,
                                        status.message.unwrap_or_default()
                                    );
                                }
                                StreamEvent::Other => {}
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse stream frame: {}", e);
                    }
                }
            }
            Ok(tungstenite::protocol::Message::Close(_)) => {
                info!("WebSocket connection closed");
                break;
            }
            Ok(_) => {} // Ignore other message types
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    Ok(())
}
