use thiserror::Error;

#[derive(Error, Debug)]
pub enum StockWatchError {
    #[error("non-finite metric value {value} for {symbol}")]
    InvalidMetric { symbol: String, value: f64 },

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("out-of-order sample for {symbol}: last timestamp {last}, got {got}")]
    OutOfOrderSample { symbol: String, last: i64, got: i64 },

    #[error("duplicate alert rule for {symbol}")]
    DuplicateRule { symbol: String },

    #[error("WebSocket error: {0}")]
    WebsocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
