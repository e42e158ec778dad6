//! Candle input.
//!
//! Candles arrive as JSON lines, one `KLine` per line. Blank lines are
//! skipped. Historical files warm the indicators; the live stream is read
//! from any async reader and forwarded over a channel.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use scm_core::KLine;

use crate::error::AppResult;

pub fn parse_kline(line: &str) -> AppResult<Option<KLine>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read a whole JSON-lines candle file. Any malformed line fails the load.
pub fn read_klines(path: impl AsRef<Path>) -> AppResult<Vec<KLine>> {
    let content = std::fs::read_to_string(path)?;
    let mut klines = Vec::new();
    for line in content.lines() {
        if let Some(kline) = parse_kline(line)? {
            klines.push(kline);
        }
    }
    Ok(klines)
}

/// Forward candles from `reader` until EOF or until the receiver is gone.
///
/// Malformed lines are logged and skipped. Returns the number forwarded.
pub async fn forward_klines<R>(reader: R, tx: mpsc::Sender<KLine>) -> AppResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        match parse_kline(&line) {
            Ok(Some(kline)) => {
                if tx.send(kline).await.is_err() {
                    debug!("Candle receiver closed");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(?e, "Skipping malformed candle line"),
        }
    }
    Ok(forwarded)
}
