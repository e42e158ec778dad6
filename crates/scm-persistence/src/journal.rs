//! JSON Lines trade journal.
//!
//! One file per UTC day, `trades_<YYYY-MM-DD>.jsonl`, opened in append mode
//! so restarts never truncate earlier fills. Each line is a complete record.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scm_core::{OrderSide, Trade};
use scm_position::TradeOutcome;

use crate::PersistenceResult;

/// One fill and its realized profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp_ms: i64,
    pub symbol: String,
    pub trade_id: u64,
    pub order_id: u64,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub fee_currency: String,
    pub is_maker: bool,
    pub profit: Decimal,
    pub net_profit: Decimal,
}

impl TradeRecord {
    pub fn new(trade: &Trade, outcome: &TradeOutcome) -> Self {
        Self {
            timestamp_ms: trade.time.timestamp_millis(),
            symbol: trade.symbol.clone(),
            trade_id: trade.trade_id,
            order_id: trade.order_id,
            side: trade.side,
            price: trade.price.inner(),
            quantity: trade.quantity.inner(),
            fee: trade.fee,
            fee_currency: trade.fee_currency.clone(),
            is_maker: trade.is_maker,
            profit: outcome.profit,
            net_profit: outcome.net_profit,
        }
    }
}

struct ActiveFile {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

pub struct TradeJournal {
    dir: PathBuf,
    buffer: Vec<TradeRecord>,
    max_buffer_size: usize,
    active: Option<ActiveFile>,
}

impl TradeJournal {
    pub fn new(dir: impl AsRef<Path>, max_buffer_size: usize) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(?e, dir = %dir.display(), "Failed to create journal directory");
        }

        Self {
            dir,
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size: max_buffer_size.max(1),
            active: None,
        }
    }

    pub fn record(&mut self, record: TradeRecord) -> PersistenceResult<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        if self.active.as_ref().is_some_and(|a| a.date != today) {
            self.close_active();
        }

        let active = match self.active.take() {
            Some(active) => active,
            None => Self::open_file(&self.dir, &today)?,
        };
        let active = self.active.insert(active);

        for record in &self.buffer {
            let json = serde_json::to_string(record)?;
            writeln!(active.writer, "{json}")?;
        }
        active.writer.flush()?;
        active.records_written += self.buffer.len();

        debug!(date = %today, records = self.buffer.len(), "Flushed trades to journal");
        self.buffer.clear();
        Ok(())
    }

    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active();
        Ok(())
    }

    fn open_file(dir: &Path, date: &str) -> PersistenceResult<ActiveFile> {
        let path = dir.join(format!("trades_{date}.jsonl"));
        info!(path = %path.display(), "Opening trade journal (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(ActiveFile {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        })
    }

    fn close_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "Failed to flush journal on close");
            }
            info!(
                date = %active.date,
                records = active.records_written,
                "Closed trade journal"
            );
        }
    }
}

impl Drop for TradeJournal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "Failed to flush journal on drop");
        }
        self.close_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scm_core::{Price, Size};
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn record(id: u64) -> TradeRecord {
        let trade = Trade {
            trade_id: id,
            order_id: 10 + id,
            symbol: "USDCUSDT".to_string(),
            side: OrderSide::Sell,
            price: Price::new(dec!(1.0002)),
            quantity: Size::new(dec!(25)),
            fee: dec!(0.0025),
            fee_currency: "USDT".to_string(),
            is_maker: true,
            time: Utc::now(),
        };
        let outcome = TradeOutcome {
            profit: dec!(0.005),
            net_profit: dec!(0.0025),
            fee_in_quote: dec!(0.0025),
            realized: true,
        };
        TradeRecord::new(&trade, &outcome)
    }

    fn read_lines(dir: &Path) -> Vec<String> {
        let entries: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
        let file = File::open(entries[0].path()).unwrap();
        BufReader::new(file).lines().map_while(Result::ok).collect()
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = TradeJournal::new(temp_dir.path(), 100);

        for i in 0..4 {
            journal.record(record(i)).unwrap();
        }
        assert_eq!(journal.pending(), 4);
        journal.close().unwrap();

        let lines = read_lines(temp_dir.path());
        assert_eq!(lines.len(), 4);
        let first: TradeRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.trade_id, 0);
        assert_eq!(first.net_profit, dec!(0.0025));
    }

    #[test]
    fn test_append_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        for batch in 0..2 {
            let mut journal = TradeJournal::new(temp_dir.path(), 100);
            for i in 0..3 {
                journal.record(record(batch * 3 + i)).unwrap();
            }
            journal.close().unwrap();
        }
        assert_eq!(read_lines(temp_dir.path()).len(), 6);
    }

    #[test]
    fn test_buffer_flushes_when_full() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = TradeJournal::new(temp_dir.path(), 2);

        journal.record(record(1)).unwrap();
        journal.record(record(2)).unwrap();
        assert_eq!(journal.pending(), 0);
        assert_eq!(read_lines(temp_dir.path()).len(), 2);
    }

    #[test]
    fn test_empty_flush_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = TradeJournal::new(temp_dir.path(), 10);
        journal.flush().unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert!(entries.is_empty());
    }
}
