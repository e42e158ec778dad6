//! Main application orchestration.
//!
//! Runs the strategy against the paper venue:
//! - Historical candles warm the indicators and seed the venue's touch
//! - Live candles first advance the venue (fills), then the strategy
//! - Ctrl-C or the end of the candle stream triggers shutdown

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use scm_core::KLine;
use scm_executor::PaperExchange;
use scm_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::strategy::Strategy;

/// Main application.
pub struct Application {
    venue: Arc<PaperExchange>,
    strategy: Strategy,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let venue = Arc::new(PaperExchange::new(
            config.market.clone(),
            config.paper.initial_balances(&config.market),
            config.paper.venue_config(&config.fees),
            event_tx,
        ));
        let strategy = Strategy::new(&config, venue.clone(), event_rx)?;
        Ok(Self { venue, strategy })
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn venue(&self) -> &PaperExchange {
        &self.venue
    }

    pub fn preload(&mut self, klines: &[KLine]) {
        for kline in klines {
            self.venue.on_kline(kline);
        }
        self.strategy.preload(klines);
    }

    /// Process one live candle.
    pub async fn on_kline(&mut self, kline: &KLine) {
        let fills = self.venue.on_kline(kline);
        if !fills.is_empty() {
            info!(fills = fills.len(), close = %kline.close, "Candle filled resting orders");
        }
        self.strategy.on_kline(kline).await;
    }

    /// Run until the candle stream ends or Ctrl-C, then cancel everything.
    pub async fn run(mut self, mut klines: mpsc::Receiver<KLine>) -> AppResult<()> {
        self.strategy.start().await;

        info!("Entering main event loop");
        let mut candle_count = 0u64;
        loop {
            tokio::select! {
                maybe = klines.recv() => {
                    let Some(kline) = maybe else {
                        info!("Candle stream ended");
                        break;
                    };
                    candle_count += 1;
                    self.on_kline(&kline).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(candle_count, "Shutting down");
        self.strategy.shutdown().await;

        match Metrics::render() {
            Ok(text) => info!(metrics = %text, "Final metrics"),
            Err(e) => warn!(?e, "Failed to render metrics"),
        }
        Ok(())
    }
}
