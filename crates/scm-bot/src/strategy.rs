//! Strategy runtime.
//!
//! Owns everything one strategy instance mutates and evaluates both tick
//! schedules on a single task:
//! - Liquidity tick: cancel the liquidity partition, read ticker and
//!   balances, build the ladder, allocate, submit
//! - Adjustment tick: cancel the adjustment partition, then place at most one
//!   profit-protected order against the current position
//!
//! Fill events are queued by the venue and applied between ticks, so the
//! position never changes while a tick is computing.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use scm_core::{KLine, Market, OrderSide, Partition, Price, UserEvent};
use scm_executor::{ActiveOrderBook, DynExchange, OrderExecutor, SubmitReport};
use scm_indicator::{Bollinger, CandleIndicator, Ewma, IndicatorError};
use scm_mm::{
    AdjustmentInput, AllocationInput, InventoryAdjuster, LadderParams, LiquidityAllocator,
    PriceLadder, StrategyConfig,
};
use scm_persistence::{StateStore, StrategyState, TradeJournal, TradeRecord};
use scm_position::{Position, PositionTracker};
use scm_telemetry::Metrics;

use crate::config::AppConfig;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Liquidity,
    Adjustment,
}

impl TickKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liquidity => "liquidity",
            Self::Adjustment => "adjustment",
        }
    }
}

pub struct Strategy {
    config: StrategyConfig,
    market: Market,
    executor: OrderExecutor,
    allocator: LiquidityAllocator,
    adjuster: InventoryAdjuster,
    mid_price: Ewma,
    band: Bollinger,
    tracker: PositionTracker,
    liquidity_book: ActiveOrderBook,
    adjustment_book: ActiveOrderBook,
    events: mpsc::UnboundedReceiver<UserEvent>,
    store: StateStore,
    journal: TradeJournal,
}

impl Strategy {
    /// Build the strategy and restore its persisted position.
    ///
    /// Fails when the configuration is invalid or the liquidity scale cannot
    /// be solved.
    pub fn new(
        config: &AppConfig,
        client: DynExchange,
        events: mpsc::UnboundedReceiver<UserEvent>,
    ) -> AppResult<Self> {
        config.validate()?;
        let strategy = &config.strategy;
        let market = config.market.clone();

        let allocator = LiquidityAllocator::from_config(strategy)?;
        let adjuster = InventoryAdjuster::new(config.fees.maker_fee_rate, strategy.min_profit);
        let mid_price = Ewma::new(strategy.mid_price_ema.interval, strategy.mid_price_ema.window)?;
        let band = Bollinger::new(
            strategy.price_range_bollinger.interval,
            strategy.price_range_bollinger.window,
            strategy.price_range_bollinger.k,
        )?;

        let store = StateStore::open(&config.persistence.state_dir, &config.instance_id())?;
        let (position, stats) = match store.load()? {
            Some(state) => {
                info!(
                    base = %state.position.base,
                    average_cost = %state.position.average_cost,
                    saved_at = %state.saved_at,
                    "Restored strategy state"
                );
                (Some(state.position), Some(state.profit_stats))
            }
            None => {
                info!("No saved strategy state, starting flat");
                (None, None)
            }
        };
        let mut tracker = PositionTracker::new(market.clone(), position, stats);
        tracker.set_fee_rates(config.fees);

        let journal = TradeJournal::new(
            &config.persistence.journal_dir,
            config.persistence.journal_buffer_size,
        );

        info!(
            symbol = %market.symbol,
            venue = client.name(),
            layers = strategy.num_of_liquidity_layers,
            scale = strategy.liquidity_scale.name(),
            weight_sum = allocator.scale().sum_over_layers(allocator.layers()),
            "Strategy initialized"
        );

        Ok(Self {
            config: strategy.clone(),
            liquidity_book: ActiveOrderBook::new(Partition::Liquidity, &market.symbol),
            adjustment_book: ActiveOrderBook::new(Partition::Adjustment, &market.symbol),
            market,
            executor: OrderExecutor::new(client),
            allocator,
            adjuster,
            mid_price,
            band,
            tracker,
            events,
            store,
            journal,
        })
    }

    pub fn position(&self) -> &Position {
        self.tracker.position()
    }

    pub fn liquidity_book(&self) -> &ActiveOrderBook {
        &self.liquidity_book
    }

    pub fn adjustment_book(&self) -> &ActiveOrderBook {
        &self.adjustment_book
    }

    pub fn indicators_ready(&self) -> bool {
        self.mid_price.last().is_some() && self.band.last().is_some()
    }

    /// Warm the indicators from historical candles.
    pub fn preload(&mut self, klines: &[KLine]) {
        let mid = self.mid_price.preload(klines);
        let band = self.band.preload(klines);
        info!(
            candles = klines.len(),
            mid_price_closes = mid,
            band_closes = band,
            ready = self.indicators_ready(),
            "Indicators preloaded"
        );
    }

    /// Clear leftovers from a previous run and place the first ladder.
    pub async fn start(&mut self) {
        if let Some(cancel) = self.executor.client().symbol_cancel() {
            match cancel.cancel_orders_by_symbol(&self.market.symbol).await {
                Ok(count) => info!(symbol = %self.market.symbol, count, "Cancelled open orders at startup"),
                Err(e) => warn!(?e, "Failed to cancel open orders at startup"),
            }
        }

        self.drain_events();
        self.run_tick(TickKind::Liquidity).await;
    }

    /// Feed one candle: update indicators, apply pending fills, then run
    /// whichever ticks the candle's interval schedules.
    pub async fn on_kline(&mut self, kline: &KLine) {
        if !kline.closed || kline.symbol != self.market.symbol {
            return;
        }

        self.mid_price.on_kline_closed(kline);
        self.band.on_kline_closed(kline);
        self.drain_events();

        if kline.interval == self.config.liquidity_update_interval {
            self.run_tick(TickKind::Liquidity).await;
        }
        if kline.interval == self.config.adjustment_update_interval {
            self.run_tick(TickKind::Adjustment).await;
        }
    }

    /// Run one tick. Errors end the tick here and never reach the caller.
    pub async fn run_tick(&mut self, kind: TickKind) {
        let started = Instant::now();
        let result = match kind {
            TickKind::Liquidity => self.liquidity_tick().await,
            TickKind::Adjustment => self.adjustment_tick().await,
        };
        Metrics::tick_duration(kind.as_str(), started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(0) => Metrics::tick(kind.as_str(), "skipped"),
            Ok(placed) => {
                debug!(tick = kind.as_str(), placed, "Tick complete");
                Metrics::tick(kind.as_str(), "placed");
            }
            Err(e) => {
                warn!(tick = kind.as_str(), ?e, "Tick aborted");
                Metrics::tick(kind.as_str(), "failed");
            }
        }
    }

    /// Returns the number of orders placed.
    pub async fn liquidity_tick(&mut self) -> AppResult<usize> {
        Self::cancel_book(&mut self.liquidity_book, &self.executor).await;

        let client = self.executor.client();
        let ticker = client.query_ticker(&self.market.symbol).await?;
        let balances = client.query_balances().await?;

        let mid_price = self
            .mid_price
            .last()
            .and_then(Price::from_f64)
            .ok_or(IndicatorError::NotReady("mid price ema"))?;
        let band_width = self
            .band
            .last()
            .and_then(Price::from_f64)
            .ok_or(IndicatorError::NotReady("bollinger band"))?;
        Metrics::pricing(mid_price.to_f64(), band_width.to_f64());

        let ladder = PriceLadder::build(
            &LadderParams {
                ticker,
                mid_price,
                band_width,
                tick_size: self.config.layer_tick_size(),
                layers: self.config.num_of_liquidity_layers,
            },
            &self.market,
        )?;
        info!(
            buy = %ticker.buy,
            sell = %ticker.sell,
            spread = %ticker.spread(),
            %mid_price,
            %band_width,
            "Building liquidity layers"
        );

        let plan = self.allocator.allocate(&AllocationInput {
            ladder: &ladder,
            ticker,
            available_base: balances.available(&self.market.base_currency),
            available_quote: balances.available(&self.market.quote_currency),
            position: self.tracker.position(),
            market: &self.market,
        })?;

        for skip in &plan.skipped {
            Metrics::layer_skipped(skip.side.as_str(), skip.reason.as_str());
        }
        for side in [OrderSide::Buy, OrderSide::Sell] {
            Metrics::intents(Partition::Liquidity.as_str(), side.as_str(), plan.count(side));
        }
        info!(
            bids = plan.count(OrderSide::Buy),
            asks = plan.count(OrderSide::Sell),
            skipped = plan.skipped.len(),
            bid_unit = %plan.bid_unit,
            ask_unit = %plan.ask_unit,
            "Liquidity layers allocated"
        );

        let report = self
            .executor
            .submit_all(&mut self.liquidity_book, plan.intents)
            .await;
        Ok(Self::record_report(Partition::Liquidity, &report))
    }

    /// Returns the number of orders placed (zero or one).
    pub async fn adjustment_tick(&mut self) -> AppResult<usize> {
        Self::cancel_book(&mut self.adjustment_book, &self.executor).await;

        let position = self.tracker.position();
        if position.is_closed() || position.is_dust(&self.market) {
            debug!(base = %position.base, "No position to adjust");
            return Ok(0);
        }

        let client = self.executor.client();
        let ticker = client.query_ticker(&self.market.symbol).await?;
        let balances = client.query_balances().await?;

        let intent = self.adjuster.adjust(&AdjustmentInput {
            position: self.tracker.position(),
            ticker,
            available_base: balances.available(&self.market.base_currency),
            available_quote: balances.available(&self.market.quote_currency),
            market: &self.market,
        });
        let Some(intent) = intent else {
            return Ok(0);
        };

        info!(
            side = %intent.side,
            price = %intent.price,
            quantity = %intent.quantity,
            base = %self.tracker.position().base,
            average_cost = %self.tracker.position().average_cost,
            "Placing adjustment order"
        );
        Metrics::intents(Partition::Adjustment.as_str(), intent.side.as_str(), 1);

        let report = self
            .executor
            .submit_all(&mut self.adjustment_book, vec![intent])
            .await;
        Ok(Self::record_report(Partition::Adjustment, &report))
    }

    /// Apply queued fills and order updates. Returns the number of trades
    /// that changed the position.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            match event {
                UserEvent::Trade(trade) => {
                    let Some(outcome) = self.tracker.apply_trade(&trade) else {
                        continue;
                    };
                    applied += 1;
                    Metrics::fill(trade.side.as_str());
                    if let Err(e) = self.journal.record(TradeRecord::new(&trade, &outcome)) {
                        warn!(?e, trade_id = trade.trade_id, "Failed to journal trade");
                    }
                }
                UserEvent::OrderUpdate(update) => {
                    if !self.liquidity_book.on_order_update(&update)
                        && !self.adjustment_book.on_order_update(&update)
                    {
                        debug!(order_id = update.order_id, "Update for untracked order");
                    }
                }
            }
        }

        if applied > 0 {
            self.save_state();
        }
        applied
    }

    /// Cancel both partitions and flush persistence. Failures are logged.
    pub async fn shutdown(&mut self) {
        info!("Shutting down strategy");
        self.drain_events();

        Self::cancel_book(&mut self.liquidity_book, &self.executor).await;
        Self::cancel_book(&mut self.adjustment_book, &self.executor).await;

        self.drain_events();
        self.save_state();
        if let Err(e) = self.journal.close() {
            error!(?e, "Failed to close trade journal");
        }
    }

    async fn cancel_book(book: &mut ActiveOrderBook, executor: &OrderExecutor) {
        if let Err(e) = book.graceful_cancel(executor.client()).await {
            warn!(partition = %book.partition(), ?e, "Cancel failed, continuing");
            Metrics::cancel_failed(book.partition().as_str());
        }
    }

    fn record_report(partition: Partition, report: &SubmitReport) -> usize {
        Metrics::submit_failures(partition.as_str(), report.failures.len());
        if !report.failures.is_empty() {
            warn!(
                %partition,
                placed = report.created.len(),
                failed = report.failures.len(),
                "Some orders were not placed"
            );
        }
        report.created.len()
    }

    fn save_state(&self) {
        let position = self.tracker.position();
        let stats = self.tracker.profit_stats();
        Metrics::position(position.base, stats.accumulated_net_profit);
        if let Err(e) = self
            .store
            .save(&StrategyState::new(position.clone(), stats.clone()))
        {
            error!(?e, "Failed to save strategy state");
        }
    }
}
