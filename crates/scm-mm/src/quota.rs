//! Tick-scoped balance reservation.
//!
//! Each ladder layer locks the base or quote amount its order needs before
//! the order is emitted. A successful lock reduces what later layers can
//! claim, so the innermost layers are funded first and outer layers degrade
//! to skipping a side once the balance runs out.
//!
//! The ledger lives for one liquidity tick. It is created from a fresh
//! balance snapshot and dropped afterwards; nothing is persisted.

use rust_decimal::Decimal;

/// One reservable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quota {
    available: Decimal,
    locked: Decimal,
}

impl Quota {
    /// Negative starting balances are treated as zero.
    pub fn new(available: Decimal) -> Self {
        Self {
            available: available.max(Decimal::ZERO),
            locked: Decimal::ZERO,
        }
    }

    pub fn available(&self) -> Decimal {
        self.available
    }

    /// Amount reserved since the last commit or rollback.
    pub fn locked(&self) -> Decimal {
        self.locked
    }

    /// Reserve `amount`. Fails without side effect if it is negative or more
    /// than what is left.
    pub fn lock(&mut self, amount: Decimal) -> bool {
        if amount < Decimal::ZERO || amount > self.available {
            return false;
        }
        self.available -= amount;
        self.locked += amount;
        true
    }

    /// Make the reservations final.
    pub fn commit(&mut self) {
        self.locked = Decimal::ZERO;
    }

    /// Return every uncommitted reservation.
    pub fn rollback(&mut self) {
        self.available += self.locked;
        self.locked = Decimal::ZERO;
    }
}

/// Base and quote quotas for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaLedger {
    base: Quota,
    quote: Quota,
}

impl QuotaLedger {
    pub fn new(available_base: Decimal, available_quote: Decimal) -> Self {
        Self {
            base: Quota::new(available_base),
            quote: Quota::new(available_quote),
        }
    }

    pub fn lock_base(&mut self, amount: Decimal) -> bool {
        self.base.lock(amount)
    }

    pub fn lock_quote(&mut self, amount: Decimal) -> bool {
        self.quote.lock(amount)
    }

    pub fn available_base(&self) -> Decimal {
        self.base.available()
    }

    pub fn available_quote(&self) -> Decimal {
        self.quote.available()
    }

    pub fn locked_base(&self) -> Decimal {
        self.base.locked()
    }

    pub fn locked_quote(&self) -> Decimal {
        self.quote.locked()
    }

    pub fn commit(&mut self) {
        self.base.commit();
        self.quote.commit();
    }

    pub fn rollback(&mut self) {
        self.base.rollback();
        self.quote.rollback();
    }
}
