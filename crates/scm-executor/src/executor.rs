//! Intent submission.
//!
//! Intents are submitted one by one. A rejected intent is logged and the
//! rest of the batch is still attempted; orders that were accepted stay in
//! place. Accepted orders are added to the partition's book.

use tracing::{debug, error};

use scm_core::{CreatedOrder, SubmitOrder};

use crate::{ActiveOrderBook, DynExchange, ExchangeClient};

#[derive(Debug, Clone)]
pub struct SubmitFailure {
    pub intent: SubmitOrder,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    pub created: Vec<CreatedOrder>,
    pub failures: Vec<SubmitFailure>,
}

impl SubmitReport {
    pub fn attempted(&self) -> usize {
        self.created.len() + self.failures.len()
    }
}

#[derive(Clone)]
pub struct OrderExecutor {
    client: DynExchange,
}

impl OrderExecutor {
    pub fn new(client: DynExchange) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &dyn ExchangeClient {
        self.client.as_ref()
    }

    pub async fn submit_all(
        &self,
        book: &mut ActiveOrderBook,
        intents: Vec<SubmitOrder>,
    ) -> SubmitReport {
        let mut report = SubmitReport::default();

        for intent in intents {
            match self.client.submit_order(intent.clone()).await {
                Ok(created) => {
                    debug!(
                        partition = %created.partition,
                        order_id = created.order_id,
                        side = %created.side,
                        price = %created.price,
                        quantity = %created.quantity,
                        "Order placed"
                    );
                    book.add(created.clone());
                    report.created.push(created);
                }
                Err(e) => {
                    error!(
                        partition = %intent.partition,
                        client_order_id = %intent.client_order_id,
                        side = %intent.side,
                        price = %intent.price,
                        quantity = %intent.quantity,
                        error = %e,
                        "Order submission failed"
                    );
                    report.failures.push(SubmitFailure {
                        intent,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
