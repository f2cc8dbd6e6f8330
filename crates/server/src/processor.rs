//! Request processor
//!
//! A single task drains the bounded request queue, applies each request to
//! the shared [`OrderBookManager`] and answers through the request's
//! [`RequestContext`]. Connections never touch the books directly.

use matching_engine::OrderBookManager;
use observability::{OrderEntryMetrics, RequestMetricsGuard};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{OrderEntryRequest, OrderEntryResponse};
use crate::session::RequestContext;

/// Unit of work queued by a connection
pub type ProcessorJob = (RequestContext, OrderEntryRequest);

/// Create the bounded queue between connections and the processor
pub fn request_queue(capacity: usize) -> (mpsc::Sender<ProcessorJob>, mpsc::Receiver<ProcessorJob>) {
    mpsc::channel(capacity.max(1))
}

#[derive(Clone)]
pub struct RequestProcessor {
    manager: Arc<OrderBookManager>,
    metrics: OrderEntryMetrics,
}

impl RequestProcessor {
    pub fn new(manager: Arc<OrderBookManager>, metrics: OrderEntryMetrics) -> Self {
        Self { manager, metrics }
    }

    pub fn manager(&self) -> &Arc<OrderBookManager> {
        &self.manager
    }

    /// Apply one request and build its response
    pub fn handle(&self, request: OrderEntryRequest) -> OrderEntryResponse {
        let mut guard = RequestMetricsGuard::new(&self.metrics, request.operation_name());

        let result = match request.clone().into_operation() {
            Ok(operation) => self.manager.process(operation),
            Err(e) => {
                // Wire-level rejects never reach the manager
                self.manager.metrics().record_rejected();
                Err(e)
            }
        };

        match result {
            Ok(outcome) => {
                let response = OrderEntryResponse::from_outcome(outcome);
                guard.set_outcome(response.outcome_label());
                response
            }
            Err(e) => {
                warn!(
                    operation = request.operation_name(),
                    order_id = request.order_id(),
                    client_sequence = request.client_sequence(),
                    instrument_id = request.instrument_id(),
                    reason = e.kind().as_str(),
                    "Order request rejected: {}", e
                );
                guard.set_outcome(e.kind().as_str());
                OrderEntryResponse::rejected(&request, &e)
            }
        }
    }

    /// Drain the queue until shutdown or until every sender is gone
    pub async fn run(self, mut queue: mpsc::Receiver<ProcessorJob>, shutdown: CancellationToken) -> Result<()> {
        info!("Request processor started");
        let mut handled: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Request processor received shutdown signal");
                    break;
                }

                job = queue.recv() => {
                    let Some((ctx, request)) = job else {
                        info!("Request queue closed");
                        break;
                    };
                    let response = self.handle(request);
                    debug!(
                        connection_id = ctx.connection_id(),
                        elapsed_us = ctx.elapsed().as_micros() as u64,
                        "Request processed"
                    );
                    if let Err(e) = ctx.respond(response).await {
                        warn!(connection_id = ctx.connection_id(), %e, "Dropping response");
                    }
                    handled += 1;
                }
            }
        }

        info!(handled, "Request processor stopped");
        Ok(())
    }
}
