//! Read-only market data routes
//!
//! - `GET /health`
//! - `GET /api/v1/instruments`
//! - `GET /api/v1/books/:instrument_id?depth=N`
//! - `GET /api/v1/metrics`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use matching_engine::{EngineMetricsSnapshot, InstrumentId, MatchingError, OrderBookManager, OrderBookSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct MarketDataState {
    manager: Arc<OrderBookManager>,
    default_depth: usize,
}

impl MarketDataState {
    pub fn new(manager: Arc<OrderBookManager>, default_depth: usize) -> Self {
        Self { manager, default_depth }
    }
}

pub fn router(manager: Arc<OrderBookManager>, default_depth: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/instruments", get(instruments))
        .route("/api/v1/books/:instrument_id", get(book))
        .route("/api/v1/metrics", get(metrics))
        .with_state(MarketDataState::new(manager, default_depth))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub books: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepthQuery {
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// JSON error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl From<MatchingError> for ApiError {
    fn from(error: MatchingError) -> Self {
        let status = match error {
            MatchingError::UnknownInstrument(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            body: ErrorBody {
                error: error.kind().as_str().to_string(),
                message: error.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub async fn health(State(state): State<MarketDataState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        books: state.manager.book_count(),
    })
}

pub async fn instruments(State(state): State<MarketDataState>) -> Json<Vec<InstrumentId>> {
    Json(state.manager.instruments())
}

pub async fn book(
    State(state): State<MarketDataState>,
    Path(instrument_id): Path<u64>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<OrderBookSnapshot>, ApiError> {
    let depth = query.depth.unwrap_or(state.default_depth);
    let snapshot = state.manager.snapshot(InstrumentId(instrument_id), depth)?;
    Ok(Json(snapshot))
}

pub async fn metrics(State(state): State<MarketDataState>) -> Json<EngineMetricsSnapshot> {
    Json(state.manager.metrics().snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching_engine::{Order, OrderIdentity, Price, Quantity, Side};

    fn state() -> MarketDataState {
        let manager = Arc::new(OrderBookManager::new());
        manager.create_order_book(InstrumentId(2)).unwrap();
        manager.create_order_book(InstrumentId(1)).unwrap();
        for (id, price) in [(1u64, 100i64), (2, 99), (3, 98)] {
            let order = Order::new(OrderIdentity::new(id, id, 1), Side::Bid, Price(price), Quantity(10));
            manager.add_order(order).unwrap();
        }
        MarketDataState::new(manager, 2)
    }

    #[tokio::test]
    async fn test_health_and_instruments() {
        let state = state();
        let Json(health) = health(State(state.clone())).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.books, 2);

        let Json(ids) = instruments(State(state)).await;
        assert_eq!(ids, vec![InstrumentId(1), InstrumentId(2)]);
    }

    #[tokio::test]
    async fn test_book_uses_default_depth() {
        let Json(snapshot) = book(State(state()), Path(1), Query(DepthQuery::default())).await.unwrap();
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].price, Price(100));
        assert!(snapshot.asks.is_empty());
        assert_eq!(snapshot.order_count, 3);

        let Json(snapshot) = book(State(state()), Path(1), Query(DepthQuery { depth: Some(5) })).await.unwrap();
        assert_eq!(snapshot.bids.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_book_is_404() {
        let err = book(State(state()), Path(42), Query(DepthQuery::default())).await.unwrap_err();
        assert_eq!(err.body.error, "unknown_instrument");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let Json(snapshot) = metrics(State(state())).await;
        assert_eq!(snapshot.orders_added, 3);
        assert_eq!(snapshot.resting_orders, 3);
        assert_eq!(snapshot.books, 2);
    }
}
