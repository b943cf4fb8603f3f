use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::client::model::food::FoodItem;

pub type OrderId = i64;

/// A confirmed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// One food in a placed order, priced at the time of ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub food: FoodItem,
    pub quantity: u32,
    pub price: Decimal,
}

/// Options for `POST /order/create/`.
///
/// The backend takes no body today; new knobs go here so the call signature stays put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct CreateOrderRequest {
    /// sent as the `Idempotency-Key` header when present
    pub idempotency_key: Option<String>,
}

impl CreateOrderRequest {
    pub fn with_idempotency_key(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
        }
    }
}
