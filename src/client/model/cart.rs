use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::client::model::food::{FoodId, FoodItem};

pub type LineId = i64;

/// Largest gap between the reported and the recomputed total still treated as rounding.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3); // 0.005

/// One food in the cart with its server-assigned id. `quantity` is always >= 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub food: FoodItem,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.food.price * Decimal::from(self.quantity)
    }
}

/// `GET /cart/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// sum of `quantity * price` over all lines
    pub fn computed_total(&self) -> Decimal {
        self.items.iter().map(CartLine::subtotal).sum()
    }

    /// whether `total` agrees with the lines within [`TOTAL_TOLERANCE`]
    pub fn is_consistent(&self) -> bool {
        (self.total - self.computed_total()).abs() <= TOTAL_TOLERANCE
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AddToCartRequest {
    pub food_id: FoodId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateCartItemRequest {
    pub quantity: u32,
}

/// `POST /cart/add/` answers with either the touched line or the whole cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AddedToCart {
    Line(CartLine),
    Cart(Cart),
}
