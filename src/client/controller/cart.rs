use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use crate::client::error::{ClientError, ValidationError};
use crate::client::gateway::ApiGateway;
use crate::client::model::cart::{AddedToCart, Cart, LineId};
use crate::client::model::food::FoodId;

pub const DEFAULT_QUANTITY: u32 = 1;

/// Last cart shown to the user and the sequence number of the fetch that produced it.
#[derive(Debug, Default)]
struct CartView {
    cart: Option<Cart>,
    applied: u64,
}

/// Mediates cart mutations and keeps the displayed cart in line with the backend.
///
/// Mutations are never applied locally: each one is followed by a full re-fetch, and the
/// displayed cart only ever changes to a complete, consistent cart returned by the backend.
/// Fetches are numbered when issued so a response older than the one already displayed is
/// dropped instead of overwriting it.
pub struct CartController {
    gateway: Arc<ApiGateway>,
    view: Mutex<CartView>,
    sequence: AtomicU64,
    scope: CancellationToken,
}

impl CartController {
    /// `scope` ties every request of this controller to the lifetime of the view using it.
    pub fn new(gateway: Arc<ApiGateway>, scope: CancellationToken) -> Self {
        Self {
            gateway,
            view: Mutex::new(CartView::default()),
            sequence: AtomicU64::new(0),
            scope,
        }
    }

    /// The displayed cart, `None` until the first successful fetch.
    pub fn cart(&self) -> Option<Cart> {
        self.lock_view().cart.clone()
    }

    /// Aborts outstanding requests; responses still arriving afterwards are ignored.
    pub fn close(&self) {
        self.scope.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Replaces the displayed cart with the backend's.
    pub async fn fetch_cart(&self) -> Result<Cart, ClientError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let cart = self.gateway.get_cart(&self.scope).await?;
        if !cart.is_consistent() {
            warn!("discarding cart with inconsistent total={} lines={}", cart.total, cart.items.len());
            return Err(ClientError::InconsistentCart {
                reported: cart.total,
                computed: cart.computed_total(),
            });
        }
        self.apply(sequence, cart)
    }

    /// Sets a line's quantity. Anything below 1 removes the line.
    pub async fn set_quantity(&self, line_id: LineId, quantity: i64) -> Result<Cart, ClientError> {
        if quantity < 1 {
            return self.remove_line(line_id).await;
        }
        let quantity = u32::try_from(quantity).map_err(|_| ValidationError::QuantityOutOfRange)?;
        self.gateway.update_cart_item(line_id, quantity, &self.scope).await?;
        self.fetch_cart().await
    }

    pub async fn remove_line(&self, line_id: LineId) -> Result<Cart, ClientError> {
        self.gateway.remove_cart_item(line_id, &self.scope).await?;
        self.fetch_cart().await
    }

    /// Adds `quantity` of a food. The caller makes sure the user is signed in; the displayed cart
    /// is not refreshed.
    pub async fn add_item(&self, food_id: FoodId, quantity: u32) -> Result<AddedToCart, ClientError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }
        self.gateway.add_to_cart(food_id, quantity, &self.scope).await
    }

    fn apply(&self, sequence: u64, cart: Cart) -> Result<Cart, ClientError> {
        let mut view = self.lock_view();
        if self.scope.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        if sequence <= view.applied {
            debug!("dropping stale cart response seq={} applied={}", sequence, view.applied);
            return Ok(view.cart.clone().unwrap_or(cart));
        }
        view.applied = sequence;
        view.cart = Some(cart.clone());
        Ok(cart)
    }

    fn lock_view(&self) -> std::sync::MutexGuard<'_, CartView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
