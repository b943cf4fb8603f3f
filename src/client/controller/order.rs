use std::sync::Arc;
use log::info;
use tokio_util::sync::CancellationToken;
use crate::client::controller::cart::CartController;
use crate::client::error::{ClientError, ValidationError};
use crate::client::gateway::ApiGateway;
use crate::client::model::order::{CreateOrderRequest, Order};

/// Turns the current cart into a confirmed order.
///
/// Exactly one create-order call per [`submit`](Self::submit); failures come back verbatim and
/// are never retried, a retry is a new `submit` by the caller.
pub struct OrderSubmitter {
    gateway: Arc<ApiGateway>,
    cart: Arc<CartController>,
    scope: CancellationToken,
}

impl OrderSubmitter {
    pub fn new(gateway: Arc<ApiGateway>, cart: Arc<CartController>, scope: CancellationToken) -> Self {
        Self { gateway, cart, scope }
    }

    pub async fn submit(&self) -> Result<Order, ClientError> {
        self.submit_with(CreateOrderRequest::default()).await
    }

    /// Refuses with [`ValidationError::EmptyCart`] when the last fetched cart has no lines (or no
    /// cart was fetched yet); the backend still has the final say. The displayed cart is left
    /// as it is either way.
    pub async fn submit_with(&self, request: CreateOrderRequest) -> Result<Order, ClientError> {
        let has_lines = self.cart.cart().is_some_and(|cart| !cart.is_empty());
        if !has_lines {
            return Err(ValidationError::EmptyCart.into());
        }
        let order = self.gateway.create_order(&request, &self.scope).await?;
        info!("order={} placed, total_price={}", order.id, order.total_price);
        Ok(order)
    }

    pub fn close(&self) {
        self.scope.cancel();
    }
}
