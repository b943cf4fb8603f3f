use std::sync::Arc;
use log::info;
use tokio_util::sync::CancellationToken;
use crate::client::controller::cart::CartController;
use crate::client::controller::order::OrderSubmitter;
use crate::client::error::{ClientError, ValidationError};
use crate::client::gateway::ApiGateway;
use crate::client::model::auth::AuthResponse;
use crate::client::model::config::ClientConfig;
use crate::client::model::food::{FoodId, FoodItem};
use crate::client::model::HealthStatus;
use crate::client::session::{FileStorage, Session, SessionStore, Storage};
use crate::client::util::image;

/// One client: a session, the gateway using it and the controllers built on top.
///
/// Nothing here is global, two `Storefront`s over different storages are fully independent.
pub struct Storefront {
    session: Arc<SessionStore>,
    gateway: Arc<ApiGateway>,
    cart: Arc<CartController>,
    orders: OrderSubmitter,
    shutdown: CancellationToken,
}

impl Storefront {
    pub fn new(config: &ClientConfig, storage: impl Storage + 'static) -> Self {
        let shutdown = CancellationToken::new();
        let session = Arc::new(SessionStore::open(storage));
        let gateway = Arc::new(ApiGateway::new(config, session.clone()));
        let cart = Arc::new(CartController::new(gateway.clone(), shutdown.child_token()));
        let orders = OrderSubmitter::new(gateway.clone(), cart.clone(), shutdown.child_token());
        Self {
            session,
            gateway,
            cart,
            orders,
            shutdown,
        }
    }

    /// Session persisted to `config.session_file`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config, FileStorage::new(config.session_file.clone()))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub fn cart(&self) -> &CartController {
        &self.cart
    }

    pub fn orders(&self) -> &OrderSubmitter {
        &self.orders
    }

    /// Cancels everything in flight, for good.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.gateway.health(&self.shutdown).await
    }

    /// Logs in against the backend and stores the returned credential.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }
        let auth = self.gateway.login(username, password, &self.shutdown).await?;
        self.session.login(auth.token, auth.username, auth.user_id)?;
        Ok(self.session.snapshot())
    }

    /// Creates an account. Does not sign in.
    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }
        let created = self.gateway.register(username, email, password, &self.shutdown).await?;
        info!("registered user_id={}", created.user_id);
        Ok(created)
    }

    pub fn sign_out(&self) -> Result<(), ClientError> {
        self.session.logout()
    }

    pub async fn menu(&self) -> Result<Vec<FoodItem>, ClientError> {
        self.gateway.list_foods(&self.shutdown).await
    }

    /// There is no single-food endpoint, so this scans the menu.
    pub async fn food(&self, id: FoodId) -> Result<Option<FoodItem>, ClientError> {
        Ok(self.menu().await?.into_iter().find(|food| food.id == id))
    }

    pub fn image_url(&self, food: &FoodItem) -> String {
        image::image_url_or_placeholder(self.gateway.api_url(), food)
    }
}
