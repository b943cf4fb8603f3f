//! The only place that talks to the backend.

use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time;
use tokio_util::sync::CancellationToken;
use crate::client::error::ClientError;
use crate::client::model::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::client::model::cart::{AddToCartRequest, AddedToCart, Cart, CartLine, LineId, UpdateCartItemRequest};
use crate::client::model::config::ClientConfig;
use crate::client::model::food::{FoodId, FoodItem};
use crate::client::model::order::{CreateOrderRequest, Order};
use crate::client::model::HealthStatus;
use crate::client::session::SessionStore;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Typed wrapper over the storefront REST api.
///
/// Cart and order calls attach the current session token when there is one. Public calls
/// (health, register, login, menu) never carry it, so a revoked token cannot lock the user out
/// of signing in again. Every call is bounded by the configured timeout and can be aborted
/// through its [`CancellationToken`]. Nothing is retried.
pub struct ApiGateway {
    http: Client,
    api_url: String,
    auth_scheme: String,
    timeout: Duration,
    session: Arc<SessionStore>,
}

impl ApiGateway {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_scheme: config.auth_scheme.clone(),
            timeout: config.timeout,
            session,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn health(&self, cancel: &CancellationToken) -> Result<HealthStatus, ClientError> {
        self.fetch(self.request(Method::GET, "health/"), cancel).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str, cancel: &CancellationToken) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest { username, email, password };
        self.fetch(self.request(Method::POST, "register/").json(&body), cancel).await
    }

    pub async fn login(&self, username: &str, password: &str, cancel: &CancellationToken) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest { username, password };
        self.fetch(self.request(Method::POST, "login/").json(&body), cancel).await
    }

    pub async fn list_foods(&self, cancel: &CancellationToken) -> Result<Vec<FoodItem>, ClientError> {
        self.fetch(self.request(Method::GET, "foods/"), cancel).await
    }

    pub async fn get_cart(&self, cancel: &CancellationToken) -> Result<Cart, ClientError> {
        self.fetch(self.authed_request(Method::GET, "cart/"), cancel).await
    }

    pub async fn add_to_cart(&self, food_id: FoodId, quantity: u32, cancel: &CancellationToken) -> Result<AddedToCart, ClientError> {
        let body = AddToCartRequest { food_id, quantity };
        self.fetch(self.authed_request(Method::POST, "cart/add/").json(&body), cancel).await
    }

    pub async fn update_cart_item(&self, item_id: LineId, quantity: u32, cancel: &CancellationToken) -> Result<CartLine, ClientError> {
        let body = UpdateCartItemRequest { quantity };
        let path = format!("cart/update/{item_id}/");
        self.fetch(self.authed_request(Method::PUT, &path).json(&body), cancel).await
    }

    pub async fn remove_cart_item(&self, item_id: LineId, cancel: &CancellationToken) -> Result<(), ClientError> {
        let path = format!("cart/update/{item_id}/");
        self.execute(self.authed_request(Method::DELETE, &path), cancel).await.map(|_| ())
    }

    pub async fn create_order(&self, request: &CreateOrderRequest, cancel: &CancellationToken) -> Result<Order, ClientError> {
        let mut builder = self.authed_request(Method::POST, "order/create/");
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        self.fetch(builder, cancel).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_url, path);
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// like [`request`](Self::request), plus the session credential when signed in
    fn authed_request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.request(method, path);
        match self.session.token() {
            Some(token) if !token.is_empty() => builder.header(AUTHORIZATION, format!("{} {}", self.auth_scheme, token)),
            _ => builder,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, cancel: &CancellationToken) -> Result<T, ClientError> {
        let body = self.execute(builder, cancel).await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::MalformedResponse { message: e.to_string() })
    }

    /// Sends the request and reads the whole body, racing both against the timeout and `cancel`.
    /// Returns the body of a 2xx response, every other outcome is classified into a [`ClientError`].
    async fn execute(&self, builder: RequestBuilder, cancel: &CancellationToken) -> Result<Vec<u8>, ClientError> {
        let exchange = async {
            let response = builder.send().await.map_err(classify_transport_error)?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| classify_body_error(status, e))?;
            Ok::<_, ClientError>((status, body.to_vec()))
        };
        let sleep = time::sleep(self.timeout);
        tokio::pin!(sleep);
        let (status, body) = tokio::select! {
            result = exchange => result?,
            _ = &mut sleep => {
                warn!("timeout waiting for the backend after {:?}", self.timeout);
                return Err(ClientError::Timeout);
            },
            _ = cancel.cancelled() => {
                debug!("request cancelled");
                return Err(ClientError::Cancelled);
            },
        };
        classify_response(status, body)
    }
}

fn classify_transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        return ClientError::Timeout;
    }
    warn!("no response from the backend, {}", e);
    ClientError::Unreachable { message: e.to_string() }
}

/// The status line arrived, so a broken body is never `Unreachable`.
fn classify_body_error(status: StatusCode, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        return ClientError::Timeout;
    }
    warn!("failed to read response body, status={} {}", status, e);
    ClientError::MalformedResponse { message: format!("incomplete body for status {}: {}", status.as_u16(), e) }
}

fn classify_response(status: StatusCode, body: Vec<u8>) -> Result<Vec<u8>, ClientError> {
    if status.is_success() {
        return Ok(body);
    }
    let message = rejection_message(status, &body);
    debug!("backend rejected the request, status={} message={}", status, message);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized { message }),
        status => Err(ClientError::ServerRejected { status: status.as_u16(), message }),
    }
}

/// Picks the most useful human readable text out of an error body.
fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    let fallback = || format!("request failed with status {}", status.as_u16());
    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        return fallback();
    };
    for key in ["error", "detail", "message"] {
        if let Some(Value::String(message)) = fields.get(key) {
            return message.clone();
        }
    }
    // field level validation errors, e.g. {"username": ["already exists."]}
    let field_errors = fields
        .iter()
        .filter_map(|(field, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "),
                _ => return None,
            };
            (!text.is_empty()).then(|| format!("{field}: {text}"))
        })
        .collect::<Vec<_>>();
    if field_errors.is_empty() {
        fallback()
    } else {
        field_errors.join("; ")
    }
}
