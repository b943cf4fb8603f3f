use derive_more::{Display, Error, From};
use rust_decimal::Decimal;

/// Every failure a storefront operation can surface.
///
/// The gateway classifies each failed call into exactly one variant and hands it upward
/// unchanged; controllers never recover from any of them locally.
#[derive(Debug, Display, Error, From)]
#[non_exhaustive]
pub enum ClientError {
    /// input rejected before any request was made
    #[display("{_0}")]
    #[from]
    Validation(ValidationError),
    #[display("unauthorized: {message}")]
    Unauthorized { message: String },
    #[display("server rejected the request ({status}): {message}")]
    ServerRejected { status: u16, message: String },
    /// no response was received at all
    #[display("backend unreachable: {message}")]
    Unreachable { message: String },
    #[display("timeout occurred")]
    Timeout,
    #[display("request cancelled")]
    Cancelled,
    #[display("malformed response: {message}")]
    MalformedResponse { message: String },
    #[display("cart total {reported} does not match its lines ({computed})")]
    InconsistentCart { reported: Decimal, computed: Decimal },
    #[display("session storage error: {_0}")]
    #[from]
    Storage(StorageError),
}

#[derive(Debug, Display, Error, PartialEq, Eq, Clone, Copy)]
pub enum ValidationError {
    #[display("your cart is empty")]
    EmptyCart,
    #[display("quantity must be at least 1")]
    InvalidQuantity,
    #[display("quantity is too large")]
    QuantityOutOfRange,
    #[display("username and password required")]
    MissingCredentials,
    #[display("token must not be empty")]
    EmptyToken,
}

#[derive(Debug, Display, Error, From)]
pub enum StorageError {
    #[display("io error: {_0}")]
    Io(std::io::Error),
    #[display("invalid session record: {_0}")]
    Json(serde_json::Error),
}

impl ClientError {
    /// `true` when the backend refused our credentials and the user has to sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}
