//! Unified error handling with Sentry integration.
//!
//! Each module owns a `thiserror` enum; [`AppError`] wraps them for hosts
//! that drive several services. Caller errors (bad input, not signed in) are
//! shown to the user as-is. Everything else is reported to Sentry and shown
//! as a generic message.

use thiserror::Error;

use corewell_core::CartError;

use crate::cache::CacheError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::documents::StoreError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::leads::LeadError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local cache operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Document store operation failed.
    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    /// Catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation rejected.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order could not be placed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Stockist request or subscription failed.
    #[error("lead error: {0}")]
    Lead(#[from] LeadError),
}

impl AppError {
    /// Whether the error comes from the caller's input rather than the system.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        match self {
            Self::Cart(_) => true,
            Self::Auth(err) => err.is_caller_error(),
            Self::Checkout(err) => err.is_caller_error(),
            Self::Lead(err) => err.is_caller_error(),
            Self::Config(_) | Self::Cache(_) | Self::Store(_) | Self::Catalog(_) => false,
        }
    }

    /// Text that is safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(CartError::ProductNotFound(id)) => format!("No product with id `{id}`"),
            Self::Cart(CartError::IndexOutOfBounds { index, len }) => {
                format!("No cart line at position {index} (cart has {len})")
            }
            Self::Auth(err) => match err {
                AuthError::MissingCredentials => "Please enter email and password".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::PasswordHash | AuthError::Store(_) => {
                    "Authentication failed, please try again later".to_string()
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::SignInRequired => {
                    "Please log in before completing your order".to_string()
                }
                CheckoutError::EmptyCart => "Your cart is empty".to_string(),
                CheckoutError::MissingShipping(field) => format!("Please enter your {field}"),
                CheckoutError::Store(_) => {
                    "Failed to process your order. Please try again".to_string()
                }
            },
            Self::Lead(err) => match err {
                LeadError::MissingField(field) => format!("Please enter your {field}"),
                LeadError::InvalidEmail(_) => "Invalid email address".to_string(),
                LeadError::SignInRequired => "Please log in to subscribe".to_string(),
                LeadError::Store(_) => {
                    "Failed to submit your request. Please try again later".to_string()
                }
            },
            Self::Config(err) => err.to_string(),
            Self::Cache(_) | Self::Store(_) | Self::Catalog(_) => {
                "Something went wrong, please try again later".to_string()
            }
        }
    }

    /// Log the error and capture system errors to Sentry.
    pub fn report(&self) {
        if self.is_caller_error() {
            tracing::info!(error = %self, "Request rejected");
            return;
        }
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Operation failed"
        );
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Stop associating Sentry events with a user (sign-out).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a user action shown in the trail of later Sentry reports.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "glow-boost")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };
    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }
    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use corewell_core::ProductId;

    use super::*;

    #[test]
    fn test_caller_errors() {
        assert!(AppError::from(CartError::ProductNotFound(ProductId::new("x"))).is_caller_error());
        assert!(AppError::from(AuthError::InvalidCredentials).is_caller_error());
        assert!(AppError::from(CheckoutError::SignInRequired).is_caller_error());
        assert!(!AppError::from(StoreError::Unavailable("down".to_string())).is_caller_error());
        assert!(
            !AppError::from(CheckoutError::Store(StoreError::Unavailable("down".to_string())))
                .is_caller_error()
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::from(StoreError::Unavailable("10.0.0.3 refused".to_string()));
        assert!(!err.user_message().contains("10.0.0.3"));

        let err = AppError::from(CartError::IndexOutOfBounds { index: 4, len: 2 });
        assert_eq!(err.user_message(), "No cart line at position 4 (cart has 2)");

        let err = AppError::from(LeadError::SignInRequired);
        assert_eq!(err.user_message(), "Please log in to subscribe");
    }
}
