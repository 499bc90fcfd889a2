//! Lead capture: stockist requests and subscription sign-ups.

use thiserror::Error;
use tracing::{info, instrument};

use corewell_core::{DocumentId, Email, StockistRequest, SubscriptionRequest, collections};

use crate::documents::{DocumentStore, StoreError, create_as};
use crate::models::Identity;

/// Plan recorded when the caller does not choose one.
pub const DEFAULT_PLAN: &str = "General Subscription";

/// Errors that can occur when capturing a lead.
#[derive(Debug, Error)]
pub enum LeadError {
    /// A required form field was left blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] corewell_core::EmailError),

    /// Subscriptions are tied to an account.
    #[error("sign in to subscribe")]
    SignInRequired,

    /// The document could not be written.
    #[error("failed to save: {0}")]
    Store(#[from] StoreError),
}

impl LeadError {
    /// Whether the caller can fix this by changing their input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Raw stockist form input.
#[derive(Debug, Clone, Default)]
pub struct StockistForm {
    pub name: String,
    pub email: String,
    pub company: String,
    pub message: String,
}

/// Record a retailer's request to stock the range. No sign-in needed.
///
/// # Errors
///
/// Returns `LeadError::MissingField` for a blank name or message,
/// `LeadError::InvalidEmail` for a malformed email and `LeadError::Store` if
/// the request cannot be saved.
#[instrument(skip_all, fields(company = %form.company))]
pub async fn submit_stockist_request(
    documents: &dyn DocumentStore,
    form: &StockistForm,
) -> Result<DocumentId, LeadError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(LeadError::MissingField("name"));
    }
    let message = form.message.trim();
    if message.is_empty() {
        return Err(LeadError::MissingField("message"));
    }

    let request = StockistRequest {
        name: name.to_owned(),
        email: Email::normalized(&form.email)?,
        company: form.company.trim().to_owned(),
        message: message.to_owned(),
    };
    let id = create_as(documents, collections::STOCKIST_REQUESTS, &request).await?;
    info!(request_id = %id, "Stockist request received");
    Ok(id)
}

/// Sign the current user up for a plan, [`DEFAULT_PLAN`] unless given.
///
/// # Errors
///
/// Returns `LeadError::SignInRequired` without an identity and
/// `LeadError::Store` if the sign-up cannot be saved.
#[instrument(skip_all)]
pub async fn subscribe(
    documents: &dyn DocumentStore,
    identity: Option<&Identity>,
    plan: Option<&str>,
) -> Result<DocumentId, LeadError> {
    let identity = identity.ok_or(LeadError::SignInRequired)?;
    let plan = plan
        .map(str::trim)
        .filter(|plan| !plan.is_empty())
        .unwrap_or(DEFAULT_PLAN);

    let request = SubscriptionRequest {
        user_id: identity.uid.clone(),
        plan: plan.to_owned(),
    };
    let id = create_as(documents, collections::SUBSCRIPTIONS, &request).await?;
    info!(user_id = %identity.uid, subscription_id = %id, plan, "Subscription created");
    Ok(id)
}
