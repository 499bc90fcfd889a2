//! Authentication service.
//!
//! Email and password accounts behind the [`IdentityProvider`] trait. The
//! cart only needs a stable uid per user and a notification whenever the
//! signed-in user changes, which [`IdentityProvider::subscribe`] provides.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, instrument};

use corewell_core::{DocumentId, Email, UserId, collections};

use crate::documents::{DocumentStore, read_as, write_as};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{Account, Identity};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Source of the signed-in identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in identity, if any.
    fn current(&self) -> Option<Identity>;

    /// Receiver notified on every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Sign in an existing account.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError>;

    /// Create an account and sign it in.
    async fn register(
        &self,
        email: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<Identity, AuthError>;

    /// Sign out. A no-op when nobody is signed in.
    fn sign_out(&self);
}

/// Identity provider keeping accounts in the `accounts` collection.
///
/// Accounts are keyed by normalized email; passwords are stored as Argon2
/// PHC strings.
pub struct LocalIdentityProvider {
    documents: Arc<dyn DocumentStore>,
    current: watch::Sender<Option<Identity>>,
}

impl std::fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityProvider")
            .field("current", &*self.current.borrow())
            .finish_non_exhaustive()
    }
}

impl LocalIdentityProvider {
    /// Create a provider with nobody signed in.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self { documents, current }
    }

    /// Re-establish a persisted session without asking for the password.
    pub fn restore(&self, identity: Identity) {
        set_sentry_user(&identity.uid, Some(identity.email.as_str()));
        self.current.send_replace(Some(identity));
    }

    fn signed_in(&self, identity: Identity) -> Identity {
        set_sentry_user(&identity.uid, Some(identity.email.as_str()));
        self.current.send_replace(Some(identity.clone()));
        identity
    }

    async fn find_account(&self, email: &Email) -> Result<Option<Account>, AuthError> {
        let id = DocumentId::new(email.as_str());
        Ok(read_as(self.documents.as_ref(), collections::ACCOUNTS, &id).await?)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password; the two are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let password = password.expose_secret();
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let email = Email::normalized(email)?;

        let account = self
            .find_account(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &account.password_hash)?;

        info!(user_id = %account.uid, "User signed in");
        Ok(self.signed_in(account.identity()))
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials`, `PasswordMismatch`,
    /// `InvalidEmail` or `WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password, confirm))]
    async fn register(
        &self,
        email: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<Identity, AuthError> {
        let password = password.expose_secret();
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if password != confirm.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        let email = Email::normalized(email)?;
        validate_password(password)?;

        if self.find_account(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let account = Account {
            uid: UserId::new(uuid::Uuid::new_v4().simple().to_string()),
            email: email.clone(),
            password_hash: hash_password(password)?,
            registered_at: Utc::now(),
        };
        write_as(
            self.documents.as_ref(),
            collections::ACCOUNTS,
            &DocumentId::new(email.as_str()),
            &account,
        )
        .await?;

        info!(user_id = %account.uid, "User registered");
        Ok(self.signed_in(account.identity()))
    }

    fn sign_out(&self) {
        let previous = self.current.send_replace(None);
        if let Some(identity) = previous {
            clear_sentry_user();
            info!(user_id = %identity.uid, "User signed out");
        }
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::documents::MemoryDocumentStore;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn provider() -> (Arc<MemoryDocumentStore>, LocalIdentityProvider) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let provider = LocalIdentityProvider::new(documents.clone());
        (documents, provider)
    }

    async fn register(provider: &LocalIdentityProvider, email: &str) -> Result<Identity, AuthError> {
        provider
            .register(email, &secret("hunter2hunter2"), &secret("hunter2hunter2"))
            .await
    }

    #[tokio::test]
    async fn test_register_signs_in_and_hashes() {
        let (documents, provider) = provider();
        let identity = register(&provider, "Buyer@CoreWell.co.za").await.unwrap();

        assert_eq!(identity.email.as_str(), "buyer@corewell.co.za");
        assert_eq!(provider.current(), Some(identity));

        let stored = documents
            .get(collections::ACCOUNTS, &DocumentId::new("buyer@corewell.co.za"))
            .unwrap();
        let hash = stored["passwordHash"].as_str().unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (_, provider) = provider();
        assert!(matches!(
            provider.register("", &secret("x"), &secret("x")).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            provider
                .register("a@b.co", &secret("longenough1"), &secret("longenough2"))
                .await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            provider.register("a@b.co", &secret("short"), &secret("short")).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            register(&provider, "not-an-email").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (_, provider) = provider();
        register(&provider, "buyer@corewell.co.za").await.unwrap();
        assert!(matches!(
            register(&provider, "BUYER@corewell.co.za").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let (_, provider) = provider();
        let registered = register(&provider, "buyer@corewell.co.za").await.unwrap();
        provider.sign_out();

        assert!(matches!(
            provider
                .sign_in("buyer@corewell.co.za", &secret("wrong-password"))
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            provider.sign_in("nobody@corewell.co.za", &secret("hunter2hunter2")).await,
            Err(AuthError::InvalidCredentials)
        ));

        let identity = provider
            .sign_in(" buyer@corewell.co.za ", &secret("hunter2hunter2"))
            .await
            .unwrap();
        assert_eq!(identity, registered);
    }

    #[tokio::test]
    async fn test_subscribers_see_sign_in_and_out() {
        let (_, provider) = provider();
        let mut events = provider.subscribe();
        assert!(events.borrow().is_none());

        let identity = register(&provider, "buyer@corewell.co.za").await.unwrap();
        assert!(events.has_changed().unwrap());
        assert_eq!(events.borrow_and_update().as_ref(), Some(&identity));

        provider.sign_out();
        assert!(events.has_changed().unwrap());
        assert!(events.borrow_and_update().is_none());
    }

    #[test]
    fn test_restore_sets_current() {
        let (_, provider) = provider();
        let identity = Identity {
            uid: UserId::new("u1"),
            email: Email::parse("buyer@corewell.co.za").unwrap(),
        };
        provider.restore(identity.clone());
        assert_eq!(provider.current(), Some(identity));
    }
}
