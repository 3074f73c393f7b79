//! Authentication service.
//!
//! Password login for admin accounts and shop customers, plus bearer token
//! resolution for the request extractors.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, TokenKeys, TokenKind};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use secrecy::ExposeSecret;

use mp_records_core::{AdminRole, CustomerId, Email, UserId};

use crate::config::BootstrapAdmin;
use crate::db::{RepositoryError, Store};
use crate::models::{AdminUser, Customer};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Admin created by `setup` when neither the request nor the environment
/// names one.
const FALLBACK_ADMIN_USERNAME: &str = "admin";
const FALLBACK_ADMIN_PASSWORD: &str = "admin123";

/// Fields submitted when a customer registers.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Authentication service.
///
/// Borrows the store and token keys from application state for the duration
/// of one request.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    keys: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, keys: &'a TokenKeys) -> Self {
        Self { store, keys }
    }

    // =========================================================================
    // Admin accounts
    // =========================================================================

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for blank input and
    /// `AuthError::InvalidCredentials` if the username or password is wrong.
    pub async fn login_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, AdminUser), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingField("username and password are required"));
        }

        let (user, password_hash) = self
            .store
            .user_credentials(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.keys.issue(user.id.as_uuid(), TokenKind::Admin)?;
        tracing::info!(username = %user.username, "admin logged in");
        Ok((token, user))
    }

    /// Create the first admin account.
    ///
    /// Missing fields fall back to the configured bootstrap admin, then to
    /// the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SetupComplete` if any admin already exists.
    pub async fn setup_admin(
        &self,
        username: Option<String>,
        password: Option<String>,
        bootstrap: Option<&BootstrapAdmin>,
    ) -> Result<AdminUser, AuthError> {
        if self.store.count_users().await? > 0 {
            return Err(AuthError::SetupComplete);
        }

        let username = username
            .filter(|u| !u.trim().is_empty())
            .or_else(|| bootstrap.map(|b| b.username.clone()))
            .unwrap_or_else(|| FALLBACK_ADMIN_USERNAME.to_owned());
        let password = password
            .filter(|p| !p.is_empty())
            .or_else(|| bootstrap.map(|b| b.password.expose_secret().to_owned()))
            .unwrap_or_else(|| FALLBACK_ADMIN_PASSWORD.to_owned());

        self.create_admin(&username, &password, AdminRole::Admin)
            .await
            .map_err(|e| match e {
                AuthError::Repository(RepositoryError::Conflict(_)) => AuthError::SetupComplete,
                other => other,
            })
    }

    /// Create an admin account.
    ///
    /// # Errors
    ///
    /// See [`create_admin`].
    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
        role: AdminRole,
    ) -> Result<AdminUser, AuthError> {
        create_admin(self.store, username, password, role).await
    }

    /// Resolve an admin bearer token to its account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token does not verify or the
    /// account no longer exists.
    pub async fn admin_from_token(&self, token: &str) -> Result<AdminUser, AuthError> {
        let claims = self.keys.verify(token, TokenKind::Admin)?;
        self.store
            .get_user(UserId::from_uuid(claims.sub))
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    // =========================================================================
    // Shop customers
    // =========================================================================

    /// Register a customer and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::EmailTaken`; names are validated as well.
    pub async fn register_customer(
        &self,
        registration: Registration,
    ) -> Result<(String, Customer), AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let customer = Customer::new(
            email,
            registration.first_name,
            registration.last_name,
            registration.phone,
            Utc::now(),
        )?;
        let password_hash = hash_password(&registration.password)?;

        self.store
            .insert_customer(&customer, Some(&password_hash))
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        let token = self.keys.issue(customer.id.as_uuid(), TokenKind::Customer)?;
        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok((token, customer))
    }

    /// Login a customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for unknown emails, wrong
    /// passwords and accounts without a password (imported from a backup),
    /// and `AuthError::AccountDisabled` for deactivated accounts.
    pub async fn login_customer(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, Customer), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingField("email and password are required"));
        }
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (customer, password_hash) = self
            .store
            .customer_credentials(email.as_str())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        if !customer.active {
            return Err(AuthError::AccountDisabled);
        }

        let token = self.keys.issue(customer.id.as_uuid(), TokenKind::Customer)?;
        Ok((token, customer))
    }

    /// Resolve a customer bearer token to an active account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token does not verify or the
    /// account is gone, and `AuthError::AccountDisabled` if it was deactivated.
    pub async fn customer_from_token(&self, token: &str) -> Result<Customer, AuthError> {
        let claims = self.keys.verify(token, TokenKind::Customer)?;
        let customer = self
            .store
            .get_customer(CustomerId::from_uuid(claims.sub))
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !customer.active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(customer)
    }
}

/// Create an admin account.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for short passwords and
/// `AuthError::Repository` (conflict) if the username is taken.
pub async fn create_admin(
    store: &dyn Store,
    username: &str,
    password: &str,
    role: AdminRole,
) -> Result<AdminUser, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::MissingField("username is required"));
    }
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = AdminUser {
        id: UserId::new(),
        username: username.to_owned(),
        role,
        created_at: Utc::now(),
    };
    store.insert_user(&user, &password_hash).await?;
    tracing::info!(username = %user.username, role = %user.role, "admin account created");
    Ok(user)
}

/// Create the configured bootstrap admin when no admin exists yet.
///
/// Returns the created account, or `None` when nothing had to be done.
///
/// # Errors
///
/// Returns `AuthError` if the store fails or the configured password is too
/// short.
pub async fn ensure_bootstrap_admin(
    store: &dyn Store,
    bootstrap: Option<&BootstrapAdmin>,
) -> Result<Option<AdminUser>, AuthError> {
    let Some(bootstrap) = bootstrap else {
        return Ok(None);
    };
    if store.count_users().await? > 0 {
        return Ok(None);
    }
    let user = create_admin(
        store,
        &bootstrap.username,
        bootstrap.password.expose_secret(),
        AdminRole::Admin,
    )
    .await?;
    Ok(Some(user))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtConfig;
    use crate::db::{CustomerStore, MemoryStore};

    fn keys() -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from("k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%".to_string()),
            admin_ttl: Duration::from_secs(3600),
        })
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "tajne123".to_string(),
            first_name: Some("Ala".to_string()),
            last_name: Some("Kot".to_string()),
            phone: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter23", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("abc12"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("abc123").is_ok());
    }

    #[tokio::test]
    async fn test_setup_uses_fallback_then_refuses() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys);

        let user = auth.setup_admin(None, None, None).await.unwrap();
        assert_eq!(user.username, "admin");
        auth.login_admin("admin", "admin123").await.unwrap();

        let again = auth.setup_admin(Some("other".into()), None, None).await;
        assert!(matches!(again, Err(AuthError::SetupComplete)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_created_once() {
        let store = MemoryStore::new();
        let bootstrap = BootstrapAdmin {
            username: "boss".to_string(),
            password: SecretString::from("longpassword".to_string()),
        };

        let first = ensure_bootstrap_admin(&store, Some(&bootstrap))
            .await
            .unwrap();
        assert!(first.is_some());
        let second = ensure_bootstrap_admin(&store, Some(&bootstrap))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys);

        let (token, customer) = auth
            .register_customer(registration("Ala@Example.pl"))
            .await
            .unwrap();
        assert_eq!(customer.email.as_str(), "ala@example.pl");
        assert_eq!(
            auth.customer_from_token(&token).await.unwrap().id,
            customer.id
        );

        let (_, logged_in) = auth
            .login_customer("ala@example.pl", "tajne123")
            .await
            .unwrap();
        assert_eq!(logged_in.id, customer.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys);

        auth.register_customer(registration("ala@example.pl"))
            .await
            .unwrap();
        let err = auth
            .register_customer(registration("ALA@example.pl"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_deactivated_customer_cannot_login() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys);

        let (_, mut customer) = auth
            .register_customer(registration("ala@example.pl"))
            .await
            .unwrap();
        customer.active = false;
        store.update_customer(&customer).await.unwrap();

        let err = auth
            .login_customer("ala@example.pl", "tajne123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn test_customer_without_password_cannot_login() {
        let store = MemoryStore::new();
        let keys = keys();
        let customer = Customer::new(
            Email::parse("imported@example.pl").unwrap(),
            Some("Jan".into()),
            Some("Nowak".into()),
            None,
            Utc::now(),
        )
        .unwrap();
        store.insert_customer(&customer, None).await.unwrap();

        let err = AuthService::new(&store, &keys)
            .login_customer("imported@example.pl", "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_admin_token_not_accepted_for_customer() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys);
        auth.setup_admin(None, None, None).await.unwrap();
        let (token, _) = auth.login_admin("admin", "admin123").await.unwrap();

        assert!(auth.customer_from_token(&token).await.is_err());
        assert!(auth.admin_from_token(&token).await.is_ok());
    }
}
