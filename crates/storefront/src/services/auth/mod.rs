//! Authentication service.
//!
//! Provides username/password registration and login backed by argon2 hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use tshop_core::Username;

use crate::db::{RepositoryError, UserStore};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords at or above this similarity to the username are rejected.
const MAX_SIMILARITY: f64 = 0.7;

/// Passwords rejected outright, compared case-insensitively.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password12",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "87654321",
    "11111111",
    "00000000",
    "qwertyuiop",
    "qwerty123",
    "qwertyui",
    "1q2w3e4r",
    "1qaz2wsx",
    "zaq12wsx",
    "asdfghjkl",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "superman",
    "starwars",
    "whatever",
    "trustno1",
    "letmein1",
    "welcome1",
    "abcd1234",
    "abc12345",
    "admin123",
    "changeme",
    "computer",
    "internet",
    "michelle",
    "jennifer",
    "danielle",
    "charlie1",
    "dragon12",
    "monkey12",
    "master12",
    "shadow12",
    "mustang1",
    "liverpool",
    "chelsea1",
    "samsung1",
    "google123",
];

/// Authentication service.
///
/// Handles user registration and login against a [`UserStore`].
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new user with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username is already registered.
    pub async fn register_with_password(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;

        if password != confirmation {
            return Err(AuthError::PasswordMismatch);
        }

        validate_password(password, &username)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_password(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        // A malformed username can't belong to anyone
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` naming the first rule the password breaks.
pub fn validate_password(password: &str, username: &Username) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "This password is entirely numeric.".to_string(),
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(AuthError::WeakPassword(
            "This password is too common.".to_string(),
        ));
    }

    if similarity(&lowered, &username.as_str().to_lowercase()) >= MAX_SIMILARITY {
        return Err(AuthError::WeakPassword(
            "The password is too similar to the username.".to_string(),
        ));
    }

    Ok(())
}

/// Similarity ratio in `0.0..=1.0` based on the longest common substring.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }

    // Rolling row of the classic longest-common-substring table
    let mut longest = 0usize;
    let mut prev = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev.get(j).copied().unwrap_or(0) + 1;
                if let Some(cell) = row.get_mut(j + 1) {
                    *cell = run;
                }
                longest = longest.max(run);
            }
        }
        prev = row;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = (2 * longest) as f64 / total as f64;
    ratio
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
    use super::*;
    use crate::db::memory::MemoryUsers;

    fn username(s: &str) -> Username {
        Username::parse(s).unwrap()
    }

    #[test]
    fn test_password_rules() {
        let user = username("painter");

        assert!(validate_password("short1", &user).is_err());
        assert!(validate_password("1234567890123", &user).is_err());
        assert!(validate_password("Password123", &user).is_err());
        assert!(validate_password("painter1", &user).is_err());
        assert!(validate_password("varnish-and-brush", &user).is_ok());
    }

    #[test]
    fn test_similarity() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("painter", "zzzzzzz") < f64::EPSILON);
        assert!(similarity("painter99", "painter") >= MAX_SIMILARITY);
        assert!(similarity("", "") < f64::EPSILON);
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("varnish-and-brush").unwrap();
        assert!(verify_password("varnish-and-brush", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryUsers::default();
        let auth = AuthService::new(&store);

        let user = auth
            .register_with_password("painter", "varnish-and-brush", "varnish-and-brush")
            .await
            .unwrap();
        assert_eq!(user.username.as_str(), "painter");

        let logged_in = auth
            .login_with_password("painter", "varnish-and-brush")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login_with_password("painter", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login_with_password("nobody", "varnish-and-brush").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let store = MemoryUsers::default();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.register_with_password("bad name", "varnish-and-brush", "varnish-and-brush")
                .await,
            Err(AuthError::InvalidUsername(_))
        ));
        assert!(matches!(
            auth.register_with_password("painter", "varnish-and-brush", "varnish-and-brus")
                .await,
            Err(AuthError::PasswordMismatch)
        ));

        auth.register_with_password("painter", "varnish-and-brush", "varnish-and-brush")
            .await
            .unwrap();
        assert!(matches!(
            auth.register_with_password("painter", "other-long-phrase", "other-long-phrase")
                .await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
