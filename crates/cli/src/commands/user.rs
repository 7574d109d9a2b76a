//! Account commands.

use secrecy::{ExposeSecret, SecretString};

use tshop_storefront::db::PgUserStore;
use tshop_storefront::services::auth::AuthService;

use super::{CommandError, connect};

/// Create an account with the password from `TSHOP_USER_PASSWORD`.
///
/// The password goes through the same validation as the signup form.
///
/// # Errors
///
/// Returns an error if the password is missing or rejected, or the username
/// is taken.
pub async fn add(username: &str) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let password = std::env::var("TSHOP_USER_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TSHOP_USER_PASSWORD"))?;

    let users = PgUserStore::new(connect().await?);
    let auth = AuthService::new(&users);

    let user = auth
        .register_with_password(
            username,
            password.expose_secret(),
            password.expose_secret(),
        )
        .await?;

    tracing::info!(id = %user.id, username = %user.username, "User created");
    Ok(())
}
