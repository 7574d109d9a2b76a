//! Authentication route handlers.
//!
//! Handles signup, password login, and logout. Form validation failures
//! re-render the form with a message; only server-side failures become
//! error responses.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::is_safe_redirect;
use crate::middleware::{OptionalAuth, RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub username: String,
    pub next: String,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub username: String,
}

/// Keep `next` only when it points back into this site.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| is_safe_redirect(n))
}

/// Whether an auth error belongs on the form rather than in an error response.
const fn is_form_error(err: &AuthError) -> bool {
    !matches!(err, AuthError::Repository(_) | AuthError::PasswordHash)
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, user))]
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::new(&state, user.as_ref()),
        error: None,
        username: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
    }
}

/// Handle login form submission.
///
/// On success the session id is cycled and the user is sent to `next` when
/// it is a local path, otherwise to the listing page.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.users());

    match auth.login_with_password(&form.username, &form.password).await {
        Ok(user) => {
            set_current_user(&session, &CurrentUser::from(&user)).await?;
            set_sentry_user(&user.id, user.username.as_str());
            tracing::info!(user_id = %user.id, "User logged in");

            let target = safe_next(form.next.as_deref()).unwrap_or("/");
            Ok(Redirect::to(target).into_response())
        }
        Err(e) if is_form_error(&e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(LoginTemplate {
                page: PageContext::new(&state, None),
                error: Some(e.user_message()),
                username: form.username,
                next: safe_next(form.next.as_deref())
                    .unwrap_or_default()
                    .to_string(),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
#[instrument(skip(state, user))]
pub async fn signup_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    SignupTemplate {
        page: PageContext::new(&state, user.as_ref()),
        error: None,
        username: String::new(),
    }
}

/// Handle signup form submission.
///
/// A new account is not logged in automatically; the user is sent to the
/// login page.
#[instrument(skip(state, form))]
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.users());

    match auth
        .register_with_password(&form.username, &form.password1, &form.password2)
        .await
    {
        Ok(_) => Ok(Redirect::to("/login/").into_response()),
        Err(e) if is_form_error(&e) => {
            tracing::info!(error = %e, "Signup rejected");
            Ok(SignupTemplate {
                page: PageContext::new(&state, None),
                error: Some(e.user_message()),
                username: form.username,
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Log out on GET or POST.
///
/// Anonymous visitors are sent to the login page first. Flushes the whole
/// session, so the cart goes with the identity.
#[instrument(skip(user, session), fields(user_id = %user.id))]
pub async fn logout(RequireAuth(user): RequireAuth, session: Session) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();
    tracing::debug!(username = %user.username, "Session flushed");

    Ok(Redirect::to("/"))
}
