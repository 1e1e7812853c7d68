//! Session-based HTML auth: register, log in, log out, reset password and a
//! dashboard that requires a session.

use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterForm, ResetPasswordForm},
        session::{SessionKeys, SessionUser, LOGIN_PATH},
    },
    html::{error_block, escape, page},
    state::AppState,
    users::{
        repo::StoreError,
        services::{authenticate, create_user, reset_password, UserError},
    },
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", get(register_page).post(register))
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/reset_password", get(reset_page).post(reset))
        .route("/dashboard", get(dashboard))
}

fn log_rejection(e: &UserError, what: &str) {
    if e.status().is_server_error() {
        error!(error = %e, "{what} failed");
    } else {
        warn!(error = %e, "{what} rejected");
    }
}

pub async fn register_page() -> Html<String> {
    Html(render_register(None, "", ""))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    if form.username.trim().is_empty() || form.email.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html(render_register(
                Some("Username, email and password are required."),
                &form.username,
                &form.email,
            )),
        )
            .into_response();
    }

    match create_user(&state.db, &form.username, &form.email, Some(&form.password), true).await {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            log_rejection(&e, "register");
            let msg = match &e {
                UserError::Store(StoreError::EmailTaken) => "Email already registered.".to_string(),
                UserError::Store(StoreError::UsernameTaken) => "Username already taken.".to_string(),
                UserError::Store(StoreError::Database(_)) | UserError::Hash(_) => {
                    "Something went wrong, please try again.".to_string()
                }
                other => other.to_string(),
            };
            (
                e.status(),
                Html(render_register(Some(&msg), &form.username, &form.email)),
            )
                .into_response()
        }
    }
}

pub async fn login_page() -> Html<String> {
    Html(render_login(None, ""))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginRequest>) -> Response {
    let user = match authenticate(&state.db, &form.username, &form.password).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("session login invalid credentials");
            return (
                StatusCode::UNAUTHORIZED,
                Html(render_login(Some("Invalid username or password."), &form.username)),
            )
                .into_response();
        }
        Err(e) => {
            log_rejection(&e, "session login");
            return (
                e.status(),
                Html(render_login(Some("Something went wrong, please try again."), &form.username)),
            )
                .into_response();
        }
    };

    let session = SessionKeys::from_ref(&state);
    let cookie = match session.start(&user.username) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "session sign failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    info!(user_id = user.id, "session started");
    ([(header::SET_COOKIE, cookie)], Redirect::to("/dashboard")).into_response()
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let session = SessionKeys::from_ref(&state);
    match session.clear() {
        Ok(cleared) => ([(header::SET_COOKIE, cleared)], Redirect::to(LOGIN_PATH)).into_response(),
        Err(e) => {
            error!(error = %e, "clear session cookie failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not end the session.").into_response()
        }
    }
}

pub async fn reset_page() -> Html<String> {
    Html(render_reset(None, None, ""))
}

#[instrument(skip(state, form))]
pub async fn reset(State(state): State<AppState>, Form(form): Form<ResetPasswordForm>) -> Response {
    match reset_password(&state.db, &form.email, &form.new_password).await {
        Ok(user) => {
            info!(user_id = user.id, "password reset");
            Html(render_reset(None, Some("Password updated. You can log in now."), "")).into_response()
        }
        Err(e) => {
            log_rejection(&e, "password reset");
            let msg = match &e {
                UserError::Store(StoreError::NotFound) => "No account with that email.".to_string(),
                UserError::Store(StoreError::Database(_)) | UserError::Hash(_) => {
                    "Something went wrong, please try again.".to_string()
                }
                other => other.to_string(),
            };
            (e.status(), Html(render_reset(Some(&msg), None, &form.email))).into_response()
        }
    }
}

pub async fn dashboard(SessionUser(user): SessionUser) -> Html<String> {
    Html(render_dashboard(&user.username, &user.email))
}

// ── HTML Templates ────────────────────────────────────────────────────

fn render_register(error: Option<&str>, username: &str, email: &str) -> String {
    let body = format!(
        r#"<h1>Register</h1>
  {error_html}
  <form method="POST" action="/auth/register">
    <label>Username</label>
    <input type="text" name="username" value="{username}" required autocomplete="username">
    <label>Email</label>
    <input type="email" name="email" value="{email}" required>
    <label>Password</label>
    <input type="password" name="password" required autocomplete="new-password">
    <button type="submit">Register</button>
  </form>
  <p>Already have an account? <a href="/auth/login">Log in</a></p>"#,
        error_html = error_block(error),
        username = escape(username),
        email = escape(email),
    );
    page("Register", &body)
}

fn render_login(error: Option<&str>, username: &str) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
  {error_html}
  <form method="POST" action="/auth/login">
    <label>Username</label>
    <input type="text" name="username" value="{username}" required autocomplete="username">
    <label>Password</label>
    <input type="password" name="password" required autocomplete="current-password">
    <button type="submit">Log in</button>
  </form>
  <p><a href="/auth/register">Register</a> · <a href="/auth/reset_password">Forgot password?</a></p>"#,
        error_html = error_block(error),
        username = escape(username),
    );
    page("Log in", &body)
}

fn render_reset(error: Option<&str>, notice: Option<&str>, email: &str) -> String {
    let notice_html = notice
        .map(|n| format!("<p>{}</p>", escape(n)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Reset password</h1>
  {error_html}{notice_html}
  <form method="POST" action="/auth/reset_password">
    <label>Email</label>
    <input type="email" name="email" value="{email}" required>
    <label>New password</label>
    <input type="password" name="new_password" required autocomplete="new-password">
    <button type="submit">Reset</button>
  </form>
  <p><a href="/auth/login">Back to login</a></p>"#,
        error_html = error_block(error),
        email = escape(email),
    );
    page("Reset password", &body)
}

fn render_dashboard(username: &str, email: &str) -> String {
    let body = format!(
        r#"<h1>Welcome, {username}</h1>
  <p>Signed in as {email}.</p>
  <p><a href="/auth/logout">Log out</a></p>"#,
        username = escape(username),
        email = escape(email),
    );
    page("Dashboard", &body)
}
