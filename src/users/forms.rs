//! HTML form flows for managing users.
//!
//! `GET /` shows the add form, `GET /users` the list. Validation failures
//! re-render the form with an inline error and a 4xx status; successful
//! writes redirect back to the list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{
    html::{error_block, escape, page},
    state::AppState,
    users::{
        handlers,
        repo::StoreError,
        repo_types::User,
        services::{self, UserError},
    },
};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/users", get(list_page).post(handlers::create_user))
        .route("/add_user", post(add_user))
        .route("/edit_user/:id", get(edit_page))
        .route("/update_user/:id", post(update_user))
        .route("/delete_user/:id", get(delete_user))
}

#[derive(Debug, Deserialize)]
pub struct UserForm {
    #[serde(default, alias = "username")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Which form produced an error; duplicate emails read differently on edit.
#[derive(Clone, Copy)]
enum FormKind {
    Add,
    Edit,
}

fn form_message(e: &UserError, kind: FormKind) -> String {
    match (e, kind) {
        (UserError::Store(StoreError::EmailTaken), FormKind::Add) => {
            "This email already exists. Try another.".into()
        }
        (UserError::Store(StoreError::EmailTaken), FormKind::Edit) => {
            "This email is already used by another user.".into()
        }
        // only raised when both rows carry a password
        (UserError::Store(StoreError::UsernameTaken), _) => {
            "This name is already used by an account with a password.".into()
        }
        (UserError::Store(StoreError::Database(_)), _) | (UserError::Hash(_), _) => {
            "Something went wrong, please try again.".into()
        }
        _ => e.to_string(),
    }
}

pub async fn index() -> Html<String> {
    Html(render_index(None, "", ""))
}

#[instrument(skip(state))]
pub async fn list_page(State(state): State<AppState>) -> Response {
    match User::list_newest_first(&state.db).await {
        Ok(users) => Html(render_user_list(&users)).into_response(),
        Err(e) => {
            error!(error = %e, "list users failed");
            (e.status(), Html(render_message("Error", &e.to_string()))).into_response()
        }
    }
}

#[instrument(skip(state, form))]
pub async fn add_user(State(state): State<AppState>, Form(form): Form<UserForm>) -> Response {
    let result = services::create_user(
        &state.db,
        &form.name,
        &form.email,
        form.password.as_deref(),
        false,
    )
    .await;

    match result {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "user added");
            Redirect::to("/users").into_response()
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!(error = %e, "add user failed");
            } else {
                warn!(error = %e, "add user rejected");
            }
            let msg = form_message(&e, FormKind::Add);
            (status, Html(render_index(Some(&msg), &form.name, &form.email))).into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn edit_page(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match User::find_by_id(&state.db, id).await {
        Ok(Some(user)) => Html(render_edit(id, None, &user.username, &user.email)).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!(error = %e, id, "load user failed");
            (e.status(), Html(render_message("Error", &e.to_string()))).into_response()
        }
    }
}

#[instrument(skip(state, form))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<UserForm>,
) -> Response {
    if form.name.trim().is_empty() || form.email.trim().is_empty() {
        let msg = UserError::MissingField.to_string();
        return (
            StatusCode::BAD_REQUEST,
            Html(render_edit(id, Some(&msg), &form.name, &form.email)),
        )
            .into_response();
    }

    let result = services::update_user(
        &state.db,
        id,
        Some(&form.name),
        Some(&form.email),
        form.password.as_deref(),
    )
    .await;

    match result {
        Ok(user) => {
            info!(user_id = user.id, "user updated");
            Redirect::to("/users").into_response()
        }
        Err(UserError::Store(StoreError::NotFound)) => not_found(),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!(error = %e, id, "update user failed");
            } else {
                warn!(error = %e, id, "update user rejected");
            }
            let msg = form_message(&e, FormKind::Edit);
            (status, Html(render_edit(id, Some(&msg), &form.name, &form.email))).into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match User::delete(&state.db, id).await {
        Ok(()) => {
            info!(user_id = id, "user deleted");
            Redirect::to("/users").into_response()
        }
        Err(StoreError::NotFound) => not_found(),
        Err(e) => {
            error!(error = %e, id, "delete user failed");
            (e.status(), Html(render_message("Error", &e.to_string()))).into_response()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render_message("Not Found", "User not found.")),
    )
        .into_response()
}

// ── HTML Templates ────────────────────────────────────────────────────

fn user_fields(name: &str, email: &str, password_label: &str) -> String {
    format!(
        r#"<label>Name</label>
    <input type="text" name="name" value="{name}" required>
    <label>Email</label>
    <input type="email" name="email" value="{email}" required>
    <label>{password_label}</label>
    <input type="password" name="password" autocomplete="new-password">"#,
        name = escape(name),
        email = escape(email),
    )
}

fn render_index(error: Option<&str>, name: &str, email: &str) -> String {
    let body = format!(
        r#"<h1>Add User</h1>
  {error_html}
  <form method="POST" action="/add_user">
    {fields}
    <button type="submit">Add User</button>
  </form>
  <p><a href="/users">View all users</a> · <a href="/auth/login">Log in</a></p>"#,
        error_html = error_block(error),
        fields = user_fields(name, email, "Password (optional)"),
    );
    page("Users", &body)
}

fn render_user_list(users: &[User]) -> String {
    let rows: String = users
        .iter()
        .map(|u| {
            format!(
                r#"<tr><td>{id}</td><td>{name}</td><td>{email}</td><td>{added}</td>
      <td><a href="/edit_user/{id}">Edit</a> <a href="/delete_user/{id}">Delete</a></td></tr>"#,
                id = u.id,
                name = escape(&u.username),
                email = escape(&u.email),
                added = u
                    .created_at
                    .format(time::macros::format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second]"
                    ))
                    .unwrap_or_default(),
            )
        })
        .collect();

    let body = format!(
        r#"<h1>All Users</h1>
  <table>
    <thead><tr><th>ID</th><th>Name</th><th>Email</th><th>Added</th><th></th></tr></thead>
    <tbody>
    {rows}
    </tbody>
  </table>
  <p><a href="/">Add another user</a></p>"#
    );
    page("All Users", &body)
}

fn render_edit(id: i64, error: Option<&str>, name: &str, email: &str) -> String {
    let body = format!(
        r#"<h1>Edit User</h1>
  {error_html}
  <form method="POST" action="/update_user/{id}">
    {fields}
    <button type="submit">Save</button>
  </form>
  <p><a href="/users">Back to users</a></p>"#,
        error_html = error_block(error),
        fields = user_fields(name, email, "New password (leave blank to keep)"),
    );
    page("Edit User", &body)
}

fn render_message(title: &str, message: &str) -> String {
    let body = format!(
        r#"<h1>{title}</h1>
  <p>{message}</p>
  <p><a href="/users">Back to users</a></p>"#,
        title = escape(title),
        message = escape(message),
    );
    page(title, &body)
}
