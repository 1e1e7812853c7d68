use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    state::AppState,
    users::{
        dto::{CreateUserRequest, Pagination, UpdateUserRequest, UserRead},
        repo::StoreError,
        repo_types::User,
        services::{self, rejection},
    },
};

type Created = (StatusCode, [(HeaderName, String); 1], Json<UserRead>);

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn store_rejection(e: StoreError) -> (StatusCode, String) {
    rejection(e.into())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<UserRead>>, (StatusCode, String)> {
    let users = User::list(&state.db, p.limit, p.offset)
        .await
        .map_err(store_rejection)?;
    Ok(Json(users.into_iter().map(UserRead::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserRead>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(store_rejection)?
        .ok_or_else(|| store_rejection(StoreError::NotFound))?;
    Ok(Json(user.into()))
}

/// `POST /api/users` and `POST /users`.
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Created, (StatusCode, String)> {
    let user = services::create_user(
        &state.db,
        &payload.username,
        &payload.email,
        Some(&payload.password),
        true,
    )
    .await
    .map_err(|e| {
        warn!(error = %e, email = %payload.email, "create user rejected");
        rejection(e)
    })?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/users/{}", user.id))],
        Json(user.into()),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserRead>, (StatusCode, String)> {
    let user = services::update_user(
        &state.db,
        id,
        payload.username.as_deref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await
    .map_err(|e| {
        warn!(error = %e, id, "update user rejected");
        rejection(e)
    })?;

    info!(user_id = user.id, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    User::delete(&state.db, id).await.map_err(|e| {
        warn!(error = %e, id, "delete user rejected");
        store_rejection(e)
    })?;
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
