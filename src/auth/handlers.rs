use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{truncate_token, LoginRequest, MeResponse, TokenResponse},
        jwt::{bearer_token, AuthUser, JwtKeys},
    },
    state::AppState,
    users::services::{authenticate, rejection},
};

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(get_me))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let user = match authenticate(&state.db, &payload.username, &payload.password).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("login invalid credentials");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(rejection(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let access_token = match keys.sign(&user.username) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token)))
}

#[instrument(skip(headers))]
pub async fn get_me(
    AuthUser(username): AuthUser,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, (StatusCode, String)> {
    let token = bearer_token(&headers)?;
    Ok(Json(MeResponse {
        username,
        token: truncate_token(token),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        app::build_app, auth::jwt::JwtKeys, state::AppState, users::services::create_user,
    };

    async fn app_with_user() -> (Router, AppState) {
        let state = AppState::fake().await;
        create_user(&state.db, "mohon", "mohon@example.com", Some("abcd1234"), true)
            .await
            .expect("seed");
        (build_app(state.clone()), state)
    }

    fn login_form(username: &str, password: &str) -> Request<Body> {
        Request::post("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={username}&password={password}"
            )))
            .unwrap()
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn login_issues_token_for_the_same_username() {
        let (app, state) = app_with_user().await;
        let res = app.oneshot(login_form("mohon", "abcd1234")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap();
        let claims = JwtKeys::from_ref(&state).verify(token).expect("verify");
        assert_eq!(claims.sub, "mohon");
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (app, _) = app_with_user().await;
        let res = app.clone().oneshot(login_form("mohon", "nope-nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(login_form("ghost", "abcd1234")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_echoes_username_and_truncated_token() {
        let (app, state) = app_with_user().await;
        let token = JwtKeys::from_ref(&state).sign("mohon").unwrap();
        let res = app
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["username"], "mohon");
        assert_eq!(body["token"], format!("{}...", &token[..20]));
    }

    #[tokio::test]
    async fn me_rejects_tampered_token() {
        let (app, state) = app_with_user().await;
        let keys = JwtKeys::from_ref(&state);
        let real = keys.sign("mohon").unwrap();
        let other = keys.sign("admin").unwrap();
        let r: Vec<&str> = real.split('.').collect();
        let o: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", r[0], o[1], r[2]);

        let res = app
            .oneshot(
                Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
