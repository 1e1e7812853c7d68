//! Cookie sessions for the HTML flows.
//!
//! The cookie value is a JWT signed with the session secret and a
//! session-only audience, so bearer tokens from `/login` are never accepted
//! as a session and vice versa. Logging out clears the cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error};

use crate::{auth::jwt::JwtKeys, state::AppState, users::repo_types::User};

pub const LOGIN_PATH: &str = "/auth/login";

/// Keys and cookie settings for sessions.
#[derive(Clone)]
pub struct SessionKeys {
    pub keys: JwtKeys,
    pub cookie_name: String,
    pub secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let cfg = &state.config;
        Self {
            keys: JwtKeys::new(
                &cfg.session.secret,
                &cfg.jwt.issuer,
                &format!("{}:session", cfg.jwt.audience),
                cfg.jwt.ttl_minutes,
            ),
            cookie_name: cfg.session.cookie_name.clone(),
            secure: cfg.session.secure,
        }
    }
}

impl SessionKeys {
    /// `Set-Cookie` value that starts a session for `username`.
    pub fn start(&self, username: &str) -> anyhow::Result<HeaderValue> {
        let token = self.keys.sign(username)?;
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, token
        );
        if let Some(ttl) = self.keys.ttl {
            cookie.push_str(&format!("; Max-Age={}", ttl.as_secs()));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// `Set-Cookie` value that removes the session cookie. Fails when the
    /// configured cookie name is not a valid header value.
    pub fn clear(&self) -> anyhow::Result<HeaderValue> {
        let cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Username of a valid session cookie, if any.
    pub fn username(&self, headers: &HeaderMap) -> Option<String> {
        let token = read_cookie(headers, &self.cookie_name)?;
        match self.keys.verify(&token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                debug!(error = %e, "session cookie rejected");
                None
            }
        }
    }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// The logged-in user of an HTML request. Redirects to the login page when
/// there is no valid session or the user no longer exists.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionKeys::from_ref(state);
        let Some(username) = session.username(&parts.headers) else {
            return Err(Redirect::to(LOGIN_PATH).into_response());
        };

        match User::find_account(&state.db, &username).await {
            Ok(Some(user)) => Ok(SessionUser(user)),
            Ok(None) => {
                debug!(%username, "session for deleted user");
                match session.clear() {
                    Ok(cleared) => {
                        Err(([(header::SET_COOKIE, cleared)], Redirect::to(LOGIN_PATH)).into_response())
                    }
                    Err(e) => {
                        error!(error = %e, "clear session cookie failed");
                        Err(Redirect::to(LOGIN_PATH).into_response())
                    }
                }
            }
            Err(e) => {
                error!(error = %e, %username, "load session user failed");
                Err((e.status(), e.to_string()).into_response())
            }
        }
    }
}
